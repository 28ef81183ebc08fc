//! In-memory clinical fact source backed by a YAML patient record document.
//!
//! The document lists patients with their encounters, program enrollments and standalone
//! observations:
//!
//! ```yaml
//! patients:
//!   - id: 7
//!     encounters:
//!       - id: 1
//!         encounter_type: de78a6be-bfc5-4634-adc3-5f1a280455cc
//!         datetime: 2023-01-10T09:00:00Z
//!     enrollments:
//!       - program: 9f144a34-3a4a-44a9-8486-6b7af6cc64f6
//!         enrolled_on: 2024-02-01T00:00:00Z
//!     observations:
//!       - concept: 856
//!         datetime: 2024-03-01T00:00:00Z
//!         value: { numeric: 1200.0 }
//! ```
//!
//! Parsing is strict: unknown keys are rejected and schema errors name the failing field.

use crate::config::ClinicalIdentifiers;
use crate::error::{GreencardError, GreencardResult};
use crate::model::{
    CalculationContext, ClinicalRule, Encounter, Observation, Patient, ProgramEnrollment,
    RuleOutcome,
};
use crate::source::{ClinicalFactSource, SourceResult};
use greencard_types::{ConceptId, MetadataUuid, PatientId};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Deserialize YAML text, reporting the path of the failing field on schema errors.
pub(crate) fn parse_yaml_strict<T: DeserializeOwned>(yaml_text: &str) -> GreencardResult<T> {
    let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

    match serde_path_to_error::deserialize::<_, T>(deserializer) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() || path == "." {
                "<root>".to_owned()
            } else {
                path
            };
            Err(GreencardError::SchemaMismatch {
                path,
                message: source.to_string(),
            })
        }
    }
}

/// Top level record document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientRecords {
    #[serde(default)]
    pub patients: Vec<PatientRecord>,
}

/// Everything known about one patient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientRecord {
    pub id: PatientId,
    #[serde(default)]
    pub encounters: Vec<Encounter>,
    #[serde(default)]
    pub enrollments: Vec<ProgramEnrollment>,
    /// Observations recorded outside any encounter.
    #[serde(default)]
    pub observations: Vec<Observation>,
}

impl PatientRecord {
    pub fn new(id: PatientId) -> Self {
        Self {
            id,
            encounters: Vec::new(),
            enrollments: Vec::new(),
            observations: Vec::new(),
        }
    }

    pub fn with_encounter(mut self, encounter: Encounter) -> Self {
        self.encounters.push(encounter);
        self
    }

    pub fn with_enrollment(mut self, enrollment: ProgramEnrollment) -> Self {
        self.enrollments.push(enrollment);
        self
    }

    pub fn with_observation(mut self, observation: Observation) -> Self {
        self.observations.push(observation);
        self
    }

    fn all_observations(&self) -> impl Iterator<Item = &Observation> {
        self.encounters
            .iter()
            .flat_map(|e| e.observations.iter())
            .chain(self.observations.iter())
    }
}

/// Concepts the in-memory rule evaluation looks at.
#[derive(Clone, Debug)]
struct RuleConcepts {
    pregnancy_status: ConceptId,
    breastfeeding: ConceptId,
    yes: ConceptId,
}

/// A [`ClinicalFactSource`] over records held in memory.
#[derive(Clone, Debug)]
pub struct InMemoryFactSource {
    patients: HashMap<PatientId, PatientRecord>,
    rules: RuleConcepts,
}

impl InMemoryFactSource {
    /// Build a source from parsed records.
    ///
    /// Encounters are ordered by datetime; encounters sharing a datetime keep record order.
    ///
    /// # Errors
    ///
    /// Returns [`GreencardError::DuplicatePatient`] if two records share a patient id.
    pub fn new(records: PatientRecords, identifiers: &ClinicalIdentifiers) -> GreencardResult<Self> {
        let mut patients = HashMap::with_capacity(records.patients.len());
        for mut record in records.patients {
            record.encounters.sort_by_key(|e| e.datetime);
            let id = record.id;
            if patients.insert(id, record).is_some() {
                return Err(GreencardError::DuplicatePatient(id));
            }
        }

        tracing::debug!(patients = patients.len(), "loaded patient records");

        Ok(Self {
            patients,
            rules: RuleConcepts {
                pregnancy_status: identifiers.pregnancy_status,
                breastfeeding: identifiers.breastfeeding,
                yes: identifiers.yes,
            },
        })
    }

    /// Parse records from YAML text.
    pub fn from_yaml_str(yaml_text: &str, identifiers: &ClinicalIdentifiers) -> GreencardResult<Self> {
        let records: PatientRecords = parse_yaml_strict(yaml_text)?;
        Self::new(records, identifiers)
    }

    /// Read records from a YAML file.
    pub fn from_path(path: &Path, identifiers: &ClinicalIdentifiers) -> GreencardResult<Self> {
        let text = std::fs::read_to_string(path).map_err(GreencardError::FileRead)?;
        Self::from_yaml_str(&text, identifiers)
    }

    /// Ids of all known patients in ascending order.
    pub fn patient_ids(&self) -> Vec<PatientId> {
        let mut ids: Vec<PatientId> = self.patients.keys().copied().collect();
        ids.sort();
        ids
    }

    fn record(&self, patient: &Patient) -> Option<&PatientRecord> {
        self.patients.get(&patient.id)
    }

    /// Encounters dated on or before `ctx.now()`, oldest first.
    fn encounters_until<'a>(
        &'a self,
        patient: &Patient,
        ctx: &CalculationContext,
    ) -> impl DoubleEndedIterator<Item = &'a Encounter> {
        let now = ctx.now();
        self.record(patient)
            .map(|r| r.encounters.as_slice())
            .unwrap_or_default()
            .iter()
            .filter(move |e| e.datetime <= now)
    }

    fn latest_observation(
        &self,
        patient: &Patient,
        concept: ConceptId,
        ctx: &CalculationContext,
    ) -> Option<Observation> {
        self.record(patient)?
            .all_observations()
            .filter(|o| o.concept == concept && o.datetime <= ctx.now())
            .max_by_key(|o| o.datetime)
            .cloned()
    }
}

impl ClinicalFactSource for InMemoryFactSource {
    fn resolve_patient(&self, id: PatientId) -> SourceResult<Option<Patient>> {
        Ok(self.patients.get(&id).map(|r| Patient { id: r.id }))
    }

    fn last_encounter(
        &self,
        patient: &Patient,
        encounter_type: &MetadataUuid,
        ctx: &CalculationContext,
    ) -> SourceResult<Option<Encounter>> {
        Ok(self
            .encounters_until(patient, ctx)
            .rev()
            .find(|e| &e.encounter_type == encounter_type)
            .cloned())
    }

    fn last_encounter_for_category(
        &self,
        patient: &Patient,
        category: &str,
        ctx: &CalculationContext,
    ) -> SourceResult<Option<Encounter>> {
        Ok(self
            .encounters_until(patient, ctx)
            .rev()
            .find(|e| e.category.as_deref() == Some(category))
            .cloned())
    }

    fn first_encounter_for_category(
        &self,
        patient: &Patient,
        category: &str,
        ctx: &CalculationContext,
    ) -> SourceResult<Option<Encounter>> {
        Ok(self
            .encounters_until(patient, ctx)
            .find(|e| e.category.as_deref() == Some(category))
            .cloned())
    }

    fn active_enrollment(
        &self,
        patient: &Patient,
        program: &MetadataUuid,
        ctx: &CalculationContext,
    ) -> SourceResult<Option<ProgramEnrollment>> {
        Ok(self.record(patient).and_then(|r| {
            r.enrollments
                .iter()
                .filter(|e| &e.program == program && e.is_active_at(ctx.now()))
                .max_by_key(|e| e.enrolled_on)
                .cloned()
        }))
    }

    fn last_observation(
        &self,
        patient: &Patient,
        concept: ConceptId,
        ctx: &CalculationContext,
    ) -> SourceResult<Option<Observation>> {
        Ok(self.latest_observation(patient, concept, ctx))
    }

    fn evaluate_rule(
        &self,
        patient: &Patient,
        rule: ClinicalRule,
        ctx: &CalculationContext,
    ) -> SourceResult<Option<RuleOutcome>> {
        let question = match rule {
            ClinicalRule::IsPregnant => self.rules.pregnancy_status,
            ClinicalRule::IsBreastFeeding => self.rules.breastfeeding,
        };

        Ok(self
            .latest_observation(patient, question, ctx)
            .filter(|o| o.answers(question, self.rules.yes))
            .map(|evidence| RuleOutcome {
                rule,
                evidence: Some(evidence),
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::io::Write;

    const SAMPLE: &str = r#"patients:
  - id: 7
    encounters:
      - id: 2
        encounter_type: 7dffc392-13e7-11e9-ab14-d663bd873d93
        category: ARV
        datetime: 2024-03-05T10:00:00Z
      - id: 1
        encounter_type: 7dffc392-13e7-11e9-ab14-d663bd873d93
        category: ARV
        datetime: 2023-01-10T09:00:00Z
    enrollments:
      - program: 9f144a34-3a4a-44a9-8486-6b7af6cc64f6
        enrolled_on: 2024-02-01T00:00:00Z
    observations:
      - concept: 5272
        datetime: 2024-04-01T00:00:00Z
        value:
          coded:
            concept: 1065
  - id: 8
"#;

    fn ctx(y: i32, m: u32, d: u32) -> CalculationContext {
        CalculationContext::new(Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap())
    }

    fn source() -> InMemoryFactSource {
        InMemoryFactSource::from_yaml_str(SAMPLE, &ClinicalIdentifiers::default())
            .expect("parse sample")
    }

    fn patient(id: u32) -> Patient {
        Patient {
            id: PatientId::new(id).unwrap(),
        }
    }

    #[test]
    fn resolves_known_patients_only() {
        let source = source();
        assert!(source.resolve_patient(PatientId::new(7).unwrap()).unwrap().is_some());
        assert!(source.resolve_patient(PatientId::new(9).unwrap()).unwrap().is_none());
        assert_eq!(
            source.patient_ids(),
            vec![PatientId::new(7).unwrap(), PatientId::new(8).unwrap()]
        );
    }

    #[test]
    fn first_and_last_encounters_follow_datetime_not_record_order() {
        let source = source();
        let now = ctx(2024, 6, 1);
        let first = source
            .first_encounter_for_category(&patient(7), "ARV", &now)
            .unwrap()
            .expect("first encounter");
        let last = source
            .last_encounter_for_category(&patient(7), "ARV", &now)
            .unwrap()
            .expect("last encounter");
        assert_eq!(first.id, 1);
        assert_eq!(last.id, 2);
        assert!(source
            .last_encounter_for_category(&patient(7), "TB", &now)
            .unwrap()
            .is_none());
    }

    #[test]
    fn encounters_after_now_are_ignored() {
        let source = source();
        let arv_type = MetadataUuid::new("7dffc392-13e7-11e9-ab14-d663bd873d93").unwrap();

        let last = source
            .last_encounter_for_category(&patient(7), "ARV", &ctx(2023, 6, 1))
            .unwrap()
            .expect("earlier encounter");
        assert_eq!(last.id, 1);
        assert_eq!(
            source
                .last_encounter(&patient(7), &arv_type, &ctx(2023, 6, 1))
                .unwrap()
                .map(|e| e.id),
            Some(1)
        );

        let before_any = ctx(2022, 12, 31);
        assert!(source
            .first_encounter_for_category(&patient(7), "ARV", &before_any)
            .unwrap()
            .is_none());
        assert!(source
            .last_encounter(&patient(7), &arv_type, &before_any)
            .unwrap()
            .is_none());
    }

    #[test]
    fn enrollment_is_checked_against_now() {
        let source = source();
        let tb = MetadataUuid::new("9f144a34-3a4a-44a9-8486-6b7af6cc64f6").unwrap();
        assert!(source
            .active_enrollment(&patient(7), &tb, &ctx(2024, 1, 1))
            .unwrap()
            .is_none());
        assert!(source
            .active_enrollment(&patient(7), &tb, &ctx(2024, 6, 1))
            .unwrap()
            .is_some());
    }

    #[test]
    fn observations_after_now_are_ignored() {
        let source = source();
        let concept = ConceptId::new(5272).unwrap();
        assert!(source
            .last_observation(&patient(7), concept, &ctx(2024, 3, 1))
            .unwrap()
            .is_none());
        assert!(source
            .last_observation(&patient(7), concept, &ctx(2024, 5, 1))
            .unwrap()
            .is_some());
    }

    #[test]
    fn pregnancy_rule_uses_latest_yes_answer() {
        let source = source();
        let outcome = source
            .evaluate_rule(&patient(7), ClinicalRule::IsPregnant, &ctx(2024, 5, 1))
            .unwrap()
            .expect("pregnant");
        assert_eq!(outcome.rule, ClinicalRule::IsPregnant);
        assert!(source
            .evaluate_rule(&patient(7), ClinicalRule::IsBreastFeeding, &ctx(2024, 5, 1))
            .unwrap()
            .is_none());
    }

    #[test]
    fn rejects_duplicate_patients() {
        let err = InMemoryFactSource::from_yaml_str(
            "patients:\n  - id: 3\n  - id: 3\n",
            &ClinicalIdentifiers::default(),
        )
        .expect_err("duplicate ids");
        assert!(matches!(err, GreencardError::DuplicatePatient(id) if id.get() == 3));
    }

    #[test]
    fn schema_errors_name_the_field() {
        let err = InMemoryFactSource::from_yaml_str(
            "patients:\n  - id: 3\n    encounterz: []\n",
            &ClinicalIdentifiers::default(),
        )
        .expect_err("unknown key");
        match err {
            GreencardError::SchemaMismatch { path, message } => {
                assert!(path.starts_with("patients"));
                assert!(message.contains("encounterz"));
            }
            other => panic!("expected SchemaMismatch error, got {other:?}"),
        }
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(SAMPLE.as_bytes()).expect("write sample");
        let source = InMemoryFactSource::from_path(file.path(), &ClinicalIdentifiers::default())
            .expect("load file");
        assert_eq!(source.patient_ids().len(), 2);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = InMemoryFactSource::from_path(
            &dir.path().join("missing.yaml"),
            &ClinicalIdentifiers::default(),
        )
        .expect_err("missing file");
        assert!(matches!(err, GreencardError::FileRead(_)));
    }
}
