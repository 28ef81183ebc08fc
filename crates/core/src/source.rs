//! The clinical data capability the evaluator depends on.

use crate::error::SourceError;
use crate::model::{
    CalculationContext, ClinicalRule, Encounter, Observation, Patient, ProgramEnrollment,
    RuleOutcome,
};
use greencard_types::{ConceptId, MetadataUuid, PatientId};

pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Lookups against the underlying EMR.
///
/// Every method returns `Ok(None)` when there is no matching data. Errors are reserved for
/// faults of the source itself.
pub trait ClinicalFactSource {
    fn resolve_patient(&self, id: PatientId) -> SourceResult<Option<Patient>>;

    /// Latest encounter of the given encounter type on or before `ctx.now()`.
    fn last_encounter(
        &self,
        patient: &Patient,
        encounter_type: &MetadataUuid,
        ctx: &CalculationContext,
    ) -> SourceResult<Option<Encounter>>;

    /// Latest drug regimen encounter of the given category on or before `ctx.now()`.
    fn last_encounter_for_category(
        &self,
        patient: &Patient,
        category: &str,
        ctx: &CalculationContext,
    ) -> SourceResult<Option<Encounter>>;

    /// Earliest drug regimen encounter of the given category on or before `ctx.now()`.
    fn first_encounter_for_category(
        &self,
        patient: &Patient,
        category: &str,
        ctx: &CalculationContext,
    ) -> SourceResult<Option<Encounter>>;

    /// Enrollment in `program` active at `ctx.now()`.
    fn active_enrollment(
        &self,
        patient: &Patient,
        program: &MetadataUuid,
        ctx: &CalculationContext,
    ) -> SourceResult<Option<ProgramEnrollment>>;

    /// Latest observation of `concept` on or before `ctx.now()`.
    fn last_observation(
        &self,
        patient: &Patient,
        concept: ConceptId,
        ctx: &CalculationContext,
    ) -> SourceResult<Option<Observation>>;

    fn evaluate_rule(
        &self,
        patient: &Patient,
        rule: ClinicalRule,
        ctx: &CalculationContext,
    ) -> SourceResult<Option<RuleOutcome>>;
}

impl<S: ClinicalFactSource + ?Sized> ClinicalFactSource for std::sync::Arc<S> {
    fn resolve_patient(&self, id: PatientId) -> SourceResult<Option<Patient>> {
        (**self).resolve_patient(id)
    }

    fn last_encounter(
        &self,
        patient: &Patient,
        encounter_type: &MetadataUuid,
        ctx: &CalculationContext,
    ) -> SourceResult<Option<Encounter>> {
        (**self).last_encounter(patient, encounter_type, ctx)
    }

    fn last_encounter_for_category(
        &self,
        patient: &Patient,
        category: &str,
        ctx: &CalculationContext,
    ) -> SourceResult<Option<Encounter>> {
        (**self).last_encounter_for_category(patient, category, ctx)
    }

    fn first_encounter_for_category(
        &self,
        patient: &Patient,
        category: &str,
        ctx: &CalculationContext,
    ) -> SourceResult<Option<Encounter>> {
        (**self).first_encounter_for_category(patient, category, ctx)
    }

    fn active_enrollment(
        &self,
        patient: &Patient,
        program: &MetadataUuid,
        ctx: &CalculationContext,
    ) -> SourceResult<Option<ProgramEnrollment>> {
        (**self).active_enrollment(patient, program, ctx)
    }

    fn last_observation(
        &self,
        patient: &Patient,
        concept: ConceptId,
        ctx: &CalculationContext,
    ) -> SourceResult<Option<Observation>> {
        (**self).last_observation(patient, concept, ctx)
    }

    fn evaluate_rule(
        &self,
        patient: &Patient,
        rule: ClinicalRule,
        ctx: &CalculationContext,
    ) -> SourceResult<Option<RuleOutcome>> {
        (**self).evaluate_rule(patient, rule, ctx)
    }
}

/// Pick the latest observation dated on or before `on_or_before`.
///
/// Candidates are scanned in order and a later candidate only replaces the current pick when
/// it is strictly later, so the first candidate wins a timestamp tie.
pub fn find_last_on_or_before<'a>(
    candidates: impl IntoIterator<Item = &'a Observation>,
    on_or_before: chrono::DateTime<chrono::Utc>,
) -> Option<&'a Observation> {
    let mut last: Option<&Observation> = None;
    for obs in candidates {
        if obs.datetime > on_or_before {
            continue;
        }
        if last.map_or(true, |l| obs.datetime > l.datetime) {
            last = Some(obs);
        }
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObsValue;
    use chrono::{TimeZone, Utc};

    fn numeric(concept: u32, day: u32, value: f64) -> Observation {
        Observation {
            concept: ConceptId::new(concept).unwrap(),
            datetime: Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap(),
            value: ObsValue::Numeric(value),
        }
    }

    #[test]
    fn picks_latest_not_after_cutoff() {
        let a = numeric(1, 1, 1.0);
        let b = numeric(2, 10, 2.0);
        let c = numeric(3, 20, 3.0);
        let cutoff = Utc.with_ymd_and_hms(2024, 5, 15, 0, 0, 0).unwrap();
        let picked = find_last_on_or_before([&a, &c, &b], cutoff).expect("one candidate");
        assert_eq!(picked, &b);
    }

    #[test]
    fn first_candidate_wins_tie() {
        let a = numeric(1, 3, 1.0);
        let b = numeric(2, 3, 2.0);
        let cutoff = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(find_last_on_or_before([&a, &b], cutoff), Some(&a));
        assert_eq!(find_last_on_or_before([&b, &a], cutoff), Some(&b));
    }

    #[test]
    fn nothing_when_all_after_cutoff() {
        let a = numeric(1, 30, 1.0);
        let cutoff = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        assert!(find_last_on_or_before([&a], cutoff).is_none());
    }
}
