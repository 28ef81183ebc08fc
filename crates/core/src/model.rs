//! Read-side projections of EMR entities.
//!
//! Nothing here is created or mutated by the evaluator. The shapes carry only what the
//! greencard questions look at.

use chrono::{DateTime, Utc};
use greencard_types::{ConceptId, MetadataUuid, PatientId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
}

/// Value of an observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObsValue {
    Numeric(f64),
    Coded(CodedAnswer),
    Text(String),
}

/// A coded answer with its optional short display name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodedAnswer {
    pub concept: ConceptId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A timestamped (question, answer) pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Observation {
    pub concept: ConceptId,
    pub datetime: DateTime<Utc>,
    /// Written as a one-key map: `numeric: 856.0`, `coded: { concept: 1065 }` or `text: ...`.
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub value: ObsValue,
}

impl Observation {
    pub fn value_numeric(&self) -> Option<f64> {
        match &self.value {
            ObsValue::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    pub fn value_coded(&self) -> Option<&CodedAnswer> {
        match &self.value {
            ObsValue::Coded(answer) => Some(answer),
            _ => None,
        }
    }

    pub fn value_text(&self) -> Option<&str> {
        match &self.value {
            ObsValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// True when this observation answers `question` with the coded `answer`.
    pub fn answers(&self, question: ConceptId, answer: ConceptId) -> bool {
        self.concept == question && self.value_coded().is_some_and(|c| c.concept == answer)
    }
}

/// A timestamped clinical event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Encounter {
    pub id: u64,
    pub encounter_type: MetadataUuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<MetadataUuid>,
    /// Drug regimen category (`ARV`, `TB`) for regimen editor encounters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub datetime: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observations: Vec<Observation>,
}

impl Encounter {
    /// True when any observation of this encounter answers `question` with `answer`.
    pub fn has_coded_answer(&self, question: ConceptId, answer: ConceptId) -> bool {
        self.observations.iter().any(|o| o.answers(question, answer))
    }
}

/// A (patient, program) enrollment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgramEnrollment {
    pub program: MetadataUuid,
    pub enrolled_on: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_on: Option<DateTime<Utc>>,
}

impl ProgramEnrollment {
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.enrolled_on <= at && self.completed_on.map_or(true, |done| done > at)
    }
}

/// Regimen reconstructed from the observations of one drug regimen encounter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RegimenSummary {
    /// Start date formatted `dd-MMM-yyyy`.
    pub start_date: Option<String>,
    pub short_display: Option<String>,
}

/// Externally defined clinical rules evaluated per patient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalRule {
    IsPregnant,
    IsBreastFeeding,
}

/// The non-null result of a rule evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleOutcome {
    pub rule: ClinicalRule,
    /// The observation that satisfied the rule, when the rule is observation based.
    pub evidence: Option<Observation>,
}

/// Supplies the "current time" a question is evaluated at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalculationContext {
    now: DateTime<Utc>,
}

impl CalculationContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Context evaluated at the system clock's current instant.
    pub fn current() -> Self {
        Self::new(Utc::now())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn enrollment_is_active_between_enrolled_and_completed() {
        let enrollment = ProgramEnrollment {
            program: MetadataUuid::new("tb").unwrap(),
            enrolled_on: at(2024, 1, 1),
            completed_on: Some(at(2024, 7, 1)),
        };
        assert!(!enrollment.is_active_at(at(2023, 12, 31)));
        assert!(enrollment.is_active_at(at(2024, 1, 1)));
        assert!(enrollment.is_active_at(at(2024, 6, 30)));
        assert!(!enrollment.is_active_at(at(2024, 7, 1)));
    }

    #[test]
    fn answers_requires_matching_question_and_coded_answer() {
        let q = ConceptId::new(161555).unwrap();
        let a = ConceptId::new(1267).unwrap();
        let obs = Observation {
            concept: q,
            datetime: at(2024, 1, 1),
            value: ObsValue::Coded(CodedAnswer {
                concept: a,
                name: None,
            }),
        };
        assert!(obs.answers(q, a));
        assert!(!obs.answers(a, a));
        assert!(!obs.answers(q, ConceptId::new(1268).unwrap()));
    }

    #[test]
    fn observation_values_read_as_one_key_maps() {
        let numeric: Observation = serde_yaml::from_str(
            "concept: 856\ndatetime: 2024-03-01T00:00:00Z\nvalue: { numeric: 1200.0 }\n",
        )
        .unwrap();
        assert_eq!(numeric.value_numeric(), Some(1200.0));

        let coded: Observation = serde_yaml::from_str(
            "concept: 5272\ndatetime: 2024-03-01T00:00:00Z\nvalue:\n  coded:\n    concept: 1065\n    name: Pregnant\n",
        )
        .unwrap();
        let answer = coded.value_coded().expect("coded value");
        assert_eq!(answer.concept.get(), 1065);
        assert_eq!(answer.name.as_deref(), Some("Pregnant"));

        let text: Observation = serde_yaml::from_str(
            "concept: 1193\ndatetime: 2024-03-01T00:00:00Z\nvalue:\n  text: AZT/3TC/NVP\n",
        )
        .unwrap();
        assert_eq!(text.value_text(), Some("AZT/3TC/NVP"));

        let back = serde_yaml::to_string(&numeric).unwrap();
        assert!(back.contains("numeric: 1200.0"), "{back}");
    }
}
