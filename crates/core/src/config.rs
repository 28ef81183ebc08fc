//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses.

use crate::constants::{
    ADHERENCE_QUESTION, ARV_CATEGORY, BREASTFEEDING, DEFAULT_ADHERENCE_WINDOW_DAYS,
    DEFAULT_ART_THRESHOLD_MONTHS, GOOD_ADHERENCE_ANSWER, HIV_ENROLLMENT_ENCOUNTER_TYPE,
    HIV_VIRAL_LOAD, IPT_COMPLETED_ANSWER, IPT_OUTCOME_ENCOUNTER_TYPE, IPT_OUTCOME_QUESTION,
    IPT_PROGRAM, LDL_ANSWER, LDL_QUESTION, PREGNANCY_STATUS, REGIMEN, REGIMEN_PLAN,
    REGIMEN_START_DATE, REGIMEN_STOPPED, TB_PROGRAM, YES,
};
use crate::{GreencardError, GreencardResult};
use greencard_types::{ConceptId, MetadataUuid};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The fixed clinical identifiers every question is evaluated against.
///
/// Defaults are the KenyaEMR dictionary values. A deployment may override any subset from a
/// YAML file; missing keys keep their default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClinicalIdentifiers {
    pub arv_category: String,
    pub hiv_enrollment_encounter_type: MetadataUuid,
    pub ipt_outcome_encounter_type: MetadataUuid,
    pub tb_program: MetadataUuid,
    pub ipt_program: MetadataUuid,
    pub adherence_question: ConceptId,
    pub good_adherence_answer: ConceptId,
    pub ipt_outcome_question: ConceptId,
    pub ipt_completed_answer: ConceptId,
    pub viral_load: ConceptId,
    pub ldl_question: ConceptId,
    pub ldl_answer: ConceptId,
    pub regimen: ConceptId,
    pub regimen_start_date: ConceptId,
    pub regimen_plan: ConceptId,
    pub regimen_stopped: ConceptId,
    pub pregnancy_status: ConceptId,
    pub breastfeeding: ConceptId,
    pub yes: ConceptId,
}

fn concept(id: u32) -> ConceptId {
    ConceptId::new(id).unwrap_or_else(|_| unreachable!("constant concept ids are positive"))
}

fn metadata(uuid: &str) -> MetadataUuid {
    MetadataUuid::new(uuid).unwrap_or_else(|_| unreachable!("constant uuids are non-empty"))
}

impl Default for ClinicalIdentifiers {
    fn default() -> Self {
        Self {
            arv_category: ARV_CATEGORY.to_owned(),
            hiv_enrollment_encounter_type: metadata(HIV_ENROLLMENT_ENCOUNTER_TYPE),
            ipt_outcome_encounter_type: metadata(IPT_OUTCOME_ENCOUNTER_TYPE),
            tb_program: metadata(TB_PROGRAM),
            ipt_program: metadata(IPT_PROGRAM),
            adherence_question: concept(ADHERENCE_QUESTION),
            good_adherence_answer: concept(GOOD_ADHERENCE_ANSWER),
            ipt_outcome_question: concept(IPT_OUTCOME_QUESTION),
            ipt_completed_answer: concept(IPT_COMPLETED_ANSWER),
            viral_load: concept(HIV_VIRAL_LOAD),
            ldl_question: concept(LDL_QUESTION),
            ldl_answer: concept(LDL_ANSWER),
            regimen: concept(REGIMEN),
            regimen_start_date: concept(REGIMEN_START_DATE),
            regimen_plan: concept(REGIMEN_PLAN),
            regimen_stopped: concept(REGIMEN_STOPPED),
            pregnancy_status: concept(PREGNANCY_STATUS),
            breastfeeding: concept(BREASTFEEDING),
            yes: concept(YES),
        }
    }
}

impl ClinicalIdentifiers {
    /// Parse identifier overrides from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`GreencardError::SchemaMismatch`] naming the offending key when the YAML has an
    /// unknown key or a value of the wrong type.
    pub fn from_yaml_str(yaml_text: &str) -> GreencardResult<Self> {
        crate::memory::parse_yaml_strict(yaml_text)
    }

    /// Read identifier overrides from a YAML file.
    pub fn from_path(path: &Path) -> GreencardResult<Self> {
        let text = std::fs::read_to_string(path).map_err(GreencardError::FileRead)?;
        Self::from_yaml_str(&text)
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    identifiers: ClinicalIdentifiers,
    adherence_window_days: u32,
    art_threshold_months: u32,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`GreencardError::InvalidInput`] if the ARV category is blank or the adherence
    /// window is zero days.
    pub fn new(
        identifiers: ClinicalIdentifiers,
        adherence_window_days: u32,
        art_threshold_months: u32,
    ) -> GreencardResult<Self> {
        if identifiers.arv_category.trim().is_empty() {
            return Err(GreencardError::InvalidInput(
                "arv_category cannot be empty".into(),
            ));
        }
        if adherence_window_days == 0 {
            return Err(GreencardError::InvalidInput(
                "adherence window must be at least one day".into(),
            ));
        }

        Ok(Self {
            identifiers,
            adherence_window_days,
            art_threshold_months,
        })
    }

    pub fn identifiers(&self) -> &ClinicalIdentifiers {
        &self.identifiers
    }

    pub fn adherence_window_days(&self) -> u32 {
        self.adherence_window_days
    }

    pub fn art_threshold_months(&self) -> u32 {
        self.art_threshold_months
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            identifiers: ClinicalIdentifiers::default(),
            adherence_window_days: DEFAULT_ADHERENCE_WINDOW_DAYS,
            art_threshold_months: DEFAULT_ART_THRESHOLD_MONTHS,
        }
    }
}

/// Parse an unsigned setting from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns `default`.
pub fn u32_from_env_value(name: &str, value: Option<String>, default: u32) -> GreencardResult<u32> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        Some(v) => v.parse::<u32>().map_err(|_| {
            GreencardError::InvalidInput(format!("{name} must be a non-negative integer, got '{v}'"))
        }),
        None => Ok(default),
    }
}

/// Load identifier overrides from an optional file path value.
///
/// If `value` is `None` or empty/whitespace, returns the default identifier set.
pub fn identifiers_from_env_value(value: Option<String>) -> GreencardResult<ClinicalIdentifiers> {
    let path = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match path {
        Some(p) => ClinicalIdentifiers::from_path(Path::new(&p)),
        None => Ok(ClinicalIdentifiers::default()),
    }
}
