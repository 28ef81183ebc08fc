//! Constants used throughout the greencard core crate.
//!
//! Concept ids follow the CIEL dictionary used by KenyaEMR; metadata identifiers are the
//! KenyaEMR program, encounter type and form uuids. They are the defaults for
//! [`crate::config::ClinicalIdentifiers`] and can be overridden at startup.

/// Drug regimen encounter category for antiretroviral therapy.
pub const ARV_CATEGORY: &str = "ARV";

/// Encounter type uuid for HIV enrollment.
pub const HIV_ENROLLMENT_ENCOUNTER_TYPE: &str = "de78a6be-bfc5-4634-adc3-5f1a280455cc";

/// Encounter type uuid for IPT outcome.
pub const IPT_OUTCOME_ENCOUNTER_TYPE: &str = "bb77c683-2144-48a5-a011-66d904d776c9";

/// Program uuid for TB.
pub const TB_PROGRAM: &str = "9f144a34-3a4a-44a9-8486-6b7af6cc64f6";

/// Program uuid for IPT.
pub const IPT_PROGRAM: &str = "335517a1-04bc-438b-9843-1ba49fb7fcd9";

/// Adherence assessment question.
pub const ADHERENCE_QUESTION: u32 = 1658;

/// Answer recorded for good adherence.
pub const GOOD_ADHERENCE_ANSWER: u32 = 159405;

/// IPT outcome question.
pub const IPT_OUTCOME_QUESTION: u32 = 161555;

/// IPT outcome answer meaning the course was completed.
pub const IPT_COMPLETED_ANSWER: u32 = 1267;

/// Numeric HIV viral load.
pub const HIV_VIRAL_LOAD: u32 = 856;

/// Coded viral load qualitative result.
pub const LDL_QUESTION: u32 = 1305;

/// Answer meaning "below detectable limit".
pub const LDL_ANSWER: u32 = 1302;

/// Current ARV regimen.
pub const REGIMEN: u32 = 1193;

/// Regimen start date recorded on the regimen editor form, as text.
pub const REGIMEN_START_DATE: u32 = 159599;

/// Regimen plan event (start, change, stop).
pub const REGIMEN_PLAN: u32 = 1255;

/// Regimen plan answer for stopping all medications.
pub const REGIMEN_STOPPED: u32 = 1260;

/// Pregnancy status question.
pub const PREGNANCY_STATUS: u32 = 5272;

/// Currently breastfeeding question.
pub const BREASTFEEDING: u32 = 5632;

/// Generic "yes" answer.
pub const YES: u32 = 1065;

/// Inclusive number of days an adherence assessment stays current.
pub const DEFAULT_ADHERENCE_WINDOW_DAYS: u32 = 182;

/// Whole months on ART a patient must exceed to count as established on treatment.
pub const DEFAULT_ART_THRESHOLD_MONTHS: u32 = 3;

/// Display pattern of regimen start dates (`dd-MMM-yyyy`, e.g. `05-Mar-2024`).
pub const DISPLAY_DATE_FORMAT: &str = "%d-%b-%Y";
