//! Wire types returned by the greencard APIs.
//!
//! Each question answers with a single-key JSON object whose key is the name the greencard UI
//! reads (`everEnrolledInHIV`, `vlResult`, ...).

use greencard_core::{GreencardSummary, ViralLoadResult};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Query string identifying the patient a question is about.
#[derive(Clone, Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PatientQuery {
    /// Integer patient id.
    #[serde(rename = "patientId")]
    pub patient_id: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct EverEnrolledInHivRes {
    #[serde(rename = "everEnrolledInHIV")]
    pub ever_enrolled_in_hiv: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct InTbRes {
    #[serde(rename = "inTB")]
    pub in_tb: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct InIptRes {
    #[serde(rename = "inIPT")]
    pub in_ipt: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct OnArtRes {
    #[serde(rename = "onART")]
    pub on_art: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct RegimenNameRes {
    /// Short display name of the current regimen; `null` when not on ART.
    #[serde(rename = "regimenName")]
    pub regimen_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct HasBeenOnArtRes {
    #[serde(rename = "hasBeenOnART")]
    pub has_been_on_art: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct ArtDurationRes {
    /// Whole months since ART start.
    pub duration: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct AdherenceRes {
    pub adherence: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct IptCompletedRes {
    #[serde(rename = "iptCompleted")]
    pub ipt_completed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct ViralLoadRes {
    /// Copies/ml as a number, or the string `"LDL"`.
    #[serde(rename = "vlResult")]
    #[schema(value_type = Object)]
    pub vl_result: ViralLoadResult,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct IsPregnantRes {
    #[serde(rename = "isPregnant")]
    pub is_pregnant: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct IsBreastFeedingRes {
    #[serde(rename = "isBreastFeeding")]
    pub is_breastfeeding: bool,
}

/// All greencard answers for one patient.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct GreencardSummaryRes {
    #[serde(rename = "everEnrolledInHIV")]
    pub ever_enrolled_in_hiv: bool,
    #[serde(rename = "inTB")]
    pub in_tb: bool,
    #[serde(rename = "inIPT")]
    pub in_ipt: bool,
    #[serde(rename = "onART")]
    pub on_art: bool,
    #[serde(rename = "regimenName")]
    pub regimen_name: Option<String>,
    #[serde(rename = "hasBeenOnART")]
    pub has_been_on_art: bool,
    pub duration: u32,
    pub adherence: bool,
    #[serde(rename = "iptCompleted")]
    pub ipt_completed: bool,
    #[serde(rename = "vlResult")]
    #[schema(value_type = Object)]
    pub vl_result: ViralLoadResult,
    #[serde(rename = "isPregnant")]
    pub is_pregnant: bool,
    #[serde(rename = "isBreastFeeding")]
    pub is_breastfeeding: bool,
}

impl From<GreencardSummary> for GreencardSummaryRes {
    fn from(s: GreencardSummary) -> Self {
        Self {
            ever_enrolled_in_hiv: s.ever_enrolled_in_hiv,
            in_tb: s.in_tb,
            in_ipt: s.in_ipt,
            on_art: s.on_art,
            regimen_name: s.regimen_name,
            has_been_on_art: s.has_been_on_art,
            duration: s.duration,
            adherence: s.adherence,
            ipt_completed: s.ipt_completed,
            vl_result: s.vl_result,
            is_pregnant: s.is_pregnant,
            is_breastfeeding: s.is_breastfeeding,
        }
    }
}
