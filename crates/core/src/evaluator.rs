//! Greencard clinical fact evaluator.
//!
//! Answers the fixed set of greencard questions about a single patient. Each question is an
//! independent evaluation: resolve the patient, make one or two lookups against the
//! [`ClinicalFactSource`], then apply a boolean, date or coded-answer test.
//!
//! Missing data always answers the negative or default case. A regimen start date that cannot
//! be parsed is logged and treated the same way. Faults of the source propagate.

use crate::config::CoreConfig;
use crate::constants::DISPLAY_DATE_FORMAT;
use crate::dates::{days_between, months_between, StartDate};
use crate::error::{GreencardError, GreencardResult};
use crate::model::{CalculationContext, ClinicalRule, Patient, RegimenSummary};
use crate::regimen::build_regimen_summary;
use crate::source::{find_last_on_or_before, ClinicalFactSource};
use greencard_types::PatientId;
use serde::Serialize;

/// Result of the viral load question.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViralLoadResult {
    /// Latest numeric viral load in copies/ml; `0.0` when nothing applicable was recorded.
    Copies(f64),
    /// Latest result was below the detectable limit.
    Ldl,
}

impl ViralLoadResult {
    pub const NONE: ViralLoadResult = ViralLoadResult::Copies(0.0);
}

impl Serialize for ViralLoadResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            ViralLoadResult::Copies(v) => serializer.serialize_f64(*v),
            ViralLoadResult::Ldl => serializer.serialize_str("LDL"),
        }
    }
}

/// Whole months between `ctx.now()` and an ART start date.
///
/// A missing or unparseable start date counts as zero months.
pub fn months_since_start(start: &StartDate, ctx: &CalculationContext) -> u32 {
    start
        .at_midnight()
        .map(|start| months_between(ctx.now(), start))
        .unwrap_or(0)
}

/// Every greencard question answered at once.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GreencardSummary {
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
    pub vl_result: ViralLoadResult,
    #[serde(rename = "isPregnant")]
    pub is_pregnant: bool,
    #[serde(rename = "isBreastFeeding")]
    pub is_breastfeeding: bool,
}

pub struct GreencardEvaluator<S> {
    source: S,
    cfg: std::sync::Arc<CoreConfig>,
}

impl<S: Clone> Clone for GreencardEvaluator<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            cfg: self.cfg.clone(),
        }
    }
}

impl<S: ClinicalFactSource> GreencardEvaluator<S> {
    pub fn new(source: S, cfg: std::sync::Arc<CoreConfig>) -> Self {
        Self { source, cfg }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    fn patient(&self, id: PatientId) -> GreencardResult<Patient> {
        self.source
            .resolve_patient(id)?
            .ok_or(GreencardError::PatientNotFound(id))
    }

    /// True iff the patient has an HIV enrollment encounter.
    pub fn ever_enrolled_in_hiv(
        &self,
        id: PatientId,
        ctx: &CalculationContext,
    ) -> GreencardResult<bool> {
        let patient = self.patient(id)?;
        let ids = self.cfg.identifiers();
        let encounter =
            self.source
                .last_encounter(&patient, &ids.hiv_enrollment_encounter_type, ctx)?;
        Ok(encounter.is_some())
    }

    /// True iff the patient is actively enrolled in the TB program at `ctx.now()`.
    pub fn in_tb_program(&self, id: PatientId, ctx: &CalculationContext) -> GreencardResult<bool> {
        let patient = self.patient(id)?;
        let enrollment =
            self.source
                .active_enrollment(&patient, &self.cfg.identifiers().tb_program, ctx)?;
        Ok(enrollment.is_some())
    }

    /// True iff the patient is actively enrolled in the IPT program at `ctx.now()`.
    pub fn in_ipt_program(&self, id: PatientId, ctx: &CalculationContext) -> GreencardResult<bool> {
        let patient = self.patient(id)?;
        let enrollment =
            self.source
                .active_enrollment(&patient, &self.cfg.identifiers().ipt_program, ctx)?;
        Ok(enrollment.is_some())
    }

    fn last_arv_regimen(
        &self,
        patient: &Patient,
        ctx: &CalculationContext,
    ) -> GreencardResult<Option<RegimenSummary>> {
        let ids = self.cfg.identifiers();
        let encounter = self
            .source
            .last_encounter_for_category(patient, &ids.arv_category, ctx)?;
        Ok(encounter.map(|e| build_regimen_summary(&e, ids)))
    }

    /// Display name of the current ART regimen, if any.
    pub fn current_regimen_name(
        &self,
        id: PatientId,
        ctx: &CalculationContext,
    ) -> GreencardResult<Option<String>> {
        let patient = self.patient(id)?;
        Ok(self
            .last_arv_regimen(&patient, ctx)?
            .and_then(|summary| summary.short_display))
    }

    /// True iff the last ARV regimen encounter yields a regimen display name.
    pub fn on_art(&self, id: PatientId, ctx: &CalculationContext) -> GreencardResult<bool> {
        Ok(self.current_regimen_name(id, ctx)?.is_some())
    }

    /// Start date of the first ARV regimen encounter.
    fn art_start(&self, patient: &Patient, ctx: &CalculationContext) -> GreencardResult<StartDate> {
        let ids = self.cfg.identifiers();
        let Some(encounter) = self
            .source
            .first_encounter_for_category(patient, &ids.arv_category, ctx)?
        else {
            return Ok(StartDate::Missing);
        };

        let summary = build_regimen_summary(&encounter, ids);
        let start = StartDate::from_display(summary.start_date.as_deref(), DISPLAY_DATE_FORMAT);
        if let StartDate::Unparseable(e) = &start {
            tracing::warn!(
                patient = %patient.id,
                encounter = encounter.id,
                "ignoring ART start date: {e}"
            );
        }
        Ok(start)
    }

    /// Whole months between `ctx.now()` and the ART start date; 0 when missing or unreadable.
    pub fn art_duration_months(
        &self,
        id: PatientId,
        ctx: &CalculationContext,
    ) -> GreencardResult<u32> {
        let patient = self.patient(id)?;
        let start = self.art_start(&patient, ctx)?;
        Ok(months_since_start(&start, ctx))
    }

    /// True iff the patient started ART more than the configured number of months ago.
    pub fn has_been_on_art(&self, id: PatientId, ctx: &CalculationContext) -> GreencardResult<bool> {
        let months = self.art_duration_months(id, ctx)?;
        Ok(months > self.cfg.art_threshold_months())
    }

    /// True iff the latest adherence assessment is "good" and falls inside the window.
    pub fn good_adherence(&self, id: PatientId, ctx: &CalculationContext) -> GreencardResult<bool> {
        let patient = self.patient(id)?;
        let ids = self.cfg.identifiers();
        let Some(obs) = self
            .source
            .last_observation(&patient, ids.adherence_question, ctx)?
        else {
            return Ok(false);
        };

        if !obs.answers(ids.adherence_question, ids.good_adherence_answer) {
            return Ok(false);
        }

        let days = days_between(ctx.now(), obs.datetime);
        tracing::debug!(patient = %patient.id, days, "good adherence assessment found");
        Ok(days <= self.cfg.adherence_window_days())
    }

    /// True iff the last IPT outcome encounter records the completion answer.
    pub fn ipt_completed(&self, id: PatientId, ctx: &CalculationContext) -> GreencardResult<bool> {
        let patient = self.patient(id)?;
        let ids = self.cfg.identifiers();
        let encounter = self
            .source
            .last_encounter(&patient, &ids.ipt_outcome_encounter_type, ctx)?;
        Ok(encounter.is_some_and(|e| {
            e.has_coded_answer(ids.ipt_outcome_question, ids.ipt_completed_answer)
        }))
    }

    /// Latest viral load, or [`ViralLoadResult::Ldl`] when the latest result was below the
    /// detectable limit.
    pub fn viral_load(
        &self,
        id: PatientId,
        ctx: &CalculationContext,
    ) -> GreencardResult<ViralLoadResult> {
        let patient = self.patient(id)?;
        let ids = self.cfg.identifiers();

        let vl_obs = self
            .source
            .last_observation(&patient, ids.viral_load, ctx)?
            .filter(|o| o.value_numeric().is_some());
        let ldl_obs = self
            .source
            .last_observation(&patient, ids.ldl_question, ctx)?
            .filter(|o| o.value_coded().is_some());

        let is_ldl = |o: &crate::model::Observation| o.answers(ids.ldl_question, ids.ldl_answer);
        let copies = |o: &crate::model::Observation| {
            o.value_numeric()
                .map_or(ViralLoadResult::NONE, ViralLoadResult::Copies)
        };

        let result = match (&vl_obs, &ldl_obs) {
            (Some(vl), Some(ldl)) => match find_last_on_or_before([vl, ldl], ctx.now()) {
                Some(latest) if latest.concept == ids.viral_load => copies(latest),
                Some(latest) if is_ldl(latest) => ViralLoadResult::Ldl,
                _ => ViralLoadResult::NONE,
            },
            (None, Some(ldl)) if is_ldl(ldl) => ViralLoadResult::Ldl,
            (None, Some(_)) => ViralLoadResult::NONE,
            (Some(vl), None) => copies(vl),
            (None, None) => ViralLoadResult::NONE,
        };
        Ok(result)
    }

    fn rule_holds(
        &self,
        id: PatientId,
        rule: ClinicalRule,
        ctx: &CalculationContext,
    ) -> GreencardResult<bool> {
        let patient = self.patient(id)?;
        Ok(self.source.evaluate_rule(&patient, rule, ctx)?.is_some())
    }

    pub fn is_pregnant(&self, id: PatientId, ctx: &CalculationContext) -> GreencardResult<bool> {
        self.rule_holds(id, ClinicalRule::IsPregnant, ctx)
    }

    pub fn is_breastfeeding(
        &self,
        id: PatientId,
        ctx: &CalculationContext,
    ) -> GreencardResult<bool> {
        self.rule_holds(id, ClinicalRule::IsBreastFeeding, ctx)
    }

    /// Answer every greencard question for the patient at the same instant.
    pub fn summary(
        &self,
        id: PatientId,
        ctx: &CalculationContext,
    ) -> GreencardResult<GreencardSummary> {
        let regimen_name = self.current_regimen_name(id, ctx)?;
        let duration = self.art_duration_months(id, ctx)?;

        Ok(GreencardSummary {
            ever_enrolled_in_hiv: self.ever_enrolled_in_hiv(id, ctx)?,
            in_tb: self.in_tb_program(id, ctx)?,
            in_ipt: self.in_ipt_program(id, ctx)?,
            on_art: regimen_name.is_some(),
            regimen_name,
            has_been_on_art: duration > self.cfg.art_threshold_months(),
            duration,
            adherence: self.good_adherence(id, ctx)?,
            ipt_completed: self.ipt_completed(id, ctx)?,
            vl_result: self.viral_load(id, ctx)?,
            is_pregnant: self.is_pregnant(id, ctx)?,
            is_breastfeeding: self.is_breastfeeding(id, ctx)?,
        })
    }
}
