//! Regimen reconstruction from drug regimen encounters.
//!
//! A regimen editor encounter records the regimen as observations: the coded regimen itself,
//! optionally a free-text regimen, the start date as entered on the form, and the plan event
//! (start, change, stop). The summary built here is what the ART questions read.

use crate::config::ClinicalIdentifiers;
use crate::constants::DISPLAY_DATE_FORMAT;
use crate::model::{Encounter, RegimenSummary};

/// Build the regimen summary for a single drug regimen encounter.
///
/// The start date is the recorded start date text when the form captured one, otherwise the
/// encounter date in `dd-MMM-yyyy` form. Recorded text is passed through unparsed. The display
/// name comes from the coded regimen answer's short name, falling back to a textual regimen
/// observation. A stop event clears the display name.
pub fn build_regimen_summary(
    encounter: &Encounter,
    identifiers: &ClinicalIdentifiers,
) -> RegimenSummary {
    let stopped = encounter.has_coded_answer(identifiers.regimen_plan, identifiers.regimen_stopped);

    let short_display = if stopped {
        None
    } else {
        let regimen_obs = encounter
            .observations
            .iter()
            .filter(|o| o.concept == identifiers.regimen);

        let coded = regimen_obs
            .clone()
            .filter_map(|o| o.value_coded())
            .find_map(|c| c.name.clone());

        coded.or_else(|| {
            regimen_obs
                .filter_map(|o| o.value_text())
                .map(str::trim)
                .find(|t| !t.is_empty())
                .map(str::to_owned)
        })
    };

    let recorded_start = encounter
        .observations
        .iter()
        .filter(|o| o.concept == identifiers.regimen_start_date)
        .filter_map(|o| o.value_text())
        .map(str::trim)
        .find(|t| !t.is_empty());

    let start_date = match recorded_start {
        Some(text) => text.to_owned(),
        None => encounter.datetime.format(DISPLAY_DATE_FORMAT).to_string(),
    };

    RegimenSummary {
        start_date: Some(start_date),
        short_display,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CodedAnswer, ObsValue, Observation};
    use chrono::{TimeZone, Utc};
    use greencard_types::{ConceptId, MetadataUuid};

    fn encounter(observations: Vec<Observation>) -> Encounter {
        Encounter {
            id: 1,
            encounter_type: MetadataUuid::new("7dffc392-13e7-11e9-ab14-d663bd873d93").unwrap(),
            form: None,
            category: Some("ARV".into()),
            datetime: Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap(),
            observations,
        }
    }

    fn obs(concept: u32, value: ObsValue) -> Observation {
        Observation {
            concept: ConceptId::new(concept).unwrap(),
            datetime: Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap(),
            value,
        }
    }

    fn coded(concept: u32, name: Option<&str>) -> ObsValue {
        ObsValue::Coded(CodedAnswer {
            concept: ConceptId::new(concept).unwrap(),
            name: name.map(str::to_owned),
        })
    }

    #[test]
    fn summary_uses_coded_regimen_name_and_encounter_date() {
        let ids = ClinicalIdentifiers::default();
        let summary = build_regimen_summary(
            &encounter(vec![obs(1193, coded(164505, Some("TDF/3TC/EFV")))]),
            &ids,
        );
        assert_eq!(summary.short_display.as_deref(), Some("TDF/3TC/EFV"));
        assert_eq!(summary.start_date.as_deref(), Some("05-Mar-2024"));
    }

    #[test]
    fn summary_falls_back_to_text_regimen() {
        let ids = ClinicalIdentifiers::default();
        let summary = build_regimen_summary(
            &encounter(vec![
                obs(1193, coded(164505, None)),
                obs(1193, ObsValue::Text(" AZT/3TC/NVP ".into())),
            ]),
            &ids,
        );
        assert_eq!(summary.short_display.as_deref(), Some("AZT/3TC/NVP"));
    }

    #[test]
    fn stopped_regimen_has_no_display_name() {
        let ids = ClinicalIdentifiers::default();
        let summary = build_regimen_summary(
            &encounter(vec![
                obs(1193, coded(164505, Some("TDF/3TC/EFV"))),
                obs(1255, coded(1260, None)),
            ]),
            &ids,
        );
        assert!(summary.short_display.is_none());
        assert!(summary.start_date.is_some());
    }

    #[test]
    fn encounter_without_regimen_obs_has_no_display_name() {
        let ids = ClinicalIdentifiers::default();
        let summary = build_regimen_summary(&encounter(vec![]), &ids);
        assert_eq!(summary, RegimenSummary {
            start_date: Some("05-Mar-2024".into()),
            short_display: None,
        });
    }

    #[test]
    fn recorded_start_date_takes_precedence_over_encounter_date() {
        let ids = ClinicalIdentifiers::default();
        let summary = build_regimen_summary(
            &encounter(vec![
                obs(1193, coded(164505, Some("TDF/3TC/EFV"))),
                obs(159599, ObsValue::Text(" 12-Jan-2023 ".into())),
            ]),
            &ids,
        );
        assert_eq!(summary.start_date.as_deref(), Some("12-Jan-2023"));

        let summary = build_regimen_summary(
            &encounter(vec![obs(159599, ObsValue::Text("2023/01/12".into()))]),
            &ids,
        );
        assert_eq!(summary.start_date.as_deref(), Some("2023/01/12"));
    }
}
