use std::path::PathBuf;
use std::sync::Arc;

use api_shared::pb;
use clap::{Parser, Subcommand};
use greencard_core::config::identifiers_from_env_value;
use greencard_core::constants::{DEFAULT_ADHERENCE_WINDOW_DAYS, DEFAULT_ART_THRESHOLD_MONTHS};
use greencard_core::dates::parse_date;
use greencard_core::{
    CalculationContext, CoreConfig, GreencardEvaluator, InMemoryFactSource, PatientId,
};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "greencard")]
#[command(about = "Answer greencard questions about patients in a record document")]
struct Cli {
    /// Patient record YAML document
    #[arg(long)]
    data: PathBuf,
    /// YAML overrides for concept and metadata identifiers
    #[arg(long)]
    identifiers: Option<String>,
    /// Evaluate as of the end of this day (YYYY-MM-DD) instead of now
    #[arg(long)]
    at: Option<String>,
    /// Adherence look-back window in days
    #[arg(long, default_value_t = DEFAULT_ADHERENCE_WINDOW_DAYS)]
    adherence_window_days: u32,
    /// Months on ART before a patient counts as established
    #[arg(long, default_value_t = DEFAULT_ART_THRESHOLD_MONTHS)]
    art_threshold_months: u32,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all patient ids
    List,
    /// Ever enrolled in HIV care
    EverEnrolledInHiv { patient_id: u32 },
    /// Currently in the TB program
    InTbProgram { patient_id: u32 },
    /// Currently in the IPT program
    InIptProgram { patient_id: u32 },
    /// Has a current ART regimen
    OnArt { patient_id: u32 },
    /// Current ART regimen name
    RegimenName { patient_id: u32 },
    /// On ART for longer than the threshold
    HasBeenOnArt { patient_id: u32 },
    /// Whole months since ART start
    ArtDuration { patient_id: u32 },
    /// Good adherence inside the window
    Adherence { patient_id: u32 },
    /// Last IPT outcome was completion
    IptCompleted { patient_id: u32 },
    /// Latest viral load or LDL
    ViralLoad { patient_id: u32 },
    /// Pregnant
    IsPregnant { patient_id: u32 },
    /// Breastfeeding
    IsBreastfeeding { patient_id: u32 },
    /// Every greencard answer
    Summary { patient_id: u32 },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn context(at: Option<&str>) -> Result<CalculationContext, Box<dyn std::error::Error>> {
    let Some(at) = at else {
        return Ok(CalculationContext::current());
    };
    let day = parse_date(at, "%Y-%m-%d")?;
    let end_of_day = day
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| format!("cannot evaluate at {at}"))?;
    Ok(CalculationContext::new(end_of_day.and_utc()))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let identifiers = identifiers_from_env_value(cli.identifiers)?;
    let source = InMemoryFactSource::from_path(&cli.data, &identifiers)?;
    let cfg = CoreConfig::new(
        identifiers,
        cli.adherence_window_days,
        cli.art_threshold_months,
    )?;
    let evaluator = GreencardEvaluator::new(Arc::new(source), Arc::new(cfg));
    let ctx = context(cli.at.as_deref())?;
    let id = PatientId::new;

    match cli.command {
        Some(Commands::List) => {
            let patients = evaluator
                .source()
                .patient_ids()
                .into_iter()
                .map(PatientId::get)
                .collect();
            print_json(&pb::ListPatientsRes { patients })?;
        }
        Some(Commands::EverEnrolledInHiv { patient_id }) => {
            print_json(&pb::EverEnrolledInHivRes {
                ever_enrolled_in_hiv: evaluator.ever_enrolled_in_hiv(id(patient_id)?, &ctx)?,
            })?;
        }
        Some(Commands::InTbProgram { patient_id }) => {
            print_json(&pb::InTbRes {
                in_tb: evaluator.in_tb_program(id(patient_id)?, &ctx)?,
            })?;
        }
        Some(Commands::InIptProgram { patient_id }) => {
            print_json(&pb::InIptRes {
                in_ipt: evaluator.in_ipt_program(id(patient_id)?, &ctx)?,
            })?;
        }
        Some(Commands::OnArt { patient_id }) => {
            print_json(&pb::OnArtRes {
                on_art: evaluator.on_art(id(patient_id)?, &ctx)?,
            })?;
        }
        Some(Commands::RegimenName { patient_id }) => {
            print_json(&pb::RegimenNameRes {
                regimen_name: evaluator.current_regimen_name(id(patient_id)?, &ctx)?,
            })?;
        }
        Some(Commands::HasBeenOnArt { patient_id }) => {
            print_json(&pb::HasBeenOnArtRes {
                has_been_on_art: evaluator.has_been_on_art(id(patient_id)?, &ctx)?,
            })?;
        }
        Some(Commands::ArtDuration { patient_id }) => {
            print_json(&pb::ArtDurationRes {
                duration: evaluator.art_duration_months(id(patient_id)?, &ctx)?,
            })?;
        }
        Some(Commands::Adherence { patient_id }) => {
            print_json(&pb::AdherenceRes {
                adherence: evaluator.good_adherence(id(patient_id)?, &ctx)?,
            })?;
        }
        Some(Commands::IptCompleted { patient_id }) => {
            print_json(&pb::IptCompletedRes {
                ipt_completed: evaluator.ipt_completed(id(patient_id)?, &ctx)?,
            })?;
        }
        Some(Commands::ViralLoad { patient_id }) => {
            print_json(&pb::ViralLoadRes {
                vl_result: evaluator.viral_load(id(patient_id)?, &ctx)?,
            })?;
        }
        Some(Commands::IsPregnant { patient_id }) => {
            print_json(&pb::IsPregnantRes {
                is_pregnant: evaluator.is_pregnant(id(patient_id)?, &ctx)?,
            })?;
        }
        Some(Commands::IsBreastfeeding { patient_id }) => {
            print_json(&pb::IsBreastFeedingRes {
                is_breastfeeding: evaluator.is_breastfeeding(id(patient_id)?, &ctx)?,
            })?;
        }
        Some(Commands::Summary { patient_id }) => {
            let summary = evaluator.summary(id(patient_id)?, &ctx)?;
            print_json(&pb::GreencardSummaryRes::from(summary))?;
        }
        None => {
            println!("Use 'greencard --help' for commands");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn at_evaluates_at_end_of_day() {
        let ctx = context(Some("2024-03-05")).unwrap();
        assert_eq!(ctx.now().day(), 5);
        assert_eq!(ctx.now().hour(), 23);
    }

    #[test]
    fn rejects_malformed_at() {
        assert!(context(Some("05/03/2024")).is_err());
    }

    #[test]
    fn parses_question_subcommands() {
        let cli = Cli::try_parse_from(["greencard", "--data", "p.yaml", "viral-load", "7"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::ViralLoad { patient_id: 7 })));
        assert_eq!(cli.adherence_window_days, 182);
    }
}
