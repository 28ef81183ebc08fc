//! # Greencard Core
//!
//! Core logic for the greencard clinical fact service.
//!
//! This crate answers a fixed set of clinical questions about a single patient (HIV and TB
//! program status, ART, adherence, IPT, viral load, pregnancy and breastfeeding):
//! - [`GreencardEvaluator`] evaluates each question against an injected [`ClinicalFactSource`]
//! - [`InMemoryFactSource`] is a source over a YAML patient record document
//! - [`CoreConfig`] carries the clinical identifiers and thresholds resolved at startup
//!
//! **No API concerns**: HTTP servers, authentication and wire types belong in `api-rest` or
//! `api-shared`.

pub mod config;
pub mod constants;
pub mod dates;
pub mod error;
pub mod evaluator;
pub mod memory;
pub mod model;
pub mod regimen;
pub mod source;

pub use config::{ClinicalIdentifiers, CoreConfig};
pub use error::{GreencardError, GreencardResult, SourceError};
pub use evaluator::{GreencardEvaluator, GreencardSummary, ViralLoadResult};
pub use memory::{InMemoryFactSource, PatientRecord, PatientRecords};
pub use model::{CalculationContext, ClinicalRule};
pub use source::ClinicalFactSource;

pub use greencard_types::{ConceptId, IdentifierError, MetadataUuid, PatientId};
