//! # API REST
//!
//! REST API implementation for the greencard service.
//!
//! Handles:
//! - HTTP endpoints with axum, one per greencard question
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialisation, CORS, API key header)
//!
//! Uses `api-shared` for wire types and `greencard-core` for evaluation.

#![warn(rust_2018_idioms)]

use api_shared::pb;
use axum::{
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{Json, Response},
    routing::get,
    Router,
};
use greencard_core::{
    CalculationContext, GreencardError, GreencardEvaluator, GreencardResult, InMemoryFactSource,
    PatientId,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Evaluator over the shared in-memory record set.
pub type Evaluator = GreencardEvaluator<Arc<InMemoryFactSource>>;

type ApiError = (StatusCode, &'static str);

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    evaluator: Evaluator,
    api_key: Option<Arc<str>>,
}

impl AppState {
    /// `api_key` protects every route except `/health` when set.
    pub fn new(evaluator: Evaluator, api_key: Option<String>) -> Self {
        Self {
            evaluator,
            api_key: api_key.filter(|k| !k.is_empty()).map(Arc::from),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_patients,
        ever_enrolled_in_hiv,
        in_tb_program,
        in_ipt_program,
        on_art,
        regimen_name,
        has_been_on_art,
        art_duration,
        adherence,
        ipt_completed,
        viral_load,
        is_pregnant,
        is_breastfeeding,
        summary,
    ),
    components(schemas(
        pb::HealthRes,
        pb::ListPatientsRes,
        pb::EverEnrolledInHivRes,
        pb::InTbRes,
        pb::InIptRes,
        pb::OnArtRes,
        pb::RegimenNameRes,
        pb::HasBeenOnArtRes,
        pb::ArtDurationRes,
        pb::AdherenceRes,
        pb::IptCompletedRes,
        pb::ViralLoadRes,
        pb::IsPregnantRes,
        pb::IsBreastFeedingRes,
        pb::GreencardSummaryRes,
    ))
)]
pub struct ApiDoc;

/// Build the REST router with Swagger UI and CORS.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/patients", get(list_patients))
        .route("/greencard/ever-enrolled-in-hiv", get(ever_enrolled_in_hiv))
        .route("/greencard/in-tb-program", get(in_tb_program))
        .route("/greencard/in-ipt-program", get(in_ipt_program))
        .route("/greencard/on-art", get(on_art))
        .route("/greencard/regimen-name", get(regimen_name))
        .route("/greencard/has-been-on-art", get(has_been_on_art))
        .route("/greencard/art-duration", get(art_duration))
        .route("/greencard/adherence", get(adherence))
        .route("/greencard/ipt-completed", get(ipt_completed))
        .route("/greencard/viral-load", get(viral_load))
        .route("/greencard/is-pregnant", get(is_pregnant))
        .route("/greencard/is-breastfeeding", get(is_breastfeeding))
        .route("/greencard/summary", get(summary))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok());

    match api_shared::validate_api_key(state.api_key.as_deref(), provided) {
        Ok(()) => Ok(next.run(req).await),
        Err(e) => {
            tracing::warn!("Rejected request to {}: {}", req.uri().path(), e);
            Err((StatusCode::UNAUTHORIZED, "Unauthorised"))
        }
    }
}

/// Evaluate one question for the patient in the query string at the current instant.
fn answer<T>(
    state: &AppState,
    query: &pb::PatientQuery,
    question: &'static str,
    evaluate: impl FnOnce(&Evaluator, PatientId, &CalculationContext) -> GreencardResult<T>,
) -> Result<T, ApiError> {
    let id = match PatientId::new(query.patient_id) {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("Invalid patient id: {:?}", e);
            return Err((StatusCode::BAD_REQUEST, "Invalid patient id"));
        }
    };

    let ctx = CalculationContext::current();
    evaluate(&state.evaluator, id, &ctx).map_err(|e| match e {
        GreencardError::PatientNotFound(_) => (StatusCode::NOT_FOUND, "Patient not found"),
        GreencardError::InvalidIdentifier(_) | GreencardError::InvalidInput(_) => {
            (StatusCode::BAD_REQUEST, "Bad request")
        }
        other => {
            tracing::error!("{} error for patient {}: {:?}", question, id, other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    })
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = pb::HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks. Never requires an API key.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<pb::HealthRes> {
    Json(api_shared::HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "Ids of all known patients", body = pb::ListPatientsRes),
        (status = 401, description = "Missing or invalid API key")
    )
)]
/// List the ids of all patients in the loaded record set
///
/// # Returns
/// * `Json<ListPatientsRes>` - Patient ids in ascending order
#[axum::debug_handler]
async fn list_patients(State(state): State<AppState>) -> Json<pb::ListPatientsRes> {
    let patients = state
        .evaluator
        .source()
        .patient_ids()
        .into_iter()
        .map(PatientId::get)
        .collect();
    Json(pb::ListPatientsRes { patients })
}

#[utoipa::path(
    get,
    path = "/greencard/ever-enrolled-in-hiv",
    params(pb::PatientQuery),
    responses(
        (status = 200, description = "Whether the patient was ever enrolled in HIV care", body = pb::EverEnrolledInHivRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Patient not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Check whether the patient was ever enrolled in HIV care
///
/// Looks for any HIV enrollment encounter dated on or before now.
///
/// # Returns
/// * `Ok(Json<EverEnrolledInHivRes>)` - `everEnrolledInHIV` flag
/// * `Err((StatusCode, &str))` - Bad request, patient not found or internal error
#[axum::debug_handler]
async fn ever_enrolled_in_hiv(
    State(state): State<AppState>,
    Query(query): Query<pb::PatientQuery>,
) -> Result<Json<pb::EverEnrolledInHivRes>, ApiError> {
    let ever_enrolled_in_hiv =
        answer(&state, &query, "everEnrolledInHIV", Evaluator::ever_enrolled_in_hiv)?;
    Ok(Json(pb::EverEnrolledInHivRes {
        ever_enrolled_in_hiv,
    }))
}

#[utoipa::path(
    get,
    path = "/greencard/in-tb-program",
    params(pb::PatientQuery),
    responses(
        (status = 200, description = "Whether the patient is in the TB program", body = pb::InTbRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Patient not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Check whether the patient is in the TB program
///
/// The enrollment must be active now: started and not yet completed.
///
/// # Returns
/// * `Ok(Json<InTbRes>)` - `inTB` flag
/// * `Err((StatusCode, &str))` - Bad request, patient not found or internal error
#[axum::debug_handler]
async fn in_tb_program(
    State(state): State<AppState>,
    Query(query): Query<pb::PatientQuery>,
) -> Result<Json<pb::InTbRes>, ApiError> {
    let in_tb = answer(&state, &query, "inTB", Evaluator::in_tb_program)?;
    Ok(Json(pb::InTbRes { in_tb }))
}

#[utoipa::path(
    get,
    path = "/greencard/in-ipt-program",
    params(pb::PatientQuery),
    responses(
        (status = 200, description = "Whether the patient is in the IPT program", body = pb::InIptRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Patient not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Check whether the patient is in the IPT program
///
/// The enrollment must be active now: started and not yet completed.
///
/// # Returns
/// * `Ok(Json<InIptRes>)` - `inIPT` flag
/// * `Err((StatusCode, &str))` - Bad request, patient not found or internal error
#[axum::debug_handler]
async fn in_ipt_program(
    State(state): State<AppState>,
    Query(query): Query<pb::PatientQuery>,
) -> Result<Json<pb::InIptRes>, ApiError> {
    let in_ipt = answer(&state, &query, "inIPT", Evaluator::in_ipt_program)?;
    Ok(Json(pb::InIptRes { in_ipt }))
}

#[utoipa::path(
    get,
    path = "/greencard/on-art",
    params(pb::PatientQuery),
    responses(
        (status = 200, description = "Whether the patient has a current ART regimen", body = pb::OnArtRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Patient not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Check whether the patient is on ART
///
/// True when the latest ARV regimen encounter names a regimen that has not been stopped.
///
/// # Returns
/// * `Ok(Json<OnArtRes>)` - `onART` flag
/// * `Err((StatusCode, &str))` - Bad request, patient not found or internal error
#[axum::debug_handler]
async fn on_art(
    State(state): State<AppState>,
    Query(query): Query<pb::PatientQuery>,
) -> Result<Json<pb::OnArtRes>, ApiError> {
    let on_art = answer(&state, &query, "onART", Evaluator::on_art)?;
    Ok(Json(pb::OnArtRes { on_art }))
}

#[utoipa::path(
    get,
    path = "/greencard/regimen-name",
    params(pb::PatientQuery),
    responses(
        (status = 200, description = "Current ART regimen name", body = pb::RegimenNameRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Patient not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Current ART regimen name
///
/// Taken from the latest ARV regimen encounter.
///
/// # Returns
/// * `Ok(Json<RegimenNameRes>)` - `regimenName`, `null` when not on ART
/// * `Err((StatusCode, &str))` - Bad request, patient not found or internal error
#[axum::debug_handler]
async fn regimen_name(
    State(state): State<AppState>,
    Query(query): Query<pb::PatientQuery>,
) -> Result<Json<pb::RegimenNameRes>, ApiError> {
    let regimen_name = answer(&state, &query, "regimenName", Evaluator::current_regimen_name)?;
    Ok(Json(pb::RegimenNameRes { regimen_name }))
}

#[utoipa::path(
    get,
    path = "/greencard/has-been-on-art",
    params(pb::PatientQuery),
    responses(
        (status = 200, description = "Whether the patient has been on ART for more than 3 months", body = pb::HasBeenOnArtRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Patient not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Check whether the patient has been on ART for more than 3 months
///
/// Measured from the first ARV regimen encounter. An unreadable start date answers false.
///
/// # Returns
/// * `Ok(Json<HasBeenOnArtRes>)` - `hasBeenOnART` flag
/// * `Err((StatusCode, &str))` - Bad request, patient not found or internal error
#[axum::debug_handler]
async fn has_been_on_art(
    State(state): State<AppState>,
    Query(query): Query<pb::PatientQuery>,
) -> Result<Json<pb::HasBeenOnArtRes>, ApiError> {
    let has_been_on_art = answer(&state, &query, "hasBeenOnART", Evaluator::has_been_on_art)?;
    Ok(Json(pb::HasBeenOnArtRes { has_been_on_art }))
}

#[utoipa::path(
    get,
    path = "/greencard/art-duration",
    params(pb::PatientQuery),
    responses(
        (status = 200, description = "Whole months since ART start", body = pb::ArtDurationRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Patient not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Whole months on ART
///
/// Measured from the first ARV regimen encounter.
///
/// # Returns
/// * `Ok(Json<ArtDurationRes>)` - `duration`, 0 when there is no readable start date
/// * `Err((StatusCode, &str))` - Bad request, patient not found or internal error
#[axum::debug_handler]
async fn art_duration(
    State(state): State<AppState>,
    Query(query): Query<pb::PatientQuery>,
) -> Result<Json<pb::ArtDurationRes>, ApiError> {
    let duration = answer(&state, &query, "duration", Evaluator::art_duration_months)?;
    Ok(Json(pb::ArtDurationRes { duration }))
}

#[utoipa::path(
    get,
    path = "/greencard/adherence",
    params(pb::PatientQuery),
    responses(
        (status = 200, description = "Good adherence recorded in the last 6 months", body = pb::AdherenceRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Patient not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Check for good adherence
///
/// The latest adherence assessment must answer "good" and be at most 182 days old.
///
/// # Returns
/// * `Ok(Json<AdherenceRes>)` - `adherence` flag
/// * `Err((StatusCode, &str))` - Bad request, patient not found or internal error
#[axum::debug_handler]
async fn adherence(
    State(state): State<AppState>,
    Query(query): Query<pb::PatientQuery>,
) -> Result<Json<pb::AdherenceRes>, ApiError> {
    let adherence = answer(&state, &query, "adherence", Evaluator::good_adherence)?;
    Ok(Json(pb::AdherenceRes { adherence }))
}

#[utoipa::path(
    get,
    path = "/greencard/ipt-completed",
    params(pb::PatientQuery),
    responses(
        (status = 200, description = "Whether the last IPT outcome was completion", body = pb::IptCompletedRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Patient not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Check whether the IPT course was completed
///
/// Reads the outcome recorded on the latest IPT outcome encounter.
///
/// # Returns
/// * `Ok(Json<IptCompletedRes>)` - `iptCompleted` flag
/// * `Err((StatusCode, &str))` - Bad request, patient not found or internal error
#[axum::debug_handler]
async fn ipt_completed(
    State(state): State<AppState>,
    Query(query): Query<pb::PatientQuery>,
) -> Result<Json<pb::IptCompletedRes>, ApiError> {
    let ipt_completed = answer(&state, &query, "iptCompleted", Evaluator::ipt_completed)?;
    Ok(Json(pb::IptCompletedRes { ipt_completed }))
}

#[utoipa::path(
    get,
    path = "/greencard/viral-load",
    params(pb::PatientQuery),
    responses(
        (status = 200, description = "Latest viral load or LDL", body = pb::ViralLoadRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Patient not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Latest viral load
///
/// Compares the latest numeric viral load with the latest qualitative result.
///
/// # Returns
/// * `Ok(Json<ViralLoadRes>)` - `vlResult` as copies/ml, `"LDL"`, or 0 when nothing is recorded
/// * `Err((StatusCode, &str))` - Bad request, patient not found or internal error
#[axum::debug_handler]
async fn viral_load(
    State(state): State<AppState>,
    Query(query): Query<pb::PatientQuery>,
) -> Result<Json<pb::ViralLoadRes>, ApiError> {
    let vl_result = answer(&state, &query, "vlResult", Evaluator::viral_load)?;
    Ok(Json(pb::ViralLoadRes { vl_result }))
}

#[utoipa::path(
    get,
    path = "/greencard/is-pregnant",
    params(pb::PatientQuery),
    responses(
        (status = 200, description = "Whether the patient is pregnant", body = pb::IsPregnantRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Patient not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Check whether the patient is pregnant
///
/// The latest pregnancy status observation must answer yes.
///
/// # Returns
/// * `Ok(Json<IsPregnantRes>)` - `isPregnant` flag
/// * `Err((StatusCode, &str))` - Bad request, patient not found or internal error
#[axum::debug_handler]
async fn is_pregnant(
    State(state): State<AppState>,
    Query(query): Query<pb::PatientQuery>,
) -> Result<Json<pb::IsPregnantRes>, ApiError> {
    let is_pregnant = answer(&state, &query, "isPregnant", Evaluator::is_pregnant)?;
    Ok(Json(pb::IsPregnantRes { is_pregnant }))
}

#[utoipa::path(
    get,
    path = "/greencard/is-breastfeeding",
    params(pb::PatientQuery),
    responses(
        (status = 200, description = "Whether the patient is breastfeeding", body = pb::IsBreastFeedingRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Patient not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Check whether the patient is breastfeeding
///
/// The latest breastfeeding observation must answer yes.
///
/// # Returns
/// * `Ok(Json<IsBreastFeedingRes>)` - `isBreastFeeding` flag
/// * `Err((StatusCode, &str))` - Bad request, patient not found or internal error
#[axum::debug_handler]
async fn is_breastfeeding(
    State(state): State<AppState>,
    Query(query): Query<pb::PatientQuery>,
) -> Result<Json<pb::IsBreastFeedingRes>, ApiError> {
    let is_breastfeeding = answer(&state, &query, "isBreastFeeding", Evaluator::is_breastfeeding)?;
    Ok(Json(pb::IsBreastFeedingRes { is_breastfeeding }))
}

#[utoipa::path(
    get,
    path = "/greencard/summary",
    params(pb::PatientQuery),
    responses(
        (status = 200, description = "Every greencard answer for the patient", body = pb::GreencardSummaryRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Patient not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Consolidated greencard view
///
/// Answers every question at the same instant so the card renders from one request.
///
/// # Returns
/// * `Ok(Json<GreencardSummaryRes>)` - All twelve greencard answers
/// * `Err((StatusCode, &str))` - Bad request, patient not found or internal error
#[axum::debug_handler]
async fn summary(
    State(state): State<AppState>,
    Query(query): Query<pb::PatientQuery>,
) -> Result<Json<pb::GreencardSummaryRes>, ApiError> {
    let summary = answer(&state, &query, "summary", Evaluator::summary)?;
    Ok(Json(summary.into()))
}
