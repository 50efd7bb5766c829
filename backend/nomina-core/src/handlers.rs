// src/handlers.rs
use axum::{
    error_handling::HandleErrorLayer,
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::{timeout::error::Elapsed, timeout::TimeoutLayer, BoxError, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info, warn};

use crate::aggregation::{aggregate_payroll, aggregate_tardiness};
use crate::clock::Clock;
use crate::config::Config;
use crate::employees::{self, TerminationRequest};
use crate::error::{ok, ApiResponse, AppError};
use crate::exceptions::{create_exceptions, ExceptionRequest};
use crate::payroll::{build_payroll_rows, PayrollReportRow};
use crate::shaping::{
    attendance_report, paginate, payroll_csv, payroll_view, period_label, PageRequest,
    DEFAULT_PAGE_SIZE,
};
use crate::store::{month_bounds, NominaStore};
use crate::tardiness::tardiness_rows;

pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 2100;

// --- Application State ---

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn NominaStore>,
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
}

// --- Query Parameters ---

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub anio: Option<i32>,
    pub mes: Option<u32>,
    pub campana: Option<String>,
    pub pagina: Option<usize>,
    pub tamano_pagina: Option<usize>,
}

impl ReportQuery {
    fn period_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        match self.anio {
            None => errors.push("anio es obligatorio".to_string()),
            Some(anio) if !(MIN_YEAR..=MAX_YEAR).contains(&anio) => errors.push(format!(
                "anio debe estar entre {} y {}",
                MIN_YEAR, MAX_YEAR
            )),
            _ => {}
        }
        match self.mes {
            None => errors.push("mes es obligatorio".to_string()),
            Some(mes) if !(1..=12).contains(&mes) => {
                errors.push("mes debe estar entre 1 y 12".to_string())
            }
            _ => {}
        }
        errors
    }

    fn page_request(&self) -> PageRequest {
        PageRequest {
            pagina: self.pagina.unwrap_or(1),
            tamano_pagina: self.tamano_pagina.unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    /// Validated (year, month).
    pub fn period(&self) -> Result<(i32, u32), AppError> {
        AppError::check(self.period_errors())?;
        match (self.anio, self.mes) {
            (Some(anio), Some(mes)) => Ok((anio, mes)),
            _ => Err(AppError::validation("anio y mes son obligatorios")),
        }
    }

    /// Validated period plus pagination, with every problem reported at once.
    pub fn paged_period(&self) -> Result<((i32, u32), PageRequest), AppError> {
        let page = self.page_request();
        let mut errors = self.period_errors();
        errors.extend(page.validate());
        AppError::check(errors)?;
        Ok((self.period()?, page))
    }

    fn campana(&self) -> Option<&str> {
        self.campana.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

fn query_params(
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<ReportQuery, AppError> {
    query
        .map(|Query(q)| q)
        .map_err(|rejection| AppError::validation(rejection.body_text()))
}

/// Report payload labelled with its period, e.g. `enero 2025`.
#[derive(Debug, Serialize)]
pub struct PeriodReport<T> {
    pub periodo: String,
    #[serde(flatten)]
    pub contenido: T,
}

// --- Router ---

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/reportes/asistencia", get(handle_attendance_report))
        .route("/reportes/tardanzas", get(handle_tardiness_report))
        .route("/nomina", get(handle_payroll))
        .route("/nomina/resumen", get(handle_payroll_summary))
        .route("/nomina/exportar", get(handle_payroll_export))
        .route("/excepciones", post(handle_create_exceptions))
        // GET takes an employee DNI, DELETE an exception id
        .route(
            "/excepciones/{clave}",
            get(handle_list_exceptions).delete(handle_delete_exception),
        )
        .route("/empleados/{dni}", get(handle_get_employee))
        .route("/empleados/{dni}/cese", post(handle_terminate_employee))
        .route(
            "/empleados/{dni}/reincorporacion",
            post(handle_reinstate_employee),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer_token,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(state.config.report_timeout())),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_middleware_error(err: BoxError) -> AppError {
    if err.is::<Elapsed>() {
        AppError::Timeout
    } else {
        AppError::Internal(format!("Unhandled middleware error: {}", err))
    }
}

// Bearer check, only enforced when API_TOKEN is configured
async fn require_bearer_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(expected) = state.config.api_token() {
        let provided = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        if !provided.is_some_and(|token| tokens_match(token, expected)) {
            warn!("Rejected {} {}: missing or invalid token", request.method(), request.uri().path());
            return Err(AppError::Unauthorized);
        }
    }
    Ok(next.run(request).await)
}

/// Compares every byte regardless of where the first mismatch is.
fn tokens_match(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// --- Handlers ---

async fn handle_health() -> impl IntoResponse {
    ok(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn handle_attendance_report(
    State(state): State<AppState>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let query = query_params(query)?;
    let ((anio, mes), page) = query.paged_period()?;
    info!("Attendance report requested for {}-{:02}", anio, mes);

    let matrix = state
        .store
        .attendance_matrix(anio, mes, query.campana())
        .await?;
    let rows = attendance_report(&matrix, anio, mes);
    debug!("Attendance report {}-{:02}: {} rows", anio, mes, rows.len());

    Ok(ok(PeriodReport {
        periodo: period_label(anio, mes),
        contenido: paginate(rows, page),
    }))
}

/// Full payroll of a period, recomputed from attendance, salaries and concepts.
async fn payroll_rows(
    store: &dyn NominaStore,
    anio: i32,
    mes: u32,
) -> Result<Vec<PayrollReportRow>, AppError> {
    let sources = store.payroll_sources(anio, mes).await?;
    let matrix = store.attendance_matrix(anio, mes, None).await?;
    let concepts = store.payment_concepts(anio, mes).await?;
    let rows = build_payroll_rows(&sources, &matrix, &concepts, anio, mes);
    debug!(
        "Payroll {}-{:02}: {} employees, {} concepts",
        anio,
        mes,
        rows.len(),
        concepts.len()
    );
    Ok(rows)
}

async fn handle_payroll(
    State(state): State<AppState>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let query = query_params(query)?;
    let ((anio, mes), page) = query.paged_period()?;
    info!("Payroll requested for {}-{:02}", anio, mes);

    let rows = payroll_rows(state.store.as_ref(), anio, mes).await?;

    Ok(ok(PeriodReport {
        periodo: period_label(anio, mes),
        contenido: paginate(rows, page).map(payroll_view),
    }))
}

async fn handle_payroll_summary(
    State(state): State<AppState>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let (anio, mes) = query_params(query)?.period()?;
    info!("Payroll summary requested for {}-{:02}", anio, mes);

    let rows = payroll_rows(state.store.as_ref(), anio, mes).await?;

    Ok(ok(PeriodReport {
        periodo: period_label(anio, mes),
        contenido: aggregate_payroll(&rows),
    }))
}

async fn handle_payroll_export(
    State(state): State<AppState>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let (anio, mes) = query_params(query)?.period()?;
    info!("Payroll export requested for {}-{:02}", anio, mes);

    let rows = payroll_rows(state.store.as_ref(), anio, mes).await?;
    let body = payroll_csv(&rows)?;
    let disposition = format!("attachment; filename=\"nomina_{}_{:02}.csv\"", anio, mes);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

async fn handle_tardiness_report(
    State(state): State<AppState>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let (anio, mes) = query_params(query)?.period()?;
    info!("Tardiness report requested for {}-{:02}", anio, mes);

    let (first, last) = month_bounds(anio, mes)
        .ok_or_else(|| AppError::validation("mes debe estar entre 1 y 12"))?;
    let marks = state.store.tardiness_marks(first, last).await?;
    let rows = tardiness_rows(&marks);
    debug!("Tardiness {}-{:02}: {} marks, {} employees", anio, mes, marks.len(), rows.len());

    Ok(ok(PeriodReport {
        periodo: period_label(anio, mes),
        contenido: aggregate_tardiness(&rows),
    }))
}

async fn handle_create_exceptions(
    State(state): State<AppState>,
    body: Result<Json<ExceptionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = body.map_err(|rejection| AppError::validation(rejection.body_text()))?;
    info!("Schedule exception requested for {}", request.dni);

    let created = create_exceptions(state.store.as_ref(), state.clock.as_ref(), &request).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}

async fn handle_list_exceptions(
    State(state): State<AppState>,
    Path(dni): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exceptions = state.store.exceptions_for(&dni).await?;
    debug!("{} schedule exceptions for {}", exceptions.len(), dni);
    Ok(ok(exceptions))
}

async fn handle_delete_exception(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id: i64 = id
        .parse()
        .map_err(|_| AppError::validation(format!("id inválido: {}", id)))?;
    state.store.delete_exception(id).await?;
    info!("Schedule exception {} deleted", id);
    Ok(ok(serde_json::json!({ "id": id })))
}

async fn handle_get_employee(
    State(state): State<AppState>,
    Path(dni): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let employee = employees::find_employee(state.store.as_ref(), &dni).await?;
    Ok(ok(employee))
}

async fn handle_terminate_employee(
    State(state): State<AppState>,
    Path(dni): Path<String>,
    body: Result<Json<TerminationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = body.map_err(|rejection| AppError::validation(rejection.body_text()))?;
    let employee = employees::terminate(state.store.as_ref(), &dni, request.fecha_cese).await?;
    Ok(ok(employee))
}

async fn handle_reinstate_employee(
    State(state): State<AppState>,
    Path(dni): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let employee = employees::reinstate(state.store.as_ref(), &dni).await?;
    Ok(ok(employee))
}
