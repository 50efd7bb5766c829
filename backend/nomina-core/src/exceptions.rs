// src/exceptions.rs
use chrono::{Months, NaiveDate};
use serde::Deserialize;
use tracing::info;

use crate::clock::Clock;
use crate::error::AppError;
use crate::store::{NewScheduleException, NominaStore, ScheduleException};

/// Longest range a single request may cover, both ends included.
pub const MAX_RANGE_DAYS: i64 = 31;

/// Body of `POST /api/excepciones`. `fechaFin` turns it into a range of days.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionRequest {
    pub dni: String,
    pub fecha: NaiveDate,
    #[serde(default)]
    pub fecha_fin: Option<NaiveDate>,
    #[serde(default)]
    pub horario_id: Option<i64>,
    #[serde(default)]
    pub descanso: bool,
    #[serde(default)]
    pub motivo: String,
}

/// Checks the request against the date rules and expands it into one exception per day.
/// Every broken rule is reported, not just the first.
pub fn expand_request(
    request: &ExceptionRequest,
    today: NaiveDate,
) -> Result<Vec<NewScheduleException>, AppError> {
    let mut errors = Vec::new();

    if request.dni.trim().is_empty() {
        errors.push("dni es obligatorio".to_string());
    }
    if request.motivo.trim().is_empty() {
        errors.push("motivo es obligatorio".to_string());
    }
    match (request.horario_id, request.descanso) {
        (Some(_), true) => errors.push(
            "Indique un horario o un día de descanso, no ambos".to_string(),
        ),
        (None, false) => {
            errors.push("Indique un horario (horarioId) o un día de descanso".to_string())
        }
        _ => {}
    }

    let fecha_fin = request.fecha_fin.unwrap_or(request.fecha);
    if fecha_fin < request.fecha {
        errors.push("fechaFin no puede ser anterior a fecha".to_string());
    } else if (fecha_fin - request.fecha).num_days() + 1 > MAX_RANGE_DAYS {
        errors.push(format!(
            "El rango no puede superar {} días",
            MAX_RANGE_DAYS
        ));
    }

    if let Some(earliest) = today.checked_sub_months(Months::new(1)) {
        if request.fecha < earliest {
            errors.push(format!(
                "fecha no puede ser anterior a {}",
                earliest.format("%d/%m/%Y")
            ));
        }
    }

    AppError::check(errors)?;

    let horario_id = if request.descanso { None } else { request.horario_id };
    Ok(request
        .fecha
        .iter_days()
        .take_while(|day| *day <= fecha_fin)
        .map(|fecha| NewScheduleException {
            dni: request.dni.trim().to_string(),
            fecha,
            horario_id,
            es_descanso: request.descanso,
            motivo: request.motivo.trim().to_string(),
        })
        .collect())
}

/// Validates, checks the referenced employee and schedule, then inserts the whole range atomically.
pub async fn create_exceptions(
    store: &dyn NominaStore,
    clock: &dyn Clock,
    request: &ExceptionRequest,
) -> Result<Vec<ScheduleException>, AppError> {
    let exceptions = expand_request(request, clock.today())?;

    if store.employee(request.dni.trim()).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Empleado {} no encontrado",
            request.dni.trim()
        )));
    }
    if let Some(horario_id) = request.horario_id.filter(|_| !request.descanso) {
        if !store.schedule_exists(horario_id).await? {
            return Err(AppError::NotFound(format!(
                "Horario {} no encontrado",
                horario_id
            )));
        }
    }

    let inserted = store.insert_exceptions(&exceptions).await?;
    info!(
        "Created {} schedule exception(s) for {}",
        inserted.len(),
        request.dni.trim()
    );
    Ok(inserted)
}
