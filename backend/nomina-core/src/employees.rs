// src/employees.rs
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::error::AppError;
use crate::store::{Employee, EmployeeStatus, NominaStore};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminationRequest {
    pub fecha_cese: NaiveDate,
}

pub async fn find_employee(store: &dyn NominaStore, dni: &str) -> Result<Employee, AppError> {
    store
        .employee(dni)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Empleado {} no encontrado", dni)))
}

/// Marks the employee as CESADO from `fecha_cese`. Employees are never deleted.
pub async fn terminate(
    store: &dyn NominaStore,
    dni: &str,
    fecha_cese: NaiveDate,
) -> Result<Employee, AppError> {
    let employee = find_employee(store, dni).await?;

    if employee.estado == EmployeeStatus::Cesado {
        return Err(AppError::Conflict(format!(
            "El empleado {} ya se encuentra cesado",
            dni
        )));
    }
    if fecha_cese < employee.fecha_ingreso {
        return Err(AppError::validation(format!(
            "fechaCese no puede ser anterior a la fecha de ingreso ({})",
            employee.fecha_ingreso.format("%d/%m/%Y")
        )));
    }

    store
        .set_employee_status(dni, EmployeeStatus::Cesado, Some(fecha_cese))
        .await?;
    info!("Employee {} terminated as of {}", dni, fecha_cese);
    find_employee(store, dni).await
}

/// Brings a terminated employee back to ACTIVO and clears the termination date.
pub async fn reinstate(store: &dyn NominaStore, dni: &str) -> Result<Employee, AppError> {
    let employee = find_employee(store, dni).await?;

    if employee.estado != EmployeeStatus::Cesado {
        return Err(AppError::Conflict(format!(
            "El empleado {} no está cesado (estado {})",
            dni, employee.estado
        )));
    }

    store
        .set_employee_status(dni, EmployeeStatus::Activo, None)
        .await?;
    info!("Employee {} reinstated", dni);
    find_employee(store, dni).await
}
