// src/store.rs
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::attendance::AttendanceRow;
use crate::payroll::{PaymentConcept, PayrollSource};
use crate::tardiness::TardinessMark;

// --- Error Handling ---

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

// --- Employees ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmployeeStatus {
    Activo,
    Cesado,
    Suspendido,
    Vacaciones,
}

impl EmployeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmployeeStatus::Activo => "ACTIVO",
            EmployeeStatus::Cesado => "CESADO",
            EmployeeStatus::Suspendido => "SUSPENDIDO",
            EmployeeStatus::Vacaciones => "VACACIONES",
        }
    }
}

impl fmt::Display for EmployeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmployeeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVO" => Ok(EmployeeStatus::Activo),
            "CESADO" => Ok(EmployeeStatus::Cesado),
            "SUSPENDIDO" => Ok(EmployeeStatus::Suspendido),
            "VACACIONES" => Ok(EmployeeStatus::Vacaciones),
            other => Err(format!("Unknown employee status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub dni: String,
    pub nombres: String,
    pub apellido_paterno: String,
    pub apellido_materno: String,
    pub fecha_ingreso: NaiveDate,
    pub fecha_cese: Option<NaiveDate>,
    pub estado: EmployeeStatus,
    pub campana: Option<String>,
    pub cargo: Option<String>,
    pub horario: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub sueldo_base: Decimal,
}

// --- Schedule Exceptions ---

/// One day of a schedule override, ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewScheduleException {
    pub dni: String,
    pub fecha: NaiveDate,
    pub horario_id: Option<i64>,
    pub es_descanso: bool,
    pub motivo: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleException {
    pub id: i64,
    pub dni: String,
    pub fecha: NaiveDate,
    pub horario_id: Option<i64>,
    pub es_descanso: bool,
    pub motivo: String,
    pub creado_en: String,
}

// --- Periods ---

/// First and last calendar day of a month, `None` for an invalid month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last = next.pred_opt()?;
    debug_assert_eq!(last.month(), month);
    Some((first, last))
}

// --- Query Layer ---

/// Read and write operations the report pipeline needs from the HR database.
/// Every operation is a single parameterized query or one transaction.
#[async_trait]
pub trait NominaStore: Send + Sync {
    /// One wide row per employee active in the month, with one `YYYY-MM-DD` column per marked day.
    async fn attendance_matrix(
        &self,
        year: i32,
        month: u32,
        campana: Option<&str>,
    ) -> StoreResult<Vec<AttendanceRow>>;

    async fn payroll_sources(&self, year: i32, month: u32) -> StoreResult<Vec<PayrollSource>>;

    async fn payment_concepts(&self, year: i32, month: u32) -> StoreResult<Vec<PaymentConcept>>;

    /// Every late mark between `from` and `to`, both inclusive.
    async fn tardiness_marks(&self, from: NaiveDate, to: NaiveDate)
        -> StoreResult<Vec<TardinessMark>>;

    async fn employee(&self, dni: &str) -> StoreResult<Option<Employee>>;

    async fn set_employee_status(
        &self,
        dni: &str,
        estado: EmployeeStatus,
        fecha_cese: Option<NaiveDate>,
    ) -> StoreResult<()>;

    async fn schedule_exists(&self, id: i64) -> StoreResult<bool>;

    /// Inserts all exceptions or none. A date that already has an exception
    /// for the employee fails the whole batch with `Conflict`.
    async fn insert_exceptions(
        &self,
        exceptions: &[NewScheduleException],
    ) -> StoreResult<Vec<ScheduleException>>;

    async fn exceptions_for(&self, dni: &str) -> StoreResult<Vec<ScheduleException>>;

    async fn delete_exception(&self, id: i64) -> StoreResult<()>;
}
