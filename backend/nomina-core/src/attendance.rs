// src/attendance.rs
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// --- Attendance Codes ---

pub const CODE_PRESENT: &str = "A";
pub const CODE_LATE: &str = "T";
pub const CODE_UNJUSTIFIED_ABSENCE: &str = "FI";
pub const CODE_JUSTIFIED_ABSENCE: &str = "FJ";
pub const CODE_REST_DAY: &str = "D";

/// Every payroll month is normalised to this many days, whatever the calendar says.
pub const PAYROLL_MONTH_DAYS: u32 = 30;

const EXCLUDED_DAY: u32 = 31;
const DATE_COLUMN_FORMAT: &str = "%Y-%m-%d";

static DATE_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date column pattern is valid"));

// --- Wide Attendance Row ---

/// One employee's month as returned by the attendance matrix query: identity
/// fields plus one column per calendar day holding the day's mark.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRow {
    pub dni: String,
    pub nombre_completo: String,
    pub campana: String,
    pub columns: BTreeMap<String, String>,
}

impl AttendanceRow {
    pub fn new(dni: &str, nombre_completo: &str, campana: &str) -> Self {
        Self {
            dni: dni.to_string(),
            nombre_completo: nombre_completo.to_string(),
            campana: campana.to_string(),
            columns: BTreeMap::new(),
        }
    }

    pub fn mark(&mut self, date: NaiveDate, code: &str) {
        self.columns
            .insert(date.format(DATE_COLUMN_FORMAT).to_string(), code.to_string());
    }
}

// --- Classification ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub dias_asistidos: u32,
    pub tardanzas: u32,
    pub faltas_injustificadas: u32,
    pub faltas_justificadas: u32,
    pub dias_descanso: u32,
    pub dias_trabajados: u32,
}

impl AttendanceSummary {
    /// Summary for an employee with no marks at all in the period.
    pub fn without_marks() -> Self {
        Self {
            dias_trabajados: PAYROLL_MONTH_DAYS,
            ..Default::default()
        }
    }
}

/// Parses a column name of the form `YYYY-MM-DD`. Anything else is not a day column.
pub fn column_date(column: &str) -> Option<NaiveDate> {
    if !DATE_COLUMN.is_match(column) {
        return None;
    }
    NaiveDate::parse_from_str(column, DATE_COLUMN_FORMAT).ok()
}

/// Counts the marks of `row` that belong to (`year`, `month`).
///
/// The 31st never counts and worked days are always measured against a
/// 30-day month, so `dias_trabajados + faltas_injustificadas + faltas_justificadas`
/// is 30 for every row.
pub fn classify(row: &AttendanceRow, year: i32, month: u32) -> AttendanceSummary {
    let mut summary = AttendanceSummary::default();

    let in_period = row.columns.iter().filter_map(|(column, value)| {
        column_date(column)
            .filter(|date| date.year() == year && date.month() == month)
            .filter(|date| date.day() != EXCLUDED_DAY)
            .map(|_| value)
    });

    for value in in_period {
        match value.trim().to_uppercase().as_str() {
            CODE_PRESENT => summary.dias_asistidos += 1,
            CODE_LATE => summary.tardanzas += 1,
            CODE_UNJUSTIFIED_ABSENCE => summary.faltas_injustificadas += 1,
            CODE_JUSTIFIED_ABSENCE => summary.faltas_justificadas += 1,
            CODE_REST_DAY => summary.dias_descanso += 1,
            _ => {}
        }
    }

    let absences = summary.faltas_injustificadas + summary.faltas_justificadas;
    summary.dias_trabajados = PAYROLL_MONTH_DAYS.saturating_sub(absences);
    summary
}
