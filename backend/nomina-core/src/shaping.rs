// src/shaping.rs
use chrono::NaiveDate;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::attendance::{classify, AttendanceRow, AttendanceSummary};
use crate::payroll::{round_money, PayrollReportRow};

// --- Locale Formatting (es-PE) ---

const CURRENCY_SYMBOL: &str = "S/";
const DATE_DISPLAY_FORMAT: &str = "%d/%m/%Y";
const MONTH_NAMES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Formats an amount the way the payroll screens show soles: `S/ 1,234.50`.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = round_money(amount);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let plain = format!("{:.2}", rounded.abs());
    let (integer, fraction) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let digits: Vec<char> = integer.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*digit);
    }

    format!("{}{} {}.{}", sign, CURRENCY_SYMBOL, grouped, fraction)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_DISPLAY_FORMAT).to_string()
}

/// `enero 2025` style label for a reporting period.
pub fn period_label(year: i32, month: u32) -> String {
    let name = month
        .checked_sub(1)
        .and_then(|index| MONTH_NAMES.get(index as usize))
        .copied()
        .unwrap_or("mes desconocido");
    format!("{} {}", name, year)
}

// --- Report Rows ---

/// Payroll row as the payroll screen consumes it: raw amounts plus their display strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayrollView {
    #[serde(flatten)]
    pub row: PayrollReportRow,
    #[serde(rename = "FechaIngresoFormateada")]
    pub fecha_ingreso: String,
    #[serde(rename = "SueldoBaseFormateado")]
    pub sueldo_base: String,
    #[serde(rename = "DescuentoFaltasFormateado")]
    pub descuento_faltas: String,
    #[serde(rename = "TotalPagarFormateado")]
    pub total_pagar: String,
}

pub fn payroll_view(row: PayrollReportRow) -> PayrollView {
    PayrollView {
        fecha_ingreso: format_date(row.fecha_ingreso),
        sueldo_base: format_currency(row.sueldo_base),
        descuento_faltas: format_currency(row.descuento_faltas),
        total_pagar: format_currency(row.neto_a_pagar),
        row,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceReportRow {
    #[serde(rename = "DNI")]
    pub dni: String,
    #[serde(rename = "NombreCompleto")]
    pub nombre_completo: String,
    #[serde(rename = "NombreCampaña")]
    pub campana: String,
    #[serde(flatten)]
    pub resumen: AttendanceSummary,
}

pub fn attendance_report(matrix: &[AttendanceRow], year: i32, month: u32) -> Vec<AttendanceReportRow> {
    matrix
        .iter()
        .map(|row| AttendanceReportRow {
            dni: row.dni.clone(),
            nombre_completo: row.nombre_completo.clone(),
            campana: row.campana.clone(),
            resumen: classify(row, year, month),
        })
        .collect()
}

// --- Pagination ---

pub const PAGE_SIZES: [usize; 4] = [10, 20, 50, 100];
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    #[serde(default = "first_page")]
    pub pagina: usize,
    #[serde(default = "default_page_size")]
    pub tamano_pagina: usize,
}

fn first_page() -> usize {
    1
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            pagina: first_page(),
            tamano_pagina: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Returns one message per invalid field.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.pagina == 0 {
            errors.push("pagina debe ser mayor o igual a 1".to_string());
        }
        if !PAGE_SIZES.contains(&self.tamano_pagina) {
            errors.push(format!(
                "tamanoPagina debe ser uno de {:?}, se recibió {}",
                PAGE_SIZES, self.tamano_pagina
            ));
        }
        errors
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagina: usize,
    pub tamano_pagina: usize,
    pub total_registros: usize,
    pub total_paginas: usize,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagina: self.pagina,
            tamano_pagina: self.tamano_pagina,
            total_registros: self.total_registros,
            total_paginas: self.total_paginas,
        }
    }
}

/// Slices an already fully fetched list. A page past the end comes back empty.
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total_registros = items.len();
    let size = request.tamano_pagina.max(1);
    let total_paginas = total_registros.div_ceil(size);
    let offset = request.pagina.saturating_sub(1).saturating_mul(size);

    Page {
        items: items.into_iter().skip(offset).take(size).collect(),
        pagina: request.pagina,
        tamano_pagina: size,
        total_registros,
        total_paginas,
    }
}

// --- CSV Export ---

const CSV_FIXED_HEADERS: [&str; 13] = [
    "DNI",
    "NombreCompleto",
    "NombreCampaña",
    "Cargo",
    "FechaIngreso",
    "DiasAsistidos",
    "Tardanzas",
    "FaltasInjustificadas",
    "FaltasJustificadas",
    "DiasDescanso",
    "DiasTrabajados",
    "SueldoBase",
    "DescuentoFaltas",
];

/// Writes the payroll report as CSV: fixed columns, one column per concept name
/// found in the period (sorted), then the net amount.
pub fn payroll_csv(rows: &[PayrollReportRow]) -> Result<Vec<u8>, csv::Error> {
    let concept_names: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.conceptos.iter().map(|c| c.nombre.as_str()))
        .collect();

    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header: Vec<&str> = CSV_FIXED_HEADERS.to_vec();
    header.extend(concept_names.iter().copied());
    header.push("TotalPagar");
    writer.write_record(&header)?;

    for row in rows {
        let summary = &row.asistencia;
        let mut record: Vec<String> = vec![
            row.dni.clone(),
            row.nombre_completo.clone(),
            row.campana.clone(),
            row.cargo.clone(),
            format_date(row.fecha_ingreso),
            summary.dias_asistidos.to_string(),
            summary.tardanzas.to_string(),
            summary.faltas_injustificadas.to_string(),
            summary.faltas_justificadas.to_string(),
            summary.dias_descanso.to_string(),
            summary.dias_trabajados.to_string(),
            format!("{:.2}", row.sueldo_base),
            format!("{:.2}", row.descuento_faltas),
        ];
        for name in &concept_names {
            let amount: Decimal = row
                .conceptos
                .iter()
                .filter(|c| c.nombre == *name)
                .map(|c| c.monto)
                .sum();
            record.push(format!("{:.2}", amount));
        }
        record.push(format!("{:.2}", row.neto_a_pagar));
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}
