// src/payroll.rs
use chrono::NaiveDate;
use rust_decimal::prelude::*;
use serde::Serialize;
use std::collections::HashMap;

use crate::attendance::{classify, AttendanceRow, AttendanceSummary, PAYROLL_MONTH_DAYS};

// --- Query Layer Inputs ---

/// Base payroll data of one employee for a period, before attendance is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PayrollSource {
    pub dni: String,
    pub nombre_completo: String,
    pub campana: String,
    pub cargo: String,
    pub fecha_ingreso: NaiveDate,
    pub sueldo_base: Decimal,
}

/// A named amount paid on top of the base salary (bonuses, allowances).
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentConcept {
    pub dni: String,
    pub nombre: String,
    pub monto: Decimal,
}

// --- Report Row ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptAmount {
    #[serde(rename = "Nombre")]
    pub nombre: String,
    #[serde(rename = "Monto", with = "rust_decimal::serde::float")]
    pub monto: Decimal,
}

/// Per-employee, per-period payroll line. Recomputed on every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayrollReportRow {
    #[serde(rename = "DNI")]
    pub dni: String,
    #[serde(rename = "NombreCompleto")]
    pub nombre_completo: String,
    #[serde(rename = "NombreCampaña")]
    pub campana: String,
    #[serde(rename = "Cargo")]
    pub cargo: String,
    #[serde(rename = "FechaIngreso")]
    pub fecha_ingreso: NaiveDate,
    #[serde(flatten)]
    pub asistencia: AttendanceSummary,
    #[serde(rename = "SueldoBase", with = "rust_decimal::serde::float")]
    pub sueldo_base: Decimal,
    #[serde(rename = "DescuentoFaltas", with = "rust_decimal::serde::float")]
    pub descuento_faltas: Decimal,
    #[serde(rename = "Conceptos")]
    pub conceptos: Vec<ConceptAmount>,
    #[serde(rename = "TotalConceptos", with = "rust_decimal::serde::float")]
    pub total_conceptos: Decimal,
    #[serde(rename = "TotalPagar", with = "rust_decimal::serde::float")]
    pub neto_a_pagar: Decimal,
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Joins base payroll data with the classified attendance and concepts of the period.
///
/// Employees without an attendance row are treated as having no marks, which
/// means a full 30-day period and no absence discount.
pub fn build_payroll_rows(
    sources: &[PayrollSource],
    matrix: &[AttendanceRow],
    concepts: &[PaymentConcept],
    year: i32,
    month: u32,
) -> Vec<PayrollReportRow> {
    let attendance: HashMap<&str, AttendanceSummary> = matrix
        .iter()
        .map(|row| (row.dni.as_str(), classify(row, year, month)))
        .collect();

    let mut concepts_by_dni: HashMap<&str, Vec<ConceptAmount>> = HashMap::new();
    for concept in concepts {
        concepts_by_dni
            .entry(concept.dni.as_str())
            .or_default()
            .push(ConceptAmount {
                nombre: concept.nombre.clone(),
                monto: round_money(concept.monto),
            });
    }

    sources
        .iter()
        .map(|source| {
            let summary = attendance
                .get(source.dni.as_str())
                .copied()
                .unwrap_or_else(AttendanceSummary::without_marks);
            let conceptos = concepts_by_dni
                .remove(source.dni.as_str())
                .unwrap_or_default();
            compute_row(source, summary, conceptos)
        })
        .collect()
}

/// Net pay = base salary - unjustified absence discount + concepts, never below zero.
/// Justified absences are paid, so only `faltas_injustificadas` is discounted.
pub fn compute_row(
    source: &PayrollSource,
    asistencia: AttendanceSummary,
    conceptos: Vec<ConceptAmount>,
) -> PayrollReportRow {
    let valor_dia = source.sueldo_base / Decimal::from(PAYROLL_MONTH_DAYS);
    let descuento_faltas = round_money(valor_dia * Decimal::from(asistencia.faltas_injustificadas));
    let total_conceptos = round_money(conceptos.iter().map(|c| c.monto).sum::<Decimal>());
    let neto_a_pagar =
        round_money(source.sueldo_base - descuento_faltas + total_conceptos).max(Decimal::ZERO);

    PayrollReportRow {
        dni: source.dni.clone(),
        nombre_completo: source.nombre_completo.clone(),
        campana: source.campana.clone(),
        cargo: source.cargo.clone(),
        fecha_ingreso: source.fecha_ingreso,
        asistencia,
        sueldo_base: round_money(source.sueldo_base),
        descuento_faltas,
        conceptos,
        total_conceptos,
        neto_a_pagar,
    }
}
