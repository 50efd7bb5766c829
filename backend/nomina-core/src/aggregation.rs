// src/aggregation.rs
use rust_decimal::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::areas::{resolve_strict, resolve_tolerant, Area};
use crate::payroll::{round_money, PayrollReportRow};
use crate::tardiness::TardinessEmployeeRow;

pub const BASE_SALARY_BUCKET: &str = "Sueldo Base";
const BONUS_MARKER: &str = "bono";
const NO_CAMPAIGN: &str = "SIN CAMPAÑA";

// --- Severity ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    #[serde(rename = "Crítico")]
    Critico,
    #[serde(rename = "Alto")]
    Alto,
    #[serde(rename = "Moderado")]
    Moderado,
    #[serde(rename = "Bajo")]
    Bajo,
}

/// (min tardiness count, min late minutes) for Crítico, Alto and Moderado, in that order.
type Ladder = [(u32, u32); 3];

const AREA_LADDER: Ladder = [(50, 1200), (25, 600), (15, 300)];
const CAMPAIGN_LADDER: Ladder = [(20, 480), (10, 240), (5, 120)];

fn severity(tardanzas: u32, minutos: u32, ladder: &Ladder) -> Severity {
    let levels = [Severity::Critico, Severity::Alto, Severity::Moderado];
    ladder
        .iter()
        .zip(levels)
        .find(|((min_count, min_minutes), _)| tardanzas >= *min_count || minutos >= *min_minutes)
        .map(|(_, level)| level)
        .unwrap_or(Severity::Bajo)
}

pub fn area_severity(tardanzas: u32, minutos: u32) -> Severity {
    severity(tardanzas, minutos, &AREA_LADDER)
}

pub fn campaign_severity(tardanzas: u32, minutos: u32) -> Severity {
    severity(tardanzas, minutos, &CAMPAIGN_LADDER)
}

/// Share of `part` in `whole` as a percentage with two decimals. Zero when `whole` is zero.
pub fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    round_money(part / whole * Decimal::ONE_HUNDRED)
}

fn campaign_key(campana: &str) -> String {
    if campana.trim().is_empty() {
        NO_CAMPAIGN.to_string()
    } else {
        campana.to_string()
    }
}

// --- Payroll Rollup ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptBucket {
    pub concepto: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub empleados: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollCampaignBucket {
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub empleados: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub porcentaje: Decimal,
    pub desglose: Vec<ConceptBucket>,
    pub filas: Vec<PayrollReportRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollAreaBucket {
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub empleados: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub porcentaje: Decimal,
    pub desglose: Vec<ConceptBucket>,
    pub campanas: BTreeMap<String, PayrollCampaignBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollAggregate {
    pub areas: BTreeMap<Area, PayrollAreaBucket>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_general: Decimal,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub desglose: Vec<ConceptBucket>,
}

fn total_pay(rows: &[&PayrollReportRow]) -> Decimal {
    rows.iter().map(|row| row.neto_a_pagar).sum()
}

/// Base salary plus every concept whose name mentions a bonus, largest first.
/// Empty input yields no buckets at all.
pub fn bonus_breakdown(rows: &[&PayrollReportRow]) -> Vec<ConceptBucket> {
    if rows.is_empty() {
        return Vec::new();
    }

    let mut bonuses: BTreeMap<&str, (Decimal, usize)> = BTreeMap::new();
    for row in rows {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for concept in &row.conceptos {
            if !concept.nombre.to_lowercase().contains(BONUS_MARKER) {
                continue;
            }
            let bucket = bonuses
                .entry(concept.nombre.as_str())
                .or_insert((Decimal::ZERO, 0));
            bucket.0 += concept.monto;
            if seen.insert(concept.nombre.as_str()) {
                bucket.1 += 1;
            }
        }
    }

    let mut buckets = vec![ConceptBucket {
        concepto: BASE_SALARY_BUCKET.to_string(),
        total: round_money(rows.iter().map(|row| row.sueldo_base).sum()),
        empleados: rows.len(),
    }];
    buckets.extend(bonuses.into_iter().map(|(nombre, (total, empleados))| ConceptBucket {
        concepto: nombre.to_string(),
        total: round_money(total),
        empleados,
    }));
    // Stable sort keeps the base salary bucket first on ties
    buckets.sort_by(|a, b| b.total.cmp(&a.total));
    buckets
}

/// Rolls payroll rows up into Area -> Campaign buckets using exact campaign matching.
/// Area percentages are shares of the grand total, campaign percentages shares of their area.
pub fn aggregate_payroll(rows: &[PayrollReportRow]) -> PayrollAggregate {
    let mut grouped: BTreeMap<Area, BTreeMap<String, Vec<&PayrollReportRow>>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry(resolve_strict(&row.campana))
            .or_default()
            .entry(campaign_key(&row.campana))
            .or_default()
            .push(row);
    }

    let all_rows: Vec<&PayrollReportRow> = rows.iter().collect();
    let total_general = total_pay(&all_rows);

    let areas = grouped
        .into_iter()
        .map(|(area, campaigns)| {
            let area_rows: Vec<&PayrollReportRow> = campaigns.values().flatten().copied().collect();
            let campaign_totals: BTreeMap<&str, Decimal> = campaigns
                .iter()
                .map(|(name, members)| (name.as_str(), total_pay(members)))
                .collect();
            let area_total: Decimal = campaign_totals.values().copied().sum();

            let campanas = campaigns
                .iter()
                .map(|(name, members)| {
                    let total = campaign_totals
                        .get(name.as_str())
                        .copied()
                        .unwrap_or(Decimal::ZERO);
                    let bucket = PayrollCampaignBucket {
                        total,
                        empleados: members.len(),
                        porcentaje: percentage(total, area_total),
                        desglose: bonus_breakdown(members),
                        filas: members.iter().map(|row| (*row).clone()).collect(),
                    };
                    (name.clone(), bucket)
                })
                .collect();

            let bucket = PayrollAreaBucket {
                total: area_total,
                empleados: area_rows.len(),
                porcentaje: percentage(area_total, total_general),
                desglose: bonus_breakdown(&area_rows),
                campanas,
            };
            (area, bucket)
        })
        .collect();

    PayrollAggregate {
        areas,
        total_general,
        desglose: bonus_breakdown(&all_rows),
    }
}

// --- Tardiness Rollup ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TardinessCampaignBucket {
    pub total_tardanzas: u32,
    pub total_minutos: u32,
    pub empleados: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub porcentaje: Decimal,
    pub nivel: Severity,
    pub filas: Vec<TardinessEmployeeRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TardinessAreaBucket {
    pub total_tardanzas: u32,
    pub total_minutos: u32,
    pub empleados: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub porcentaje: Decimal,
    pub nivel: Severity,
    pub campanas: BTreeMap<String, TardinessCampaignBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TardinessAggregate {
    pub areas: BTreeMap<Area, TardinessAreaBucket>,
    pub total_tardanzas: u32,
    pub total_minutos: u32,
}

fn tardiness_totals(rows: &[&TardinessEmployeeRow]) -> (u32, u32) {
    rows.iter().fold((0, 0), |(count, minutes), row| {
        (
            count.saturating_add(row.tardanzas),
            minutes.saturating_add(row.minutos),
        )
    })
}

/// Rolls tardiness rows up into Area -> Campaign buckets using tolerant campaign matching.
pub fn aggregate_tardiness(rows: &[TardinessEmployeeRow]) -> TardinessAggregate {
    let mut grouped: BTreeMap<Area, BTreeMap<String, Vec<&TardinessEmployeeRow>>> =
        BTreeMap::new();
    for row in rows {
        grouped
            .entry(resolve_tolerant(&row.campana))
            .or_default()
            .entry(campaign_key(&row.campana))
            .or_default()
            .push(row);
    }

    let all_rows: Vec<&TardinessEmployeeRow> = rows.iter().collect();
    let (total_tardanzas, total_minutos) = tardiness_totals(&all_rows);

    let areas = grouped
        .into_iter()
        .map(|(area, campaigns)| {
            let area_rows: Vec<&TardinessEmployeeRow> =
                campaigns.values().flatten().copied().collect();
            let (area_count, area_minutes) = tardiness_totals(&area_rows);

            let campanas = campaigns
                .into_iter()
                .map(|(name, members)| {
                    let (count, minutes) = tardiness_totals(&members);
                    let bucket = TardinessCampaignBucket {
                        total_tardanzas: count,
                        total_minutos: minutes,
                        empleados: members.len(),
                        porcentaje: percentage(Decimal::from(count), Decimal::from(area_count)),
                        nivel: campaign_severity(count, minutes),
                        filas: members.into_iter().cloned().collect(),
                    };
                    (name, bucket)
                })
                .collect();

            let bucket = TardinessAreaBucket {
                total_tardanzas: area_count,
                total_minutos: area_minutes,
                empleados: area_rows.len(),
                porcentaje: percentage(Decimal::from(area_count), Decimal::from(total_tardanzas)),
                nivel: area_severity(area_count, area_minutes),
                campanas,
            };
            (area, bucket)
        })
        .collect();

    TardinessAggregate {
        areas,
        total_tardanzas,
        total_minutos,
    }
}
