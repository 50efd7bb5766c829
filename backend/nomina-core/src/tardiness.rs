// src/tardiness.rs
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// A late mark as read from the attendance table.
#[derive(Debug, Clone, PartialEq)]
pub struct TardinessMark {
    pub dni: String,
    pub nombre_completo: String,
    pub campana: String,
    pub fecha: NaiveDate,
    pub minutos: u32,
}

/// Severity of a single late arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum TardinessLevel {
    #[serde(rename = "Leve")]
    Leve,
    #[serde(rename = "Moderada")]
    Moderada,
    #[serde(rename = "Grave")]
    Grave,
    #[serde(rename = "Muy grave")]
    MuyGrave,
}

// Upper bound (inclusive) in minutes for each level
const LEVE_MAX_MINUTES: u32 = 5;
const MODERADA_MAX_MINUTES: u32 = 15;
const GRAVE_MAX_MINUTES: u32 = 30;

pub fn level_for_minutes(minutos: u32) -> TardinessLevel {
    match minutos {
        0..=LEVE_MAX_MINUTES => TardinessLevel::Leve,
        m if m <= MODERADA_MAX_MINUTES => TardinessLevel::Moderada,
        m if m <= GRAVE_MAX_MINUTES => TardinessLevel::Grave,
        _ => TardinessLevel::MuyGrave,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TardinessRecord {
    pub fecha: NaiveDate,
    pub minutos: u32,
    pub nivel: TardinessLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TardinessEmployeeRow {
    pub dni: String,
    pub nombre_completo: String,
    #[serde(rename = "NombreCampaña")]
    pub campana: String,
    pub tardanzas: u32,
    pub minutos: u32,
    pub registros: Vec<TardinessRecord>,
}

/// Groups late marks per employee. Rows come out ordered by DNI and each
/// employee's records by date.
pub fn tardiness_rows(marks: &[TardinessMark]) -> Vec<TardinessEmployeeRow> {
    let mut by_employee: BTreeMap<&str, TardinessEmployeeRow> = BTreeMap::new();

    for mark in marks {
        let row = by_employee
            .entry(mark.dni.as_str())
            .or_insert_with(|| TardinessEmployeeRow {
                dni: mark.dni.clone(),
                nombre_completo: mark.nombre_completo.clone(),
                campana: mark.campana.clone(),
                tardanzas: 0,
                minutos: 0,
                registros: Vec::new(),
            });
        row.tardanzas = row.tardanzas.saturating_add(1);
        row.minutos = row.minutos.saturating_add(mark.minutos);
        row.registros.push(TardinessRecord {
            fecha: mark.fecha,
            minutos: mark.minutos,
            nivel: level_for_minutes(mark.minutos),
        });
    }

    by_employee
        .into_values()
        .map(|mut row| {
            row.registros.sort_by_key(|record| record.fecha);
            row
        })
        .collect()
}
