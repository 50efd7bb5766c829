// src/areas.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level grouping of campaigns used by every payroll and tardiness rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Area {
    #[serde(rename = "OUTBOUND")]
    Outbound,
    #[serde(rename = "INBOUND")]
    Inbound,
    #[serde(rename = "STAFF")]
    Staff,
    #[serde(rename = "OTROS")]
    Otros,
}

impl Area {
    pub fn label(&self) -> &'static str {
        match self {
            Area::Outbound => "OUTBOUND",
            Area::Inbound => "INBOUND",
            Area::Staff => "STAFF",
            Area::Otros => "OTROS",
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// --- Campaign Allowlists ---
// Order matters: the tolerant resolver walks areas in this order.

static AREA_CAMPAIGNS: [(Area, &[&str]); 3] = [
    (
        Area::Outbound,
        &[
            "MIGRACION",
            "PORTABILIDAD",
            "ALTAS NUEVAS",
            "RENOVACIONES",
            "COBRANZAS",
            "VENTAS HOGAR",
        ],
    ),
    (
        Area::Inbound,
        &[
            "ATENCION AL CLIENTE",
            "SOPORTE TECNICO",
            "RETENCIONES",
            "RECLAMOS",
            "MESA DE AYUDA",
        ],
    ),
    (
        Area::Staff,
        &[
            "ADMINISTRACION",
            "RECURSOS HUMANOS",
            "SISTEMAS",
            "CALIDAD",
            "CAPACITACION",
            "PLANEAMIENTO",
        ],
    ),
];

const MIN_KEYWORD_LEN: usize = 4;

/// Exact, case-sensitive allowlist lookup. Used by the payroll rollup.
pub fn resolve_strict(campaign: &str) -> Area {
    AREA_CAMPAIGNS
        .iter()
        .find(|(_, campaigns)| campaigns.contains(&campaign))
        .map(|(area, _)| *area)
        .unwrap_or(Area::Otros)
}

/// Lookup used by the tardiness rollup: exact match, then case-insensitive,
/// then any shared keyword before giving up to [`Area::Otros`].
pub fn resolve_tolerant(campaign: &str) -> Area {
    let strict = resolve_strict(campaign);
    if strict != Area::Otros {
        return strict;
    }

    let normalized = campaign.trim().to_uppercase();
    if normalized.is_empty() {
        return Area::Otros;
    }
    if let Some((area, _)) = AREA_CAMPAIGNS
        .iter()
        .find(|(_, campaigns)| campaigns.iter().any(|c| *c == normalized))
    {
        return *area;
    }

    let words = keywords(&normalized);
    AREA_CAMPAIGNS
        .iter()
        .find(|(_, campaigns)| {
            campaigns
                .iter()
                .any(|c| keywords(c).iter().any(|kw| words.contains(kw)))
        })
        .map(|(area, _)| *area)
        .unwrap_or(Area::Otros)
}

fn keywords(name: &str) -> Vec<String> {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() >= MIN_KEYWORD_LEN)
        .map(|word| word.to_uppercase())
        .collect()
}
