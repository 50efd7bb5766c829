// src/session.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const SESSION_FILE_NAME: &str = "session.json";
const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session file I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("Session file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Filters {
    pub anio: Option<i32>,
    pub mes: Option<u32>,
    pub campana: Option<String>,
}

/// State the client keeps between invocations: last filters, page position,
/// expanded areas, the last report received and the API token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientSession {
    pub token: Option<String>,
    pub filters: Filters,
    pub pagina: usize,
    pub tamano_pagina: usize,
    pub expanded_areas: BTreeSet<String>,
    pub last_report: Option<serde_json::Value>,
}

impl Default for ClientSession {
    fn default() -> Self {
        Self {
            token: None,
            filters: Filters::default(),
            pagina: 1,
            tamano_pagina: DEFAULT_PAGE_SIZE,
            expanded_areas: BTreeSet::new(),
            last_report: None,
        }
    }
}

impl ClientSession {
    /// `<config dir>/nomina/session.json`, or the working directory when there is no config dir.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("nomina"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(SESSION_FILE_NAME)
    }

    /// A missing file is an empty session.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Merges the flags given on this run into the saved filters. Omitted flags keep
    /// the previous value. Changing the period or campaign goes back to page 1.
    pub fn apply_filters(&mut self, anio: Option<i32>, mes: Option<u32>, campana: Option<String>) {
        let previous = self.filters.clone();
        if anio.is_some() {
            self.filters.anio = anio;
        }
        if mes.is_some() {
            self.filters.mes = mes;
        }
        if campana.is_some() {
            self.filters.campana = campana.filter(|c| !c.trim().is_empty());
        }
        if self.filters != previous {
            self.pagina = 1;
        }
    }

    pub fn apply_page(&mut self, pagina: Option<usize>, tamano_pagina: Option<usize>) {
        if let Some(size) = tamano_pagina {
            if size != self.tamano_pagina {
                self.tamano_pagina = size;
                self.pagina = 1;
            }
        }
        if let Some(page) = pagina {
            self.pagina = page;
        }
    }

    /// Expands the area when collapsed and collapses it when expanded.
    pub fn toggle_area(&mut self, area: &str) -> bool {
        let area = area.trim().to_uppercase();
        if self.expanded_areas.remove(&area) {
            false
        } else {
            self.expanded_areas.insert(area);
            true
        }
    }

    /// A rejected token invalidates everything loaded with it.
    pub fn on_unauthorized(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_loads_default_session() {
        let dir = tempdir().unwrap();
        let session = ClientSession::load(&dir.path().join("none.json")).unwrap();

        assert_eq!(session, ClientSession::default());
        assert_eq!(session.tamano_pagina, 10);
    }

    #[test]
    fn test_save_and_load_keeps_filters_and_areas() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let mut session = ClientSession::default();
        session.apply_filters(Some(2025), Some(1), Some("MIGRACION".to_string()));
        session.toggle_area("outbound");
        session.token = Some("secreto".to_string());
        session.last_report = Some(serde_json::json!({ "totalGeneral": 1500.0 }));
        session.save(&path).unwrap();

        let loaded = ClientSession::load(&path).unwrap();
        assert_eq!(loaded, session);
        assert!(loaded.expanded_areas.contains("OUTBOUND"));
    }

    #[test]
    fn test_omitted_flags_resume_saved_filters() {
        let mut session = ClientSession::default();
        session.apply_filters(Some(2025), Some(3), None);
        session.apply_page(Some(4), None);

        session.apply_filters(None, None, None);
        assert_eq!(session.filters.anio, Some(2025));
        assert_eq!(session.filters.mes, Some(3));
        assert_eq!(session.pagina, 4, "same filters keep the page");

        session.apply_filters(None, Some(4), None);
        assert_eq!(session.pagina, 1, "a new period starts at page 1");
    }

    #[test]
    fn test_changing_page_size_resets_page() {
        let mut session = ClientSession::default();
        session.apply_page(Some(3), None);
        session.apply_page(None, Some(50));

        assert_eq!(session.pagina, 1);
        assert_eq!(session.tamano_pagina, 50);
    }

    #[test]
    fn test_toggle_area_twice_collapses() {
        let mut session = ClientSession::default();

        assert!(session.toggle_area("INBOUND"));
        assert!(!session.toggle_area("inbound"));
        assert!(session.expanded_areas.is_empty());
    }

    #[test]
    fn test_unauthorized_clears_everything() {
        let mut session = ClientSession::default();
        session.token = Some("vencido".to_string());
        session.apply_filters(Some(2024), Some(12), None);

        session.on_unauthorized();

        assert_eq!(session, ClientSession::default());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(ClientSession::load(&path), Err(SessionError::Json(_))));
    }
}
