// src/config.rs
use clap::Parser;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

//=============================================================================
// Configuration
//=============================================================================

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    // Database
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,

    // Server
    #[serde(default = "default_host")]
    pub server_host: String,
    #[serde(default = "default_port")]
    pub server_port: u16,
    #[serde(default = "default_report_timeout")]
    pub report_timeout_secs: u64,

    // Optional bearer token for /api routes
    #[serde(default)]
    pub api_token: Option<String>,

    // TLS, enabled only when both are set
    #[serde(default)]
    pub cert_path: Option<PathBuf>,
    #[serde(default)]
    pub key_path: Option<PathBuf>,
}

fn default_database_url() -> String {
    "sqlite://nomina.db".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_report_timeout() -> u64 {
    120
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            db_max_connections: default_max_connections(),
            server_host: default_host(),
            server_port: default_port(),
            report_timeout_secs: default_report_timeout(),
            api_token: None,
            cert_path: None,
            key_path: None,
        }
    }
}

/// Command line overrides for the environment configuration.
#[derive(Debug, Parser, Default)]
#[command(name = "nomina-core", about = "Attendance and payroll reporting service")]
pub struct Args {
    /// SQLite connection string, e.g. sqlite://nomina.db
    #[arg(long)]
    pub database_url: Option<String>,
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub port: Option<u16>,
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        envy::from_env::<Config>()
    }

    #[cfg(test)]
    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars)
    }

    pub fn with_args(mut self, args: Args) -> Self {
        if let Some(url) = args.database_url {
            self.database_url = url;
        }
        if let Some(host) = args.host {
            self.server_host = host;
        }
        if let Some(port) = args.port {
            self.server_port = port;
        }
        self
    }

    /// Empty tokens count as unset.
    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server_host, self.server_port).parse()
    }

    pub fn report_timeout(&self) -> Duration {
        Duration::from_secs(self.report_timeout_secs)
    }

    pub fn tls_paths(&self) -> Option<(&PathBuf, &PathBuf)> {
        match (&self.cert_path, &self.key_path) {
            (Some(cert), Some(key)) => Some((cert, key)),
            _ => None,
        }
    }
}
