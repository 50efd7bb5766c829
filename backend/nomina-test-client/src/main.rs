// src/main.rs

mod api;
mod session;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;

use crate::api::{ApiClient, ClientError, DEFAULT_TIMEOUT, REPORT_TIMEOUT};
use crate::session::ClientSession;

#[derive(Debug, Parser)]
#[command(name = "nomina-test-client", about = "Consulta la API de asistencia y nómina")]
struct Cli {
    #[arg(long, env = "NOMINA_URL", default_value = "http://localhost:3000")]
    base_url: String,
    /// Bearer token; saved in the session for later runs
    #[arg(long, env = "NOMINA_TOKEN")]
    token: Option<String>,
    /// Session file (defaults to the user config directory)
    #[arg(long)]
    session: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args, Default)]
struct PeriodArgs {
    #[arg(long)]
    anio: Option<i32>,
    #[arg(long)]
    mes: Option<u32>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Server health check
    Health,
    /// Paged payroll of a period
    Nomina {
        #[command(flatten)]
        periodo: PeriodArgs,
        #[arg(long)]
        pagina: Option<usize>,
        #[arg(long)]
        tamano: Option<usize>,
    },
    /// Payroll totals by area and campaign
    Resumen {
        #[command(flatten)]
        periodo: PeriodArgs,
        /// Expand or collapse an area (OUTBOUND, INBOUND, STAFF, OTROS)
        #[arg(long)]
        area: Vec<String>,
    },
    /// Tardiness by area and campaign
    Tardanzas {
        #[command(flatten)]
        periodo: PeriodArgs,
    },
    /// Classified attendance of a period
    Asistencia {
        #[command(flatten)]
        periodo: PeriodArgs,
        #[arg(long)]
        campana: Option<String>,
        #[arg(long)]
        pagina: Option<usize>,
        #[arg(long)]
        tamano: Option<usize>,
    },
    /// Register a schedule exception for one day or a range
    Excepcion {
        #[arg(long)]
        dni: String,
        #[arg(long)]
        fecha: String,
        #[arg(long)]
        fecha_fin: Option<String>,
        #[arg(long)]
        horario: Option<i64>,
        #[arg(long)]
        descanso: bool,
        #[arg(long)]
        motivo: String,
    },
    /// Forget saved filters, pages and token
    Limpiar,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let session_path = cli.session.clone().unwrap_or_else(ClientSession::default_path);
    let mut session = ClientSession::load(&session_path)
        .with_context(|| format!("Failed to load session from {}", session_path.display()))?;

    if cli.token.is_some() {
        session.token = cli.token.clone();
    }

    let result = run(&cli, &mut session).await;

    if result.as_ref().is_err_and(ClientError::invalidates_session) {
        session.on_unauthorized();
    }
    session
        .save(&session_path)
        .with_context(|| format!("Failed to save session to {}", session_path.display()))?;

    match result {
        Ok(()) => Ok(()),
        Err(ClientError::Api { status, message, errors }) => {
            // Server text is shown as-is
            eprintln!("❌ [{}] {}", status.as_u16(), message);
            for error in errors {
                eprintln!("   - {}", error);
            }
            std::process::exit(1);
        }
        Err(e) => bail!("{}", e),
    }
}

fn period_query(session: &ClientSession) -> Result<Vec<(&'static str, String)>, ClientError> {
    match (session.filters.anio, session.filters.mes) {
        (Some(anio), Some(mes)) => Ok(vec![("anio", anio.to_string()), ("mes", mes.to_string())]),
        _ => Err(ClientError::Api {
            status: reqwest::StatusCode::BAD_REQUEST,
            message: "Indique --anio y --mes (se recuerdan para las siguientes consultas)".to_string(),
            errors: Vec::new(),
        }),
    }
}

fn page_query(session: &ClientSession) -> Vec<(&'static str, String)> {
    vec![
        ("pagina", session.pagina.to_string()),
        ("tamanoPagina", session.tamano_pagina.to_string()),
    ]
}

async fn run(cli: &Cli, session: &mut ClientSession) -> Result<(), ClientError> {
    let client = ApiClient::new(&cli.base_url, session.token.clone())?;

    match &cli.command {
        Command::Health => {
            println!("🔍 {}/health", cli.base_url);
            let data = client.get("/health", &[], DEFAULT_TIMEOUT).await?;
            println!("{}", pretty(&data));
        }
        Command::Nomina { periodo, pagina, tamano } => {
            session.apply_filters(periodo.anio, periodo.mes, None);
            session.apply_page(*pagina, *tamano);
            let mut query = period_query(session)?;
            query.extend(page_query(session));

            let data = client.get("/api/nomina", &query, REPORT_TIMEOUT).await?;
            print_page_header(&data);
            for row in data["items"].as_array().into_iter().flatten() {
                println!(
                    "{:<10} {:<35} {:<22} {:>16}",
                    text(&row["DNI"]),
                    text(&row["NombreCompleto"]),
                    text(&row["NombreCampaña"]),
                    text(&row["TotalPagarFormateado"]),
                );
            }
            session.last_report = Some(data);
        }
        Command::Resumen { periodo, area } => {
            session.apply_filters(periodo.anio, periodo.mes, None);
            for name in area {
                session.toggle_area(name);
            }
            let query = period_query(session)?;

            let data = client.get("/api/nomina/resumen", &query, REPORT_TIMEOUT).await?;
            println!("📊 Nómina {} | Total general: {}", text(&data["periodo"]), text(&data["totalGeneral"]));
            if let Some(areas) = data["areas"].as_object() {
                for (name, bucket) in areas {
                    let expanded = session.expanded_areas.contains(name);
                    println!(
                        "{} {:<10} {:>14} ({}%, {} empleados)",
                        if expanded { "▾" } else { "▸" },
                        name,
                        text(&bucket["total"]),
                        text(&bucket["porcentaje"]),
                        text(&bucket["empleados"]),
                    );
                    if expanded {
                        for (campaign, detail) in bucket["campanas"].as_object().into_iter().flatten() {
                            println!(
                                "    {:<24} {:>14} ({}%)",
                                campaign,
                                text(&detail["total"]),
                                text(&detail["porcentaje"]),
                            );
                        }
                    }
                }
            }
            session.last_report = Some(data);
        }
        Command::Tardanzas { periodo } => {
            session.apply_filters(periodo.anio, periodo.mes, None);
            let query = period_query(session)?;

            let data = client.get("/api/reportes/tardanzas", &query, REPORT_TIMEOUT).await?;
            println!(
                "⏰ Tardanzas {} | {} tardanzas, {} minutos",
                text(&data["periodo"]),
                text(&data["totalTardanzas"]),
                text(&data["totalMinutos"]),
            );
            for (name, bucket) in data["areas"].as_object().into_iter().flatten() {
                println!(
                    "  {:<10} {:>5} tardanzas {:>6} min  [{}]",
                    name,
                    text(&bucket["totalTardanzas"]),
                    text(&bucket["totalMinutos"]),
                    text(&bucket["nivel"]),
                );
            }
            session.last_report = Some(data);
        }
        Command::Asistencia { periodo, campana, pagina, tamano } => {
            session.apply_filters(periodo.anio, periodo.mes, campana.clone());
            session.apply_page(*pagina, *tamano);
            let mut query = period_query(session)?;
            query.extend(page_query(session));
            if let Some(campana) = &session.filters.campana {
                query.push(("campana", campana.clone()));
            }

            let data = client.get("/api/reportes/asistencia", &query, REPORT_TIMEOUT).await?;
            print_page_header(&data);
            for row in data["items"].as_array().into_iter().flatten() {
                println!(
                    "{:<10} {:<35} A:{:>2} T:{:>2} FI:{:>2} FJ:{:>2} D:{:>2} trabajados:{:>2}",
                    text(&row["DNI"]),
                    text(&row["NombreCompleto"]),
                    text(&row["diasAsistidos"]),
                    text(&row["tardanzas"]),
                    text(&row["faltasInjustificadas"]),
                    text(&row["faltasJustificadas"]),
                    text(&row["diasDescanso"]),
                    text(&row["diasTrabajados"]),
                );
            }
            session.last_report = Some(data);
        }
        Command::Excepcion { dni, fecha, fecha_fin, horario, descanso, motivo } => {
            let body = json!({
                "dni": dni,
                "fecha": fecha,
                "fechaFin": fecha_fin,
                "horarioId": horario,
                "descanso": descanso,
                "motivo": motivo,
            });
            let data = client.post("/api/excepciones", &body).await?;
            let count = data.as_array().map(Vec::len).unwrap_or(0);
            println!("✅ {} excepción(es) registradas para {}", count, dni);
        }
        Command::Limpiar => {
            session.clear();
            println!("🧹 Sesión limpiada");
        }
    }

    Ok(())
}

fn print_page_header(data: &Value) {
    println!(
        "📄 {} | página {} de {} ({} registros)",
        text(&data["periodo"]),
        text(&data["pagina"]),
        text(&data["totalPaginas"]),
        text(&data["totalRegistros"]),
    );
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
