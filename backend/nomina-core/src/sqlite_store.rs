// src/sqlite_store.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, info};

use crate::attendance::AttendanceRow;
use crate::payroll::{PaymentConcept, PayrollSource};
use crate::store::{
    month_bounds, Employee, EmployeeStatus, NewScheduleException, NominaStore, ScheduleException,
    StoreError, StoreResult,
};
use crate::tardiness::TardinessMark;

const MONEY_SCALE: u32 = 2;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS campanas (
    id INTEGER PRIMARY KEY,
    nombre TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS cargos (
    id INTEGER PRIMARY KEY,
    nombre TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS horarios (
    id INTEGER PRIMARY KEY,
    nombre TEXT NOT NULL,
    hora_entrada TEXT NOT NULL,
    hora_salida TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS empleados (
    dni TEXT PRIMARY KEY,
    nombres TEXT NOT NULL,
    apellido_paterno TEXT NOT NULL,
    apellido_materno TEXT NOT NULL DEFAULT '',
    fecha_ingreso TEXT NOT NULL,
    fecha_cese TEXT,
    estado TEXT NOT NULL DEFAULT 'ACTIVO'
        CHECK (estado IN ('ACTIVO', 'CESADO', 'SUSPENDIDO', 'VACACIONES')),
    campana_id INTEGER REFERENCES campanas(id),
    cargo_id INTEGER REFERENCES cargos(id),
    horario_id INTEGER REFERENCES horarios(id),
    supervisor_dni TEXT,
    coordinador_dni TEXT,
    jefe_dni TEXT,
    sueldo_base_centimos INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS marcas_asistencia (
    dni TEXT NOT NULL REFERENCES empleados(dni),
    fecha TEXT NOT NULL,
    codigo TEXT NOT NULL,
    minutos_tardanza INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (dni, fecha)
);

CREATE TABLE IF NOT EXISTS conceptos_pago (
    id INTEGER PRIMARY KEY,
    dni TEXT NOT NULL REFERENCES empleados(dni),
    anio INTEGER NOT NULL,
    mes INTEGER NOT NULL,
    nombre TEXT NOT NULL,
    monto_centimos INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS excepciones_horario (
    id INTEGER PRIMARY KEY,
    dni TEXT NOT NULL REFERENCES empleados(dni),
    fecha TEXT NOT NULL,
    horario_id INTEGER REFERENCES horarios(id),
    es_descanso INTEGER NOT NULL DEFAULT 0,
    motivo TEXT NOT NULL,
    creado_en TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (dni, fecha)
);

CREATE INDEX IF NOT EXISTS idx_marcas_fecha ON marcas_asistencia (fecha);
CREATE INDEX IF NOT EXISTS idx_conceptos_periodo ON conceptos_pago (anio, mes);
"#;

// Full name as the legacy procedures build it
const FULL_NAME_SQL: &str =
    "TRIM(e.nombres || ' ' || e.apellido_paterno || ' ' || e.apellido_materno)";

// Employed at some point between ?1 (first day) and ?2 (last day)
const ACTIVE_IN_PERIOD_SQL: &str =
    "e.fecha_ingreso <= ?2 AND (e.fecha_cese IS NULL OR e.fecha_cese >= ?1)";

fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::new(cents, MONEY_SCALE)
}

fn invalid_period(year: i32, month: u32) -> StoreError {
    StoreError::Database(sqlx::Error::Protocol(format!(
        "invalid period {}-{:02}",
        year, month
    )))
}

// --- Row Records ---

#[derive(Debug, FromRow)]
struct EmployeeIdentityRecord {
    #[sqlx(rename = "DNI")]
    dni: String,
    #[sqlx(rename = "NombreCompleto")]
    nombre_completo: String,
    #[sqlx(rename = "Campaña")]
    campana: String,
}

#[derive(Debug, FromRow)]
struct MarkRecord {
    dni: String,
    fecha: NaiveDate,
    codigo: String,
}

#[derive(Debug, FromRow)]
struct PayrollSourceRecord {
    #[sqlx(rename = "DNI")]
    dni: String,
    #[sqlx(rename = "NombreCompleto")]
    nombre_completo: String,
    #[sqlx(rename = "Campaña")]
    campana: String,
    #[sqlx(rename = "Cargo")]
    cargo: String,
    #[sqlx(rename = "FechaIngreso")]
    fecha_ingreso: NaiveDate,
    #[sqlx(rename = "SueldoBaseMensual")]
    sueldo_base_centimos: i64,
}

impl From<PayrollSourceRecord> for PayrollSource {
    fn from(record: PayrollSourceRecord) -> Self {
        PayrollSource {
            dni: record.dni,
            nombre_completo: record.nombre_completo,
            campana: record.campana,
            cargo: record.cargo,
            fecha_ingreso: record.fecha_ingreso,
            sueldo_base: cents_to_decimal(record.sueldo_base_centimos),
        }
    }
}

#[derive(Debug, FromRow)]
struct ConceptRecord {
    dni: String,
    nombre: String,
    monto_centimos: i64,
}

#[derive(Debug, FromRow)]
struct TardinessRecordRow {
    dni: String,
    nombre_completo: String,
    campana: String,
    fecha: NaiveDate,
    minutos_tardanza: i64,
}

#[derive(Debug, FromRow)]
struct EmployeeRecord {
    dni: String,
    nombres: String,
    apellido_paterno: String,
    apellido_materno: String,
    fecha_ingreso: NaiveDate,
    fecha_cese: Option<NaiveDate>,
    estado: String,
    campana: Option<String>,
    cargo: Option<String>,
    horario: Option<String>,
    sueldo_base_centimos: i64,
}

impl TryFrom<EmployeeRecord> for Employee {
    type Error = StoreError;

    fn try_from(record: EmployeeRecord) -> Result<Self, Self::Error> {
        let estado = EmployeeStatus::from_str(&record.estado)
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?;
        Ok(Employee {
            dni: record.dni,
            nombres: record.nombres,
            apellido_paterno: record.apellido_paterno,
            apellido_materno: record.apellido_materno,
            fecha_ingreso: record.fecha_ingreso,
            fecha_cese: record.fecha_cese,
            estado,
            campana: record.campana,
            cargo: record.cargo,
            horario: record.horario,
            sueldo_base: cents_to_decimal(record.sueldo_base_centimos),
        })
    }
}

// --- SQLite Store ---

/// `NominaStore` over a bounded SQLite pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        info!(
            "Connected to {} (max {} connections)",
            database_url, max_connections
        );
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates missing tables. Safe to run on every start.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        info!("Database schema ready");
        Ok(())
    }
}

#[async_trait]
impl NominaStore for SqliteStore {
    async fn attendance_matrix(
        &self,
        year: i32,
        month: u32,
        campana: Option<&str>,
    ) -> StoreResult<Vec<AttendanceRow>> {
        let (first, last) = month_bounds(year, month).ok_or_else(|| invalid_period(year, month))?;

        let employees = sqlx::query_as::<_, EmployeeIdentityRecord>(&format!(
            "SELECT e.dni AS \"DNI\", {} AS \"NombreCompleto\", COALESCE(c.nombre, '') AS \"Campaña\"
             FROM empleados e
             LEFT JOIN campanas c ON c.id = e.campana_id
             WHERE {} AND (?3 IS NULL OR c.nombre = ?3)
             ORDER BY e.dni",
            FULL_NAME_SQL, ACTIVE_IN_PERIOD_SQL
        ))
        .bind(first)
        .bind(last)
        .bind(campana)
        .fetch_all(&self.pool)
        .await?;

        let marks = sqlx::query_as::<_, MarkRecord>(
            "SELECT dni, fecha, codigo FROM marcas_asistencia
             WHERE fecha >= ?1 AND fecha <= ?2
             ORDER BY dni, fecha",
        )
        .bind(first)
        .bind(last)
        .fetch_all(&self.pool)
        .await?;

        // Pivot sparse marks into one wide row per employee
        let mut rows: BTreeMap<String, AttendanceRow> = employees
            .into_iter()
            .map(|e| {
                let row = AttendanceRow::new(&e.dni, &e.nombre_completo, &e.campana);
                (e.dni, row)
            })
            .collect();
        for mark in marks {
            if let Some(row) = rows.get_mut(&mark.dni) {
                row.mark(mark.fecha, &mark.codigo);
            }
        }

        debug!(
            "Attendance matrix {}-{:02}: {} employees",
            year,
            month,
            rows.len()
        );
        Ok(rows.into_values().collect())
    }

    async fn payroll_sources(&self, year: i32, month: u32) -> StoreResult<Vec<PayrollSource>> {
        let (first, last) = month_bounds(year, month).ok_or_else(|| invalid_period(year, month))?;

        let records = sqlx::query_as::<_, PayrollSourceRecord>(&format!(
            "SELECT e.dni AS \"DNI\",
                    {} AS \"NombreCompleto\",
                    COALESCE(c.nombre, '') AS \"Campaña\",
                    COALESCE(r.nombre, '') AS \"Cargo\",
                    e.fecha_ingreso AS \"FechaIngreso\",
                    e.sueldo_base_centimos AS \"SueldoBaseMensual\"
             FROM empleados e
             LEFT JOIN campanas c ON c.id = e.campana_id
             LEFT JOIN cargos r ON r.id = e.cargo_id
             WHERE {}
             ORDER BY e.dni",
            FULL_NAME_SQL, ACTIVE_IN_PERIOD_SQL
        ))
        .bind(first)
        .bind(last)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(PayrollSource::from).collect())
    }

    async fn payment_concepts(&self, year: i32, month: u32) -> StoreResult<Vec<PaymentConcept>> {
        let records = sqlx::query_as::<_, ConceptRecord>(
            "SELECT dni, nombre, monto_centimos FROM conceptos_pago
             WHERE anio = ? AND mes = ?
             ORDER BY dni, id",
        )
        .bind(year)
        .bind(month)
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(|r| PaymentConcept {
                dni: r.dni,
                nombre: r.nombre,
                monto: cents_to_decimal(r.monto_centimos),
            })
            .collect())
    }

    async fn tardiness_marks(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<TardinessMark>> {
        let records = sqlx::query_as::<_, TardinessRecordRow>(&format!(
            "SELECT m.dni, {} AS nombre_completo, COALESCE(c.nombre, '') AS campana,
                    m.fecha, m.minutos_tardanza
             FROM marcas_asistencia m
             JOIN empleados e ON e.dni = m.dni
             LEFT JOIN campanas c ON c.id = e.campana_id
             WHERE UPPER(TRIM(m.codigo)) = 'T' AND m.fecha >= ? AND m.fecha <= ?
             ORDER BY m.dni, m.fecha",
            FULL_NAME_SQL
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(|r| TardinessMark {
                dni: r.dni,
                nombre_completo: r.nombre_completo,
                campana: r.campana,
                fecha: r.fecha,
                minutos: u32::try_from(r.minutos_tardanza.max(0)).unwrap_or(u32::MAX),
            })
            .collect())
    }

    async fn employee(&self, dni: &str) -> StoreResult<Option<Employee>> {
        let record = sqlx::query_as::<_, EmployeeRecord>(
            "SELECT e.dni, e.nombres, e.apellido_paterno, e.apellido_materno,
                    e.fecha_ingreso, e.fecha_cese, e.estado,
                    c.nombre AS campana, r.nombre AS cargo, h.nombre AS horario,
                    e.sueldo_base_centimos
             FROM empleados e
             LEFT JOIN campanas c ON c.id = e.campana_id
             LEFT JOIN cargos r ON r.id = e.cargo_id
             LEFT JOIN horarios h ON h.id = e.horario_id
             WHERE e.dni = ?",
        )
        .bind(dni)
        .fetch_optional(&self.pool)
        .await?;

        record.map(Employee::try_from).transpose()
    }

    async fn set_employee_status(
        &self,
        dni: &str,
        estado: EmployeeStatus,
        fecha_cese: Option<NaiveDate>,
    ) -> StoreResult<()> {
        let result = sqlx::query("UPDATE empleados SET estado = ?, fecha_cese = ? WHERE dni = ?")
            .bind(estado.as_str())
            .bind(fecha_cese)
            .bind(dni)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Empleado {} no encontrado", dni)));
        }
        Ok(())
    }

    async fn schedule_exists(&self, id: i64) -> StoreResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM horarios WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn insert_exceptions(
        &self,
        exceptions: &[NewScheduleException],
    ) -> StoreResult<Vec<ScheduleException>> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(exceptions.len());

        for exception in exceptions {
            let result = sqlx::query_as::<_, ScheduleException>(
                "INSERT INTO excepciones_horario (dni, fecha, horario_id, es_descanso, motivo)
                 VALUES (?, ?, ?, ?, ?)
                 RETURNING id, dni, fecha, horario_id, es_descanso, motivo, creado_en",
            )
            .bind(&exception.dni)
            .bind(exception.fecha)
            .bind(exception.horario_id)
            .bind(exception.es_descanso)
            .bind(&exception.motivo)
            .fetch_one(&mut *tx)
            .await;

            match result {
                Ok(row) => inserted.push(row),
                Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                    // Dropping the transaction rolls back the rows already inserted
                    return Err(StoreError::Conflict(format!(
                        "Ya existe una excepción de horario para el DNI {} en la fecha {}",
                        exception.dni,
                        exception.fecha.format("%d/%m/%Y")
                    )));
                }
                Err(e) => return Err(e.into()),
            }
        }

        tx.commit().await?;
        debug!("Inserted {} schedule exceptions", inserted.len());
        Ok(inserted)
    }

    async fn exceptions_for(&self, dni: &str) -> StoreResult<Vec<ScheduleException>> {
        let rows = sqlx::query_as::<_, ScheduleException>(
            "SELECT id, dni, fecha, horario_id, es_descanso, motivo, creado_en
             FROM excepciones_horario WHERE dni = ? ORDER BY fecha",
        )
        .bind(dni)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete_exception(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM excepciones_horario WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "Excepción de horario {} no encontrada",
                id
            )));
        }
        Ok(())
    }
}
