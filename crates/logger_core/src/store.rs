//! Persistência das leituras em SQLite.
//!
//! Uma única conexão ([`Database`]) é compartilhada pelos dois gateways
//! atrás de um `Mutex`; cada tipo de dispositivo grava na sua própria tabela:
//!
//! - `fridge_readings`   – [`FridgeStore`]
//! - `mushroom_readings` – [`MushroomStore`]
//!
//! Valores `f32` são gravados como `REAL` (f64), o que preserva o valor exato
//! na volta.

use crate::types::{EnclosureReading, FridgeReading, StoredEnclosureReading, StoredFridgeReading};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS fridge_readings (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    received_at      INTEGER NOT NULL,
    temperature      REAL    NOT NULL,
    humidity         REAL    NOT NULL,
    pressure         REAL    NOT NULL,
    compressor_on    INTEGER NOT NULL,
    goal_temperature REAL    NOT NULL
);
CREATE TABLE IF NOT EXISTS mushroom_readings (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    received_at        INTEGER NOT NULL,
    temperature        REAL    NOT NULL,
    humidity           REAL    NOT NULL,
    light_on           INTEGER NOT NULL,
    humidifier_on      INTEGER NOT NULL,
    intake_fan_on      INTEGER NOT NULL,
    circulation_fan_on INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_fridge_time   ON fridge_readings(received_at DESC);
CREATE INDEX IF NOT EXISTS idx_mushroom_time ON mushroom_readings(received_at DESC);
";

/// Erros de armazenamento.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Erro SQLite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Conexão com o banco inutilizada (thread em pânico segurava o lock)")]
    Poisoned,
}

/// Gateway de persistência de um tipo de leitura.
///
/// Uma falha é devolvida ao chamador sem retry.
pub trait PersistenceGateway: Send {
    type Reading;

    fn store(&self, reading: &Self::Reading) -> Result<(), StoreError>;
}

// ──────────────────────────────────────────────
// Conexão
// ──────────────────────────────────────────────

/// Conexão SQLite compartilhada. `Clone` só duplica o `Arc`.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Abre (ou cria) o banco em `path` e garante o schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    /// Banco em memória (testes).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    pub fn fridge_store(&self) -> FridgeStore {
        FridgeStore { db: self.clone() }
    }

    pub fn mushroom_store(&self) -> MushroomStore {
        MushroomStore { db: self.clone() }
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn count_rows(db: &Database, table: &str) -> Result<u64, StoreError> {
    let conn = db.lock()?;
    let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(n.max(0) as u64)
}

// ──────────────────────────────────────────────
// Geladeira
// ──────────────────────────────────────────────

/// Gateway da tabela `fridge_readings`.
#[derive(Clone)]
pub struct FridgeStore {
    db: Database,
}

impl FridgeStore {
    /// Últimas `limit` leituras, da mais nova para a mais antiga.
    pub fn recent(&self, limit: usize) -> Result<Vec<StoredFridgeReading>, StoreError> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, received_at, temperature, humidity, pressure, compressor_on, goal_temperature
             FROM fridge_readings ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(StoredFridgeReading {
                id: row.get(0)?,
                received_at: row.get::<_, i64>(1)?.max(0) as u64,
                reading: FridgeReading {
                    temperature: row.get::<_, f64>(2)? as f32,
                    humidity: row.get::<_, f64>(3)? as f32,
                    pressure: row.get::<_, f64>(4)? as f32,
                    compressor_on: row.get(5)?,
                    goal_temperature: row.get::<_, f64>(6)? as f32,
                },
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn count(&self) -> Result<u64, StoreError> {
        count_rows(&self.db, "fridge_readings")
    }
}

impl PersistenceGateway for FridgeStore {
    type Reading = FridgeReading;

    fn store(&self, r: &FridgeReading) -> Result<(), StoreError> {
        let conn = self.db.lock()?;
        conn.prepare_cached(
            "INSERT INTO fridge_readings
                (received_at, temperature, humidity, pressure, compressor_on, goal_temperature)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?
        .execute(params![
            now_millis(),
            f64::from(r.temperature),
            f64::from(r.humidity),
            f64::from(r.pressure),
            r.compressor_on,
            f64::from(r.goal_temperature),
        ])?;
        Ok(())
    }
}

// ──────────────────────────────────────────────
// Estufa de cogumelos
// ──────────────────────────────────────────────

/// Gateway da tabela `mushroom_readings`.
#[derive(Clone)]
pub struct MushroomStore {
    db: Database,
}

impl MushroomStore {
    /// Últimas `limit` leituras, da mais nova para a mais antiga.
    pub fn recent(&self, limit: usize) -> Result<Vec<StoredEnclosureReading>, StoreError> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, received_at, temperature, humidity,
                    light_on, humidifier_on, intake_fan_on, circulation_fan_on
             FROM mushroom_readings ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(StoredEnclosureReading {
                id: row.get(0)?,
                received_at: row.get::<_, i64>(1)?.max(0) as u64,
                reading: EnclosureReading {
                    temperature: row.get::<_, f64>(2)? as f32,
                    humidity: row.get::<_, f64>(3)? as f32,
                    light_on: row.get(4)?,
                    humidifier_on: row.get(5)?,
                    intake_fan_on: row.get(6)?,
                    circulation_fan_on: row.get(7)?,
                },
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn count(&self) -> Result<u64, StoreError> {
        count_rows(&self.db, "mushroom_readings")
    }
}

impl PersistenceGateway for MushroomStore {
    type Reading = EnclosureReading;

    fn store(&self, r: &EnclosureReading) -> Result<(), StoreError> {
        let conn = self.db.lock()?;
        conn.prepare_cached(
            "INSERT INTO mushroom_readings
                (received_at, temperature, humidity,
                 light_on, humidifier_on, intake_fan_on, circulation_fan_on)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?
        .execute(params![
            now_millis(),
            f64::from(r.temperature),
            f64::from(r.humidity),
            r.light_on,
            r.humidifier_on,
            r.intake_fan_on,
            r.circulation_fan_on,
        ])?;
        Ok(())
    }
}
