use super::{
    AllocationRepository, Dataset, RepositoryError, RepositoryResult, ResourceRepository,
};
use crate::allocation::Allocation;
use crate::curve::{CurveLibrary, DistributionCurve};
use crate::period::AssignmentPeriod;
use crate::resource::Resource;
use rusqlite::{Connection, params};
use serde::de::DeserializeOwned;
use std::sync::{Mutex, MutexGuard};

pub struct SqliteRepository {
    connection: Mutex<Connection>,
}

impl SqliteRepository {
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> RepositoryResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn in_memory() -> RepositoryResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> RepositoryResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS resources (
                id TEXT PRIMARY KEY,
                resource_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS allocations (
                id TEXT PRIMARY KEY,
                resource_id TEXT NOT NULL,
                allocation_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS assignment_periods (
                row_id INTEGER PRIMARY KEY AUTOINCREMENT,
                allocation_id TEXT NOT NULL,
                period_start TEXT NOT NULL,
                period_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS curves (
                name TEXT PRIMARY KEY,
                points_json TEXT NOT NULL
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| RepositoryError::InvalidData("sqlite connection mutex poisoned".into()))
    }

    /// Replaces the stored dataset in a single transaction.
    pub fn save_dataset(&self, dataset: &Dataset) -> RepositoryResult<()> {
        dataset.validate()?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM resources", [])?;
        tx.execute("DELETE FROM allocations", [])?;
        tx.execute("DELETE FROM assignment_periods", [])?;
        tx.execute("DELETE FROM curves", [])?;
        {
            let mut stmt = tx.prepare("INSERT INTO resources (id, resource_json) VALUES (?1, ?2)")?;
            for resource in &dataset.resources {
                stmt.execute(params![resource.id, serde_json::to_string(resource)?])?;
            }
            let mut stmt = tx.prepare(
                "INSERT INTO allocations (id, resource_id, allocation_json) VALUES (?1, ?2, ?3)",
            )?;
            for allocation in &dataset.allocations {
                stmt.execute(params![
                    allocation.id,
                    allocation.resource_id,
                    serde_json::to_string(allocation)?
                ])?;
            }
            let mut stmt = tx.prepare(
                "INSERT INTO assignment_periods (allocation_id, period_start, period_json) VALUES (?1, ?2, ?3)",
            )?;
            for period in &dataset.periods {
                stmt.execute(params![
                    period.allocation_id,
                    period.period_start.format("%Y-%m-%d").to_string(),
                    serde_json::to_string(period)?
                ])?;
            }
            let mut stmt = tx.prepare("INSERT INTO curves (name, points_json) VALUES (?1, ?2)")?;
            for (name, curve) in &dataset.curves {
                stmt.execute(params![name, serde_json::to_string(curve)?])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn query_json<T: DeserializeOwned>(&self, sql: &str) -> RepositoryResult<Vec<T>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for json in rows {
            out.push(serde_json::from_str(&json?)?);
        }
        Ok(out)
    }
}

impl ResourceRepository for SqliteRepository {
    fn resources(&self) -> RepositoryResult<Vec<Resource>> {
        self.query_json("SELECT resource_json FROM resources ORDER BY id ASC")
    }
}

impl AllocationRepository for SqliteRepository {
    fn allocations(&self) -> RepositoryResult<Vec<Allocation>> {
        self.query_json("SELECT allocation_json FROM allocations ORDER BY resource_id ASC, id ASC")
    }

    fn assignment_periods(&self) -> RepositoryResult<Vec<AssignmentPeriod>> {
        self.query_json(
            "SELECT period_json FROM assignment_periods ORDER BY period_start ASC, row_id ASC",
        )
    }

    fn curves(&self) -> RepositoryResult<CurveLibrary> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT name, points_json FROM curves ORDER BY name ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut library = CurveLibrary::new();
        for row in rows {
            let (name, json) = row?;
            let curve: DistributionCurve = serde_json::from_str(&json)?;
            library.register(name, curve);
        }
        Ok(library)
    }
}
