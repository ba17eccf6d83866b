//! Device state store

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

use crate::{
    config::DatabaseConfig,
    errors::YardMonitorError,
    models::{DeviceCode, DeviceView, SpotStatus, StatusReport},
};

/// Persistence boundary for device rows.
///
/// Every write is a single auto-committed statement; no transaction
/// spans the status write and the assignment clear.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

/// Raw snapshot row. `spot_status` stays text here so tokens outside
/// the canonical set survive until the typed mapping.
#[derive(Debug, sqlx::FromRow)]
struct DeviceRow {
    code: String,
    yard: Option<String>,
    spot_status: Option<String>,
    distance: Option<f64>,
    reading_timestamp: Option<DateTime<Utc>>,
    vehicle_plate: Option<String>,
}

impl From<DeviceRow> for DeviceView {
    fn from(row: DeviceRow) -> Self {
        DeviceView {
            code: row.code,
            yard: row.yard,
            status: SpotStatus::parse(row.spot_status.as_deref()),
            distance: row.distance,
            reading_timestamp: row.reading_timestamp,
            vehicle_plate: row.vehicle_plate,
        }
    }
}

impl Database {
    /// Connect to the database and run pending migrations
    pub async fn from_url(config: &DatabaseConfig) -> Result<Self, YardMonitorError> {
        config.validate()?;

        info!("Connecting to database");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await?;

        Self::new(pool).await
    }

    /// Wrap an existing pool, running pending migrations
    pub async fn new(pool: PgPool) -> Result<Self, YardMonitorError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Apply one decoded status report.
    ///
    /// The status write always happens first. Whenever the applied
    /// status is `available` the vehicle assignment is cleared in a
    /// second independent statement, whether or not a vehicle was
    /// assigned. A stale assignment left by an earlier crash heals on
    /// the next `available` report.
    pub async fn process_report(&self, report: StatusReport) -> Result<(), YardMonitorError> {
        let rows = self
            .apply_status_update(&report.device_code, report.status.as_deref(), report.distance)
            .await?;

        if rows == 0 {
            debug!(
                "Device {} is not provisioned, update skipped",
                report.device_code
            );
        }

        if report.is_available() {
            self.clear_vehicle_assignment(&report.device_code).await?;
        }

        info!(
            "Device {} updated: status={}",
            report.device_code,
            report
                .status
                .as_deref()
                .unwrap_or(SpotStatus::Unknown.as_str())
        );

        Ok(())
    }

    /// Set status, distance and reading timestamp for one device row.
    ///
    /// The row is keyed by device code. Zero affected rows means the
    /// code has not been provisioned yet; that is not an error, since
    /// devices are provisioned independently of telemetry arrival.
    pub async fn apply_status_update(
        &self,
        device: &DeviceCode,
        status: Option<&str>,
        distance: Option<f64>,
    ) -> Result<u64, YardMonitorError> {
        let result = sqlx::query(
            "UPDATE devices
             SET spot_status = $1, distance = $2, reading_timestamp = now()
             WHERE code = $3",
        )
        .bind(status)
        .bind(distance)
        .bind(device.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Drop the vehicle assignment for one device row. Idempotent.
    pub async fn clear_vehicle_assignment(
        &self,
        device: &DeviceCode,
    ) -> Result<u64, YardMonitorError> {
        let result = sqlx::query("UPDATE devices SET motorcycle_id = NULL WHERE code = $1")
            .bind(device.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Current state of all devices for display, optionally filtered to
    /// one yard.
    ///
    /// Ordering is stable across calls with unchanged data: yard name
    /// first, then device code.
    pub async fn fetch_snapshot(
        &self,
        yard: Option<&str>,
    ) -> Result<Vec<DeviceView>, YardMonitorError> {
        let rows = sqlx::query_as::<_, DeviceRow>(
            "SELECT d.code,
                    y.name AS yard,
                    d.spot_status,
                    d.distance,
                    d.reading_timestamp,
                    m.license AS vehicle_plate
             FROM devices d
             LEFT JOIN yards y ON d.id_yard = y.id
             LEFT JOIN motorcycles m ON d.motorcycle_id = m.id
             WHERE $1::text IS NULL OR y.name = $1
             ORDER BY y.name, d.code",
        )
        .bind(yard)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DeviceView::from).collect())
    }
}
