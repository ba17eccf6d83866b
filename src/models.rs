//! Data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::YardMonitorError;

/// Stable identifier of one parking-spot sensor device.
///
/// The code doubles as the row key in the `devices` table and as the
/// suffix of the per-device command topic. It must be non-blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceCode(String);

impl TryFrom<&str> for DeviceCode {
    type Error = YardMonitorError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(YardMonitorError::InvalidDeviceCode(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl DeviceCode {
    /// Get the raw device code
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Occupancy state of a monitored parking spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpotStatus {
    Available,
    Occupied,
    #[default]
    Unknown,
}

impl SpotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpotStatus::Available => "available",
            SpotStatus::Occupied => "occupied",
            SpotStatus::Unknown => "unknown",
        }
    }

    /// Map a stored status token to the typed state.
    ///
    /// Devices may report tokens outside the canonical set; anything
    /// unrecognized (or absent) reads as `Unknown`.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("available") => SpotStatus::Available,
            Some("occupied") => SpotStatus::Occupied,
            _ => SpotStatus::Unknown,
        }
    }
}

/// Wire form of one status message.
///
/// Device firmware reports the sensor distance under the `distancia`
/// field. Every field is optional at this layer; what is mandatory is
/// decided in [`StatusReport::decode`].
#[derive(Debug, Deserialize)]
struct RawStatusReport {
    #[serde(default)]
    device_code: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, rename = "distancia")]
    distance: Option<f64>,
}

/// One decoded telemetry message.
///
/// Constructed on message arrival, consumed immediately by the store
/// transition, then discarded. Never buffered or retried.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub device_code: DeviceCode,
    /// Raw status token as reported. The store is the final authority
    /// on legal values, so unknown tokens pass through unchanged.
    pub status: Option<String>,
    pub distance: Option<f64>,
}

impl StatusReport {
    /// Decode a raw status payload.
    ///
    /// Malformed JSON yields [`YardMonitorError::DecodeError`]; a
    /// syntactically valid payload without a device code is rejected
    /// separately with [`YardMonitorError::MissingDeviceCode`].
    pub fn decode(payload: &[u8]) -> Result<Self, YardMonitorError> {
        let raw: RawStatusReport = serde_json::from_slice(payload)?;

        let device_code = match raw.device_code.as_deref() {
            Some(code) if !code.trim().is_empty() => DeviceCode::try_from(code)?,
            _ => return Err(YardMonitorError::MissingDeviceCode),
        };

        Ok(Self {
            device_code,
            status: raw.status,
            distance: raw.distance,
        })
    }

    /// Whether the reported status marks the spot as free.
    pub fn is_available(&self) -> bool {
        self.status.as_deref() == Some(SpotStatus::Available.as_str())
    }
}

/// Read-side projection of one device row joined with its yard and
/// assigned vehicle, as consumed by the display collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceView {
    pub code: String,
    pub yard: Option<String>,
    pub status: SpotStatus,
    pub distance: Option<f64>,
    pub reading_timestamp: Option<DateTime<Utc>>,
    pub vehicle_plate: Option<String>,
}

/// Occupancy counts over one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub total: usize,
    pub available: usize,
    pub occupied: usize,
}

impl SnapshotSummary {
    pub fn of(views: &[DeviceView]) -> Self {
        let available = views
            .iter()
            .filter(|v| v.status == SpotStatus::Available)
            .count();
        let occupied = views
            .iter()
            .filter(|v| v.status == SpotStatus::Occupied)
            .count();

        Self {
            total: views.len(),
            available,
            occupied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_status_report() {
        let payload = br#"{"device_code": "S1", "status": "occupied", "distancia": 12.4}"#;

        let report = StatusReport::decode(payload).unwrap();

        assert_eq!(report.device_code.as_str(), "S1");
        assert_eq!(report.status.as_deref(), Some("occupied"));
        assert_eq!(report.distance, Some(12.4));
        assert!(!report.is_available());
    }

    #[test]
    fn decode_report_without_distance() {
        let payload = br#"{"device_code": "S2", "status": "available"}"#;

        let report = StatusReport::decode(payload).unwrap();

        assert_eq!(report.distance, None);
        assert!(report.is_available());
    }

    #[test]
    fn decode_passes_unknown_status_through() {
        let payload = br#"{"device_code": "S3", "status": "mystery", "distancia": 5.0}"#;

        let report = StatusReport::decode(payload).unwrap();

        assert_eq!(report.status.as_deref(), Some("mystery"));
        assert!(!report.is_available());
    }

    #[test]
    fn decode_rejects_missing_device_code() {
        let payload = br#"{"status": "occupied", "distancia": 12.4}"#;

        let result = StatusReport::decode(payload);

        assert!(matches!(result, Err(YardMonitorError::MissingDeviceCode)));
    }

    #[test]
    fn decode_rejects_blank_device_code() {
        let payload = br#"{"device_code": "   ", "status": "occupied"}"#;

        let result = StatusReport::decode(payload);

        assert!(matches!(result, Err(YardMonitorError::MissingDeviceCode)));
    }

    #[test]
    fn decode_rejects_malformed_payload() {
        let result = StatusReport::decode(b"{not valid json");

        assert!(matches!(result, Err(YardMonitorError::DecodeError(_))));
    }

    #[test]
    fn spot_status_falls_back_to_unknown() {
        assert_eq!(SpotStatus::parse(Some("available")), SpotStatus::Available);
        assert_eq!(SpotStatus::parse(Some("occupied")), SpotStatus::Occupied);
        assert_eq!(SpotStatus::parse(Some("mystery")), SpotStatus::Unknown);
        assert_eq!(SpotStatus::parse(None), SpotStatus::Unknown);
    }

    #[test]
    fn device_code_rejects_blank_input() {
        assert!(DeviceCode::try_from("").is_err());
        assert!(DeviceCode::try_from("   ").is_err());
        assert_eq!(DeviceCode::try_from(" S1 ").unwrap().as_str(), "S1");
    }

    #[test]
    fn snapshot_summary_counts() {
        let view = |code: &str, status: SpotStatus| DeviceView {
            code: code.to_string(),
            yard: None,
            status,
            distance: None,
            reading_timestamp: None,
            vehicle_plate: None,
        };
        let views = vec![
            view("S1", SpotStatus::Occupied),
            view("S2", SpotStatus::Available),
            view("S3", SpotStatus::Available),
            view("S4", SpotStatus::Unknown),
        ];

        let summary = SnapshotSummary::of(&views);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.available, 2);
        assert_eq!(summary.occupied, 1);
    }
}
