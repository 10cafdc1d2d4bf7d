//! Observation normalization
//!
//! Brings reader output into canonical form for one sensor and window.

use contracts::{ContractError, ObservationRecord, SensorSpec, TimeWindow};

/// Wrap a longitude into `[-180, 180)`
pub fn wrap_longitude(longitude: f64) -> f64 {
    let wrapped = (longitude + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Normalize one observation
///
/// Returns `Ok(None)` when the observation lies outside `window`.
///
/// # Errors
/// `SourceData { kind: Corrupt }` for non-finite coordinates or a latitude
/// outside `[-90, 90]`.
pub fn normalize(
    sensor: &SensorSpec,
    window: &TimeWindow,
    mut record: ObservationRecord,
) -> Result<Option<ObservationRecord>, ContractError> {
    if !window.contains(record.timestamp) {
        return Ok(None);
    }

    if !record.latitude.is_finite() || !(-90.0..=90.0).contains(&record.latitude) {
        return Err(ContractError::source_corrupt(
            sensor.id.as_str(),
            *window,
            format!(
                "latitude {} out of range for '{}'",
                record.latitude, record.payload_ref
            ),
        ));
    }
    if !record.longitude.is_finite() {
        return Err(ContractError::source_corrupt(
            sensor.id.as_str(),
            *window,
            format!(
                "non-finite longitude for '{}'",
                record.payload_ref
            ),
        ));
    }

    record.sensor_id = sensor.id.clone();
    record.longitude = wrap_longitude(record.longitude);
    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use contracts::SensorRole;

    fn sensor() -> SensorSpec {
        SensorSpec::parse("bottle-sst", SensorRole::Primary, "2000-01-01", "2000-12-31", "v03.3")
            .unwrap()
    }

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2000, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2000, 4, 1, 0, 0, 0).unwrap(),
        )
    }

    fn record(day: u32, lat: f64, lon: f64) -> ObservationRecord {
        ObservationRecord::new(
            "raw-id",
            Utc.with_ymd_and_hms(2000, 3, day, 6, 0, 0).unwrap(),
            lat,
            lon,
            format!("row-{day}"),
        )
    }

    #[test]
    fn test_wrap_longitude() {
        assert_eq!(wrap_longitude(0.0), 0.0);
        assert_eq!(wrap_longitude(180.0), -180.0);
        assert_eq!(wrap_longitude(190.0), -170.0);
        assert_eq!(wrap_longitude(-190.0), 170.0);
        assert_eq!(wrap_longitude(359.5), -0.5);
        assert!(wrap_longitude(-1e-17) < 180.0);
    }

    #[test]
    fn test_forces_sensor_id_and_wraps() {
        let normalized = normalize(&sensor(), &window(), record(2, 45.0, 200.0))
            .unwrap()
            .unwrap();
        assert_eq!(normalized.sensor_id.as_str(), "bottle-sst");
        assert_eq!(normalized.longitude, -160.0);
    }

    #[test]
    fn test_out_of_window_dropped() {
        let mut outside = record(2, 45.0, 10.0);
        outside.timestamp = window().end;
        assert!(normalize(&sensor(), &window(), outside).unwrap().is_none());
    }

    #[test]
    fn test_bad_latitude_is_corrupt() {
        let err = normalize(&sensor(), &window(), record(2, 91.0, 10.0)).unwrap_err();
        assert!(err.is_retryable());
        assert!(!err.is_missing_source());

        let err = normalize(&sensor(), &window(), record(2, f64::NAN, 10.0)).unwrap_err();
        assert!(err.to_string().contains("corrupt"), "got: {err}");
    }
}
