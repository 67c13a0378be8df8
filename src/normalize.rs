use crate::envelope;
use crate::feather::{Row, TsValue};

/// Epoch values above this magnitude are milliseconds, not seconds.
const EPOCH_MILLIS_CUTOFF: f64 = 1_000_000_000_000.0;

/// Converts a tagged timestamp value into a UTC instant.
///
/// # Arguments
/// * `ts` - Timestamp as it arrived from the feather file.
///
/// # Returns
/// * `anyhow::Result<DateTime<Utc>>` - The instant in UTC.
///
/// # Errors
/// * If a textual timestamp is not ISO-8601 or an epoch value is out of range.
pub fn to_utc(ts: &TsValue) -> anyhow::Result<chrono::DateTime<chrono::Utc>> {
    match ts {
        TsValue::DateTime(dt) => anyhow::Ok(*dt),
        TsValue::Text(raw) => parse_iso(raw),
        TsValue::Epoch(value) => {
            let mut secs = *value;
            if secs.abs() > EPOCH_MILLIS_CUTOFF {
                secs /= 1000.0;
            }
            let micros = (secs * 1_000_000.0).round() as i64;
            chrono::DateTime::from_timestamp_micros(micros)
                .ok_or_else(|| anyhow::anyhow!("Epoch timestamp {} is out of range", value))
        }
    }
}

/// Converts a tagged timestamp into a canonical UTC ISO-8601 `Z` string.
///
/// Idempotent: feeding the output back in as text yields the same string.
pub fn to_utc_iso(ts: &TsValue) -> anyhow::Result<String> {
    anyhow::Ok(format_utc(to_utc(ts)?))
}

/// Parses an ISO-8601 string into a UTC instant.
///
/// A trailing `Z` is rewritten to `+00:00` before parsing. Accepted shapes
/// are RFC 3339 with an offset, naive date-times with a `T` or space
/// separator, and bare dates. Naive values are taken as UTC.
///
/// # Arguments
/// * `raw` - The textual timestamp, surrounding whitespace allowed.
///
/// # Returns
/// * `anyhow::Result<DateTime<Utc>>` - The parsed instant in UTC.
///
/// # Errors
/// * If the string matches none of the accepted shapes.
pub fn parse_iso(raw: &str) -> anyhow::Result<chrono::DateTime<chrono::Utc>> {
    let trimmed = raw.trim();
    let candidate = match trimmed.strip_suffix('Z') {
        Some(stripped) => format!("{}+00:00", stripped),
        None => trimmed.to_string(),
    };

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(&candidate) {
        return anyhow::Ok(dt.with_timezone(&chrono::Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(&candidate, format) {
            return anyhow::Ok(naive.and_utc());
        }
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(&candidate, "%Y-%m-%d") {
        let naive = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow::anyhow!("Failed to build midnight for date '{}'", trimmed))?;
        return anyhow::Ok(naive.and_utc());
    }

    Err(anyhow::anyhow!("Failed to parse timestamp '{}' as ISO-8601", trimmed))
}

/// Formats a UTC instant as `YYYY-MM-DDTHH:MM:SS[.ffffff]Z`.
///
/// The six-digit fraction appears only when the sub-second part is non-zero,
/// so no other suffix variant is ever emitted.
pub fn format_utc(dt: chrono::DateTime<chrono::Utc>) -> String {
    if dt.timestamp_subsec_micros() == 0 {
        dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
    }
}

/// Scales a floating-point value into a fixed-point integer.
///
/// `round(value * scale)` cast to integer. No clamping and no overflow
/// checks: large scales or values may exceed 32-bit ranges, which is
/// accepted behavior.
pub fn scale_number(value: f64, scale: i64) -> i64 {
    (value * scale as f64).round() as i64
}

/// Normalizes extracted rows into their canonical scaled form.
///
/// Each row's timestamp becomes a UTC ISO `Z` string and the five numeric
/// fields become scale integers. Row order is preserved; rows arriving from
/// the bounded filter path carry already-normalized text timestamps, which
/// map to themselves here.
///
/// # Arguments
/// * `rows` - Extracted rows in table order.
/// * `price_scale` - Multiplier for open/high/low/close.
/// * `volume_scale` - Multiplier for volume.
///
/// # Returns
/// * `anyhow::Result<Vec<envelope::NormalizedRow>>` - Canonical rows.
///
/// # Errors
/// * If any timestamp cannot be normalized.
pub fn normalize_rows(
    rows: &[Row],
    price_scale: i64,
    volume_scale: i64,
) -> anyhow::Result<Vec<envelope::NormalizedRow>> {
    let mut normalized = Vec::with_capacity(rows.len());
    for row in rows {
        normalized.push(envelope::NormalizedRow {
            ts: to_utc_iso(&row.ts)?,
            open: scale_number(row.open, price_scale),
            high: scale_number(row.high, price_scale),
            low: scale_number(row.low, price_scale),
            close: scale_number(row.close, price_scale),
            volume: scale_number(row.volume, volume_scale),
        });
    }
    anyhow::Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn scale_rounds_to_nearest_integer() {
        assert_eq!(scale_number(12.34, 10), 123);
        assert_eq!(scale_number(100.12, 100), 10012);
        assert_eq!(scale_number(101.99, 100), 10199);
        assert_eq!(scale_number(99.5, 100), 9950);
        assert_eq!(scale_number(100.55, 100), 10055);
        // rounding, not truncation
        assert_eq!(scale_number(0.999, 100), 100);
        assert_eq!(scale_number(-1.235, 100), -124);
    }

    #[test]
    fn aware_datetime_formats_with_z_suffix() {
        let dt = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let iso = to_utc_iso(&TsValue::DateTime(dt)).unwrap();
        assert_eq!(iso, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn text_with_explicit_utc_offset_normalizes_to_z() {
        let iso = to_utc_iso(&TsValue::Text("2024-01-01T00:00:00+00:00".to_string())).unwrap();
        assert_eq!(iso, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn text_with_nonzero_offset_converts_to_utc() {
        let iso = to_utc_iso(&TsValue::Text("2024-01-01T02:00:00+02:00".to_string())).unwrap();
        assert_eq!(iso, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn naive_text_and_bare_date_are_taken_as_utc() {
        let iso = to_utc_iso(&TsValue::Text("2024-01-01T00:00:00".to_string())).unwrap();
        assert_eq!(iso, "2024-01-01T00:00:00Z");
        let iso = to_utc_iso(&TsValue::Text("2024-01-01 00:00:00".to_string())).unwrap();
        assert_eq!(iso, "2024-01-01T00:00:00Z");
        let iso = to_utc_iso(&TsValue::Text("2024-01-01".to_string())).unwrap();
        assert_eq!(iso, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn epoch_seconds_and_milliseconds_agree() {
        let from_secs = to_utc_iso(&TsValue::Epoch(1_704_067_200.0)).unwrap();
        let from_millis = to_utc_iso(&TsValue::Epoch(1_704_067_200_000.0)).unwrap();
        assert_eq!(from_secs, from_millis);
        assert_eq!(from_secs, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn fractional_seconds_keep_six_digits() {
        let iso = to_utc_iso(&TsValue::Epoch(1_704_067_200.5)).unwrap();
        assert_eq!(iso, "2024-01-01T00:00:00.500000Z");
        let iso = to_utc_iso(&TsValue::Text("2024-01-01T00:00:00.123456Z".to_string())).unwrap();
        assert_eq!(iso, "2024-01-01T00:00:00.123456Z");
    }

    #[test]
    fn normalization_is_idempotent() {
        for input in [
            TsValue::Epoch(1_704_067_200.0),
            TsValue::Text("2024-06-15T09:30:00+02:00".to_string()),
            TsValue::Epoch(1_704_067_200.25),
        ] {
            let once = to_utc_iso(&input).unwrap();
            let twice = to_utc_iso(&TsValue::Text(once.clone())).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn malformed_text_is_an_error() {
        assert!(to_utc_iso(&TsValue::Text("not-a-time".to_string())).is_err());
        assert!(to_utc_iso(&TsValue::Text("2024-13-45T99:00:00Z".to_string())).is_err());
    }

    #[test]
    fn rows_normalize_in_order_with_both_scales() {
        let rows = vec![Row {
            ts: TsValue::DateTime(chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            open: 100.12,
            high: 101.99,
            low: 99.5,
            close: 100.55,
            volume: 12.34,
        }];
        let normalized = normalize_rows(&rows, 100, 10).unwrap();
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].ts, "2024-01-01T00:00:00Z");
        assert_eq!(normalized[0].open, 10012);
        assert_eq!(normalized[0].high, 10199);
        assert_eq!(normalized[0].low, 9950);
        assert_eq!(normalized[0].close, 10055);
        assert_eq!(normalized[0].volume, 123);
    }
}
