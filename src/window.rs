use crate::feather::{Row, TsValue};
use crate::normalize;

/// Parses an optional CLI time bound into a UTC instant.
///
/// Missing or empty values mean "no bound on this side"; anything else
/// must parse as one of the ISO-8601 shapes the timestamp normalizer
/// accepts, so a whitespace-only bound is an error rather than a no-op.
///
/// # Arguments
/// * `value` - Raw `--start`/`--end` flag value, if given.
///
/// # Returns
/// * `anyhow::Result<Option<chrono::DateTime<chrono::Utc>>>` - Parsed bound or `None`.
pub fn parse_bound(value: Option<&str>) -> anyhow::Result<Option<chrono::DateTime<chrono::Utc>>> {
    match value {
        Some(raw) if !raw.is_empty() => {
            let dt = normalize::parse_iso(raw)?;
            anyhow::Ok(Some(dt))
        }
        _ => anyhow::Ok(None),
    }
}

/// Keeps the rows whose timestamp falls within `[start, end]`, inclusive
/// on both ends. A zero-width window (`start == end`) keeps only rows at
/// exactly that instant.
///
/// With no bound supplied this is an identity pass: raw `ts` values flow
/// through untouched and are normalized later in the scaling stage. When a
/// bound is active, each row's `ts` is normalized once for the comparison
/// and surviving rows carry the already-normalized string, so downstream
/// normalization maps it to itself.
///
/// # Arguments
/// * `rows` - Rows in table order with raw `ts` values.
/// * `start` - Optional inclusive lower bound (UTC).
/// * `end` - Optional inclusive upper bound (UTC).
///
/// # Returns
/// * `anyhow::Result<Vec<Row>>` - The surviving rows, original order preserved.
///
/// # Errors
/// * If a row's timestamp cannot be normalized.
pub fn filter_rows(
    rows: Vec<Row>,
    start: Option<chrono::DateTime<chrono::Utc>>,
    end: Option<chrono::DateTime<chrono::Utc>>,
) -> anyhow::Result<Vec<Row>> {
    if start.is_none() && end.is_none() {
        return anyhow::Ok(rows);
    }

    let mut kept = Vec::with_capacity(rows.len());
    for mut row in rows {
        let dt = normalize::to_utc(&row.ts)?;
        if let Some(lower) = start {
            if dt < lower {
                continue;
            }
        }
        if let Some(upper) = end {
            if dt > upper {
                continue;
            }
        }
        row.ts = TsValue::Text(normalize::format_utc(dt));
        kept.push(row);
    }
    anyhow::Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row_at_epoch(secs: f64) -> Row {
        Row {
            ts: TsValue::Epoch(secs),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 10.0,
        }
    }

    #[test]
    fn no_bounds_passes_raw_values_through() {
        let rows = vec![row_at_epoch(1_704_067_200.0), row_at_epoch(1_704_067_260.0)];
        let out = filter_rows(rows, None, None).unwrap();
        assert_eq!(out.len(), 2);
        // ts must still be the raw epoch, untouched by normalization
        assert!(matches!(out[0].ts, TsValue::Epoch(_)));
        assert!(matches!(out[1].ts, TsValue::Epoch(_)));
    }

    #[test]
    fn zero_width_window_keeps_exact_instant_only() {
        let instant = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rows = vec![
            row_at_epoch(1_704_067_199.0),
            row_at_epoch(1_704_067_200.0),
            row_at_epoch(1_704_067_201.0),
        ];
        let out = filter_rows(rows, Some(instant), Some(instant)).unwrap();
        assert_eq!(out.len(), 1);
        match &out[0].ts {
            TsValue::Text(s) => assert_eq!(s, "2024-01-01T00:00:00Z"),
            other => panic!("expected normalized text ts, got {:?}", other),
        }
    }

    #[test]
    fn bounds_are_inclusive_on_both_ends() {
        let start = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 2, 0).unwrap();
        let rows = vec![
            row_at_epoch(1_704_067_140.0), // 23:59:00, before the window
            row_at_epoch(1_704_067_200.0), // boundary start
            row_at_epoch(1_704_067_260.0),
            row_at_epoch(1_704_067_320.0), // boundary end
            row_at_epoch(1_704_067_380.0), // after the window
        ];
        let out = filter_rows(rows, Some(start), Some(end)).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn single_bound_filters_one_side_only() {
        let start = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 0).unwrap();
        let rows = vec![row_at_epoch(1_704_067_200.0), row_at_epoch(1_704_067_260.0)];
        let out = filter_rows(rows, Some(start), None).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn parse_bound_handles_missing_and_empty() {
        assert!(parse_bound(None).unwrap().is_none());
        assert!(parse_bound(Some("")).unwrap().is_none());
        let dt = parse_bound(Some("2024-01-01T00:00:00Z")).unwrap().unwrap();
        assert_eq!(dt.timestamp(), 1_704_067_200);
    }

    #[test]
    fn parse_bound_rejects_garbage_and_whitespace_only() {
        assert!(parse_bound(Some("yesterday")).is_err());
        // blank but non-empty is malformed input, not an absent bound
        assert!(parse_bound(Some("   ")).is_err());
    }

    #[test]
    fn bounded_and_unbounded_paths_yield_the_same_final_ts() {
        let rows = vec![row_at_epoch(1_704_067_200.0), row_at_epoch(1_704_067_260.0)];
        let start = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let unbounded = filter_rows(rows.clone(), None, None).unwrap();
        let bounded = filter_rows(rows, Some(start), None).unwrap();

        let plain = crate::normalize::normalize_rows(&unbounded, 100, 100).unwrap();
        let filtered = crate::normalize::normalize_rows(&bounded, 100, 100).unwrap();
        let plain_ts: Vec<&str> = plain.iter().map(|r| r.ts.as_str()).collect();
        let filtered_ts: Vec<&str> = filtered.iter().map(|r| r.ts.as_str()).collect();
        assert_eq!(plain_ts, filtered_ts);
    }
}
