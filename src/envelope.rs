/// Schema identifier written into every envelope. Compiled-in constant,
/// bumped only on breaking output-format changes.
pub const SCHEMA_VERSION: &str = "market-json-v1";

/// One canonical OHLCV row. Field declaration order is the serialized key
/// order: `ts, open, high, low, close, volume`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NormalizedRow {
    pub ts: String,
    pub open: i64,
    pub high: i64,
    pub low: i64,
    pub close: i64,
    pub volume: i64,
}

/// The integer multipliers the rows were scaled with.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct Scale {
    pub price: i64,
    pub volume: i64,
}

/// Top-level output object.
#[derive(Debug, serde::Serialize)]
pub struct Envelope {
    #[serde(rename = "schemaVersion")]
    pub schema_version: &'static str,
    #[serde(rename = "datasetVersion")]
    pub dataset_version: String,
    #[serde(rename = "evalWindow")]
    pub eval_window: String,
    pub scale: Scale,
    pub rows: Vec<NormalizedRow>,
}

/// Builds the envelope around already-normalized, already-filtered rows.
///
/// `evalWindow` spans the first and last row as they stand; nothing is
/// sorted or deduplicated.
///
/// # Arguments
/// * `rows` - Canonical rows in their final order.
/// * `scale` - The multipliers that produced them.
/// * `dataset_version` - Caller-supplied dataset label.
pub fn build(rows: Vec<NormalizedRow>, scale: Scale, dataset_version: String) -> Envelope {
    Envelope {
        schema_version: SCHEMA_VERSION,
        dataset_version,
        eval_window: infer_eval_window(&rows),
        scale,
        rows,
    }
}

/// Computes the inclusive `first~last` time span of the row list, or an
/// empty string when there are no rows.
pub fn infer_eval_window(rows: &[NormalizedRow]) -> String {
    match (rows.first(), rows.last()) {
        (Some(first), Some(last)) => format!("{}~{}", first.ts, last.ts),
        _ => String::new(),
    }
}

/// Serializes the envelope as compact UTF-8 JSON and writes it in a single
/// call, so a failed run never leaves a partial output file.
///
/// # Arguments
/// * `envelope` - The assembled envelope.
/// * `path` - Destination JSON path.
///
/// # Errors
/// * If serialization or the file write fails.
pub fn write_json<P: AsRef<std::path::Path>>(envelope: &Envelope, path: P) -> anyhow::Result<()> {
    let json = serde_json::to_string(envelope)
        .map_err(|e| anyhow::anyhow!("Failed to serialize envelope: {}", e))?;
    std::fs::write(path.as_ref(), json).map_err(|e| {
        anyhow::anyhow!("Failed to write output file {}: {}", path.as_ref().display(), e)
    })?;
    anyhow::Ok(())
}
