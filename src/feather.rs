use std::collections::HashMap;

use arrow::array::{
    Array, Date32Array, Date64Array, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeStringArray, RecordBatch, StringArray, TimestampMicrosecondArray,
    TimestampMillisecondArray, TimestampNanosecondArray, TimestampSecondArray, UInt32Array,
    UInt64Array,
};
use arrow::datatypes::{DataType, Schema, TimeUnit};
use arrow::ipc::reader::FileReader;

/// Timestamp value as it arrives from the feather file.
///
/// The time column has no single physical type in the wild: exporters write
/// native timestamp columns, ISO strings, or plain epoch numbers. Each row
/// carries its value tagged so normalization can dispatch per representation.
#[derive(Debug, Clone)]
pub enum TsValue {
    /// Native timestamp column, already an absolute UTC instant.
    DateTime(chrono::DateTime<chrono::Utc>),
    /// Textual timestamp, parsed as ISO-8601 during normalization.
    Text(String),
    /// Numeric epoch in seconds, or milliseconds when the magnitude says so.
    Epoch(f64),
}

/// A single OHLCV record extracted from the feather table, in table order.
#[derive(Debug, Clone)]
pub struct Row {
    pub ts: TsValue,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Positions of the required columns, resolved once per file.
struct ColumnMap {
    ts: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl ColumnMap {
    /// Locates the six required columns by case-insensitive name matching.
    /// The time column may be named `ts`, `timestamp` or `time`, tried in
    /// that order.
    ///
    /// # Errors
    /// * If the time column or any of open/high/low/close/volume is absent,
    ///   reported with the column's human-readable name.
    fn from_schema(schema: &Schema) -> anyhow::Result<Self> {
        let lower: HashMap<String, usize> = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(i, field)| (field.name().to_lowercase(), i))
            .collect();

        let ts = ["ts", "timestamp", "time"]
            .iter()
            .find_map(|name| lower.get(*name).copied())
            .ok_or_else(|| anyhow::anyhow!("Missing ts/timestamp column in feather data"))?;

        let pick = |name: &str| {
            lower
                .get(name)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("Missing {} column in feather data", name))
        };

        anyhow::Ok(ColumnMap {
            ts,
            open: pick("open")?,
            high: pick("high")?,
            low: pick("low")?,
            close: pick("close")?,
            volume: pick("volume")?,
        })
    }
}

/// Reads all OHLCV rows from a feather (Arrow IPC) file.
///
/// The whole table is materialized in memory; record batch boundaries are
/// invisible to callers and row order is preserved exactly.
///
/// # Arguments
/// * `path` - Path to the input `.feather` file.
///
/// # Returns
/// * `anyhow::Result<Vec<Row>>` - Rows in table order.
///
/// # Errors
/// * If the file cannot be opened or is not valid Arrow IPC.
/// * If a required column is missing or has an unsupported type.
pub fn read_rows<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Vec<Row>> {
    let file = std::fs::File::open(path.as_ref()).map_err(|e| {
        anyhow::anyhow!("Failed to open feather file {}: {}", path.as_ref().display(), e)
    })?;
    read_ipc(file)
}

/// Reads OHLCV rows from any seekable Arrow IPC source.
pub fn read_ipc<R: std::io::Read + std::io::Seek>(source: R) -> anyhow::Result<Vec<Row>> {
    let reader = FileReader::try_new(source, None)
        .map_err(|e| anyhow::anyhow!("Failed to read input as Arrow IPC: {}", e))?;
    let columns = ColumnMap::from_schema(&reader.schema())?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| anyhow::anyhow!("Failed to read record batch: {}", e))?;
        extend_rows(&batch, &columns, &mut rows)?;
    }
    anyhow::Ok(rows)
}

/// Appends one record batch worth of rows, widening numeric columns to `f64`
/// and tagging the time column per its physical type.
fn extend_rows(batch: &RecordBatch, columns: &ColumnMap, rows: &mut Vec<Row>) -> anyhow::Result<()> {
    let schema = batch.schema_ref();
    let ts = ts_column(batch.column(columns.ts).as_ref(), schema.field(columns.ts).name())?;
    let open = f64_column(batch.column(columns.open).as_ref(), schema.field(columns.open).name())?;
    let high = f64_column(batch.column(columns.high).as_ref(), schema.field(columns.high).name())?;
    let low = f64_column(batch.column(columns.low).as_ref(), schema.field(columns.low).name())?;
    let close = f64_column(batch.column(columns.close).as_ref(), schema.field(columns.close).name())?;
    let volume = f64_column(batch.column(columns.volume).as_ref(), schema.field(columns.volume).name())?;

    for i in 0..batch.num_rows() {
        rows.push(Row {
            ts: ts[i].clone(),
            open: open[i],
            high: high[i],
            low: low[i],
            close: close[i],
            volume: volume[i],
        });
    }
    anyhow::Ok(())
}

/// Downcasts a price/volume column to `f64` values.
///
/// Null slots are a hard error: a silently fabricated price would corrupt
/// the output, so the column must be fully populated.
fn f64_column(array: &dyn Array, name: &str) -> anyhow::Result<Vec<f64>> {
    if array.null_count() > 0 {
        return Err(anyhow::anyhow!("Column {} contains null values in feather data", name));
    }

    macro_rules! widen {
        ($ty:ty) => {{
            let typed = array
                .as_any()
                .downcast_ref::<$ty>()
                .ok_or_else(|| anyhow::anyhow!("Failed to downcast {} column", name))?;
            anyhow::Ok((0..typed.len()).map(|i| typed.value(i) as f64).collect())
        }};
    }

    match array.data_type() {
        DataType::Float64 => widen!(Float64Array),
        DataType::Float32 => widen!(Float32Array),
        DataType::Int64 => widen!(Int64Array),
        DataType::Int32 => widen!(Int32Array),
        DataType::UInt64 => widen!(UInt64Array),
        DataType::UInt32 => widen!(UInt32Array),
        other => Err(anyhow::anyhow!(
            "Column {} has unsupported type {:?}, expected a numeric column",
            name,
            other
        )),
    }
}

/// Extracts the time column as tagged `TsValue`s.
///
/// Arrow timestamp columns store offsets from the UTC epoch regardless of
/// their timezone annotation, so they map straight to UTC instants. String
/// columns are deferred to the normalizer; numeric columns become raw epoch
/// values. Null slots abort, like in any other required column.
fn ts_column(array: &dyn Array, name: &str) -> anyhow::Result<Vec<TsValue>> {
    if array.null_count() > 0 {
        return Err(anyhow::anyhow!("Column {} contains null values in feather data", name));
    }

    macro_rules! epoch {
        ($ty:ty) => {{
            let typed = array
                .as_any()
                .downcast_ref::<$ty>()
                .ok_or_else(|| anyhow::anyhow!("Failed to downcast ts column"))?;
            anyhow::Ok((0..typed.len())
                .map(|i| TsValue::Epoch(typed.value(i) as f64))
                .collect())
        }};
    }

    macro_rules! ts_raw {
        ($ty:ty) => {{
            let typed = array
                .as_any()
                .downcast_ref::<$ty>()
                .ok_or_else(|| anyhow::anyhow!("Failed to downcast ts column"))?;
            (0..typed.len()).map(|i| typed.value(i)).collect::<Vec<i64>>()
        }};
    }

    match array.data_type() {
        DataType::Timestamp(unit, _tz) => {
            let micros: Vec<i64> = match unit {
                TimeUnit::Second => ts_raw!(TimestampSecondArray)
                    .iter()
                    .map(|v| v * 1_000_000)
                    .collect(),
                TimeUnit::Millisecond => ts_raw!(TimestampMillisecondArray)
                    .iter()
                    .map(|v| v * 1_000)
                    .collect(),
                TimeUnit::Microsecond => ts_raw!(TimestampMicrosecondArray),
                TimeUnit::Nanosecond => ts_raw!(TimestampNanosecondArray)
                    .iter()
                    .map(|v| v.div_euclid(1_000))
                    .collect(),
            };
            micros
                .into_iter()
                .map(|us| {
                    chrono::DateTime::from_timestamp_micros(us)
                        .map(TsValue::DateTime)
                        .ok_or_else(|| anyhow::anyhow!("Timestamp {} is out of range", us))
                })
                .collect()
        }
        DataType::Date32 => {
            let typed = array
                .as_any()
                .downcast_ref::<Date32Array>()
                .ok_or_else(|| anyhow::anyhow!("Failed to downcast ts column"))?;
            (0..typed.len())
                .map(|i| {
                    let secs = typed.value(i) as i64 * 86_400;
                    chrono::DateTime::from_timestamp(secs, 0)
                        .map(TsValue::DateTime)
                        .ok_or_else(|| anyhow::anyhow!("Date {} is out of range", typed.value(i)))
                })
                .collect()
        }
        DataType::Date64 => {
            let typed = array
                .as_any()
                .downcast_ref::<Date64Array>()
                .ok_or_else(|| anyhow::anyhow!("Failed to downcast ts column"))?;
            (0..typed.len())
                .map(|i| {
                    chrono::DateTime::from_timestamp_millis(typed.value(i))
                        .map(TsValue::DateTime)
                        .ok_or_else(|| anyhow::anyhow!("Date {} is out of range", typed.value(i)))
                })
                .collect()
        }
        DataType::Utf8 => {
            let typed = array
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| anyhow::anyhow!("Failed to downcast ts column"))?;
            anyhow::Ok((0..typed.len())
                .map(|i| TsValue::Text(typed.value(i).to_string()))
                .collect())
        }
        DataType::LargeUtf8 => {
            let typed = array
                .as_any()
                .downcast_ref::<LargeStringArray>()
                .ok_or_else(|| anyhow::anyhow!("Failed to downcast ts column"))?;
            anyhow::Ok((0..typed.len())
                .map(|i| TsValue::Text(typed.value(i).to_string()))
                .collect())
        }
        DataType::Int64 => epoch!(Int64Array),
        DataType::Int32 => epoch!(Int32Array),
        DataType::UInt64 => epoch!(UInt64Array),
        DataType::UInt32 => epoch!(UInt32Array),
        DataType::Float64 => epoch!(Float64Array),
        DataType::Float32 => epoch!(Float32Array),
        other => Err(anyhow::anyhow!(
            "Column {} has unsupported type {:?}, expected timestamp, string or numeric",
            name,
            other
        )),
    }
}
