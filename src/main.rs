mod cli;
mod envelope;
mod feather;
mod normalize;
mod window;

/// Main entry point of the application.
///
/// This function orchestrates the entire workflow:
/// 1. Parses command-line arguments.
/// 2. Validates input/output paths.
/// 3. Reads OHLCV rows from the feather file.
/// 4. Applies the optional UTC time window.
/// 5. Normalizes timestamps, scales prices/volume and writes the JSON envelope.
///
/// # Returns
///
/// * `anyhow::Result<()>` - Success or an error if any step fails.
fn main() -> anyhow::Result<()> {
    let total_start = std::time::Instant::now();
    let args = cli::Args::parse();
    println!("Start conversion...");

    check_path(&args.input)?;
    ensure_parent_dir_exist(&args.output)?;

    let rows = feather::read_rows(&args.input)?;
    println!("📄 Loaded {} rows from {}", rows.len(), args.input.display());

    let start = window::parse_bound(args.start.as_deref())?;
    let end = window::parse_bound(args.end.as_deref())?;
    let rows = window::filter_rows(rows, start, end)?;

    let normalized = normalize::normalize_rows(&rows, args.price_scale, args.volume_scale)?;
    let payload = envelope::build(
        normalized,
        envelope::Scale {
            price: args.price_scale,
            volume: args.volume_scale,
        },
        args.dataset_version,
    );
    envelope::write_json(&payload, &args.output)?;

    println!(
        "✅ Wrote {} rows to {} in {:?} seconds",
        payload.rows.len(),
        args.output.display(),
        total_start.elapsed().as_secs_f64()
    );
    anyhow::Ok(())
}

/// Validates that the input path exists before any work starts.
///
/// # Arguments
/// * `path` - Path to the input feather file.
///
/// # Returns
/// * `anyhow::Result<()>` - Success or an error if the path is missing.
fn check_path(path: &std::path::Path) -> anyhow::Result<()> {
    if !path.exists() {
        return Err(anyhow::anyhow!("Input path does not exist: {}", path.display()));
    }
    anyhow::Ok(())
}

/// Creates the output file's parent directory when it does not exist yet.
///
/// # Arguments
/// * `path` - Destination JSON path.
///
/// # Returns
/// * `anyhow::Result<()>` - Success or an error if directory creation fails.
fn ensure_parent_dir_exist(path: &std::path::Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    anyhow::Ok(())
}
