/// Structure representing command-line arguments.
#[derive(Debug)]
pub struct Args {
    pub input: std::path::PathBuf,
    pub output: std::path::PathBuf,
    pub start: Option<String>,
    pub end: Option<String>,
    pub dataset_version: String,
    pub price_scale: i64,
    pub volume_scale: i64,
}

/// Command-line arguments parser using Clap.
///
/// Supports input/output paths, an optional UTC time window and
/// price/volume scale factors with validation.
impl Args {
    /// Parses command-line arguments using `clap`.
    ///
    /// # Returns
    /// * `Args` - Struct containing parsed arguments.
    ///
    /// # Errors
    /// * If required arguments are missing or invalid.
    pub fn parse() -> Self {
        let matches = clap::Command::new("feather_to_market_json")
            .version("0.2.0")
            .about("Normalize feather OHLCV data to canonical market JSON")
            .arg(
                clap::Arg::new("input")
                    .short('i')
                    .long("input")
                    .help("Path to input .feather file")
                    .required(true)
                    .num_args(1),
            )
            .arg(
                clap::Arg::new("output")
                .short('o')
                .long("output")
                .help("Path to output JSON file")
                .required(true)
                .num_args(1),
            )
            .arg(
                clap::Arg::new("start")
                .long("start")
                .help("UTC ISO start time (inclusive)")
                .required(false)
                .num_args(1),
            )
            .arg(
                clap::Arg::new("end")
                .long("end")
                .help("UTC ISO end time (inclusive)")
                .required(false)
                .num_args(1),
            )
            .arg(
                clap::Arg::new("dataset-version")
                .long("dataset-version")
                .help("Dataset version label written into the envelope")
                .default_value("v1")
                .num_args(1),
            )
            .arg(
                clap::Arg::new("price-scale")
                .long("price-scale")
                .help("Integer multiplier applied to open/high/low/close")
                .default_value("100")
                .num_args(1)
                .value_parser(clap::builder::ValueParser::new(parse_i64_positive)),
            )
            .arg(
                clap::Arg::new("volume-scale")
                .long("volume-scale")
                .help("Integer multiplier applied to volume")
                .default_value("100")
                .num_args(1)
                .value_parser(clap::builder::ValueParser::new(parse_i64_positive)),
            )
            .get_matches();

        Args {
            input: std::path::PathBuf::from(matches.get_one::<String>("input").unwrap()),
            output: std::path::PathBuf::from(matches.get_one::<String>("output").unwrap()),
            start: matches.get_one::<String>("start").cloned(),
            end: matches.get_one::<String>("end").cloned(),
            dataset_version: matches.get_one::<String>("dataset-version").cloned().unwrap(),
            price_scale: matches.get_one::<i64>("price-scale").cloned().unwrap(),
            volume_scale: matches.get_one::<i64>("volume-scale").cloned().unwrap(),
        }
    }
}

/// Validates that a scale factor is a positive integer.
///
/// # Arguments
/// * `s` - String representation of the scale factor.
///
/// # Returns
/// * `Result<i64>` - Validated scale factor.
fn parse_i64_positive(s: &str) -> Result<i64, String> {
    match s.parse::<i64>() {
        Ok(n) if n <= 0 => Err("Must be a positive integer".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("Not a valid number: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_scale_parser_accepts_positive() {
        assert_eq!(parse_i64_positive("100"), Ok(100));
        assert_eq!(parse_i64_positive("1"), Ok(1));
    }

    #[test]
    fn positive_scale_parser_rejects_zero_negative_and_garbage() {
        assert!(parse_i64_positive("0").is_err());
        assert!(parse_i64_positive("-5").is_err());
        assert!(parse_i64_positive("ten").is_err());
    }
}
