use anyhow::{anyhow, Result};
use clap::ArgMatches;

use crate::rctree::TreeVariant;

#[derive(Debug, Clone)]
pub struct CliArgs {
    pub input_file: String,
    pub output_file: Option<String>,
    pub output_format: OutputFormat,
    pub engine: TreeVariant,
    pub apply_ln2: bool,
    pub r_unit: f64,
    pub c_unit: f64,
    pub netlist_file: Option<String>,
    pub golden_file: Option<String>,
    pub graph_json_file: Option<String>,
    pub verbose_level: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Txt,
    Csv,
    Json,
}

impl CliArgs {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let input_file = matches
            .get_one::<String>("input")
            .ok_or_else(|| anyhow!("Input SPEF file is required"))?
            .clone();

        let output_file = matches.get_one::<String>("output").cloned();
        let netlist_file = matches.get_one::<String>("netlist").cloned();
        let golden_file = matches.get_one::<String>("golden").cloned();
        let graph_json_file = matches.get_one::<String>("graph-json").cloned();

        let verbose_level = matches.get_count("verbose");
        let apply_ln2 = matches.get_flag("ln2");

        let output_format = match matches.get_one::<String>("format").unwrap().as_str() {
            "txt" => OutputFormat::Txt,
            "csv" => OutputFormat::Csv,
            "json" => OutputFormat::Json,
            _ => return Err(anyhow!("Invalid output format")),
        };

        let engine = match matches.get_one::<String>("engine").unwrap().as_str() {
            "adjacency" => TreeVariant::Adjacency,
            "matrix" => TreeVariant::Matrix,
            _ => return Err(anyhow!("Invalid engine variant")),
        };

        let r_unit = parse_unit_scale(matches.get_one::<String>("r-unit").unwrap())?;
        let c_unit = parse_unit_scale(matches.get_one::<String>("c-unit").unwrap())?;

        Ok(CliArgs {
            input_file,
            output_file,
            output_format,
            engine,
            apply_ln2,
            r_unit,
            c_unit,
            netlist_file,
            golden_file,
            graph_json_file,
            verbose_level,
        })
    }
}

/// Parse a unit-scale factor (e.g. "1.0", "1e3", "1e-15").
fn parse_unit_scale(value: &str) -> Result<f64> {
    let scale = value
        .trim()
        .parse::<f64>()
        .map_err(|e| anyhow!("Invalid unit scale '{}': {}", value, e))?;
    if !scale.is_finite() || scale <= 0.0 {
        return Err(anyhow!("Unit scale must be positive, got '{}'", value));
    }
    Ok(scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unit_scale() {
        assert_eq!(parse_unit_scale("1.0").unwrap(), 1.0);
        assert_eq!(parse_unit_scale("1e3").unwrap(), 1000.0);
        assert_eq!(parse_unit_scale(" 1e-15 ").unwrap(), 1e-15);
    }

    #[test]
    fn test_parse_unit_scale_rejects_bad_values() {
        assert!(parse_unit_scale("zero").is_err());
        assert!(parse_unit_scale("0").is_err());
        assert!(parse_unit_scale("-2.0").is_err());
        assert!(parse_unit_scale("inf").is_err());
    }
}
