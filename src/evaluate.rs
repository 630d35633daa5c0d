use std::collections::HashMap;
use std::fs;

use anyhow::{Context, Result};
use log::debug;

/// Golden delays below this value are compared by absolute error; larger
/// ones by relative error.
pub const REL_ERROR_THRESHOLD: f64 = 0.05;

/// Error statistics from a computed-vs-golden comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorStats {
    pub avg_abs_error: f64,
    pub avg_rel_error_pct: f64,
    pub abs_samples: usize,
    pub rel_samples: usize,
    pub compared: usize,
}

/// Delay table keyed by `(load, driver)` display names.
pub type DelayTable = HashMap<(String, String), f64>;

/// Read a delay table file: one `load driver delay` triple per line,
/// whitespace-separated. Short or non-numeric lines are skipped.
pub fn read_delay_file(path: &str) -> Result<DelayTable> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read delay file '{}'", path))?;
    Ok(parse_delay_table(&content))
}

pub fn parse_delay_table(content: &str) -> DelayTable {
    let mut delays = DelayTable::new();
    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }
        if let Ok(delay) = parts[2].parse::<f64>() {
            delays.insert((parts[0].to_string(), parts[1].to_string()), delay);
        }
    }
    delays
}

/// Compare computed delays against golden data over the shared keys.
pub fn compare(calculated: &DelayTable, golden: &DelayTable) -> ErrorStats {
    let mut abs_errors = Vec::new();
    let mut rel_errors = Vec::new();
    let mut compared = 0;

    for (key, &calc) in calculated {
        let Some(&gold) = golden.get(key) else {
            debug!("no golden entry for {} {}", key.0, key.1);
            continue;
        };
        compared += 1;

        if gold < REL_ERROR_THRESHOLD || gold == 0.0 {
            abs_errors.push((calc - gold).abs());
        } else {
            rel_errors.push(((calc - gold) / gold).abs());
        }
    }

    let avg = |v: &[f64]| {
        if v.is_empty() {
            0.0
        } else {
            v.iter().sum::<f64>() / v.len() as f64
        }
    };

    ErrorStats {
        avg_abs_error: avg(&abs_errors),
        avg_rel_error_pct: avg(&rel_errors) * 100.0,
        abs_samples: abs_errors.len(),
        rel_samples: rel_errors.len(),
        compared,
    }
}

impl ErrorStats {
    pub fn print(&self) {
        println!("Compared {} delay entries", self.compared);
        println!(
            "Average Absolute Error: {:.6} ({} samples)",
            self.avg_abs_error, self.abs_samples
        );
        println!(
            "Average Relative Error: {:.2}% ({} samples)",
            self.avg_rel_error_pct, self.rel_samples
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &str, f64)]) -> DelayTable {
        entries
            .iter()
            .map(|(l, d, v)| ((l.to_string(), d.to_string()), *v))
            .collect()
    }

    #[test]
    fn test_parse_delay_table() {
        let content = "\
u1/A u2/Z 0.000024
u3/A u2/Z 0.000001
short line
u4/A u2/Z not_a_number
";
        let delays = parse_delay_table(content);
        assert_eq!(delays.len(), 2);
        assert_eq!(
            delays[&("u1/A".to_string(), "u2/Z".to_string())],
            0.000024
        );
    }

    #[test]
    fn test_small_golden_uses_absolute_error() {
        let calc = table(&[("a", "d", 0.02)]);
        let gold = table(&[("a", "d", 0.01)]);
        let stats = compare(&calc, &gold);
        assert_eq!(stats.abs_samples, 1);
        assert_eq!(stats.rel_samples, 0);
        assert!((stats.avg_abs_error - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_large_golden_uses_relative_error() {
        let calc = table(&[("a", "d", 0.11)]);
        let gold = table(&[("a", "d", 0.10)]);
        let stats = compare(&calc, &gold);
        assert_eq!(stats.abs_samples, 0);
        assert_eq!(stats.rel_samples, 1);
        assert!((stats.avg_rel_error_pct - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_unmatched_keys_skipped() {
        let calc = table(&[("a", "d", 1.0), ("b", "d", 2.0)]);
        let gold = table(&[("a", "d", 1.0)]);
        let stats = compare(&calc, &gold);
        assert_eq!(stats.compared, 1);
    }

    #[test]
    fn test_exact_match_zero_error() {
        let calc = table(&[("a", "d", 0.2), ("b", "d", 0.01)]);
        let gold = table(&[("a", "d", 0.2), ("b", "d", 0.01)]);
        let stats = compare(&calc, &gold);
        assert_eq!(stats.avg_abs_error, 0.0);
        assert_eq!(stats.avg_rel_error_pct, 0.0);
        assert_eq!(stats.compared, 2);
    }
}
