use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write as IoWrite;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::cli::OutputFormat;
use crate::elmore::{DelayMap, ElmoreEngine};
use crate::evaluate::DelayTable;
use crate::netlist::NetIo;
use crate::parser::SpefParser;
use crate::rctree::{NetRecord, RCTree, RCTreeMatrix, TreeVariant};

/// Analyzer configuration.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Resistance unit scale applied at edge insertion.
    pub r_unit: f64,
    /// Capacitance unit scale applied at capacitance insertion.
    pub c_unit: f64,
    /// Scale delays by ln(2) for the 50%-threshold approximation.
    pub apply_ln2: bool,
    /// Which RC-tree realization to evaluate on.
    pub variant: TreeVariant,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            r_unit: 1.0,
            c_unit: 1.0,
            apply_ln2: false,
            variant: TreeVariant::Adjacency,
        }
    }
}

/// One computed load delay, display names resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayEntry {
    pub load: String,
    /// `None` marks a load unreachable from the driver.
    pub delay: Option<f64>,
}

/// All delays of one net, from its single driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetDelays {
    pub net: String,
    pub driver: String,
    pub entries: Vec<DelayEntry>,
}

/// Whole-run results container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub nets: Vec<NetDelays>,
    /// Nets seen in the input, including skipped and rejected ones.
    pub net_count: usize,
    /// Nets without a driver pin.
    pub skipped_nets: usize,
    /// Nets rejected for structural violations.
    pub rejected_nets: usize,
    pub total_time: f64,
}

enum NetOutcome {
    Computed(NetDelays),
    NoDriver,
    Rejected,
}

/// Drives the per-net pipeline: parse -> build tree -> validate ->
/// compute delays -> collect results.
pub struct Analyzer {
    config: AnalyzerConfig,
    net_directions: Option<HashMap<String, NetIo>>,
    first_record: Option<NetRecord>,
    results: Option<AnalysisResult>,
}

impl Analyzer {
    pub fn new() -> Self {
        Analyzer::with_config(AnalyzerConfig::default())
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        Analyzer {
            config,
            net_directions: None,
            first_record: None,
            results: None,
        }
    }

    /// Use a netlist-direction description as the source of driver/load
    /// pins instead of the SPEF `*CONN` sections.
    pub fn set_net_directions(&mut self, directions: HashMap<String, NetIo>) {
        self.net_directions = Some(directions);
    }

    /// Run the full analysis over a SPEF file.
    pub fn run_file(&mut self, path: &str) -> Result<()> {
        info!("Loading SPEF from: {}", path);
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read SPEF file '{}'", path))?;
        self.run_content(&content)
    }

    /// Run the full analysis over an in-memory SPEF text.
    pub fn run_content(&mut self, content: &str) -> Result<()> {
        let start = Instant::now();

        let parser = SpefParser::from_content(content);
        info!("Name map entries: {}", parser.name_map().len());

        let mut result = AnalysisResult::default();
        for record in parser.nets(content) {
            if self.first_record.is_none() {
                self.first_record = Some(record.clone());
            }
            result.net_count += 1;
            debug!("net '{}': {} nodes referenced", record.name, record.caps.len());

            match self.process_net(&record) {
                NetOutcome::Computed(delays) => result.nets.push(delays),
                NetOutcome::NoDriver => result.skipped_nets += 1,
                NetOutcome::Rejected => result.rejected_nets += 1,
            }
        }

        result.total_time = start.elapsed().as_secs_f64();
        info!(
            "Processed {} nets in {:.3}ms",
            result.net_count,
            result.total_time * 1000.0
        );
        self.results = Some(result);
        Ok(())
    }

    /// Compute delays for one completed net record.
    fn process_net(&self, record: &NetRecord) -> NetOutcome {
        let (driver, loads) = self.resolve_endpoints(record);
        let Some(driver) = driver else {
            debug!("net '{}': no driver pin, skipping", record.name);
            return NetOutcome::NoDriver;
        };

        let engine = ElmoreEngine::new(self.config.apply_ln2);
        let delays: DelayMap = match self.config.variant {
            TreeVariant::Adjacency => {
                let tree = RCTree::from_record(record, self.config.r_unit, self.config.c_unit);
                if let Err(e) = tree.validate(&driver) {
                    error!("rejecting net: {}", e);
                    return NetOutcome::Rejected;
                }
                engine.delays(&tree, &driver, &loads)
            }
            TreeVariant::Matrix => {
                let mut tree =
                    RCTreeMatrix::from_record(record, self.config.r_unit, self.config.c_unit);
                if let Err(e) = tree.validate(&driver) {
                    error!("rejecting net: {}", e);
                    return NetOutcome::Rejected;
                }
                engine.delays_matrix(&mut tree, &driver, &loads)
            }
        };

        let entries = loads
            .iter()
            .map(|load| DelayEntry {
                load: record.display_name(load).to_string(),
                delay: delays.get(load).copied().flatten(),
            })
            .collect();

        NetOutcome::Computed(NetDelays {
            net: record.name.clone(),
            driver: record.display_name(&driver).to_string(),
            entries,
        })
    }

    /// Driver and loads for a net: from the netlist-direction info when
    /// present (reverse display-name lookup), else from the `*CONN` pins.
    fn resolve_endpoints(&self, record: &NetRecord) -> (Option<String>, Vec<String>) {
        let Some(directions) = &self.net_directions else {
            return (record.driver.clone(), record.loads.clone());
        };
        let Some(io) = directions.get(&record.name) else {
            warn!("net '{}' not found in netlist info", record.name);
            return (None, Vec::new());
        };

        let reverse: HashMap<&str, &str> = record
            .pin_names
            .iter()
            .map(|(raw, display)| (display.as_str(), raw.as_str()))
            .collect();
        let lookup = |pin: &String| -> Option<String> {
            match reverse.get(pin.as_str()) {
                Some(raw) => Some(raw.to_string()),
                None => {
                    warn!("net '{}': no node for pin '{}'", record.name, pin);
                    None
                }
            }
        };

        if io.outputs.len() > 1 {
            warn!(
                "net '{}': {} output pins listed, using the first",
                record.name,
                io.outputs.len()
            );
        }
        let driver = io.outputs.first().and_then(|pin| lookup(pin));
        let loads = io.inputs.iter().filter_map(|pin| lookup(pin)).collect();
        (driver, loads)
    }

    /// The first net record of the last run, for graph export.
    pub fn first_record(&self) -> Option<&NetRecord> {
        self.first_record.as_ref()
    }

    pub fn results(&self) -> Option<&AnalysisResult> {
        self.results.as_ref()
    }

    /// Defined delays keyed by `(load, driver)` display names, for
    /// golden-data comparison.
    pub fn delay_table(&self) -> DelayTable {
        let mut table = DelayTable::new();
        if let Some(results) = &self.results {
            for net in &results.nets {
                for entry in &net.entries {
                    if let Some(delay) = entry.delay {
                        table.insert((entry.load.clone(), net.driver.clone()), delay);
                    }
                }
            }
        }
        table
    }

    /// Export results to file in the requested format.
    pub fn export_results(&self, filename: &str, format: OutputFormat) -> Result<()> {
        let results = self
            .results
            .as_ref()
            .ok_or_else(|| anyhow!("No analysis results available"))?;

        match format {
            OutputFormat::Txt => self.export_txt(results, filename),
            OutputFormat::Csv => self.export_csv(results, filename),
            OutputFormat::Json => self.export_json(results, filename),
        }
    }

    /// One `load driver delay` triple per line, fixed 6-decimal precision;
    /// unreachable loads written as `undefined`.
    fn export_txt(&self, results: &AnalysisResult, filename: &str) -> Result<()> {
        let mut file = File::create(filename)
            .with_context(|| format!("Failed to create output file '{}'", filename))?;
        for net in &results.nets {
            for entry in &net.entries {
                match entry.delay {
                    Some(delay) => writeln!(file, "{} {} {:.6}", entry.load, net.driver, delay)?,
                    None => writeln!(file, "{} {} undefined", entry.load, net.driver)?,
                }
            }
        }
        info!("Results exported to TXT: {}", filename);
        Ok(())
    }

    fn export_csv(&self, results: &AnalysisResult, filename: &str) -> Result<()> {
        let file = File::create(filename)
            .with_context(|| format!("Failed to create output file '{}'", filename))?;
        let mut writer = csv::Writer::from_writer(file);

        writer.write_record(["net", "load", "driver", "delay"])?;
        for net in &results.nets {
            for entry in &net.entries {
                let delay = match entry.delay {
                    Some(d) => format!("{:.6}", d),
                    None => "undefined".to_string(),
                };
                writer.write_record([&net.net, &entry.load, &net.driver, &delay])?;
            }
        }
        writer.flush()?;
        info!("Results exported to CSV: {}", filename);
        Ok(())
    }

    fn export_json(&self, results: &AnalysisResult, filename: &str) -> Result<()> {
        let file = File::create(filename)
            .with_context(|| format!("Failed to create output file '{}'", filename))?;
        serde_json::to_writer_pretty(file, results)?;
        info!("Results exported to JSON: {}", filename);
        Ok(())
    }

    /// Print an analysis summary to stdout.
    pub fn print_summary(&self) {
        let Some(results) = &self.results else {
            println!("No analysis results available");
            return;
        };

        println!("\n=== Delay Analysis Summary ===");
        println!("Nets parsed: {}", results.net_count);
        println!("Nets computed: {}", results.nets.len());
        if results.skipped_nets > 0 {
            println!("Nets without driver: {}", results.skipped_nets);
        }
        if results.rejected_nets > 0 {
            println!("Nets rejected (structural): {}", results.rejected_nets);
        }
        println!("Total time: {:.3}ms", results.total_time * 1000.0);

        let mut defined = 0usize;
        let mut undefined = 0usize;
        let mut min_delay = f64::INFINITY;
        let mut max_delay = f64::NEG_INFINITY;
        for net in &results.nets {
            for entry in &net.entries {
                match entry.delay {
                    Some(d) => {
                        defined += 1;
                        min_delay = min_delay.min(d);
                        max_delay = max_delay.max(d);
                    }
                    None => undefined += 1,
                }
            }
        }

        println!("Load delays: {} defined, {} undefined", defined, undefined);
        if defined > 0 {
            println!("Delay range: [{:.6e}, {:.6e}]", min_delay, max_delay);
        }
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}
