use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::*;
use log::{error, info};
use std::path::Path;

mod analyzer;
mod cli;
mod elmore;
mod evaluate;
mod export;
mod name_map;
mod netlist;
mod parser;
mod rctree;

use crate::analyzer::{Analyzer, AnalyzerConfig};
use crate::cli::CliArgs;
use crate::export::NetGraph;

fn main() {
    env_logger::init();

    let matches = create_cli().get_matches();

    if let Err(e) = run_application(&matches) {
        error!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}

fn create_cli() -> Command {
    Command::new("RustElmore")
        .version("0.1.0")
        .about("A fast Elmore delay estimator for SPEF parasitic netlists written in Rust")
        .author("RustElmore Team")
        .arg(
            Arg::new("input")
                .help("Input SPEF file with parasitic RC networks")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output file for the per-load delay table"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .default_value("txt")
                .value_parser(["txt", "csv", "json"])
                .help("Output format"),
        )
        .arg(
            Arg::new("engine")
                .long("engine")
                .value_name("VARIANT")
                .default_value("adjacency")
                .value_parser(["adjacency", "matrix"])
                .help("RC-tree realization to evaluate on"),
        )
        .arg(
            Arg::new("ln2")
                .long("ln2")
                .action(ArgAction::SetTrue)
                .help("Scale delays by ln(2) for the 50%-threshold approximation"),
        )
        .arg(
            Arg::new("r-unit")
                .long("r-unit")
                .value_name("SCALE")
                .default_value("1.0")
                .help("Resistance unit scale factor"),
        )
        .arg(
            Arg::new("c-unit")
                .long("c-unit")
                .value_name("SCALE")
                .default_value("1.0")
                .help("Capacitance unit scale factor"),
        )
        .arg(
            Arg::new("netlist")
                .long("netlist")
                .value_name("FILE")
                .help("Netlist-direction file supplying driver/load pins per net"),
        )
        .arg(
            Arg::new("golden")
                .long("golden")
                .value_name("FILE")
                .help("Golden delay table to compare the computed delays against"),
        )
        .arg(
            Arg::new("graph-json")
                .long("graph-json")
                .value_name("FILE")
                .help("Export the first net's parasitic graph as JSON"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Increase verbosity level"),
        )
}

fn run_application(matches: &ArgMatches) -> anyhow::Result<()> {
    let args = CliArgs::from_matches(matches)?;

    info!("{}", "Starting RustElmore - SPEF Elmore delay estimator".green().bold());
    info!("Input file: {}", args.input_file.bright_blue());

    // Validate input file exists
    if !Path::new(&args.input_file).exists() {
        return Err(anyhow::anyhow!("Input file '{}' not found", args.input_file));
    }

    let config = AnalyzerConfig {
        r_unit: args.r_unit,
        c_unit: args.c_unit,
        apply_ln2: args.apply_ln2,
        variant: args.engine,
    };

    let mut analyzer = Analyzer::with_config(config);

    if let Some(netlist_file) = &args.netlist_file {
        info!("Using pin directions from: {}", netlist_file.bright_blue());
        let directions = netlist::read_netlist_info(netlist_file)?;
        analyzer.set_net_directions(directions);
    }

    analyzer.run_file(&args.input_file)?;

    // Export or summarize delay results
    if let Some(output_file) = &args.output_file {
        analyzer.export_results(output_file, args.output_format)?;
        info!("Results exported to: {}", output_file.bright_green());
    } else {
        analyzer.print_summary();
    }

    // Optional comparison against golden data
    if let Some(golden_file) = &args.golden_file {
        info!("Comparing against golden data: {}", golden_file.bright_blue());
        let golden = evaluate::read_delay_file(golden_file)?;
        let stats = evaluate::compare(&analyzer.delay_table(), &golden);
        stats.print();
    }

    // Optional graph export of the first net
    if let Some(graph_file) = &args.graph_json_file {
        match analyzer.first_record() {
            Some(record) => NetGraph::from_record(record).write_json(graph_file)?,
            None => info!("No nets parsed, skipping graph export"),
        }
    }

    info!("{}", "Delay analysis completed successfully!".green().bold());
    Ok(())
}
