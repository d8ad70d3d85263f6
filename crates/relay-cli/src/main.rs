use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use relay_core::{init_tracing_with, BatchTranspiler, TranspileConfig};

fn cli() -> Command {
    Command::new("relay")
        .version(relay_core::VERSION)
        .about("Transpile 4GL method sources into ES modules")
        .arg(
            Arg::new("input")
                .value_name("DIR")
                .help("Directory of method sources")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("out")
                .long("out")
                .value_name("DIR")
                .help("Output directory for modules and reports")
                .default_value("./out"),
        )
        .arg(
            Arg::new("commands")
                .long("commands")
                .value_name("DIR")
                .help("Directory of command implementation modules")
                .default_value("./commands"),
        )
        .arg(
            Arg::new("params")
                .long("params")
                .value_name("N")
                .help("Positional parameters on every generated function"),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .value_name("N")
                .help("Worker threads (0 = all cores)"),
        )
        .arg(
            Arg::new("chunk-size")
                .long("chunk-size")
                .value_name("N")
                .help("Files handed to a worker at once"),
        )
        .arg(
            Arg::new("no-recovery")
                .long("no-recovery")
                .help("Leave failed constructs as written instead of splicing stand-ins")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("source-maps")
                .long("source-maps")
                .help("Write a position map next to every module")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
}

fn main() -> Result<()> {
    let matches = cli().get_matches();

    init_tracing_with(if matches.get_flag("debug") {
        "relay_core=debug"
    } else {
        "relay_core=info"
    });

    let mut config = TranspileConfig::default();
    if let Some(params) = matches.get_one::<String>("params") {
        config = config.with_parameter_count(params.parse().context("--params expects a number")?);
    }
    if let Some(threads) = matches.get_one::<String>("threads") {
        config = config.with_threads(threads.parse().context("--threads expects a number")?);
    }
    if let Some(chunk_size) = matches.get_one::<String>("chunk-size") {
        config = config.with_chunk_size(chunk_size.parse().context("--chunk-size expects a number")?);
    }
    if matches.get_flag("no-recovery") {
        config = config.with_recovery(false);
    }
    if matches.get_flag("source-maps") {
        config = config.with_position_maps(true);
    }

    let input = PathBuf::from(matches.get_one::<String>("input").context("missing input directory")?);
    let out = PathBuf::from(matches.get_one::<String>("out").context("missing output directory")?);
    let commands = PathBuf::from(matches.get_one::<String>("commands").context("missing commands directory")?);

    let position_maps = config.emit_position_maps;
    let outcome = BatchTranspiler::new(config).run(&input, &commands)?;
    outcome.write(&out, position_maps)?;

    let stats = &outcome.statistics;
    println!("Relay v{}", relay_core::VERSION);
    println!(
        "Files: {} processed, {} transformed, {} with errors ({:.1}% clean)",
        stats.files_processed,
        stats.files_transformed,
        stats.files_with_errors,
        stats.success_rate() * 100.0
    );
    println!(
        "Diagnostics: {} errors, {} warnings",
        outcome.error_count(),
        outcome.warning_count()
    );
    for recommendation in &outcome.report.recommendations {
        println!("  - {recommendation}");
    }
    println!("Output: {} ({} ms)", out.display(), stats.duration_ms);

    if outcome.error_count() > 0 {
        std::process::exit(1);
    }
    Ok(())
}
