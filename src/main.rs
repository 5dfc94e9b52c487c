use anyhow::Result;
use clap::Parser;
use icloudsort::icloudsort_core::catalog::IngestOptions;
use icloudsort::icloudsort_core::classify::SkipPolicy;
use icloudsort::icloudsort_core::exif::exiftool_available;
use icloudsort::icloudsort_core::planner::{ActionKind, ExecuteOptions, PlanOptions};
use icloudsort::icloudsort_core::{
    Cli, DirPattern, ExifToolExtractor, FsCopier, LogReporter, NoTags, RunOptions, TagExtractor,
    run,
};
use simplelog::{CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, WriteLogger};
use std::fs::File;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize loggers
    let term_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        term_level,
        Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )];

    if cli.log {
        loggers.push(WriteLogger::new(
            cli.log_level,
            Config::default(),
            File::create("icloudsort.log")?,
        ));
    }

    CombinedLogger::init(loggers)?;

    if cli.verbose {
        log::info!("Verbose mode enabled");
    }

    let mut dry_run = cli.dry_run;
    if cli.output.is_none() && !dry_run {
        log::warn!("No output directory specified, assuming --dry-run mode");
        dry_run = true;
    }

    let options = RunOptions {
        source: cli.source.clone(),
        ingest: IngestOptions {
            validate_checksums: cli.validate_checksums,
            checksum_policy: cli.checksum_policy,
        },
        skip: SkipPolicy {
            exclude_personal: cli.skip_personal_library,
            exclude_shared: cli.skip_shared_library,
        },
        plan: PlanOptions {
            output_root: cli.output.clone(),
            pattern: DirPattern::parse(&cli.date_format)?,
            overwrite: cli.overwrite,
        },
        execute: ExecuteOptions {
            dry_run,
            set_timestamps: !cli.no_set_timestamps,
        },
    };

    let mut extractor: Box<dyn TagExtractor> = if cli.skip_metadata {
        Box::new(NoTags)
    } else {
        if !exiftool_available() {
            anyhow::bail!("exiftool not found on PATH, install it or pass --skip-metadata");
        }
        Box::new(ExifToolExtractor::new()?)
    };

    let summary = run(&options, extractor.as_mut(), &FsCopier, &LogReporter)?;
    drop(extractor);

    if dry_run {
        println!("\n[DRY RUN] Would copy:");
        for action in summary.actions.iter().filter(|a| a.kind.is_copy()) {
            if let Some(destination) = &action.destination {
                println!("  {} -> {}", action.filename, destination.display());
            }
        }
    }

    println!("\nDone!");
    println!("  {} personal, {} shared ({} untracked)", summary.personal, summary.shared, summary.untracked);
    if summary.excluded > 0 {
        println!("  {} excluded", summary.excluded);
    }
    if dry_run {
        println!("  {} files would be copied", summary.would_copy);
    } else {
        println!("  {} files copied", summary.copied);
    }
    if summary.skipped_existing > 0 {
        println!("  {} already present (use --overwrite to replace)", summary.skipped_existing);
    }
    let unresolved = summary
        .actions
        .iter()
        .filter(|a| a.kind == ActionKind::SkipUnresolved)
        .count();
    if unresolved > 0 {
        println!("  {} without a usable creation date", unresolved);
    }
    if !summary.anomalies.is_empty() {
        println!("  {} problems reported:", summary.anomalies.len());
        for anomaly in &summary.anomalies {
            println!("    - {}", anomaly);
        }
    }

    Ok(())
}
