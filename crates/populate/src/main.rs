use std::io::BufRead;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use casefile_common::config::{default_config_path, load_config, AppConfig};
use casefile_extract_dispatch::{run_extractor, Route, RouterBuilder};
use casefile_extract_types::ExtractOutcome;
use casefile_populate::{run, sniff_pass, RunOptions, Shard};
use casefile_store::{self as store, NewFile};

#[derive(Parser)]
#[command(name = "casefile", about = "Type sniffing and metadata extraction over a file index")]
struct Args {
    /// Path to config file (default: /etc/casefile/casefile.toml as root, else ~/.config/casefile/casefile.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Index database, overriding `index.db_path`
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the index schema
    Init,
    /// Add file rows to the index (paths from arguments, or one per line on stdin)
    Add { paths: Vec<String> },
    /// Fill in true extensions from file content
    Sniff {
        /// Re-sniff rows that already have a true extension
        #[arg(long)]
        all: bool,
        /// Directory relative stored paths are resolved against, overriding `index.base_dir`
        #[arg(long)]
        base_dir: Option<PathBuf>,
    },
    /// Extract metadata for every indexed file
    Populate {
        /// Process only rows with id % N == K, given as K/N
        #[arg(long)]
        shard: Option<Shard>,
        /// Route unresolved rows by declared extension without sniffing
        #[arg(long)]
        no_sniff: bool,
    },
    /// Run routing and extraction on one file and print the record as JSON
    Extract { path: PathBuf },
    /// Show which extractor a file name routes to
    Route {
        filename: String,
        /// Sniffed extension, "" for a native executable
        #[arg(long)]
        true_ext: Option<String>,
    },
    /// Print effective configuration with defaults filled in
    Config,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(db) = &args.db {
        config.index.db_path = db.clone();
    }

    let _guard = casefile_common::logging::init("warn,casefile=info", &config.log);

    let opts = RunOptions::from_config(&config);
    for (name, on) in opts.extractor.capabilities.describe() {
        tracing::debug!("capability {name}: {}", if on { "enabled" } else { "disabled" });
    }

    match args.command {
        Command::Init => {
            store::open(Path::new(&config.index.db_path))?;
            println!("initialised {}", config.index.db_path);
        }

        Command::Add { paths } => {
            let conn = store::open(Path::new(&config.index.db_path))?;
            let paths = if paths.is_empty() { read_stdin_lines()? } else { paths };
            for p in &paths {
                store::upsert_file(&conn, &new_file(&config, p))?;
            }
            println!("{} files added", paths.len());
        }

        Command::Sniff { all, base_dir } => {
            let conn = store::open(Path::new(&config.index.db_path))?;
            let base = base_dir.as_deref().or(opts.base_dir.as_deref());
            let summary = sniff_pass(&conn, &opts.extractor.capabilities, all, base, |i, total, path| {
                tracing::debug!("[{i}/{total}] {path}");
            })?;
            println!(
                "resolved={} unknown={} errors={}",
                summary.resolved, summary.unknown, summary.errors
            );
        }

        Command::Populate { shard, no_sniff } => {
            let conn = store::open(Path::new(&config.index.db_path))?;
            let opts = RunOptions { shard, sniff_unresolved: opts.sniff_unresolved && !no_sniff, ..opts };
            let summary = run(&conn, &opts, |p| {
                info!("[{}/{}] {} {}", p.index, p.total, p.status, p.filename);
                ControlFlow::Continue(())
            })?;
            println!(
                "OK={} SKIPPED={} ERRORS={}  log: {}",
                summary.ok,
                summary.skipped,
                summary.errors,
                summary.log_path.display()
            );
        }

        Command::Extract { path } => {
            let out = extract_one(&path, &opts)?;
            println!("{}", serde_json::to_string_pretty(&out).context("serializing record")?);
        }

        Command::Route { filename, true_ext } => {
            let router = RouterBuilder::with_defaults().build();
            let name = Path::new(&filename)
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            let declared = Path::new(&filename).extension().map(|e| e.to_string_lossy().into_owned());
            match router.resolve(&name, true_ext.as_deref(), declared.as_deref()) {
                Route::Dispatch(ex, key) => println!("{} (via {key})", ex.family()),
                Route::Skip(reason) => println!("SKIPPED ({reason})"),
            }
        }

        Command::Config => {
            let toml = toml::to_string_pretty(&config).context("serializing config to TOML")?;
            let path = args.config.unwrap_or_else(default_config_path);
            println!("# Effective configuration (file: {path})");
            println!("# Values shown include defaults for any fields not set in your file.");
            println!();
            print!("{toml}");
        }
    }

    Ok(())
}

fn read_stdin_lines() -> Result<Vec<String>> {
    let mut out = Vec::new();
    for line in std::io::stdin().lock().lines() {
        let line = line.context("reading paths from stdin")?;
        let line = line.trim();
        if !line.is_empty() {
            out.push(line.to_string());
        }
    }
    Ok(out)
}

fn new_file(config: &AppConfig, stored: &str) -> NewFile {
    let mut row = NewFile::from_path(stored);
    match std::fs::metadata(config.resolve_path(stored)) {
        Ok(meta) => {
            row.size_bytes = i64::try_from(meta.len()).ok();
            row.mtime = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .and_then(|d| i64::try_from(d.as_secs()).ok());
        }
        Err(e) => warn!("{stored}: {e}"),
    }
    row
}

/// Sniff, route and extract one file outside the index.
fn extract_one(path: &Path, opts: &RunOptions) -> Result<Value> {
    let caps = opts.extractor.capabilities;
    let sniffed = casefile_sniff::sniff_path(path, &caps).with_context(|| format!("reading {}", path.display()))?;
    let router = RouterBuilder::with_defaults().build();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let declared = path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut out = json!({
        "path": path.display().to_string(),
        "true_extension": sniffed.extension,
        "sniffed": sniffed.description,
    });
    let (extractor, key) = match router.resolve(&name, sniffed.extension.as_deref(), declared.as_deref()) {
        Route::Dispatch(ex, key) => (ex, key),
        Route::Skip(reason) => {
            out["status"] = json!(format!("SKIPPED ({reason})"));
            return Ok(out);
        }
    };
    out["route"] = json!(key.to_string());
    out["family"] = json!(extractor.family().as_str());

    let outcome = run_extractor(extractor.as_ref(), path, &opts.extractor);
    match &outcome {
        ExtractOutcome::PartialSuccess(_, reason) => out["partial"] = json!(reason),
        ExtractOutcome::Failure(reason) => out["error"] = json!(reason),
        ExtractOutcome::Success(_) => {}
    }
    if let Some(record) = outcome.record() {
        out["mime"] = json!(record.mime);
        let columns: Map<String, Value> = record.columns().context("serializing record")?.into_iter().collect();
        out["record"] = Value::Object(columns);
    }
    Ok(out)
}
