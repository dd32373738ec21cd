// ABOUTME: CLI that extracts drug-encyclopedia detail pages from files, stdin, search results or the network.
// ABOUTME: Prints one JSON report per page and a status summary on stderr.

mod fetch;
mod store;

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use medicollect_extract::preview::DETAIL_URL_PREFIX;
use medicollect_extract::{
    completion_percentage, find_identifier, mine_keywords, missing_fields, parse_search_response,
    validate, ExtractedRecord, ExtractionStats, Extractor, FieldSchema, NormalizedRecord, Status,
    Thresholds,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::fetch::Fetcher;
use crate::store::{FileIdStore, IdStore, MemoryIdStore};

/// Extract structured fields from drug-encyclopedia detail pages.
#[derive(Parser, Debug)]
#[command(name = "medicollect")]
#[command(about = "Extract drug detail pages and print JSON records", long_about = None)]
struct Args {
    /// HTML files to extract ("-" reads stdin), or identifiers with --fetch.
    #[arg(required_unless_present = "search")]
    targets: Vec<String>,

    /// Search API response JSON; medicine pages found in it are fetched
    /// after the listed targets.
    #[arg(long, requires = "fetch")]
    search: Option<PathBuf>,

    /// Page identifier; only valid with a single target. Defaults to the
    /// first nine-digit run in the file name.
    #[arg(long)]
    id: Option<String>,

    /// Treat targets as identifiers and download their detail pages.
    #[arg(long, default_value_t = false)]
    fetch: bool,

    /// URL the identifier is appended to when fetching.
    #[arg(long, default_value = DETAIL_URL_PREFIX)]
    base_url: String,

    /// Minimum delay between requests, in milliseconds.
    #[arg(long, default_value_t = 200)]
    delay_ms: u64,

    /// Retries per page after a failed request.
    #[arg(long, default_value_t = 3)]
    retries: u32,

    /// Field schema JSON replacing the builtin one.
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Thresholds JSON; missing keys keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// File of processed identifiers to skip; successful pages are appended.
    #[arg(long)]
    processed_ids: Option<PathBuf>,

    /// Print normalized records instead of raw extractions.
    #[arg(long, default_value_t = false)]
    normalize: bool,

    /// Output compact JSON instead of pretty.
    #[arg(long, default_value_t = false)]
    compact: bool,
}

#[derive(Debug, Serialize)]
struct Report {
    identifier: String,
    status: Status,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation_error: Option<String>,
    completion: f64,
    missing_fields: Vec<String>,
    keywords: BTreeSet<String>,
    record: serde_json::Value,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(1)
        }
    }
}

/// Returns Ok(false) when some input could not be read or fetched.
fn run(args: &Args) -> Result<bool> {
    let targets = collect_targets(args)?;
    if args.id.is_some() && targets.len() > 1 {
        bail!("--id is only valid with a single target");
    }

    let extractor = build_extractor(args)?;
    let mut store: Box<dyn IdStore> = match &args.processed_ids {
        Some(path) => Box::new(FileIdStore::open(path)?),
        None => Box::new(MemoryIdStore::new()),
    };
    let mut fetcher = if args.fetch {
        Some(Fetcher::new(
            args.base_url.clone(),
            Duration::from_millis(args.delay_ms),
            args.retries,
        )?)
    } else {
        None
    };

    let mut stats = ExtractionStats::new();
    let mut all_ok = true;

    for target in &targets {
        let id = match target_identifier(args, target) {
            Some(id) => id,
            None => {
                eprintln!("error: no identifier for {}; pass --id", target);
                all_ok = false;
                continue;
            }
        };
        if store.contains(&id) {
            tracing::info!(identifier = %id, "already processed, skipping");
            continue;
        }

        let html = match &mut fetcher {
            Some(fetcher) => fetcher.fetch(&id),
            None => read_target(target),
        };
        let html = match html {
            Ok(html) => html,
            Err(err) => {
                eprintln!("error reading {}: {:#}", target, err);
                stats.record_fetch_failure();
                all_ok = false;
                continue;
            }
        };

        let Some(record) = extractor.extract_html(&html, &id) else {
            eprintln!("error: malformed identifier {:?} for {}", id, target);
            all_ok = false;
            continue;
        };
        stats.record(record.status);

        let report = build_report(&extractor, &record, args.normalize)?;
        if report.valid && record.status == Status::Success {
            store.add(&id)?;
        }
        print_json(&report, args.compact)?;
    }

    eprintln!(
        "{} (success rate {:.1}%, {} ids processed)",
        stats,
        stats.success_rate() * 100.0,
        store.len()
    );
    Ok(all_ok)
}

/// Listed targets followed by the identifiers of search hits, without repeats.
fn collect_targets(args: &Args) -> Result<Vec<String>> {
    let mut targets = args.targets.clone();
    let Some(path) = &args.search else {
        return Ok(targets);
    };
    let json = read_file(path)?;
    let previews = parse_search_response(&json)
        .with_context(|| format!("parsing search results in {}", path.display()))?;
    for preview in previews {
        if targets.contains(&preview.identifier) {
            continue;
        }
        tracing::info!(
            identifier = %preview.identifier,
            title = %preview.title,
            url = %preview.detail_url(),
            "queued search result"
        );
        targets.push(preview.identifier);
    }
    Ok(targets)
}

fn build_extractor(args: &Args) -> Result<Extractor> {
    let mut builder = Extractor::builder();
    if let Some(path) = &args.schema {
        let json = read_file(path)?;
        builder = builder.schema(FieldSchema::from_json(&json)?);
    }
    if let Some(path) = &args.config {
        let json = read_file(path)?;
        builder = builder.thresholds(Thresholds::from_json(&json)?);
    }
    Ok(builder.build()?)
}

fn build_report(extractor: &Extractor, record: &ExtractedRecord, normalize: bool) -> Result<Report> {
    let validation = validate(record);
    if let Err(reason) = &validation {
        tracing::warn!(identifier = %record.identifier, %reason, "record failed validation");
    }
    let body = if normalize {
        serde_json::to_value(NormalizedRecord::from(record))?
    } else {
        serde_json::to_value(record)?
    };
    Ok(Report {
        identifier: record.identifier.clone(),
        status: record.status,
        valid: validation.is_ok(),
        validation_error: validation.err().map(|e| e.to_string()),
        completion: completion_percentage(record, extractor.schema()),
        missing_fields: missing_fields(record, extractor.schema()),
        keywords: mine_keywords(record),
        record: body,
    })
}

fn target_identifier(args: &Args, target: &str) -> Option<String> {
    if let Some(id) = &args.id {
        return Some(id.clone());
    }
    if args.fetch {
        return Some(target.to_string());
    }
    let name = Path::new(target).file_name()?.to_str()?;
    find_identifier(name).map(String::from)
}

fn read_target(target: &str) -> Result<String> {
    if target == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    read_file(Path::new(target))
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    if compact {
        println!("{}", serde_json::to_string(value)?);
    } else {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}
