use std::io;
use std::path::{Path, PathBuf};

use airfoil_calc::{
    Batch, BatchEntry, Constants, Criterion, Selection, SortKey, analyze, extract_values,
    extrema, filter, inventory, limits_frame, list_available_re, samples_frame, sort_records,
    write_csv,
};
use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use serde_json::{Map, Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Tools for XFLR5 polar analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log debug events (per-file parse details)
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Figures of merit for every selected polar
    Limits(LimitsArgs),
    /// Values at requested angles of attack
    Extract(ExtractArgs),
    /// Min/max of CL, CD, Cm and Cl/Cd per polar
    Extrema(CommonArgs),
    /// Reynolds numbers available in the polars directory
    ListRe(DirArgs),
    /// Profiles grouped by Reynolds number
    Inventory(DirArgs),
}

#[derive(Args, Debug)]
struct DirArgs {
    /// Polars directory
    #[arg(long, default_value = "polars", value_hint = ValueHint::DirPath)]
    polars_dir: PathBuf,

    /// Analysis constants (JSON); missing keys use defaults
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CommonArgs {
    #[command(flatten)]
    dir: DirArgs,

    /// Profiles to include (comma-separated name substrings). Default: all
    #[arg(short, long)]
    profiles: Option<String>,

    /// Reynolds filter on file names (e.g. 0.100)
    #[arg(long)]
    re: Option<String>,

    /// Filter criterion, e.g. 'Cl/Cd_max > 100' or 'cl_i between 0.3,0.8'. Repeatable
    #[arg(short, long = "filter")]
    filters: Vec<String>,
}

#[derive(Args, Debug)]
struct LimitsArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Sort column; prefix with '-' for descending (e.g. -Cl/Cd_max)
    #[arg(long)]
    sort: Option<String>,

    /// Export the table to CSV
    #[arg(long, value_hint = ValueHint::FilePath)]
    csv: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Angles of attack to sample (comma-separated degrees)
    #[arg(long, required = true)]
    alphas: String,

    /// Export the samples to CSV
    #[arg(long, value_hint = ValueHint::FilePath)]
    csv: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Limits(args) => handle_limits(args),
        Command::Extract(args) => handle_extract(args),
        Command::Extrema(args) => handle_extrema(args),
        Command::ListRe(args) => handle_list_re(args),
        Command::Inventory(args) => handle_inventory(args),
    }
}

fn load_constants(dir: &DirArgs) -> Result<Constants> {
    match &dir.config {
        Some(path) => Constants::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(Constants::new()),
    }
}

fn parse_criteria(filters: &[String]) -> Result<Vec<Criterion>> {
    filters
        .iter()
        .map(|text| {
            text.parse::<Criterion>()
                .with_context(|| format!("parsing filter '{text}'"))
        })
        .collect()
}

fn parse_alphas(text: &str) -> Result<Vec<f64>> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| anyhow!("invalid angle '{s}' in --alphas"))
        })
        .collect()
}

fn selection(common: &CommonArgs) -> Selection {
    Selection::new(common.profiles.as_deref(), common.re.as_deref())
}

fn export(df: &mut polars::prelude::DataFrame, path: &Path) -> Result<()> {
    write_csv(df, path).with_context(|| format!("exporting {}", path.display()))?;
    println!("Data exported to {}", path.display());
    Ok(())
}

fn handle_limits(args: LimitsArgs) -> Result<()> {
    let constants = load_constants(&args.common.dir)?;
    let criteria = parse_criteria(&args.common.filters)?;
    let sort = args.sort.as_deref().map(SortKey::parse).transpose()?;

    let report = analyze(&args.common.dir.polars_dir, &selection(&args.common), &constants)?;
    let mut records = report.records.clone();
    if !criteria.is_empty() {
        records = filter(&records, &criteria);
        if records.is_empty() {
            println!("No profiles match the specified criteria.");
            return Ok(());
        }
        info!(matching = records.len(), "filters applied");
    }
    if let Some(key) = &sort {
        sort_records(&mut records, key);
    }

    let mut df = limits_frame(&records)?;
    match &args.csv {
        Some(path) => export(&mut df, path)?,
        None => println!("{df}"),
    }
    println!("{}", report.summary());
    Ok(())
}

/// Drop batch entries whose polar fails `criteria`, judged on its limits record.
fn retain_passing<T>(
    batch: &mut Batch<T>,
    dir: &Path,
    selection: &Selection,
    constants: &Constants,
    criteria: &[Criterion],
) -> Result<()> {
    if criteria.is_empty() {
        return Ok(());
    }
    let passing = analyze(dir, selection, constants)?.passing_files(criteria);
    batch.retain_files(&passing);
    info!(matching = batch.entries.len(), "filters applied");
    Ok(())
}

/// JSON object keyed by file stem, carrying profile and Reynolds number.
fn labelled<T>(entry: &BatchEntry<T>, body: Map<String, Value>) -> (String, Value) {
    let mut object = Map::new();
    object.insert("Profile".to_string(), json!(entry.profile));
    object.insert("Re".to_string(), json!(entry.reynolds));
    object.extend(body);
    (entry.label(), Value::Object(object))
}

fn handle_extract(args: ExtractArgs) -> Result<()> {
    let constants = load_constants(&args.common.dir)?;
    let criteria = parse_criteria(&args.common.filters)?;
    let alphas = parse_alphas(&args.alphas)?;
    if alphas.is_empty() {
        return Err(anyhow!("--alphas needs at least one angle"));
    }

    let dir = &args.common.dir.polars_dir;
    let selection = selection(&args.common);
    let mut batch = extract_values(dir, &selection, &alphas, &constants)?;
    retain_passing(&mut batch, dir, &selection, &constants, &criteria)?;
    if !criteria.is_empty() && batch.entries.is_empty() {
        println!("No profiles match the specified criteria.");
        return Ok(());
    }

    match &args.csv {
        Some(path) => export(&mut samples_frame(&batch.entries)?, path)?,
        None => {
            let out: Map<String, Value> = batch
                .entries
                .iter()
                .map(|entry| {
                    let per_angle: Map<String, Value> = entry
                        .value
                        .iter()
                        .map(|s| {
                            let values = json!({
                                "alpha": s.row.alpha,
                                "CL": s.row.cl,
                                "CD": s.row.cd,
                                "CDp": s.row.cdp,
                                "Cm": s.row.cm,
                                "Cl_Cd": s.cl_cd(),
                            });
                            (format!("alpha_{}", s.target), values)
                        })
                        .collect();
                    labelled(entry, per_angle)
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&Value::Object(out))?);
        }
    }
    println!("{}", batch.summary());
    Ok(())
}

fn handle_extrema(args: CommonArgs) -> Result<()> {
    let constants = load_constants(&args.dir)?;
    let criteria = parse_criteria(&args.filters)?;
    let dir = &args.dir.polars_dir;
    let selection = selection(&args);
    let mut batch = extrema(dir, &selection, &constants)?;
    retain_passing(&mut batch, dir, &selection, &constants, &criteria)?;

    let out: Map<String, Value> = batch
        .entries
        .iter()
        .map(|entry| -> Result<(String, Value)> {
            let body = match serde_json::to_value(&entry.value)? {
                Value::Object(map) => map,
                other => Map::from_iter([("extrema".to_string(), other)]),
            };
            Ok(labelled(entry, body))
        })
        .collect::<Result<_>>()?;
    println!("{}", serde_json::to_string_pretty(&Value::Object(out))?);
    println!("{}", batch.summary());
    Ok(())
}

fn handle_list_re(args: DirArgs) -> Result<()> {
    let constants = load_constants(&args)?;
    let values = list_available_re(&args.polars_dir, &constants)?;
    println!("Available Reynolds (appearing in file names):");
    for v in values {
        println!(" - {v}");
    }
    Ok(())
}

fn handle_inventory(args: DirArgs) -> Result<()> {
    let inv = inventory(&args.polars_dir)?;
    println!("{}", inv.report());
    Ok(())
}
