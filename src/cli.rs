//! Command-line front end: argument types and command bodies.
//!
//! Command bodies write to any `Write` so they can be driven from tests.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::batch::par_map;
use crate::catalog::{HaloCatalog, NodeId, Snapshot, default_cache_path, load_catalog, save_cache};
use crate::error::HaloError;
use crate::genealogy::{PathPolicy, build_tree, hosts_at_snapshot, render_dot, render_text};
use crate::history::{CmhTable, DEFAULT_NFW_F, HistoryOptions, ThresholdPolicy, compute_history};
use crate::runtime::RunContext;

#[derive(Debug, Parser)]
#[command(name = "dhalo")]
#[command(version, about = "Merger-history tools for DHalo catalogues", long_about = None)]
pub struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Worker threads for batch commands.
    #[arg(long, env = "DHALO_THREADS", global = true)]
    pub threads: Option<usize>,

    /// Identifier attached to this run's log lines.
    #[arg(long, env = "DHALO_RUN_ID", global = true)]
    pub run_id: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn context(&self) -> RunContext {
        RunContext::new(self.run_id.clone(), self.verbose, self.threads)
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Collapsed mass history of one or more host haloes, as a table.
    Cmh(CmhArgs),
    /// Host haloes with at least one group member at a snapshot.
    Query(QueryArgs),
    /// Merger tree of one host halo.
    Tree(TreeArgs),
    /// Convert a catalogue into a `.npy` cache.
    Cache(CacheArgs),
}

#[derive(Debug, clap::Args)]
pub struct CmhArgs {
    /// Catalogue file (.npz table or .npy cache).
    pub catalog: PathBuf,

    /// Root nodeIndex values.
    pub roots: Vec<NodeId>,

    /// Text file with one nodeIndex per line (a header line is allowed).
    #[arg(long)]
    pub ids_file: Option<PathBuf>,

    /// NFW f parameter: minimum progenitor mass as a fraction of the root's.
    #[arg(long, default_value_t = DEFAULT_NFW_F)]
    pub nfw_f: f64,

    /// What progenitors are weighed by.
    #[arg(long, value_enum, default_value_t = ThresholdPolicy::HostMass)]
    pub policy: ThresholdPolicy,

    /// How progenitors reached through several merger lines are counted.
    #[arg(long, value_enum, default_value_t = PathPolicy::Distinct)]
    pub paths: PathPolicy,

    /// Output field delimiter.
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,
}

#[derive(Debug, clap::Args)]
pub struct QueryArgs {
    pub catalog: PathBuf,
    pub snapshot: Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TreeFormat {
    Text,
    Dot,
}

#[derive(Debug, clap::Args)]
pub struct TreeArgs {
    pub catalog: PathBuf,
    pub root: NodeId,
    #[arg(long, value_enum, default_value_t = TreeFormat::Text)]
    pub format: TreeFormat,
}

#[derive(Debug, clap::Args)]
pub struct CacheArgs {
    pub catalog: PathBuf,
    /// Output path; defaults to `<stem>_cache.npy` next to the input.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Parses an ids listing: one id per line, blank lines and `#` comments
/// skipped, a non-numeric first line taken as a header.
pub fn parse_ids(text: &str) -> Result<Vec<NodeId>> {
    let mut ids = Vec::new();
    let mut first = true;
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        // first whitespace/comma separated field
        let field = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .next()
            .unwrap_or(line);
        match field.parse::<NodeId>() {
            Ok(id) => ids.push(id),
            Err(_) if first => {}
            Err(err) => bail!("line {}: bad nodeIndex {:?}: {}", lineno + 1, field, err),
        }
        first = false;
    }
    Ok(ids)
}

pub fn read_ids(path: &Path) -> Result<Vec<NodeId>> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let ids = parse_ids(&text).with_context(|| format!("in {}", path.display()))?;
    tracing::info!(path = %path.display(), ids = ids.len(), "loaded root ids");
    Ok(ids)
}

/// Outcome of a `cmh` batch: rows written plus the roots that failed.
#[derive(Debug)]
pub struct CmhReport {
    pub written: usize,
    pub failures: Vec<HaloError>,
}

/// Computes the CMH of every root in parallel and writes the pivot table.
/// Failed roots are left out of the table and returned in the report.
pub fn run_cmh<W: Write>(
    ctx: &RunContext,
    catalog: &HaloCatalog,
    roots: &[NodeId],
    nfw_f: f64,
    options: HistoryOptions,
    delimiter: char,
    out: W,
) -> Result<CmhReport> {
    if !nfw_f.is_finite() || nfw_f < 0.0 {
        return Err(HaloError::InvalidThreshold(nfw_f).into());
    }

    let results = par_map(ctx, roots, |&root| {
        compute_history(catalog, root, nfw_f, options)
    });

    let mut histories = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(h) => histories.push(h),
            Err(err) => failures.push(err),
        }
    }

    let table = CmhTable::from_histories(&histories);
    table
        .write_delimited(out, delimiter)
        .context("write CMH table")?;

    tracing::info!(
        run = %ctx.run_id,
        haloes = histories.len(),
        failed = failures.len(),
        snapshots = table.snapshots.len(),
        "pivoted CMHs"
    );
    Ok(CmhReport {
        written: histories.len(),
        failures,
    })
}

pub fn run_query<W: Write>(catalog: &HaloCatalog, snapshot: Snapshot, mut out: W) -> Result<usize> {
    let hosts = hosts_at_snapshot(catalog, snapshot)?;
    for id in &hosts {
        writeln!(out, "{id}")?;
    }
    out.flush()?;
    Ok(hosts.len())
}

pub fn run_tree<W: Write>(
    catalog: &HaloCatalog,
    root: NodeId,
    format: TreeFormat,
    mut out: W,
) -> Result<()> {
    let tree = build_tree(catalog, root)?;
    let rendered = match format {
        TreeFormat::Text => render_text(&tree, catalog)?,
        TreeFormat::Dot => render_dot(&tree, catalog)?,
    };
    out.write_all(rendered.as_bytes())?;
    out.flush()?;
    Ok(())
}

/// Runs the parsed command. `Ok(false)` means the command finished but some
/// items failed.
pub fn execute<W: Write>(cli: Cli, ctx: &RunContext, out: W) -> Result<bool> {
    match cli.command {
        Commands::Cmh(args) => {
            let mut roots = args.roots;
            if let Some(path) = &args.ids_file {
                roots.extend(read_ids(path)?);
            }
            if roots.is_empty() {
                bail!("no root ids given (pass ids or --ids-file)");
            }
            let catalog = load_catalog(&args.catalog)?;
            let options = HistoryOptions {
                threshold: args.policy,
                paths: args.paths,
            };
            let report = run_cmh(ctx, &catalog, &roots, args.nfw_f, options, args.delimiter, out)?;
            for err in &report.failures {
                let cause = err.root_cause();
                tracing::error!(kind = cause.kind(), "{err}");
            }
            Ok(report.failures.is_empty())
        }
        Commands::Query(args) => {
            let catalog = load_catalog(&args.catalog)?;
            let n = run_query(&catalog, args.snapshot, out)?;
            tracing::debug!(snapshot = args.snapshot, hosts = n, "query done");
            Ok(true)
        }
        Commands::Tree(args) => {
            let catalog = load_catalog(&args.catalog)?;
            run_tree(&catalog, args.root, args.format, out)?;
            Ok(true)
        }
        Commands::Cache(args) => {
            let catalog = load_catalog(&args.catalog)?;
            let output = args
                .output
                .unwrap_or_else(|| default_cache_path(&args.catalog));
            save_cache(&output, &catalog)?;
            tracing::info!(path = %output.display(), records = catalog.len(), "cache written");
            Ok(true)
        }
    }
}
