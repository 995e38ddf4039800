mod catalog_data;
mod config;
mod fixture;
mod runner;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use ctxbench_backend::{HttpBackend, SimBackend, SimProfile};
use ctxbench_core::{Backend, Catalog, ComparisonReport, Mode, ModeReport, SourceLocator};
use ctxbench_store::RepoStore;

use runner::{RunOptions, SessionRunner};

#[derive(Parser)]
#[command(
    name = "ctxbench",
    version,
    about = "Context-reuse benchmark: full-resend vs reference-based retrieval context"
)]
struct Cli {
    /// Content root to retrieve from (defaults to the embedded
    /// ticketd fixture, materialized into a temp directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Backend adapter
    #[arg(long, global = true)]
    backend: Option<BackendKind>,

    /// Simulated-backend profile
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Catalog JSON file (defaults to the built-in 25-task catalog)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Emit the per-step prompt-hash audit trace
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a single retrieval query and show the snippet
    Resolve {
        /// Query, e.g. "file:routing.rs" or "function-lookup:enqueue"
        query: String,
    },

    /// List catalog tasks and their queries
    Catalog,

    /// Write the embedded ticketd fixture project to a directory
    Fixture {
        /// Target directory
        #[arg(short, long)]
        dir: PathBuf,
    },

    /// Run one session in a single mode
    Run {
        /// Transmission mode
        #[arg(short, long, value_enum)]
        mode: CliMode,

        /// Number of tasks (each runs 3 steps)
        #[arg(short, long, default_value = "5")]
        tasks: usize,

        /// Print the report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run both modes and print the comparison with diagnostics
    Compare {
        /// Number of tasks (each runs 3 steps)
        #[arg(short, long, default_value = "5")]
        tasks: usize,

        /// Print the full comparison report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show current configuration
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliMode {
    FullResend,
    Reference,
}

impl From<CliMode> for Mode {
    fn from(val: CliMode) -> Self {
        match val {
            CliMode::FullResend => Mode::FullResend,
            CliMode::Reference => Mode::Reference,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendKind {
    Sim,
    Http,
}

/// Removes the materialized temp fixture when the run ends.
struct CleanupDir(PathBuf);

impl Drop for CleanupDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.trace { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load_config()?;

    match cli.command {
        Commands::Resolve { query } => {
            let (_cleanup, root) = content_root(cli.root)?;
            cmd_resolve(&RepoStore::new(root), &query)
        }
        Commands::Catalog => {
            let catalog = load_catalog(cli.catalog.as_deref())?;
            cmd_catalog(&catalog)
        }
        Commands::Fixture { dir } => cmd_fixture(&dir),
        Commands::Run { mode, tasks, json } => {
            let (_cleanup, root) = content_root(cli.root)?;
            let catalog = load_catalog(cli.catalog.as_deref())?;
            let backend = build_backend(&cfg, cli.backend, cli.profile.as_deref())?;
            let store = RepoStore::new(root);
            let options = run_options(&cfg, tasks);
            let runner = SessionRunner::new(&store, backend.as_ref(), &catalog, options);
            let report = runner.run(mode.into())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_mode_report(&report, backend.name());
            }
            Ok(())
        }
        Commands::Compare { tasks, json } => {
            let (_cleanup, root) = content_root(cli.root)?;
            let catalog = load_catalog(cli.catalog.as_deref())?;
            let store = RepoStore::new(root);
            let options = run_options(&cfg, tasks);

            // Independent backend per mode: a session-aware backend
            // must not carry cache state from baseline into treatment.
            let baseline_backend = build_backend(&cfg, cli.backend, cli.profile.as_deref())?;
            let baseline = SessionRunner::new(
                &store,
                baseline_backend.as_ref(),
                &catalog,
                options.clone(),
            )
            .run(Mode::FullResend)?;
            eprintln!(
                "[compare] baseline done: {} tasks, input {}",
                baseline.num_tasks,
                fmt_size(baseline.total_input_size)
            );

            let treatment_backend = build_backend(&cfg, cli.backend, cli.profile.as_deref())?;
            let treatment = SessionRunner::new(
                &store,
                treatment_backend.as_ref(),
                &catalog,
                options,
            )
            .run(Mode::Reference)?;
            eprintln!(
                "[compare] treatment done: {} tasks, input {}, reuse {:.1}%",
                treatment.num_tasks,
                fmt_size(treatment.total_input_size),
                treatment.reuse_rate.unwrap_or(0.0) * 100.0
            );

            let report =
                ComparisonReport::build(baseline, treatment, cfg.compare.tolerance_pct);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_comparison(&report, baseline_backend.name());
            }
            Ok(())
        }
        Commands::Config => cmd_config(&cfg),
    }
}

// ---------------------------------------------------------------------------
// Setup helpers
// ---------------------------------------------------------------------------

/// Use the given content root, or materialize the embedded fixture
/// into a temp directory cleaned up on exit.
fn content_root(root: Option<PathBuf>) -> Result<(Option<CleanupDir>, PathBuf)> {
    if let Some(root) = root {
        if !root.exists() {
            bail!("content root does not exist: {}", root.display());
        }
        return Ok((None, root));
    }
    let pid = std::process::id();
    let dir = std::env::temp_dir().join(format!("ctxbench-fixture-{pid}"));
    std::fs::create_dir_all(&dir).context("creating fixture temp dir")?;
    fixture::materialize(&dir)?;
    Ok((Some(CleanupDir(dir.clone())), dir))
}

fn load_catalog(path: Option<&std::path::Path>) -> Result<Catalog> {
    match path {
        Some(p) => {
            let content = std::fs::read_to_string(p)
                .with_context(|| format!("reading catalog {}", p.display()))?;
            Catalog::from_json_str(&content)
                .with_context(|| format!("parsing catalog {}", p.display()))
        }
        None => Ok(catalog_data::builtin()),
    }
}

fn build_backend(
    cfg: &config::Config,
    kind: Option<BackendKind>,
    profile: Option<&str>,
) -> Result<Box<dyn Backend>> {
    let kind = match kind {
        Some(k) => k,
        None => match cfg.backend.kind.as_str() {
            "sim" => BackendKind::Sim,
            "http" => BackendKind::Http,
            other => bail!("unknown backend kind in config: {other}"),
        },
    };
    match kind {
        BackendKind::Sim => {
            let profile: SimProfile = profile
                .unwrap_or(&cfg.backend.profile)
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            Ok(Box::new(SimBackend::new(profile)))
        }
        BackendKind::Http => Ok(Box::new(HttpBackend::new(
            cfg.backend.url.clone(),
            cfg.backend.model.clone(),
        ))),
    }
}

fn run_options(cfg: &config::Config, tasks: usize) -> RunOptions {
    RunOptions {
        num_tasks: tasks,
        max_output_size: cfg.session.max_output_size,
        temperature: cfg.session.temperature,
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_resolve(store: &RepoStore, query: &str) -> Result<()> {
    let snippet = store.resolve(query);
    println!("--- {} ---", snippet.snippet_id);
    println!("  query:    {}", snippet.query);
    println!("  locator:  {}", snippet.locator);
    println!("  size est: {}", snippet.size_estimate);
    if !matches!(snippet.locator, SourceLocator::Missing) {
        println!("  preview:  {}", truncate(&snippet.text.replace('\n', " "), 160));
    }
    Ok(())
}

fn cmd_catalog(catalog: &Catalog) -> Result<()> {
    println!("{:<5} {:<52} Queries", "Task", "Prompt");
    println!("{}", "-".repeat(100));
    for (i, task) in catalog.tasks.iter().enumerate() {
        println!(
            "{:<5} {:<52} {}",
            i + 1,
            truncate(&task.prompt, 50),
            task.queries.join(", ")
        );
    }
    Ok(())
}

fn cmd_fixture(dir: &std::path::Path) -> Result<()> {
    let count = fixture::materialize(dir)?;
    println!("Wrote {count} fixture files to {}", dir.display());
    Ok(())
}

fn cmd_config(cfg: &config::Config) -> Result<()> {
    println!("Config: {}", config::show_config_path());
    println!();
    println!("[session]");
    println!("  max_output_size = {}", cfg.session.max_output_size);
    println!("  temperature = {}", cfg.session.temperature);
    println!();
    println!("[compare]");
    println!("  tolerance_pct = {}", cfg.compare.tolerance_pct);
    println!();
    println!("[backend]");
    println!("  kind = {}", cfg.backend.kind);
    println!("  profile = {}", cfg.backend.profile);
    println!("  url = {}", cfg.backend.url);
    println!("  model = {}", cfg.backend.model);
    Ok(())
}

// ---------------------------------------------------------------------------
// Report printing
// ---------------------------------------------------------------------------

fn print_mode_report(report: &ModeReport, backend: &str) {
    let w = 66;
    println!();
    println!(
        "ctxbench run ({}, {} tasks, backend: {backend})",
        report.mode, report.num_tasks
    );
    println!("{}", "\u{2550}".repeat(w));
    println!("  {:<26} {}", "Steps completed", report.total_steps);
    if let Some(unique) = report.unique_snippets {
        println!("  {:<26} {}", "Unique snippets", unique);
    }
    if let Some(rate) = report.reuse_rate {
        println!("  {:<26} {:.1}%", "Snippet reuse rate", rate * 100.0);
    }
    println!(
        "  {:<26} {}",
        "Input size (est)",
        fmt_size(report.total_input_size)
    );
    println!(
        "  {:<26} {}",
        "Output size",
        fmt_size(report.total_output_size)
    );
    println!(
        "  {:<26} {}",
        "Avoided size",
        fmt_size(report.total_avoided_size)
    );
    println!(
        "  {:<26} {}",
        "Latency",
        format_duration(report.total_latency_ms)
    );
    let split_note = if report.prefill_estimated {
        " (estimated)"
    } else {
        ""
    };
    println!(
        "  {:<26} {} / {}{split_note}",
        "  prefill / decode",
        format_duration(report.total_prefill_ms),
        format_duration(report.total_decode_ms)
    );
    println!(
        "  {:<26} {}",
        "Reused size (backend)",
        fmt_opt_size(report.total_reused_size)
    );
    println!(
        "  {:<26} {}",
        "Energy",
        report
            .total_energy_joules
            .map(|j| format!("{j:.1} J"))
            .unwrap_or_else(|| "N/A".into())
    );
    println!("{}", "\u{2550}".repeat(w));

    println!();
    println!(
        "{:<6} {:>12} {:>12} {:>12} {:>8} {:>12}",
        "Task", "Input", "Output", "Latency", "New", "Avoided"
    );
    println!("{}", "\u{2500}".repeat(w));
    for task in &report.tasks {
        println!(
            "{:<6} {:>12} {:>12} {:>12} {:>8} {:>12}",
            task.task_idx,
            fmt_size(task.input_size),
            fmt_size(task.output_size),
            format_duration(task.latency_ms),
            task.new_snippets,
            fmt_size(task.avoided_size)
        );
    }
}

fn print_comparison(report: &ComparisonReport, backend: &str) {
    let w = 78;
    let baseline = &report.baseline;
    let treatment = &report.treatment;

    println!();
    println!(
        "ctxbench comparison ({} tasks, backend: {backend})",
        report.num_tasks
    );
    println!("{}", "\u{2550}".repeat(w));
    println!("  full-resend = stateless, resends every snippet each step");
    println!("  reference   = session-aware, sends each snippet once then by id");
    println!("{}", "\u{2550}".repeat(w));
    println!(
        "{:<28} {:>16} {:>16} {:>12}",
        "Metric", "full-resend", "reference", "Delta"
    );
    println!("{}", "\u{2500}".repeat(w));
    println!(
        "{:<28} {:>16} {:>16} {:>12}",
        "Steps",
        baseline.total_steps,
        treatment.total_steps,
        ""
    );
    println!(
        "{:<28} {:>16} {:>16} {:>12}",
        "Unique snippets",
        baseline
            .unique_snippets
            .map(|u| u.to_string())
            .unwrap_or_else(|| "N/A".into()),
        treatment
            .unique_snippets
            .map(|u| u.to_string())
            .unwrap_or_else(|| "N/A".into()),
        ""
    );
    println!(
        "{:<28} {:>16} {:>16} {:>12}",
        "Reuse rate",
        "0.0%",
        treatment
            .reuse_rate
            .map(|r| format!("{:.1}%", r * 100.0))
            .unwrap_or_else(|| "N/A".into()),
        ""
    );
    println!(
        "{:<28} {:>16} {:>16} {:>12}",
        "Input size (est)",
        fmt_size(baseline.total_input_size),
        fmt_size(treatment.total_input_size),
        fmt_delta(
            baseline.total_input_size as f64,
            treatment.total_input_size as f64
        )
    );
    println!(
        "{:<28} {:>16} {:>16} {:>12}",
        "Avoided size",
        fmt_size(baseline.total_avoided_size),
        fmt_size(treatment.total_avoided_size),
        ""
    );
    println!(
        "{:<28} {:>16} {:>16} {:>12}",
        "Output size",
        fmt_size(baseline.total_output_size),
        fmt_size(treatment.total_output_size),
        fmt_delta(
            baseline.total_output_size as f64,
            treatment.total_output_size as f64
        )
    );
    println!("{}", "\u{2500}".repeat(w));
    let split_note = if treatment.prefill_estimated || baseline.prefill_estimated {
        " (prefill/decode split estimated)"
    } else {
        ""
    };
    println!("Latency breakdown{split_note}");
    println!(
        "{:<28} {:>16} {:>16} {:>12}",
        "Total (ms)",
        format!("{:.0}", baseline.total_latency_ms),
        format!("{:.0}", treatment.total_latency_ms),
        fmt_delta(baseline.total_latency_ms, treatment.total_latency_ms)
    );
    println!(
        "{:<28} {:>16} {:>16} {:>12}",
        "  Prefill (ms)",
        format!("{:.0}", baseline.total_prefill_ms),
        format!("{:.0}", treatment.total_prefill_ms),
        fmt_delta(baseline.total_prefill_ms, treatment.total_prefill_ms)
    );
    println!(
        "{:<28} {:>16} {:>16} {:>12}",
        "  Decode (ms)",
        format!("{:.0}", baseline.total_decode_ms),
        format!("{:.0}", treatment.total_decode_ms),
        fmt_delta(baseline.total_decode_ms, treatment.total_decode_ms)
    );
    println!(
        "{:<28} {:>16} {:>16} {:>12}",
        "Computed input",
        fmt_opt_size(baseline.total_computed_input_size),
        fmt_opt_size(treatment.total_computed_input_size),
        ""
    );
    println!(
        "{:<28} {:>16} {:>16} {:>12}",
        "Reused (backend)",
        fmt_opt_size(baseline.total_reused_size),
        fmt_opt_size(treatment.total_reused_size),
        ""
    );
    println!(
        "{:<28} {:>16} {:>16} {:>12}",
        "Energy (J)",
        baseline
            .total_energy_joules
            .map(|j| format!("{j:.1}"))
            .unwrap_or_else(|| "N/A".into()),
        treatment
            .total_energy_joules
            .map(|j| format!("{j:.1}"))
            .unwrap_or_else(|| "N/A".into()),
        match (baseline.total_energy_joules, treatment.total_energy_joules) {
            (Some(b), Some(t)) => fmt_delta(b, t),
            _ => String::new(),
        }
    );
    println!("{}", "\u{2550}".repeat(w));

    println!();
    println!("Compute boundary diagnostic");
    println!("{}", "\u{2500}".repeat(w));
    println!(
        "  Input size reduction:     {:.1}%",
        report.deltas.input_size_reduction_pct
    );
    println!(
        "  Prefill time reduction:   {:.1}%",
        report.deltas.prefill_reduction_pct
    );
    println!(
        "  Avoided snippet size:     {}",
        fmt_size(treatment.total_avoided_size)
    );
    println!(
        "  Reused size (backend):    {}",
        fmt_opt_size(treatment.total_reused_size)
    );
    println!(
        "  Tolerance band:           \u{00b1}{:.0} pct points",
        report.tolerance_pct
    );
    println!("{}", "\u{2500}".repeat(w));
    println!("  verdict: {}", report.diagnostic);
    println!("  {}", report.diagnostic.summary());
    println!("{}", "\u{2550}".repeat(w));
}

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn fmt_size(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1000 {
        format!("{:.1}k", n as f64 / 1000.0)
    } else {
        format!("{n}")
    }
}

fn fmt_opt_size(n: Option<u64>) -> String {
    n.map(fmt_size).unwrap_or_else(|| "N/A".into())
}

fn fmt_delta(baseline: f64, treatment: f64) -> String {
    if baseline == 0.0 {
        return "N/A".into();
    }
    let pct = ((treatment - baseline) / baseline) * 100.0;
    if pct >= 0.0 {
        format!("+{pct:.1}%")
    } else {
        format!("{pct:.1}%")
    }
}

fn format_duration(ms: f64) -> String {
    if ms < 1.0 {
        format!("{:.1} µs", ms * 1000.0)
    } else if ms < 1000.0 {
        format!("{:.1} ms", ms)
    } else {
        format!("{:.2} s", ms / 1000.0)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_size() {
        assert_eq!(fmt_size(999), "999");
        assert_eq!(fmt_size(1500), "1.5k");
        assert_eq!(fmt_size(2_500_000), "2.5M");
    }

    #[test]
    fn test_fmt_delta_zero_baseline() {
        assert_eq!(fmt_delta(0.0, 10.0), "N/A");
        assert_eq!(fmt_delta(100.0, 50.0), "-50.0%");
        assert_eq!(fmt_delta(100.0, 110.0), "+10.0%");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer string", 10), "a much ...");
    }
}
