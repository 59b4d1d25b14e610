mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tick_config::{ConfigSource, LoadedConfig};
use tick_core::{
    Coords, DIM, DeltaRecord, DrainReport, Outcome, Reclaimer, ReclaimerConfig, ReferencePair,
    StatusSnapshot, TickError, Tracked, XOperator,
};

use report::PendingView;

#[derive(Parser)]
#[command(name = "tickstack", about = "Priority-ordered deferred reclamation driver")]
struct Cli {
    /// Config file (overrides TICKSTACK_CONFIG and ./tickstack.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Admit reclaim requests in order, then drain and report
    Reclaim {
        /// Requests as WEIGHT:REFS, e.g. 2000:2
        #[arg(required = true, value_parser = parse_item)]
        items: Vec<Item>,

        /// Override the configured stack capacity
        #[arg(long)]
        capacity: Option<usize>,
    },

    /// Allocate random buffers and reclaim them under pressure
    Demo {
        /// Number of buffers to allocate
        #[arg(long, default_value_t = 100)]
        count: u64,

        /// RNG seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Release every Kth buffer upstream before it is submitted
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        retire_every: Option<u64>,

        /// Override the configured stack capacity
        #[arg(long)]
        capacity: Option<usize>,
    },

    /// Compute the delta topology of a JSON array of 11-element samples
    Topology {
        /// Input file path
        path: PathBuf,

        /// Use the two most recent samples instead of first and last
        #[arg(long)]
        rolling: bool,

        /// Also project the reference pair through an operator
        #[arg(long, value_enum)]
        project: Option<OperatorArg>,
    },

    /// Print the effective configuration and where it came from
    Config,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Item {
    weight: f64,
    refs: u32,
}

fn parse_item(s: &str) -> std::result::Result<Item, String> {
    let (weight, refs) = s
        .split_once(':')
        .ok_or_else(|| format!("expected WEIGHT:REFS, got '{s}'"))?;
    let weight: f64 = weight
        .trim()
        .parse()
        .map_err(|_| format!("invalid weight '{weight}'"))?;
    let refs: u32 = refs
        .trim()
        .parse()
        .map_err(|_| format!("invalid reference count '{refs}'"))?;
    Ok(Item { weight, refs })
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OperatorArg {
    Add,
    Subtract,
    Multiply,
    Divide,
    Extrapolate,
    Damp,
}

impl From<OperatorArg> for XOperator {
    fn from(op: OperatorArg) -> Self {
        match op {
            OperatorArg::Add => XOperator::Add,
            OperatorArg::Subtract => XOperator::Subtract,
            OperatorArg::Multiply => XOperator::Multiply,
            OperatorArg::Divide => XOperator::Divide,
            OperatorArg::Extrapolate => XOperator::Extrapolate,
            OperatorArg::Damp => XOperator::Damp,
        }
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Reclaim { items, capacity } => cmd_reclaim(&cli, items, *capacity),
        Commands::Demo {
            count,
            seed,
            retire_every,
            capacity,
        } => cmd_demo(&cli, *count, *seed, *retire_every, *capacity),
        Commands::Topology {
            path,
            rolling,
            project,
        } => cmd_topology(&cli, path, *rolling, *project),
        Commands::Config => cmd_config(&cli),
    }
}

fn load_config(cli: &Cli) -> Result<LoadedConfig> {
    tick_config::load(cli.config.as_deref()).context("failed to load configuration")
}

fn effective_config(cli: &Cli, capacity: Option<usize>) -> Result<ReclaimerConfig> {
    let mut config = load_config(cli)?.config;
    if let Some(capacity) = capacity {
        config.capacity = capacity;
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{out}");
    Ok(())
}

// ---------------------------------------------------------------------------
// reclaim
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ReclaimOutput {
    rejected: Vec<String>,
    cascaded: Vec<Outcome>,
    pending: Vec<PendingView>,
    drained: Vec<Outcome>,
    status: StatusSnapshot,
}

fn cmd_reclaim(cli: &Cli, items: &[Item], capacity: Option<usize>) -> Result<()> {
    let config = effective_config(cli, capacity)?;
    let mut reclaimer: Reclaimer<Tracked<String>> =
        Reclaimer::new(&config).context("invalid reclaimer configuration")?;

    let mut rejected = Vec::new();
    let mut cascaded = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let label = format!("item{}", i + 1);
        let handle = reclaimer.register();
        match reclaimer.admit_reclaim(Tracked::new(handle, label.clone()), item.weight, item.refs) {
            Ok(admission) => {
                if !cli.json {
                    println!("admitted {label} {handle}");
                    if !admission.drained.is_empty() {
                        println!("cascade: {} drained", admission.drained.len());
                        report::print_outcomes(&admission.drained);
                    }
                }
                cascaded.extend(admission.drained);
            }
            Err(r) => {
                if !cli.json {
                    println!("rejected {label}: {}", r.error);
                }
                rejected.push(format!("{label}: {}", r.error));
            }
        }
    }

    let pending: Vec<PendingView> = reclaimer
        .stack()
        .iter()
        .map(PendingView::from_request)
        .collect();
    let drained = reclaimer.drain_now();
    let status = reclaimer.status_snapshot();

    if cli.json {
        return print_json(&ReclaimOutput {
            rejected,
            cascaded,
            pending,
            drained,
            status,
        });
    }

    report::print_pending(&pending);
    println!("final drain:");
    report::print_outcomes(&drained);
    report::print_status(&status);
    Ok(())
}

// ---------------------------------------------------------------------------
// demo
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct DemoOutput {
    seed: u64,
    allocated: u64,
    bytes: u64,
    retries: u64,
    report: DrainReport,
    status: StatusSnapshot,
    topology: Option<DeltaRecord>,
}

fn cmd_demo(
    cli: &Cli,
    count: u64,
    seed: u64,
    retire_every: Option<u64>,
    capacity: Option<usize>,
) -> Result<()> {
    let config = effective_config(cli, capacity)?;
    let mut reclaimer: Reclaimer<Tracked<Vec<u8>>> =
        Reclaimer::new(&config).context("invalid reclaimer configuration")?;
    let mut rng = SmallRng::seed_from_u64(seed);

    let mut outcomes = Vec::new();
    let mut bytes = 0u64;
    let mut retries = 0u64;
    for i in 1..=count {
        let size = rng.random_range(1..=4096usize);
        let refs = rng.random_range(1..=3u32);
        let handle = reclaimer.register();
        bytes += size as u64;

        // Simulates a buffer whose owner already freed it elsewhere.
        if let Some(k) = retire_every
            && i % k == 0
        {
            reclaimer.retire(handle);
        }

        let buffer = Tracked::new(handle, vec![0u8; size]);
        match reclaimer.admit_reclaim(buffer, size as f64, refs) {
            Ok(admission) => outcomes.extend(admission.drained),
            Err(rejected) if matches!(rejected.error, TickError::CapacityExceeded { .. }) => {
                outcomes.extend(reclaimer.drain_now());
                retries += 1;
                let admission = reclaimer
                    .admit_reclaim(rejected.resource, size as f64, refs)
                    .map_err(TickError::from)
                    .context("admission failed after draining")?;
                outcomes.extend(admission.drained);
            }
            Err(rejected) => {
                return Err(TickError::from(rejected)).context("admission failed");
            }
        }

        let pressure = reclaimer.current_pressure();
        let coords: Coords = std::array::from_fn(|axis| match axis {
            0 => reclaimer.stack().len() as f64,
            1 => pressure,
            2 => size as f64 / 1024.0,
            _ => rng.random_range(-1.0..1.0),
        });
        reclaimer
            .admit_vector_sample(coords)
            .context("failed to record sample")?;
    }

    outcomes.extend(reclaimer.drain_now());
    let report = DrainReport::from(outcomes.as_slice());
    let status = reclaimer.status_snapshot();
    let topology = match reclaimer.compute_topology() {
        Ok(record) => Some(record),
        Err(TickError::NumericDegenerate(reason)) => {
            tracing::debug!(%reason, "topology skipped");
            None
        }
        Err(e) => return Err(e).context("failed to compute topology"),
    };

    if cli.json {
        return print_json(&DemoOutput {
            seed,
            allocated: count,
            bytes,
            retries,
            report,
            status,
            topology,
        });
    }

    println!("seed:           {seed}");
    println!("allocated:      {count} buffers ({bytes} bytes)");
    println!("retries:        {retries}");
    report::print_status(&status);
    match topology {
        Some(record) => {
            println!("topology:");
            report::print_record(&record);
        }
        None => println!("topology: skipped (not enough samples)"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// topology
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct TopologyOutput {
    samples: usize,
    record: Option<DeltaRecord>,
    skipped: Option<String>,
    projection: Option<Coords>,
}

fn read_samples(path: &Path) -> Result<Vec<Coords>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let samples: Vec<Vec<f64>> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    samples
        .into_iter()
        .enumerate()
        .map(|(i, s)| {
            let len = s.len();
            <Coords>::try_from(s).map_err(|_| {
                anyhow::anyhow!("sample {i} has {len} coordinates, expected {DIM}")
            })
        })
        .collect()
}

fn cmd_topology(
    cli: &Cli,
    path: &Path,
    rolling: bool,
    project: Option<OperatorArg>,
) -> Result<()> {
    let mut config = load_config(cli)?.config;
    if rolling {
        config.reference_pair = ReferencePair::Rolling;
    }
    let samples = read_samples(path)?;
    if samples.len() > config.history_capacity {
        tracing::warn!(
            samples = samples.len(),
            retained = config.history_capacity,
            "history is bounded, oldest samples will be evicted"
        );
    }

    let mut reclaimer: Reclaimer<Tracked<()>> =
        Reclaimer::new(&config).context("invalid reclaimer configuration")?;
    for coords in &samples {
        reclaimer
            .admit_vector_sample(*coords)
            .context("invalid sample")?;
    }

    let (record, skipped) = match reclaimer.compute_topology() {
        Ok(record) => (Some(record), None),
        Err(TickError::NumericDegenerate(reason)) => (None, Some(reason.to_string())),
        Err(e) => return Err(e).context("failed to compute topology"),
    };
    let projection = match (project, &record) {
        (Some(op), Some(_)) => Some(
            reclaimer
                .project(op.into())
                .context("projection failed")?,
        ),
        _ => None,
    };

    if cli.json {
        return print_json(&TopologyOutput {
            samples: samples.len(),
            record,
            skipped,
            projection,
        });
    }

    println!("samples:    {}", samples.len());
    match (&record, &skipped) {
        (Some(record), _) => report::print_record(record),
        (None, Some(reason)) => println!("topology: skipped ({reason})"),
        (None, None) => bail!("topology produced neither a record nor a reason"),
    }
    if let Some(coords) = projection {
        let formatted: Vec<String> = coords.iter().map(|c| format!("{c:.4}")).collect();
        println!("projection: [{}]", formatted.join(", "));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn describe_source(source: &ConfigSource) -> String {
    match source {
        ConfigSource::Explicit(path) => format!("{} (--config)", path.display()),
        ConfigSource::Env(path) => format!("{} ({})", path.display(), tick_config::CONFIG_ENV),
        ConfigSource::WorkingDir(path) => path.display().to_string(),
        ConfigSource::Defaults => "built-in defaults".to_string(),
    }
}

fn cmd_config(cli: &Cli) -> Result<()> {
    let loaded = load_config(cli)?;
    if cli.json {
        return print_json(&loaded.config);
    }
    let rendered = toml::to_string(&loaded.config).context("failed to render config")?;
    println!("# source: {}", describe_source(&loaded.source));
    print!("{rendered}");
    Ok(())
}
