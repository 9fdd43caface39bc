mod driver;
mod render;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mb_core::{FieldConfig, Injection, Simulation, Snapshot};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::driver::Driver;

#[derive(Parser)]
#[command(name = "mb", about = "Moederbloem ΔΦ–κ–θ phase-field simulator")]
struct Cli {
    /// TOML file overriding preset values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base parameter set
    #[arg(long, global = true, value_enum, default_value_t = Preset::Moederbloem)]
    preset: Preset,

    /// RNG seed; random when omitted
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Preset {
    /// Spatial field processor: 4 s cycle, coupling 0.08
    Moederbloem,
    /// Kernel motor: 1 s cycle, coupling 0.12, typed energy drive
    Kernel,
}

impl Preset {
    fn config(self) -> FieldConfig {
        match self {
            Preset::Moederbloem => FieldConfig::moederbloem(),
            Preset::Kernel => FieldConfig::kernel(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Tick in real time until Ctrl-C, a tick count or a duration
    Run {
        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,

        /// Milliseconds between ticks
        #[arg(long, default_value_t = 16)]
        interval_ms: u64,

        /// Stop after this many seconds
        #[arg(long)]
        duration_secs: Option<f64>,

        /// Draw the field every tick
        #[arg(long)]
        render: bool,

        /// Print a stats line every N ticks
        #[arg(long, default_value_t = 60)]
        report_every: u64,

        /// Inject a glyph at X,Y before the first tick (repeatable)
        #[arg(long, value_name = "X,Y", value_parser = parse_point)]
        inject: Vec<(f64, f64)>,

        /// Read X,Y lines from stdin and inject each one live
        #[arg(long)]
        stdin: bool,
    },

    /// Run offline with synthetic time and print the final state
    Simulate {
        /// Number of ticks
        #[arg(long, default_value_t = 100)]
        ticks: u64,

        /// Synthetic milliseconds per tick
        #[arg(long, default_value_t = 16.0)]
        step_ms: f64,

        /// Inject a glyph at X,Y before the first tick (repeatable)
        #[arg(long, value_name = "X,Y", value_parser = parse_point)]
        inject: Vec<(f64, f64)>,

        /// Print the final snapshot as JSON
        #[arg(long)]
        json: bool,

        /// Draw the final field
        #[arg(long)]
        render: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn parse_point(s: &str) -> std::result::Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid coordinate '{v}': {e}"))
    };
    Ok((parse(x)?, parse(y)?))
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

/// Recursively overlay `patch` onto `base`; tables merge, everything else replaces.
fn merge(base: &mut toml::Value, patch: toml::Value) {
    match (base, patch) {
        (toml::Value::Table(base), toml::Value::Table(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, patch) => *base = patch,
    }
}

fn read_config_file(preset: Preset, path: &Path) -> Result<FieldConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let patch: toml::Value = toml::from_str(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    let mut config = toml::Value::try_from(preset.config())?;
    merge(&mut config, patch);
    config
        .try_into()
        .with_context(|| format!("invalid configuration in {}", path.display()))
}

fn load_config(cli: &Cli) -> Result<FieldConfig> {
    let config = match &cli.config {
        Some(path) => read_config_file(cli.preset, path)?,
        None => cli.preset.config(),
    };
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn build_simulation(cli: &Cli) -> Result<Simulation> {
    let config = load_config(cli)?;
    let seed = cli.seed.unwrap_or_else(rand::random);
    tracing::info!(seed, preset = ?cli.preset, "building simulation");
    Simulation::new(config, seed).context("failed to build simulation")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Run {
            ticks,
            interval_ms,
            duration_secs,
            render,
            report_every,
            inject,
            stdin,
        } => {
            let opts = RunOptions {
                ticks: *ticks,
                interval: Duration::from_millis((*interval_ms).max(1)),
                duration_secs: *duration_secs,
                render: *render,
                report_every: (*report_every).max(1),
                inject,
                stdin: *stdin,
            };
            cmd_run(&cli, opts).await
        }
        Commands::Simulate {
            ticks,
            step_ms,
            inject,
            json,
            render,
        } => cmd_simulate(&cli, *ticks, *step_ms, inject, *json, *render),
        Commands::Config => cmd_config(&cli),
    }
}

struct RunOptions<'a> {
    ticks: Option<u64>,
    interval: Duration,
    duration_secs: Option<f64>,
    render: bool,
    report_every: u64,
    inject: &'a [(f64, f64)],
    stdin: bool,
}

async fn cmd_run(cli: &Cli, opts: RunOptions<'_>) -> Result<()> {
    let sim = build_simulation(cli)?;
    let mut driver = Driver::new(sim, opts.interval);
    let mut snapshots = driver.subscribe();
    let injector = driver.injector();
    for &(x, y) in opts.inject {
        injector.inject(Injection::at(x, y));
    }
    driver.start();

    let deadline = async {
        match opts.duration_secs {
            Some(secs) => {
                let limit = Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX);
                tokio::time::sleep(limit).await
            }
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    let mut lines = opts
        .stdin
        .then(|| BufReader::new(tokio::io::stdin()).lines());
    let mut next_report = opts.report_every;
    let mut stdout = std::io::stdout();

    loop {
        tokio::select! {
            _ = &mut interrupted => {
                tracing::info!("interrupted");
                break;
            }
            _ = &mut deadline => {
                tracing::info!("duration elapsed");
                break;
            }
            line = next_line(&mut lines), if lines.is_some() => {
                match line.context("failed to read stdin")? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => match parse_point(&line) {
                        Ok((x, y)) => {
                            injector.inject(Injection::at(x, y));
                        }
                        Err(e) => tracing::warn!("skipping stdin line: {e}"),
                    },
                    None => lines = None,
                }
            }
            changed = snapshots.changed() => {
                changed.context("tick task went away")?;
                let Some(snap) = snapshots.borrow_and_update().clone() else {
                    continue;
                };
                if opts.render {
                    writeln!(stdout, "\x1b[H\x1b[2J{}", render::render(&snap))?;
                    stdout.flush()?;
                } else if snap.tick >= next_report {
                    writeln!(stdout, "{}", render::status_line(&snap))?;
                    next_report = snap.tick + opts.report_every;
                }
                if opts.ticks.is_some_and(|limit| snap.tick >= limit) {
                    break;
                }
            }
        }
    }

    driver.stop().await?;
    match snapshots.borrow().as_ref() {
        Some(snap) => writeln!(stdout, "{}", render::status_line(snap))?,
        None => {
            let ticks = driver.simulation().map_or(0, Simulation::ticks);
            writeln!(stdout, "tick={ticks} (no snapshot published)")?;
        }
    }
    Ok(())
}

/// Next stdin line, or never once stdin is closed.
async fn next_line<R>(
    lines: &mut Option<tokio::io::Lines<R>>,
) -> std::io::Result<Option<String>>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    match lines {
        Some(lines) => lines.next_line().await,
        None => std::future::pending().await,
    }
}

/// Tick with synthetic time `i * step_ms` and return the final snapshot.
fn simulate(sim: &mut Simulation, ticks: u64, step_ms: f64) -> Option<Snapshot> {
    let mut last = None;
    for i in 0..ticks {
        last = Some(sim.tick(i as f64 * step_ms));
    }
    last
}

fn cmd_simulate(
    cli: &Cli,
    ticks: u64,
    step_ms: f64,
    inject: &[(f64, f64)],
    json: bool,
    render: bool,
) -> Result<()> {
    let mut sim = build_simulation(cli)?;
    for &(x, y) in inject {
        sim.inject(Injection::at(x, y));
    }

    let Some(snap) = simulate(&mut sim, ticks, step_ms) else {
        println!("(no ticks run)");
        return Ok(());
    };

    if json {
        let text = snap.to_json_pretty().context("failed to serialize snapshot")?;
        println!("{text}");
    } else if render {
        println!("{}", render::render(&snap));
    } else {
        println!("{}", render::status_line(&snap));
    }
    Ok(())
}

fn cmd_config(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let text = toml::to_string_pretty(&config).context("failed to encode configuration")?;
    print!("{text}");
    Ok(())
}
