use anyhow::{Context, bail};
use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tickline::config::DisplayMode;
use tickline::{ContextRegistry, ProgressIndicator, Settings, logging};

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

#[derive(Parser)]
#[command(name = "tickline", version, styles = clap_cargo_style())]
#[command(about = "Background-ticking progress line for step-based work")]
struct Cli {
    /// Settings file (defaults to .tickline/settings.toml, searched upward)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Where to draw progress: auto, terminal, log or none
    #[arg(long, global = true, value_parser = parse_display)]
    display: Option<DisplayMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulated workload of scoped steps
    Demo {
        /// Number of steps
        #[arg(short, long, default_value_t = 8)]
        total: u64,

        /// Coarse phase label shown next to the counters
        #[arg(short, long, default_value = "working")]
        step: String,

        /// Time each step takes, in milliseconds
        #[arg(long, default_value_t = 300)]
        step_ms: u64,

        /// Ticker delay in milliseconds (overrides config)
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Fail at this step (1-based) to show error propagation
        #[arg(long)]
        fail_at: Option<u64>,
    },

    /// Display effective settings
    Config,
}

fn parse_display(value: &str) -> Result<DisplayMode, String> {
    match value {
        "auto" => Ok(DisplayMode::Auto),
        "terminal" => Ok(DisplayMode::Terminal),
        "log" => Ok(DisplayMode::Log),
        "none" => Ok(DisplayMode::None),
        other => Err(format!("unknown display mode '{other}'")),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .context("Failed to load settings")?;
    if let Some(display) = cli.display {
        settings.progress.display = display;
    }

    logging::init_with_config(&settings.logging);
    ContextRegistry::install_global(ContextRegistry::from_config(&settings.progress));

    match cli.command {
        Commands::Config => {
            println!("{}", settings.to_toml()?);
            Ok(())
        }
        Commands::Demo {
            total,
            step,
            step_ms,
            delay_ms,
            fail_at,
        } => {
            if let Some(ms) = delay_ms {
                settings.progress.delay_ms = ms;
            }
            run_demo(&settings, total, step, Duration::from_millis(step_ms), fail_at)
        }
    }
}

fn run_demo(
    settings: &Settings,
    total: u64,
    step: String,
    step_time: Duration,
    fail_at: Option<u64>,
) -> anyhow::Result<()> {
    let progress = ProgressIndicator::from_config(&settings.progress);
    progress.set_total(total);
    progress.set_step(step);

    let outcome = progress.launch(|p| -> anyhow::Result<()> {
        for i in 1..=total {
            p.increment_scoped(format!("item-{i}"), || {
                thread::sleep(step_time);
                if fail_at == Some(i) {
                    bail!("item-{i} failed");
                }
                Ok(())
            })?;
        }
        Ok(())
    });

    eprintln!("{}", progress.text());
    outcome
}
