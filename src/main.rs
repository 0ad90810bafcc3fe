//! fuzzylight - street lighting inference
//!
//! Command-line interface for one-off evaluation, simulation and rule checks.

use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use fuzzylight::{
    bundled_rules, check_rules, FileRuleSource, Fuzzifier, InferenceEngine, LightConfig,
    RuleSource, SensorSample, StreetLightSimulator, TracingSink,
};

#[derive(Parser)]
#[command(name = "fuzzylight")]
#[command(version)]
#[command(about = "Fuzzy inference engine for street lighting", long_about = None)]
struct Cli {
    /// Configuration file (skips the default search locations)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More log output (repeatable)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Less log output (repeatable)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate one sensor sample
    Eval {
        /// Hour of day
        #[arg(long, allow_negative_numbers = true)]
        time: f64,

        /// Ambient light level
        #[arg(long, allow_negative_numbers = true)]
        light: f64,

        /// Weather category
        #[arg(long)]
        weather: String,

        /// Rule file (TOML or JSON)
        #[arg(long, value_name = "FILE")]
        rules: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the street light simulator
    Simulate {
        /// Simulated hours
        #[arg(long)]
        hours: Option<u32>,

        /// Random seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// Delay between ticks in milliseconds
        #[arg(long, value_name = "MS")]
        tick_ms: Option<u64>,

        /// Rule file (TOML or JSON)
        #[arg(long, value_name = "FILE")]
        rules: Option<PathBuf>,
    },

    /// List rules and report malformed conditions
    CheckRules {
        /// Rule file (TOML or JSON)
        #[arg(long, value_name = "FILE")]
        rules: Option<PathBuf>,
    },

    /// Write the default configuration file
    InitConfig {
        /// Output path (defaults to stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Command::InitConfig { output } => init_config(output.as_deref()),
        command => {
            let config = load_config(cli.config.as_deref())?;
            let level = config.general.log_level.adjust(cli.verbose, cli.quiet);
            tracing_subscriber::fmt()
                .with_max_level(level.tracing_level())
                .with_writer(std::io::stderr)
                .init();

            run(command, &config)
        }
    }
}

fn run(command: Command, config: &LightConfig) -> Result<ExitCode> {
    match command {
        Command::Eval {
            time,
            light,
            weather,
            rules,
            json,
        } => {
            let engine = build_engine(config, rules.as_deref())?;
            let outcome = engine
                .evaluate_sample(&SensorSample::new(time, light, weather))
                .context("Inference failed")?;

            if json {
                let value = serde_json::json!({
                    "sample": outcome.sample,
                    "fuzzy": outcome.fuzzy,
                    "activated": outcome.activated,
                    "selected": outcome.selected(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
                return Ok(ExitCode::SUCCESS);
            }

            println!("light:   {}", outcome.fuzzy.light);
            println!("time:    {}", outcome.fuzzy.time);
            println!("weather: {}", outcome.fuzzy.weather);
            if outcome.activated.is_empty() {
                println!("No rules activated; keep current state");
            } else {
                println!("Activated rules:");
                for rule in &outcome.activated {
                    println!("  [{}] {} -> {}", rule.priority, rule.name, rule.action_name);
                }
            }
            if let Some(rule) = outcome.selected() {
                println!("Action: {} (rule: {})", rule.action_name, rule.name);
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Simulate {
            hours,
            seed,
            tick_ms,
            rules,
        } => {
            let engine = build_engine(config, rules.as_deref())?;
            let mut settings = config.simulation.clone();
            if seed.is_some() {
                settings.seed = seed;
            }
            if let Some(tick_ms) = tick_ms {
                settings.tick_ms = tick_ms;
            }
            let hours = hours.unwrap_or(settings.hours);

            println!("Street light simulation: {} hours", hours);
            let mut simulator = StreetLightSimulator::new(engine, settings);
            let mut tick = 0;
            simulator
                .run_with(hours, |report| {
                    tick += 1;
                    println!("[{}/{}] {}", tick, hours, report);
                    ControlFlow::Continue(())
                })
                .context("Simulation stopped")?;
            Ok(ExitCode::SUCCESS)
        }

        Command::CheckRules { rules } => {
            let source = rule_source(config, rules.as_deref())?;
            let records = source
                .fetch_rules()
                .with_context(|| format!("Failed to load rules from {}", source.describe()))?;

            println!("{}: {} rules", source.describe(), records.len());
            let checks = check_rules(&records);
            for (rule, check) in records.iter().zip(&checks) {
                match &check.error {
                    None => println!(
                        "  ok   [{}] {}: {} -> {}",
                        rule.priority, rule.name, rule.condition, rule.action_name
                    ),
                    Some(error) => println!("  FAIL [{}] {}: {}", rule.priority, rule.name, error),
                }
            }

            let failed = checks.iter().filter(|c| !c.is_valid()).count();
            if failed > 0 {
                eprintln!("{} malformed condition(s)", failed);
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::InitConfig { output } => init_config(output.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<LightConfig> {
    let Some(path) = path else {
        return LightConfig::load().context("Failed to load configuration");
    };

    let mut config = LightConfig::load_from_file(path)
        .with_context(|| format!("Failed to load config: {}", path.display()))?;
    config.apply_env_overrides();
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn rule_source(config: &LightConfig, cli_path: Option<&Path>) -> Result<Arc<dyn RuleSource>> {
    let path = cli_path.map(Path::to_path_buf).or_else(|| config.rules.path.clone());
    match path {
        Some(path) => Ok(Arc::new(FileRuleSource::new(path))),
        None => Ok(Arc::new(bundled_rules().context("Bundled rule set is invalid")?)),
    }
}

fn build_engine(config: &LightConfig, cli_path: Option<&Path>) -> Result<InferenceEngine> {
    let rules = rule_source(config, cli_path)?;
    Ok(InferenceEngine::with_sink(
        Fuzzifier::new(config.fuzzy.clone()),
        rules,
        Arc::new(TracingSink),
    ))
}

fn init_config(output: Option<&Path>) -> Result<ExitCode> {
    let content = LightConfig::default_config_content();
    match output {
        Some(path) => {
            if path.exists() {
                bail!("Refusing to overwrite existing file: {}", path.display());
            }
            fs::write(path, content)
                .with_context(|| format!("Failed to write config: {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(ExitCode::SUCCESS)
}
