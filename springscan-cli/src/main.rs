//! SpringScan CLI — scan market universes for volatility compression.
//!
//! Commands:
//! - `scan` — fetch, score and rank a market (or an explicit symbol list)
//! - `universe list` / `universe show` — inspect the available markets
//! - `config default` — print a fully populated TOML config

mod obs;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use springscan_core::data::universe::FTSE_MIB;
use springscan_core::data::{
    CircuitBreaker, CsvDirProvider, DataProvider, SyntheticProvider, Universe, YahooProvider,
};
use springscan_core::scoring::ScoringPolicy;
use springscan_runner::{
    default_csv_name, export_json, write_results_csv, Diagnosis, NoProgress, PacingConfig,
    ScanConfig, ScanOutcome, ScanProgress, Scanner, StderrProgress,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "springscan",
    about = "SpringScan — find stocks coiled in low-volatility consolidation"
)]
struct Cli {
    /// Log filter when SPRINGSCAN_LOG is unset (e.g. warn, info, springscan_runner=debug).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log format: text or json.
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan one or more markets and rank symbols by compression score.
    Scan(ScanArgs),
    /// Market universe commands.
    Universe {
        #[command(subcommand)]
        action: UniverseAction,
    },
    /// Configuration commands.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderKind {
    /// Yahoo Finance chart API.
    Yahoo,
    /// `<SYMBOL>.csv` files in --csv-dir.
    Csv,
    /// Deterministic fake data, for demos.
    Synthetic,
}

#[derive(clap::Args)]
struct ScanArgs {
    /// Market to scan (repeatable). Defaults to FTSE MIB.
    #[arg(long = "market")]
    markets: Vec<String>,

    /// Explicit comma-separated symbols; overrides --market.
    #[arg(long, value_delimiter = ',')]
    symbols: Vec<String>,

    /// TOML file with a [markets] table replacing the built-in universes.
    #[arg(long)]
    universe_file: Option<PathBuf>,

    /// Scan configuration (TOML). Flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Minimum score to report (0-100).
    #[arg(long)]
    min_score: Option<u32>,

    /// Maximum number of results.
    #[arg(long)]
    max_results: Option<usize>,

    /// Worker threads; more than 1 switches to rate-limited parallel fetching.
    #[arg(long)]
    workers: Option<usize>,

    /// History source.
    #[arg(long, value_enum, default_value_t = ProviderKind::Yahoo)]
    provider: ProviderKind,

    /// Directory of CSV files (required with --provider csv).
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Write results as CSV. Without a path, uses market_scan_YYYYMMDD_HHMM.csv.
    #[arg(long, num_args = 0..=1)]
    csv: Option<Option<PathBuf>>,

    /// Print the full outcome as JSON instead of a table.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// No per-symbol progress on stderr.
    #[arg(long, short, default_value_t = false)]
    quiet: bool,
}

#[derive(Subcommand)]
enum UniverseAction {
    /// List markets and their ticker counts.
    List {
        #[arg(long)]
        universe_file: Option<PathBuf>,
    },
    /// Print the tickers of one market.
    Show {
        name: String,
        #[arg(long)]
        universe_file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the default configuration as TOML.
    Default,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    obs::init_tracing(&cli.log_level, &cli.log_format).map_err(anyhow::Error::msg)?;

    match cli.command {
        Commands::Scan(args) => run_scan_cmd(args),
        Commands::Universe { action } => match action {
            UniverseAction::List { universe_file } => run_universe_list(universe_file.as_deref()),
            UniverseAction::Show {
                name,
                universe_file,
            } => run_universe_show(&name, universe_file.as_deref()),
        },
        Commands::Config {
            action: ConfigAction::Default,
        } => run_config_default(),
    }
}

fn load_universe(path: Option<&Path>) -> Result<Universe> {
    match path {
        Some(path) => Universe::from_file(path).map_err(anyhow::Error::msg),
        None => Ok(Universe::builtin()),
    }
}

fn resolve_symbols(args: &ScanArgs) -> Result<Vec<String>> {
    let explicit: Vec<String> = args
        .symbols
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if !explicit.is_empty() {
        return Ok(explicit);
    }

    let universe = load_universe(args.universe_file.as_deref())?;
    let markets = if args.markets.is_empty() {
        vec![FTSE_MIB.to_string()]
    } else {
        args.markets.clone()
    };
    universe.select(&markets).map_err(anyhow::Error::msg)
}

fn build_config(args: &ScanArgs) -> Result<ScanConfig> {
    let mut config = match &args.config {
        Some(path) => ScanConfig::from_file(path)?,
        None => {
            let mut config = ScanConfig::default();
            // Pauses only matter for a remote API.
            if !matches!(args.provider, ProviderKind::Yahoo) {
                config.pacing = PacingConfig::none();
            }
            config
        }
    };

    if let Some(min_score) = args.min_score {
        config.scan.min_score = min_score;
    }
    if let Some(max_results) = args.max_results {
        config.scan.max_results = max_results;
    }
    if let Some(workers) = args.workers {
        config.scan.workers = workers;
    }
    config.validate()?;
    Ok(config)
}

fn build_provider(args: &ScanArgs) -> Result<Box<dyn DataProvider>> {
    Ok(match args.provider {
        ProviderKind::Yahoo => {
            let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
            Box::new(YahooProvider::new(circuit_breaker)?)
        }
        ProviderKind::Csv => {
            let Some(dir) = &args.csv_dir else {
                bail!("--provider csv requires --csv-dir");
            };
            if !dir.is_dir() {
                bail!("CSV directory does not exist: {}", dir.display());
            }
            Box::new(CsvDirProvider::new(dir))
        }
        ProviderKind::Synthetic => {
            eprintln!("WARNING: synthetic provider, results are based on fake data");
            Box::new(SyntheticProvider::new(chrono::Local::now().date_naive()))
        }
    })
}

fn run_scan_cmd(args: ScanArgs) -> Result<()> {
    let symbols = resolve_symbols(&args)?;
    if symbols.is_empty() {
        bail!("no symbols to scan");
    }
    let config = build_config(&args)?;
    let provider = build_provider(&args)?;

    tracing::info!(
        symbols = symbols.len(),
        provider = provider.name(),
        fingerprint = %config.fingerprint()?,
        "starting scan"
    );

    let scanner = Scanner::from_config(provider.as_ref(), &config)?;
    let progress: Box<dyn ScanProgress> = if args.quiet || args.json {
        Box::new(NoProgress)
    } else {
        Box::new(StderrProgress::new())
    };
    let outcome = scanner.run_with(
        &symbols,
        config.scan.min_score,
        config.scan.max_results,
        progress.as_ref(),
        None,
    );

    if args.json {
        println!("{}", export_json(&outcome)?);
    } else {
        print_results(&outcome, config.scan.min_score);
    }

    if let Some(csv) = &args.csv {
        let path = csv
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_csv_name(chrono::Local::now().naive_local())));
        write_results_csv(&path, &outcome)
            .with_context(|| format!("failed to export {}", path.display()))?;
        eprintln!("Results saved to: {}", path.display());
    }

    Ok(())
}

fn print_results(outcome: &ScanOutcome, min_score: u32) {
    let summary = outcome.summary();

    println!();
    println!("=== Scan Result ===");
    println!("Symbols:        {}", summary.total);
    println!("Analyzed:       {}", summary.analyzed);
    println!("Failed:         {}", summary.failed);
    println!("Returned:       {} (score >= {min_score})", summary.returned);
    if let Some(mean) = summary.mean_score {
        println!("Mean Score:     {mean:.1}");
    }
    if let Some(max) = summary.max_score {
        println!("Max Score:      {max}");
    }
    if !outcome.skipped.is_empty() {
        println!("Skipped:        {}", outcome.skipped.len());
    }

    let diagnosis = outcome.diagnosis();
    if diagnosis != Diagnosis::Found {
        println!();
        println!("{}", diagnosis.hint());
        return;
    }

    println!();
    println!(
        "{:>4}  {:<12} {:>5}  {:<8} {:>10} {:>8} {:>6} {:>8} {:>6} {:>8} {:>7}",
        "#", "Ticker", "Score", "Tier", "Price", "Chg %", "ATR R", "Rng10 %", "Vol R", "MA50 %",
        "Vol/Avg"
    );
    for (i, r) in outcome.results.iter().enumerate() {
        let m = &r.metrics;
        println!(
            "{:>4}  {:<12} {:>5}  {:<8} {:>10.2} {:>8.2} {:>6.2} {:>8.2} {:>6.2} {:>8.2} {:>7.2}",
            i + 1,
            r.symbol,
            m.score,
            r.tier().label(),
            m.price,
            m.daily_change_pct,
            m.atr_ratio,
            m.range_10d_pct,
            m.volume_ratio,
            m.distance_ma50_pct,
            m.volume_vs_avg
        );
    }
}

fn run_universe_list(path: Option<&Path>) -> Result<()> {
    let universe = load_universe(path)?;
    for name in universe.market_names() {
        let count = universe.market(name).map_or(0, <[String]>::len);
        println!("{name:<24} {count:>4} tickers");
    }
    println!();
    println!("Total: {} tickers", universe.ticker_count());
    Ok(())
}

fn run_universe_show(name: &str, path: Option<&Path>) -> Result<()> {
    let universe = load_universe(path)?;
    let Some(tickers) = universe.market(name) else {
        bail!(
            "unknown market '{name}'. Available: {}",
            universe.market_names().join(", ")
        );
    };
    for ticker in tickers {
        println!("{ticker}");
    }
    Ok(())
}

fn run_config_default() -> Result<()> {
    let config = ScanConfig {
        scoring: Some(ScoringPolicy::default()),
        ..ScanConfig::default()
    };
    print!("{}", config.to_toml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_scan(args: &[&str]) -> ScanArgs {
        let cli = Cli::try_parse_from(std::iter::once("springscan").chain(args.iter().copied()))
            .unwrap();
        match cli.command {
            Commands::Scan(args) => args,
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn default_scan_targets_ftse_mib() {
        let args = parse_scan(&["scan"]);
        let symbols = resolve_symbols(&args).unwrap();
        assert_eq!(
            symbols,
            Universe::builtin().market(FTSE_MIB).unwrap().to_vec()
        );
    }

    #[test]
    fn explicit_symbols_override_markets() {
        let args = parse_scan(&["scan", "--market", "DAX", "--symbols", "ENI.MI, SAP.DE"]);
        assert_eq!(resolve_symbols(&args).unwrap(), ["ENI.MI", "SAP.DE"]);
    }

    #[test]
    fn flags_override_config_defaults() {
        let args = parse_scan(&["scan", "--min-score", "40", "--workers", "3"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.scan.min_score, 40);
        assert_eq!(config.scan.workers, 3);
        assert_eq!(config.scan.max_results, 50);
        assert_eq!(config.pacing, PacingConfig::default());
    }

    #[test]
    fn offline_providers_skip_pacing() {
        let args = parse_scan(&["scan", "--provider", "synthetic"]);
        assert_eq!(build_config(&args).unwrap().pacing, PacingConfig::none());
    }

    #[test]
    fn invalid_min_score_is_rejected() {
        let args = parse_scan(&["scan", "--min-score", "150"]);
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn csv_flag_takes_optional_path() {
        assert_eq!(parse_scan(&["scan", "--csv"]).csv, Some(None));
        assert_eq!(
            parse_scan(&["scan", "--csv", "out.csv"]).csv,
            Some(Some(PathBuf::from("out.csv")))
        );
        assert_eq!(parse_scan(&["scan"]).csv, None);
    }

    #[test]
    fn csv_provider_requires_directory() {
        let args = parse_scan(&["scan", "--provider", "csv"]);
        assert!(build_provider(&args).is_err());
    }
}
