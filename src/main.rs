use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

use rust_fairprice::analysis::engine::ValuationEngine;
use rust_fairprice::api::YahooClient;
use rust_fairprice::models::{Config, ValuationParams};
use rust_fairprice::{extract, refresh, registry, report, store};

#[derive(Parser)]
#[command(name = "fairprice", about = "Personal fair-price valuation toolkit")]
struct Cli {
    /// Required annual return (e.g. 0.15)
    #[arg(long, global = true)]
    target_return: Option<f64>,

    /// Projection horizon in periods
    #[arg(long, global = true)]
    horizon: Option<u32>,

    /// Recency window in years for ratio medians
    #[arg(long, global = true)]
    ratio_window: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract historical statements from CSV exports into the store
    Extract {
        /// Statements directory (defaults to the configured one)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Restrict to one company directory by name
        #[arg(long)]
        company: Option<String>,
    },
    /// Refresh market snapshots from the quote provider
    Refresh,
    /// Interactively add tickers to the roster
    Add,
    /// Value companies and print the summary table
    Value {
        /// Restrict to one company by store name
        name: Option<String>,
    },
    /// Full method-by-method breakdown for one company
    Detail { name: String },
    /// Value everything and export the results as JSON
    Export {
        /// Output path (defaults to the configured one)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn build_params(cli: &Cli) -> ValuationParams {
    let mut params = ValuationParams::default();
    if let Some(r) = cli.target_return {
        params.target_return = r;
    }
    if let Some(h) = cli.horizon {
        params.projection_horizon = h;
    }
    if let Some(w) = cli.ratio_window {
        params.ratio_window = w;
    }
    params
}

fn build_engine(config: &Config, params: ValuationParams) -> Result<ValuationEngine> {
    let companies = store::load_companies(Path::new(&config.companies_path))?;
    let weights = store::load_weight_table(Path::new(&config.weights_path))?;
    Ok(ValuationEngine::new(companies, weights, params))
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rust_fairprice=warn")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("❌ Configuration Error: {}", e);
            std::process::exit(1);
        }
    };
    let params = build_params(&cli);

    match cli.command {
        Command::Extract { dir, company } => {
            let statements_dir = dir.unwrap_or_else(|| PathBuf::from(&config.statements_dir));
            let roster = store::load_roster(Path::new(&config.roster_path))?;
            let mut companies = store::load_companies(Path::new(&config.companies_path))?;

            let summary = extract::run_extraction(
                &statements_dir,
                &mut companies,
                &roster,
                company.as_deref(),
            )?;
            store::save_companies(Path::new(&config.companies_path), &companies)?;

            println!("✅ Extracted {} companies", summary.extracted.len());
            for name in &summary.extracted {
                println!("   📄 {}", name);
            }
            if !summary.empty.is_empty() {
                println!("⚠️  {} directories had no usable rows", summary.empty.len());
            }
        }
        Command::Refresh => {
            let mut companies = store::load_companies(Path::new(&config.companies_path))?;
            if companies.is_empty() {
                println!("⚠️  Store is empty; run extract or add first");
                return Ok(());
            }
            let client = YahooClient::new()?;
            let result = refresh::refresh_quotes(
                &client,
                &mut companies,
                config.rate_limit_per_minute,
                config.refresh_concurrency,
            )
            .await;
            store::save_companies(Path::new(&config.companies_path), &companies)?;

            println!(
                "✅ Quotes refreshed: {} updated, {} failed, {} without ticker",
                result.updated,
                result.failed.len(),
                result.skipped
            );
            for name in &result.failed {
                println!("   ⚠️  {}", name);
            }
        }
        Command::Add => {
            let markets = store::load_markets(Path::new(&config.markets_path))?;
            let client = YahooClient::new()?;
            registry::run_add_workflow(&client, &markets, Path::new(&config.roster_path)).await?;
        }
        Command::Value { name } => {
            let mut engine = build_engine(&config, params)?;
            match name {
                Some(name) => match engine.value_company(&name) {
                    Some(valuation) => report::print_summary(&[valuation]),
                    None => {
                        eprintln!("❌ Unknown company '{}'", name);
                        std::process::exit(1);
                    }
                },
                None => {
                    let valuations = engine.value_all();
                    if valuations.is_empty() {
                        println!("⚠️  Store is empty; run extract first");
                        return Ok(());
                    }
                    report::print_summary(&valuations);
                }
            }
        }
        Command::Detail { name } => {
            let mut engine = build_engine(&config, params)?;
            match engine.value_company(&name) {
                Some(valuation) => report::print_detail(&valuation),
                None => {
                    eprintln!("❌ Unknown company '{}'", name);
                    std::process::exit(1);
                }
            }
        }
        Command::Export { output } => {
            let mut engine = build_engine(&config, params)?;
            let valuations = engine.value_all();
            let path = output.unwrap_or_else(|| PathBuf::from(&config.export_path));
            report::export_json(&path, &valuations, engine.params())?;
            println!("✅ Exported {} results to {}", valuations.len(), path.display());
        }
    }

    Ok(())
}
