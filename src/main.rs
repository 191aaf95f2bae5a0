use anyhow::Context;
use api_client::provider_from_config;
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};
use configuration::{Config, LoggingConfig, QuoteSource};
use core_types::{format_price, format_usd, parse_share_count, Execution, LedgerEntry};
use database::{connect, run_migrations, PgLedgerStore};
use executor::{ExecutorError, Holding, OrderExecutor, PortfolioAggregator, PortfolioSnapshot};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use uuid::Uuid;

/// The main entry point for the Equitybook application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the URL may come from config.toml instead.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config =
        configuration::load_unvalidated_from("config.toml").context("Failed to load configuration")?;
    if let Some(source) = cli.quote_source {
        config.quotes.source = source;
    }
    config.validate().context("Invalid configuration")?;

    let log_guard = init_tracing(&config.logging)?;

    match run(cli.command, config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if let Some(executor_error) = e.downcast_ref::<ExecutorError>() {
                eprintln!(
                    "Rejected [{}]{}: {}",
                    executor_error.reason_code(),
                    if executor_error.is_retryable() { " (retryable)" } else { "" },
                    executor_error
                );
                drop(log_guard);
                std::process::exit(2);
            }
            Err(e)
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A paper-trading brokerage: buy and sell equities at live prices and value the holdings.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Overrides `quotes.source` from the configuration.
    #[arg(long, value_enum, global = true)]
    quote_source: Option<QuoteSource>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a new account and print its id.
    OpenAccount {
        /// Starting cash. Defaults to `accounts.initial_cash`.
        #[arg(long)]
        cash: Option<Decimal>,
    },
    /// Look up the current price of a symbol.
    Quote { symbol: String },
    /// Buy shares at the current price.
    Buy(OrderArgs),
    /// Sell shares at the current price.
    Sell(OrderArgs),
    /// Show cash, valued positions, and the account total.
    Portfolio(ViewArgs),
    /// Show every ledger entry, oldest first.
    History(ViewArgs),
    /// Show open positions without pricing them.
    Holdings(ViewArgs),
}

#[derive(Parser)]
struct OrderArgs {
    #[arg(long)]
    account: Uuid,

    /// The ticker symbol (e.g., "AAPL").
    symbol: String,

    /// A positive whole number of shares.
    shares: String,
}

#[derive(Parser)]
struct ViewArgs {
    #[arg(long)]
    account: Uuid,

    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,
}

// ==============================================================================
// Setup
// ==============================================================================

/// Installs the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .with_context(|| format!("Invalid log level '{}'", logging.level))?;

    match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "equitybook.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
            Ok(Some(guard))
        }
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
            Ok(None)
        }
    }
}

struct Services {
    orders: OrderExecutor,
    portfolio: PortfolioAggregator,
}

async fn build_services(config: &Config) -> anyhow::Result<Services> {
    let pool = connect(&config.database)
        .await
        .context("Failed to connect to the database")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let store = Arc::new(PgLedgerStore::new(pool));
    let quotes = provider_from_config(&config.quotes).context("Failed to build the quote provider")?;

    Ok(Services {
        orders: OrderExecutor::new(store.clone(), quotes.clone(), config.accounts.initial_cash),
        portfolio: PortfolioAggregator::new(store, quotes, config.portfolio.quote_failure),
    })
}

// ==============================================================================
// Command Handlers
// ==============================================================================

async fn run(command: Commands, config: Config) -> anyhow::Result<()> {
    match command {
        Commands::Quote { symbol } => handle_quote(&config, &symbol).await?,
        Commands::OpenAccount { cash } => {
            let services = build_services(&config).await?;
            let account = services.orders.open_account(cash).await?;
            println!("Opened account {} with {}", account.account_id, format_usd(account.cash));
        }
        Commands::Buy(args) => {
            let shares = parse_share_count(&args.shares).map_err(ExecutorError::from)?;
            let services = build_services(&config).await?;
            let execution = services.orders.buy(args.account, &args.symbol, shares).await?;
            print_execution(&execution);
        }
        Commands::Sell(args) => {
            let shares = parse_share_count(&args.shares).map_err(ExecutorError::from)?;
            let services = build_services(&config).await?;
            let execution = services.orders.sell(args.account, &args.symbol, shares).await?;
            print_execution(&execution);
        }
        Commands::Portfolio(args) => {
            let services = build_services(&config).await?;
            let snapshot = services.portfolio.get_portfolio(args.account).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_portfolio(&snapshot);
            }
        }
        Commands::History(args) => {
            let services = build_services(&config).await?;
            let entries = services.portfolio.get_history(args.account).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                print_history(&entries);
            }
        }
        Commands::Holdings(args) => {
            let services = build_services(&config).await?;
            let holdings = services.portfolio.holdings(args.account).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&holdings)?);
            } else {
                print_holdings(&holdings);
            }
        }
    }

    Ok(())
}

/// Quotes need no database, so this talks to the provider directly.
async fn handle_quote(config: &Config, symbol: &str) -> anyhow::Result<()> {
    let quotes = provider_from_config(&config.quotes).context("Failed to build the quote provider")?;
    let quote = executor::lookup_quote(quotes.as_ref(), symbol).await?;
    println!("{} ({}): {}", quote.symbol, quote.name, format_price(quote.price));
    Ok(())
}

// ==============================================================================
// Rendering
// ==============================================================================

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.iter().map(|h| Cell::new(h)).collect::<Vec<_>>());
    table
}

fn money_cell(amount: Decimal) -> Cell {
    Cell::new(format_usd(amount)).set_alignment(CellAlignment::Right)
}

fn price_cell(price: Decimal) -> Cell {
    Cell::new(format_price(price)).set_alignment(CellAlignment::Right)
}

fn print_execution(execution: &Execution) {
    let entry = &execution.entry;
    println!(
        "{} {} {} @ {} ({}). Cash now {}",
        entry.side().as_str(),
        entry.shares.unsigned_abs(),
        entry.symbol,
        format_price(entry.price),
        format_usd(entry.notional()),
        format_usd(execution.cash_after)
    );
}

fn print_portfolio(snapshot: &PortfolioSnapshot) {
    let mut table = new_table(&["Symbol", "Name", "Shares", "Price", "Value"]);
    for position in &snapshot.positions {
        table.add_row(vec![
            Cell::new(&position.symbol),
            Cell::new(&position.name),
            Cell::new(position.net_shares).set_alignment(CellAlignment::Right),
            price_cell(position.current_price),
            money_cell(position.market_value),
        ]);
    }
    for position in &snapshot.unpriced {
        table.add_row(vec![
            Cell::new(&position.symbol),
            Cell::new(format!("unpriced: {}", position.reason)),
            Cell::new(position.net_shares).set_alignment(CellAlignment::Right),
            Cell::new("-"),
            Cell::new("-"),
        ]);
    }
    table.add_row(vec![
        Cell::new("CASH"),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        money_cell(snapshot.cash),
    ]);
    table.add_row(vec![
        Cell::new("TOTAL"),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        money_cell(snapshot.total),
    ]);
    println!("Account {}", snapshot.account_id);
    println!("{table}");
}

fn print_history(entries: &[LedgerEntry]) {
    if entries.is_empty() {
        println!("No transactions yet.");
        return;
    }
    let mut table = new_table(&["#", "Executed", "Side", "Symbol", "Shares", "Price", "Amount"]);
    for entry in entries {
        table.add_row(vec![
            Cell::new(entry.entry_id),
            Cell::new(entry.executed_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(entry.side().as_str()),
            Cell::new(&entry.symbol),
            Cell::new(entry.shares).set_alignment(CellAlignment::Right),
            price_cell(entry.price),
            money_cell(entry.notional()),
        ]);
    }
    println!("{table}");
}

fn print_holdings(holdings: &[Holding]) {
    if holdings.is_empty() {
        println!("No open positions.");
        return;
    }
    let mut table = new_table(&["Symbol", "Shares"]);
    for holding in holdings {
        table.add_row(vec![
            Cell::new(&holding.symbol),
            Cell::new(holding.net_shares).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{table}");
}
