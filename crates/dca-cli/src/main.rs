use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};

mod commands;
mod webhook;

#[derive(Parser)]
#[command(name = "dca")]
#[command(about = "Recurring-purchase order engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> environment -> local overrides)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Per-(account, asset) allocations
    Alloc {
        #[command(subcommand)]
        cmd: AllocCmd,
    },

    /// Place purchases
    Order {
        #[command(subcommand)]
        cmd: OrderCmd,
    },

    /// Inspect the spend ledger
    Ledger {
        #[command(subcommand)]
        cmd: LedgerCmd,
    },

    /// Settle records left STAGED
    Reconcile {
        #[command(subcommand)]
        cmd: ReconcileCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,
    /// Apply SQL migrations.
    Migrate,
}

#[derive(Subcommand)]
enum AllocCmd {
    /// Create or replace an allocation.
    Set {
        #[arg(long)]
        account: String,

        #[arg(long)]
        asset: String,

        /// Daily spend target in quote currency (e.g. 100 or 12.5)
        #[arg(long)]
        daily_target: String,

        /// Purchases per day
        #[arg(long)]
        frequency: u32,
    },

    /// List an account's allocations.
    Show {
        #[arg(long)]
        account: String,
    },
}

#[derive(Subcommand)]
enum OrderCmd {
    /// Place one purchase for a pair, or for every pair of the account.
    #[command(group(ArgGroup::new("target").required(true).args(["asset", "all"])))]
    Place {
        #[arg(long)]
        account: String,

        #[arg(long)]
        asset: Option<String>,

        #[arg(long, default_value_t = false)]
        all: bool,

        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum LedgerCmd {
    /// Most recent records for a pair.
    List {
        #[arg(long)]
        account: String,

        #[arg(long)]
        asset: String,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum ReconcileCmd {
    /// Ask the venue about STAGED records older than the grace period.
    Sweep {
        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Dev-time convenience; absent file is fine.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = dca_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = dca_db::status(&pool).await?;
                    println!("db_ok={} has_ledger_table={}", s.ok, s.has_ledger_table);
                    if s.has_ledger_table {
                        println!("staged={}", dca_db::count_staged(&pool).await?);
                    }
                }
                DbCmd::Migrate => {
                    dca_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
            let loaded = dca_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Alloc { cmd } => match cmd {
            AllocCmd::Set {
                account,
                asset,
                daily_target,
                frequency,
            } => commands::alloc::set(&account, &asset, &daily_target, frequency).await?,
            AllocCmd::Show { account } => commands::alloc::show(&account).await?,
        },

        Commands::Order { cmd } => match cmd {
            OrderCmd::Place {
                account,
                asset,
                all,
                config_paths,
            } => {
                let asset = if all { None } else { asset };
                commands::order::place(&config_paths, &account, asset.as_deref()).await?
            }
        },

        Commands::Ledger { cmd } => match cmd {
            LedgerCmd::List {
                account,
                asset,
                limit,
            } => commands::ledger::list(&account, &asset, limit).await?,
        },

        Commands::Reconcile { cmd } => match cmd {
            ReconcileCmd::Sweep { config_paths } => commands::reconcile::sweep(&config_paths).await?,
        },
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
