use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "crm-sync")]
#[command(about = "Merge Wave and BigCommerce customers into one CRM ledger")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "crm-sync.toml", global = true)]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Override the database path from the config file
    #[arg(long, global = true)]
    pub database: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Fetch both sources and replace the customer ledger
    Sync {
        /// Fetch and reconcile only; leave the database untouched
        #[arg(long)]
        dry_run: bool,
    },
    /// List customers with no contact in the last N days
    Inactive {
        #[arg(long, default_value = "14", value_parser = clap::value_parser!(i64).range(0..=36500))]
        days: i64,
    },
    /// Show the most recent orders
    Latest {
        #[arg(long, default_value = "5")]
        limit: usize,
    },
    /// Export the customer ledger as CSV
    Export {
        #[arg(short, long, default_value = "customers.csv")]
        output: String,
    },
}

impl CliArgs {
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Sync { dry_run: false })
    }
}
