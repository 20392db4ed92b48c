use clap::Parser;
use crm_sync::adapters::{bigcommerce_source, csv_export, wave_source};
use crm_sync::core::LedgerStore;
use crm_sync::utils::error::ErrorSeverity;
use crm_sync::utils::{logger, validation::Validate};
use crm_sync::{CliArgs, Command, SqliteStore, SyncConfig, SyncEngine, SyncError, SyncPipeline};

fn exit_code(e: &SyncError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,  // 可重試
        ErrorSeverity::High => 1,    // 設定或資料問題
        ErrorSeverity::Critical => 3, // 儲存層問題
    }
}

fn fail(e: SyncError) -> ! {
    tracing::error!(
        "❌ crm-sync failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(&e));
}

fn load_config(args: &CliArgs) -> Result<SyncConfig, SyncError> {
    tracing::info!("📁 Loading configuration from: {}", args.config);
    let mut config = SyncConfig::from_file(&args.config)?;

    if let Some(database) = &args.database {
        tracing::info!("🔧 Database path overridden to: {}", database);
        config.database.path = database.clone();
    }

    config.validate()?;
    Ok(config)
}

async fn run(args: CliArgs, config: SyncConfig) -> Result<(), SyncError> {
    let store = SqliteStore::open(&config.database.path)?;

    match args.command() {
        Command::Sync { dry_run } => {
            let pipeline = SyncPipeline::new(
                wave_source(&config.wave)?,
                bigcommerce_source(&config.bigcommerce)?,
                store,
            );
            let engine = SyncEngine::new(pipeline);

            if dry_run {
                let ledger = engine.preview().await?;
                let report = crm_sync::domain::model::SyncReport::from_reconciliation(&ledger);
                println!("🔍 Dry run (nothing written)");
                println!("{}", serde_json::to_string_pretty(&report)?);
                for skipped in &ledger.skipped {
                    println!(
                        "  skipped {} order {} (customer {:?})",
                        skipped.source, skipped.external_id, skipped.customer_external_id
                    );
                }
            } else {
                let report = engine.run().await?;
                println!("✅ Sync completed successfully!");
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
        Command::Inactive { days } => {
            let inactive = store.inactive_customers(chrono::Utc::now(), days).await?;
            println!("{} customers with no contact in {} days", inactive.len(), days);
            for customer in inactive {
                match customer.days_since_contact {
                    Some(d) => println!("  {:<40} {} days", customer.name, d),
                    None => println!("  {:<40} never", customer.name),
                }
            }
        }
        Command::Latest { limit } => {
            for order in store.latest_orders(limit).await? {
                println!(
                    "  {:<12} {:<40} {:>10} {}",
                    order.invoice_number.as_deref().unwrap_or("-"),
                    order.customer_name,
                    order.total.map(|t| format!("{:.2}", t)).unwrap_or_default(),
                    order.source
                );
            }
        }
        Command::Export { output } => {
            let customers = store.customers().await?;
            let rows = csv_export::export_ledger_csv(&customers, &output)?;
            println!("📁 Exported {} customers to {}", rows, output);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    // 設定檔讀取前先用命令列參數初始化日誌
    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting crm-sync");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => fail(e),
    };
    tracing::info!("✅ Configuration loaded and validated successfully");

    if let Err(e) = run(args, config).await {
        fail(e);
    }
}
