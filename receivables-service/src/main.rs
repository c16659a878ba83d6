//! Receivables Service entry point: one-shot ledger import run.

use receivables_service::config::ReceivablesConfig;
use receivables_service::import::import_workbook;
use receivables_service::services::Database;

use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load configuration
    let config = ReceivablesConfig::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    // Initialize tracing
    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting receivables-service"
    );

    // The file to import comes from the first CLI argument or IMPORT_FILE.
    let file = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("IMPORT_FILE").ok())
        .ok_or_else(|| {
            tracing::error!("No import file given (argument or IMPORT_FILE)");
            std::io::Error::other("No import file given")
        })?;

    tracing::info!(
        service_name = %config.service_name,
        file = %file,
        batch_size = config.import.batch_size,
        batch_delay_ms = config.import.batch_delay_ms,
        db_max_connections = config.database.max_connections,
        db_min_connections = config.database.min_connections,
        "Configuration loaded"
    );

    let database = Database::new(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to connect to database");
        std::io::Error::other(format!("Database error: {}", e))
    })?;

    database.run_migrations().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to run migrations");
        std::io::Error::other(format!("Migration error: {}", e))
    })?;

    let outcome = import_workbook(&database, &file, &config.import).await;

    // The summary is reported even when the run aborted partway; it is the
    // operator's only audit surface.
    let s = &outcome.summary;
    tracing::info!(
        rows_read = s.rows_read,
        rows_skipped_empty = s.rows_skipped_empty,
        rows_skipped_duplicate = s.rows_skipped_duplicate,
        cells_defaulted = s.cells_defaulted,
        records_processed = s.records_processed,
        customers_created = s.customers_created,
        customers_updated = s.customers_updated,
        balances_created = s.balances_created,
        balances_updated = s.balances_updated,
        "Import summary"
    );

    match outcome.error {
        Some(e) => {
            tracing::error!(error = %e, "Import failed");
            Err(std::io::Error::other(format!("Import failed: {}", e)))
        }
        None => {
            tracing::info!("Import complete");
            Ok(())
        }
    }
}
