use access_provisioner::application::dispatcher::RequestDispatcher;
use access_provisioner::application::engine::ProvisioningEngine;
use access_provisioner::application::escalation::Escalator;
use access_provisioner::config::Settings;
use access_provisioner::domain::ports::{DeadLetterSinkBox, RetryLedgerBox};
use access_provisioner::infrastructure::http::{
    HttpIdentityGroupClient, HttpTicketSystem, HttpVaultSafeClient,
};
use access_provisioner::infrastructure::in_memory::{
    InMemoryDeadLetterSink, InMemoryQueue, InMemoryRetryLedger,
};
use access_provisioner::infrastructure::outbox::{JsonLinesDeadLetterSink, LogNotifier};
use access_provisioner::interfaces::csv::report_writer::ReportWriter;
use access_provisioner::interfaces::json::batch_reader::BatchReader;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Queue batch to process (JSON)
    input: PathBuf,

    #[command(flatten)]
    settings: Settings,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .with_writer(io::stderr)
        .init();

    settings.validate().into_diagnostic()?;

    let ledger = build_ledger(&settings)?;
    let dead_letters: DeadLetterSinkBox = match &settings.dead_letter_path {
        Some(path) => Box::new(JsonLinesDeadLetterSink::new(path)),
        None => Box::new(InMemoryDeadLetterSink::new()),
    };

    let timeout = settings.http_timeout();
    let identity =
        HttpIdentityGroupClient::new(settings.identity_endpoint(), timeout).into_diagnostic()?;
    let vault = HttpVaultSafeClient::new(settings.vault_endpoint(), timeout).into_diagnostic()?;
    let tickets = HttpTicketSystem::new(settings.ticket_endpoint(), timeout).into_diagnostic()?;

    let file = File::open(&cli.input).into_diagnostic()?;
    let batch = BatchReader::new(file).messages().into_diagnostic()?;
    let queue = InMemoryQueue::with_messages(batch.clone());

    let engine = ProvisioningEngine::new(
        Box::new(identity),
        Box::new(vault),
        ledger,
        Escalator::new(Box::new(tickets), Box::new(LogNotifier::new()), dead_letters),
        Box::new(queue),
        settings.retry_policy(),
    );
    let dispatcher = RequestDispatcher::new(engine).with_lanes(settings.lanes);

    let report = dispatcher.dispatch(&batch).await;

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_report(&report).into_diagnostic()?;

    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn build_ledger(settings: &Settings) -> Result<RetryLedgerBox> {
    use access_provisioner::infrastructure::rocksdb::RocksDBRetryLedger;

    match &settings.ledger_path {
        Some(path) => Ok(Box::new(RocksDBRetryLedger::open(path).into_diagnostic()?)),
        None => Ok(Box::new(InMemoryRetryLedger::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn build_ledger(settings: &Settings) -> Result<RetryLedgerBox> {
    if settings.ledger_path.is_some() {
        tracing::warn!(
            "Persistent retry ledger requested via --ledger-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory ledger."
        );
    }
    Ok(Box::new(InMemoryRetryLedger::new()))
}
