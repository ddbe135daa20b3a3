use clap::Parser;
use miette::{IntoDiagnostic, Result};
use payouts::application::service::PayoutService;
use payouts::domain::ports::{RequestFilter, RequestStore};
use payouts::domain::request::Status;
use payouts::infrastructure::gateway::SimulatedGateway;
use payouts::infrastructure::in_memory::InMemoryRequestStore;
use payouts::infrastructure::runtime::{ProcessingRuntime, RetryPolicy};
use payouts::interfaces::csv::report_writer::ReportWriter;
use payouts::interfaces::csv::request_reader::RequestReader;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input CSV file of payment requests
    input: PathBuf,

    /// Delay between creation and worker pickup, in milliseconds
    #[arg(long, default_value_t = 2000)]
    schedule_delay_ms: u64,

    /// Lower bound of the simulated gateway latency, in milliseconds
    #[arg(long, default_value_t = 2000)]
    gateway_delay_min_ms: u64,

    /// Upper bound of the simulated gateway latency, in milliseconds
    #[arg(long, default_value_t = 5000)]
    gateway_delay_max_ms: u64,

    /// Probability that the simulated gateway accepts a payout (0.0 - 1.0)
    #[arg(long, default_value_t = 0.9)]
    success_rate: f64,

    /// Maximum worker attempts per request on transient failures
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// How long to wait for all requests to leave pending/processing
    #[arg(long, default_value_t = 60)]
    drain_timeout_secs: u64,

    /// Complete approved requests once processing has drained
    #[arg(long)]
    finalize: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.gateway_delay_max_ms < cli.gateway_delay_min_ms {
        miette::bail!("gateway delay range is inverted");
    }

    let store = Arc::new(InMemoryRequestStore::new());
    let gateway = Arc::new(SimulatedGateway::new(
        cli.gateway_delay_min_ms..=cli.gateway_delay_max_ms,
        cli.success_rate,
    ));
    let (scheduler, runtime) = ProcessingRuntime::start(
        store.clone(),
        gateway,
        RetryPolicy {
            max_attempts: cli.max_attempts,
            ..Default::default()
        },
    );
    let service = PayoutService::with_schedule_delay(
        store.clone(),
        scheduler,
        Duration::from_millis(cli.schedule_delay_ms),
    );

    // Create the requests; each successful creation schedules a worker run.
    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = RequestReader::new(file);
    for row in reader.requests() {
        match row {
            Ok(input) => {
                if let Err(e) = service.create(input).await {
                    eprintln!("Error creating request: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading request: {}", e);
            }
        }
    }

    // Wait for the workers to drain the pending/processing backlog.
    let deadline = Instant::now() + Duration::from_secs(cli.drain_timeout_secs);
    loop {
        let in_flight = store
            .list(&RequestFilter::default())
            .await
            .into_diagnostic()?
            .iter()
            .filter(|r| matches!(r.status, Status::Pending | Status::Processing))
            .count();
        if in_flight == 0 {
            break;
        }
        if Instant::now() >= deadline {
            eprintln!("Drain timeout: {} requests still in flight", in_flight);
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    if cli.finalize {
        let approved = store
            .list(&RequestFilter {
                status: Some(Status::Approved),
                ..Default::default()
            })
            .await
            .into_diagnostic()?;
        for request in approved {
            if let Err(e) = service.complete(request.id).await {
                eprintln!("Error completing request {}: {}", request.id, e);
            }
        }
    }

    // Output final state
    let requests = store
        .list(&RequestFilter::default())
        .await
        .into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_requests(&requests).into_diagnostic()?;

    drop(service);
    runtime.join().await;

    Ok(())
}
