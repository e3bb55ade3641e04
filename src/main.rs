use anyhow::Context as _;
use briefly_watermarker::config::Config;
use briefly_watermarker::event::InvocationPayload;
use briefly_watermarker::handler::{Handler, InvocationResponse};
use briefly_watermarker::store::S3ObjectStore;
use clap::Parser;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Instrument;

/// Briefly watermarker - stamps uploaded images and republishes them
#[derive(Parser, Debug)]
#[command(name = "briefly-watermarker")]
#[command(version, about, long_about = None)]
struct Args {
    /// Replay a saved invocation payload (JSON file) instead of serving invocations
    #[arg(short, long)]
    event: Option<PathBuf>,

    /// Validate configuration and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    briefly_watermarker::logging::init_subscriber()?;

    let args = Args::parse();

    let config = Config::from_env().map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        e
    })?;

    tracing::info!(
        source_bucket = %config.source_bucket,
        destination_bucket = %config.destination_bucket,
        region = %config.region,
        endpoint = config.endpoint_url.as_deref().unwrap_or("default"),
        batch_failure_mode = ?config.batch_failure_mode,
        "Configuration loaded successfully"
    );

    if args.check_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let store = Arc::new(S3ObjectStore::from_config(&config).await);
    let handler = Handler::new(&config, store);

    if let Some(path) = args.event {
        let response = replay(&handler, &path).await?;
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    run(service_fn(|event| invoke(&handler, event))).await
}

async fn invoke(
    handler: &Handler,
    event: LambdaEvent<InvocationPayload>,
) -> Result<InvocationResponse, Error> {
    let span = tracing::info_span!("lambda", request_id = %event.context.request_id);
    handler
        .handle(event.payload)
        .instrument(span)
        .await
        .map_err(Error::from)
}

async fn replay(handler: &Handler, path: &Path) -> anyhow::Result<InvocationResponse> {
    let payload = InvocationPayload::from_file(path)?;

    tracing::info!(
        event_file = %path.display(),
        records = payload.records.len(),
        "Replaying invocation"
    );

    handler
        .handle(payload)
        .await
        .with_context(|| format!("Replay of {} failed", path.display()))
}
