use anyhow::Result;
use tripstore::cli::{start, telemetry};

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    let action = start()?;

    let result = action.execute().await;

    telemetry::shutdown_tracer();

    result
}
