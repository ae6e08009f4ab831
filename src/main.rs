use std::process::ExitCode;

use fleetkeeper::infrastructure::bootstrap;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let tokens: Vec<String> = std::env::args().skip(1).collect();
    let launched = bootstrap::launch(tokens).await;
    let outcome = launched.exit.wait().await;

    info!(code = outcome.code, "fleetkeeper stopped");
    ExitCode::from(outcome.code)
}
