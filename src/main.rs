use std::net::TcpListener;
use std::sync::Arc;

use staffauth::configuration::{get_configuration, Settings};
use staffauth::directory::PgUserDirectory;
use staffauth::error::AppError;
use staffauth::startup::run;
use staffauth::telemetry::init_telemetry;

/// Load settings and bring the database up to the current schema
async fn bootstrap() -> Result<(Settings, PgUserDirectory), AppError> {
    let configuration = get_configuration()?;
    tracing::info!("Configuration loaded successfully");

    tracing::info!("Attempting to connect to database");
    let directory = PgUserDirectory::connect(&configuration.database).await?;
    directory.migrate().await?;
    tracing::info!("Database ready");

    Ok((configuration, directory))
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let (configuration, directory) = match bootstrap().await {
        Ok(ready) => ready,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            let kind = match e {
                AppError::Config(_) => std::io::ErrorKind::InvalidInput,
                _ => std::io::ErrorKind::ConnectionRefused,
            };
            return Err(std::io::Error::new(kind, e.to_string()));
        }
    };

    let address = configuration.application.address();
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, Arc::new(directory), configuration)?;
    server.await
}
