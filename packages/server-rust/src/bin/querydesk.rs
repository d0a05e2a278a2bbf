use std::sync::Arc;

use clap::Parser;
use querydesk_server::catalog::JsonFileCatalog;
use querydesk_server::config::POSTGRES_ELEVATION_TEMPLATE;
use querydesk_server::session::{ConnectionSession, PgConnector};
use querydesk_server::telemetry::init_tracing;
use querydesk_server::{build_operation_pipeline, Cli, NetworkModule, QueryDeskService};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    let elevation = cli.elevation_config(POSTGRES_ELEVATION_TEMPLATE);
    if elevation.secret.is_none() {
        warn!("DB_ROLE_PASSWORD is not set; every database operation will fail role elevation");
    }

    let connector = Arc::new(PgConnector::new(&cli.database_config()));
    let session = Arc::new(ConnectionSession::new(connector, elevation));
    let catalog = Arc::new(JsonFileCatalog::new(&cli.catalog));
    info!(catalog = %catalog.path().display(), "query catalog configured");

    let service_config = cli.service_config();
    let service = Arc::new(QueryDeskService::new(catalog, session));
    let pipeline = build_operation_pipeline(service, &service_config);

    let mut network = NetworkModule::new(cli.network_config(), pipeline, service_config);
    let port = network.start().await?;
    info!(port, "querydesk listening");

    network
        .serve(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await
}
