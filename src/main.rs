use dotenvy::dotenv;
use tracing::info;

use std::net::SocketAddr;
use subkeeper::infra::{
    app::create_app,
    config::AppConfig,
    expiry_sweeper::run_expiry_sweep_loop,
    setup::{init_app_state, init_tracing},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = AppConfig::from_env();
    init_tracing(config.json_logs);

    let app_state = init_app_state(config).await?;

    // Read bind address from config before moving app_state
    let bind_addr = app_state.config.bind_addr;

    tokio::spawn(run_expiry_sweep_loop(
        app_state.orchestrator.clone(),
        app_state.config.expiry_sweep_interval,
    ));

    let app = create_app(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Backend listening at {}", &listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
