use tracing::info;

use crate::{AppState, Result};

pub(crate) async fn serve() -> Result<()> {
    let app_state = AppState::from_env().await?;
    let port = app_state.app.port;

    let routes = super::make_router().with_state(app_state);

    info!("Spawning Tasks");
    let server = tokio::spawn(super::run_server(routes, port));
    info!("Tasks Spawned");

    server.await??;

    info!("Main Returning");

    Ok(())
}
