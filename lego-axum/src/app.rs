use axum::extract::DefaultBodyLimit;
use axum::Router;
use lego_core::LegoConfigSnapshot;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::{routes, AppState};

/// Room for a full batch of maximum-size files plus form overhead.
const FORM_OVERHEAD: u64 = 1024 * 1024;

#[derive(Clone)]
pub struct LegoApp {
    pub state: AppState,
    pub router: Router<()>,
}

impl LegoApp {
    pub fn new(state: AppState) -> Self {
        let body_limit = usize::try_from(state.rules.max_batch_bytes() + FORM_OVERHEAD).unwrap_or(usize::MAX);

        let router = routes::router(state.clone())
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );

        Self { state, router }
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

/// Build the application from configuration.
pub fn build(config: LegoConfigSnapshot) -> anyhow::Result<LegoApp> {
    Ok(LegoApp::new(AppState::from_config(config)?))
}
