//! Web server module

pub mod capture;
pub mod render;

use anyhow::Result;
use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue},
    response::Html,
    routing::get,
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

use crate::config::Config;
use crate::geoip::SharedGeoLookup;
use crate::store::SharedStore;

pub struct AppState {
    pub store: SharedStore,
    pub geo: SharedGeoLookup,
}

impl AppState {
    pub fn new(store: SharedStore, geo: SharedGeoLookup) -> Self {
        Self { store, geo }
    }
}

/// Homepage: capture this visit, then render the full history
async fn index(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Html<String> {
    let peer = connect_info.map(|ConnectInfo(addr)| addr.ip());

    let visit = capture::capture(&state, &headers, peer).await;
    let history = render::load_history(state.store.as_ref(), &visit).await;

    Html(render::render_page(&visit, &history))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        // Every hit must reach the handler to be recorded
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}

pub async fn start_server(config: &Config, state: Arc<AppState>) -> Result<()> {
    let app = router(state);

    let addr = config.bind_addr();
    info!("Web server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
