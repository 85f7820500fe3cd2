use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{AppState, controllers::home_controller};

pub mod admin_routes;
pub mod alerts_routes;
pub mod home_routes;
pub mod prices_routes;

/// The tracker API. Capture clients talk to it under `/api`.
fn api() -> Router<AppState> {
    let router = Router::<AppState>::new();

    let router = prices_routes::add_routes(router);
    let router = alerts_routes::add_routes(router);
    admin_routes::add_routes(router)
}

pub fn app(state: AppState) -> Router {
    let router = Router::<AppState>::new();
    let router = home_routes::add_routes(router);

    router
        .merge(api())
        .nest("/api", api())
        .fallback(home_controller::not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
