use axum::{Router, routing::get};
use crate::{AppState, controllers::alerts_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/alerts",
            get(alerts_controller::get_alerts).post(alerts_controller::post_alert),
        )
        .route("/alerts/url", get(alerts_controller::get_alert_for_url))
}
