use axum::{Router, routing::post};
use crate::{AppState, controllers::admin_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/cleanup", post(admin_controller::post_cleanup))
        .route("/sweep", post(admin_controller::post_sweep))
        .route("/test-notification", post(admin_controller::post_test_notification))
}
