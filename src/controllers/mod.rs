pub mod admin_controller;
pub mod alerts_controller;
pub mod home_controller;
pub mod prices_controller;

use axum::extract::rejection::JsonRejection;

use crate::error::TrackerError;

/// Malformed bodies surface like any other failure (500 + `{error}`).
pub(crate) fn body_error(rejection: JsonRejection) -> TrackerError {
    TrackerError::InvalidObservation(rejection.body_text())
}
