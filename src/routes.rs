use std::sync::Arc;

use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        // Public booking flow
        .route("/api/quote", get(handlers::booking::get_quote))
        .route("/api/availability", get(handlers::booking::get_availability))
        .route("/api/checkout", post(handlers::booking::create_checkout))
        .route(
            "/api/bookings/:id/status",
            get(handlers::booking::get_booking_status),
        )
        .route("/api/contact", post(handlers::contact::submit_contact))
        .route(
            "/calendar/:booking_id",
            get(handlers::calendar::download_ics),
        )
        // Payment providers
        .route("/webhook/stripe", post(handlers::webhook::stripe_webhook))
        .route("/webhook/paylink", post(handlers::webhook::paylink_webhook))
        // Back office
        .route("/api/admin/stats", get(handlers::admin::get_stats))
        .route(
            "/api/admin/bookings",
            get(handlers::admin::get_bookings).post(handlers::admin::create_booking),
        )
        .route(
            "/api/admin/bookings/:id",
            get(handlers::admin::get_booking)
                .patch(handlers::admin::update_booking)
                .delete(handlers::admin::delete_booking),
        )
        .route(
            "/api/admin/bookings/:id/cancel",
            post(handlers::admin::cancel_booking),
        )
        .route(
            "/api/admin/bookings/:id/assign",
            post(handlers::admin::assign_booking),
        )
        .route(
            "/api/admin/bookings/:id/email",
            post(handlers::admin::resend_confirmation),
        )
        .route(
            "/api/admin/motorcycles",
            get(handlers::fleet::list_motorcycles).post(handlers::fleet::create_motorcycle),
        )
        .route(
            "/api/admin/motorcycles/:id",
            patch(handlers::fleet::update_motorcycle),
        )
        .route("/api/admin/messages", get(handlers::messages::list_messages))
        .route(
            "/api/admin/messages/:id/status",
            post(handlers::messages::set_message_status),
        )
        .route(
            "/api/admin/messages/:id",
            delete(handlers::messages::delete_message),
        )
        .route("/api/admin/events", get(handlers::events::events_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
