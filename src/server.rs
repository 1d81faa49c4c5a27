//! # Server Configuration
//!
//! Router, middleware stack and HTTP server lifecycle for the SAKINA API.

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::auth_middleware;
use crate::config::AppConfig;
use crate::handlers::{
    self, commissions, hotels, invoices, notifications, offerings, profiles, requests, settings,
    stats, workspaces,
};
use crate::telemetry::{self, TRACE_ID_HEADER};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
}

/// Authenticated `/api/v1` routes
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/me", get(profiles::me))
        .route(
            "/workspaces",
            get(workspaces::list_workspaces).post(workspaces::create_workspace),
        )
        .route(
            "/workspaces/{id}",
            get(workspaces::get_workspace)
                .patch(workspaces::update_workspace)
                .delete(workspaces::delete_workspace),
        )
        .route(
            "/profiles",
            get(profiles::list_profiles).post(profiles::create_profile),
        )
        .route(
            "/profiles/{id}",
            get(profiles::get_profile)
                .patch(profiles::update_profile)
                .delete(profiles::delete_profile),
        )
        .route("/hotels", get(hotels::list_hotels).post(hotels::create_hotel))
        .route(
            "/hotels/{id}",
            get(hotels::get_hotel)
                .put(hotels::update_hotel)
                .delete(hotels::delete_hotel),
        )
        .route(
            "/requests",
            get(requests::list_requests).post(requests::create_request),
        )
        .route(
            "/requests/{id}",
            get(requests::get_request)
                .patch(requests::update_request)
                .delete(requests::delete_request),
        )
        .route(
            "/requests/{id}/offerings",
            get(offerings::list_request_offerings).post(offerings::submit_offering),
        )
        .route("/offerings", get(offerings::list_offerings))
        .route("/offerings/{id}", get(offerings::get_offering))
        .route(
            "/offerings/{id}/prices",
            put(offerings::update_offering_prices),
        )
        .route("/offerings/{id}/margin", post(offerings::apply_margin))
        .route("/offerings/{id}/confirm", post(offerings::confirm_offering))
        .route("/offerings/{id}/withdraw", post(offerings::withdraw_offering))
        .route(
            "/commissions",
            get(commissions::list_commissions).post(commissions::create_commission),
        )
        .route(
            "/commissions/{id}",
            axum::routing::patch(commissions::update_commission)
                .delete(commissions::delete_commission),
        )
        .route("/settings", get(settings::list_settings))
        .route(
            "/settings/{key}",
            get(settings::get_setting).put(settings::upsert_setting),
        )
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        .route(
            "/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route("/invoices/{id}", get(invoices::get_invoice))
        .route(
            "/invoices/{id}/status",
            post(invoices::transition_invoice),
        )
        .route("/stats", get(stats::dashboard_stats))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, TRACE_ID_HEADER])
        .expose_headers([TRACE_ID_HEADER, HeaderName::from_static("retry-after")]);

    if config.cors_allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .nest("/api/v1", api_routes(state.clone()))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(telemetry::trace_context_middleware))
}

/// Starts the server and serves until `shutdown` is cancelled
pub async fn run_server(
    config: Arc<AppConfig>,
    db: DatabaseConnection,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    let state = AppState {
        config: Arc::clone(&config),
        db,
    };
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, profile = %config.profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Cancels `token` on Ctrl+C or SIGTERM
pub async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::warn!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::warn!("Received SIGTERM, shutting down"),
    }
    token.cancel();
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::root,
        handlers::healthz,
        profiles::me,
        profiles::create_profile,
        profiles::list_profiles,
        profiles::get_profile,
        profiles::update_profile,
        profiles::delete_profile,
        workspaces::create_workspace,
        workspaces::list_workspaces,
        workspaces::get_workspace,
        workspaces::update_workspace,
        workspaces::delete_workspace,
        hotels::create_hotel,
        hotels::list_hotels,
        hotels::get_hotel,
        hotels::update_hotel,
        hotels::delete_hotel,
        requests::create_request,
        requests::list_requests,
        requests::get_request,
        requests::update_request,
        requests::delete_request,
        offerings::submit_offering,
        offerings::list_request_offerings,
        offerings::list_offerings,
        offerings::get_offering,
        offerings::update_offering_prices,
        offerings::apply_margin,
        offerings::confirm_offering,
        offerings::withdraw_offering,
        commissions::create_commission,
        commissions::list_commissions,
        commissions::update_commission,
        commissions::delete_commission,
        settings::list_settings,
        settings::get_setting,
        settings::upsert_setting,
        notifications::list_notifications,
        notifications::unread_count,
        notifications::mark_read,
        notifications::mark_all_read,
        invoices::create_invoice,
        invoices::list_invoices,
        invoices::get_invoice,
        invoices::transition_invoice,
        stats::dashboard_stats,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::pricing::RoomCounts,
            crate::pricing::RoomPrices,
            crate::models::profile::Role,
            crate::models::request::RequestStatus,
            crate::models::request::PackageType,
            crate::models::offering::OfferingStatus,
            crate::models::invoice::InvoiceStatus,
            crate::models::notification::NotificationKind,
            handlers::HealthStatus,
            handlers::types::DeletedResponse,
            profiles::ProfileDto,
            workspaces::WorkspaceDto,
            hotels::HotelDto,
            requests::RequestDto,
            offerings::OfferingDto,
            offerings::QuoteResponse,
            offerings::ConfirmResponse,
            commissions::CommissionDto,
            settings::SettingDto,
            notifications::NotificationDto,
            invoices::InvoiceDto,
            stats::DashboardStats,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "root", description = "Service information and health"),
        (name = "profiles", description = "Users and roles"),
        (name = "workspaces", description = "Travel agency tenants"),
        (name = "hotels", description = "Provider hotels"),
        (name = "requests", description = "Accommodation requests"),
        (name = "offerings", description = "Bids, quotes and confirmation"),
        (name = "commissions", description = "Workspace commission rates"),
        (name = "settings", description = "Marketplace settings"),
        (name = "notifications", description = "Per-user notification feed"),
        (name = "invoices", description = "Invoices for confirmed bookings"),
        (name = "stats", description = "Admin dashboard counts"),
    ),
    info(
        title = "SAKINA Marketplace API",
        description = "Hotel-bidding marketplace for travel agencies, hotel providers and administrators",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
