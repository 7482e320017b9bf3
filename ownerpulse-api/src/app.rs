/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use ownerpulse_api::{app::AppState, config::Config};
/// use ownerpulse_shared::auth::jwks::{HttpKeySource, JwksCache};
/// use ownerpulse_shared::auth::jwt::TokenVerifier;
/// use sqlx::PgPool;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let source = HttpKeySource::for_domain(&config.auth.domain, config.jwks_fetch_timeout())?;
/// let keys = JwksCache::new(
///     Arc::new(source),
///     config.jwks_cache_ttl(),
///     config.jwks_min_refresh_interval(),
/// );
/// let verifier = TokenVerifier::new(keys, config.verifier_config());
/// let state = AppState::new(pool, config, verifier);
/// let app = ownerpulse_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::get,
    Router,
};
use ownerpulse_shared::auth::{jwt::TokenVerifier, middleware::authenticate};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{warn, Level};

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Access token verifier with its signing key cache
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config, verifier: TokenVerifier) -> Self {
        Self {
            db,
            config: Arc::new(config),
            verifier: Arc::new(verifier),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health                      # public
/// ├── POST /users                       # public
/// ├── /users                            # bearer token
/// │   ├── GET        /                  # admin only
/// │   ├── GET|PATCH  /profile
/// │   └── GET|PATCH|DELETE /:id         # self or admin
/// ├── /properties                       # bearer token, owner scoped
/// │   ├── GET|POST   /
/// │   ├── GET|PATCH|DELETE /:id
/// │   ├── GET        /:id/bookings
/// │   └── GET        /:id/work-orders
/// ├── /bookings                         # bearer token, owner scoped
/// │   ├── GET|POST   /
/// │   └── GET|PATCH|DELETE /:id
/// └── /work-orders                      # bearer token, owner scoped
///     ├── GET|POST   /
///     └── GET|PATCH|DELETE /:id
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS
/// 3. Compression
/// 4. Logging (tower-http TraceLayer)
/// 5. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;
    use axum::routing::post;

    // Public routes
    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/users", post(routes::users::create_user));

    // Everything else requires a verified bearer token
    let user_routes = Router::new()
        .route("/", get(routes::users::list_users))
        .route(
            "/profile",
            get(routes::users::get_profile).patch(routes::users::update_profile),
        )
        .route(
            "/:id",
            get(routes::users::get_user)
                .patch(routes::users::update_user)
                .delete(routes::users::delete_user),
        );

    let property_routes = Router::new()
        .route(
            "/",
            get(routes::properties::list_properties).post(routes::properties::create_property),
        )
        .route(
            "/:id",
            get(routes::properties::get_property)
                .patch(routes::properties::update_property)
                .delete(routes::properties::delete_property),
        )
        .route("/:id/bookings", get(routes::properties::list_property_bookings))
        .route(
            "/:id/work-orders",
            get(routes::properties::list_property_work_orders),
        );

    let booking_routes = Router::new()
        .route(
            "/",
            get(routes::bookings::list_bookings).post(routes::bookings::create_booking),
        )
        .route(
            "/:id",
            get(routes::bookings::get_booking)
                .patch(routes::bookings::update_booking)
                .delete(routes::bookings::delete_booking),
        );

    let work_order_routes = Router::new()
        .route(
            "/",
            get(routes::work_orders::list_work_orders)
                .post(routes::work_orders::create_work_order),
        )
        .route(
            "/:id",
            get(routes::work_orders::get_work_order)
                .patch(routes::work_orders::update_work_order)
                .delete(routes::work_orders::delete_work_order),
        );

    let protected_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/properties", property_routes)
        .nest("/bookings", booking_routes)
        .nest("/work-orders", work_order_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let cors = cors_layer(&state.config.api.cors_origins);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Permissive CORS when the allow-list contains `*`, otherwise exact origins
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Bearer token authentication layer
///
/// Verifies the access token and injects the resulting
/// [`IdentityAssertion`](ownerpulse_shared::identity::IdentityAssertion)
/// into request extensions. Handlers turn it into a local user through the
/// [`CurrentUser`](crate::extract::CurrentUser) extractor.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Request<Body> is not Sync, so don't hold a borrow of it across the await
    let headers = req.headers().clone();

    let assertion = authenticate(&state.verifier, &headers)
        .await
        .map_err(|e| {
            if e.is_retriable() {
                warn!(error = %e, "Signing keys unavailable, rejecting request");
            }
            ApiError::from(e)
        })?;

    req.extensions_mut().insert(assertion);

    Ok(next.run(req).await)
}
