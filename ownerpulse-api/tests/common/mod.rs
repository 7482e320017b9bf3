/// Common test utilities for integration tests
///
/// - App construction over a per-test database pool
/// - Access tokens signed with the fixture RSA key, verified against a
///   static key set (no network)
/// - A request helper that returns status and parsed JSON body

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ownerpulse_api::app::{build_router, AppState};
use ownerpulse_api::config::Config;
use ownerpulse_shared::auth::jwks::{JwksCache, StaticKeySource};
use ownerpulse_shared::auth::jwt::{issuer_for_domain, TokenVerifier};
use serde_json::{json, Value};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tower::Service as _;

pub const DOMAIN: &str = "ownerpulse-test.us.auth0.com";
pub const AUDIENCE: &str = "https://api.ownerpulse.test";

const KEY_ID: &str = "test-key-1";
const JWKS: &str = include_str!("../../../ownerpulse-shared/tests/fixtures/jwks.json");
const PRIVATE_KEY: &[u8] = include_bytes!("../../../ownerpulse-shared/tests/fixtures/rsa_private.pem");

pub fn test_config() -> Config {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "postgresql://unused/ownerpulse_test"),
        ("AUTH0_DOMAIN", DOMAIN),
        ("AUTH0_AUDIENCE", AUDIENCE),
        ("RUN_MIGRATIONS", "false"),
    ]);

    Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
        .expect("test configuration is complete")
}

/// Builds the full router over the given pool
pub fn test_app(pool: PgPool) -> Router {
    let config = test_config();
    let source = StaticKeySource::from_json(JWKS).expect("fixture key set parses");
    let keys = JwksCache::new(
        Arc::new(source),
        config.jwks_cache_ttl(),
        config.jwks_min_refresh_interval(),
    );
    let verifier = TokenVerifier::new(keys, config.verifier_config());

    build_router(AppState::new(pool, config, verifier))
}

/// Signs an access token for `subject` with optional email and name
pub fn token_for(subject: &str, email: Option<&str>, name: Option<&str>) -> String {
    let now = Utc::now().timestamp();
    let mut claims = json!({
        "sub": subject,
        "iss": issuer_for_domain(DOMAIN),
        "aud": AUDIENCE,
        "iat": now,
        "exp": now + 3600,
    });
    if let Some(email) = email {
        claims["email"] = json!(email);
    }
    if let Some(name) = name {
        claims["name"] = json!(name);
    }

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KEY_ID.to_string());

    encode(
        &header,
        &claims,
        &EncodingKey::from_rsa_pem(PRIVATE_KEY).expect("fixture key parses"),
    )
    .expect("token signs")
}

/// Sends one request and returns the status with the JSON body (Null when empty)
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request builds");

    let response = app.clone().call(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");

    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            panic!("non-JSON body ({}): {}", status, String::from_utf8_lossy(&bytes))
        })
    };

    (status, json)
}

/// The Cabin property used across scenarios
pub fn cabin() -> Value {
    json!({
        "name": "Cabin",
        "bedrooms": 3,
        "bathrooms": 2,
        "address": "1 Lake Rd",
        "city": "Tahoe",
        "state": "CA",
        "zipCode": "96150"
    })
}

pub fn booking_for(property_id: &str, check_in: &str, check_out: &str) -> Value {
    json!({
        "propertyId": property_id,
        "guestName": "Sam Guest",
        "guestEmail": "sam@example.com",
        "checkInDate": check_in,
        "checkOutDate": check_out,
        "numberOfGuests": 2,
        "totalAmount": "850.00",
        "cleaningFee": "75.00"
    })
}
