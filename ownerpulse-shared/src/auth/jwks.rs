/// Signing key set retrieval and caching
///
/// Access tokens are signed with keys published by the identity provider at
/// `https://{domain}/.well-known/jwks.json`. Keys are cached by `kid` for a
/// TTL; a miss or a stale cache triggers a refresh, throttled to at most one
/// attempt per minimum refresh interval. When a refresh fails the previously
/// fetched key is served if there is one.
///
/// # Example
///
/// ```no_run
/// use ownerpulse_shared::auth::jwks::{HttpKeySource, JwksCache};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let source = HttpKeySource::for_domain("tenant.us.auth0.com", Duration::from_secs(5))?;
/// let cache = JwksCache::new(Arc::new(source), Duration::from_secs(600), Duration::from_secs(12));
///
/// if let Some(jwk) = cache.get("key-id").await? {
///     println!("found key {:?}", jwk.common.key_id);
/// }
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Error type for key set retrieval
#[derive(Debug, Clone, thiserror::Error)]
pub enum JwksError {
    /// Network or HTTP-level failure
    #[error("Failed to fetch signing keys: {0}")]
    Fetch(String),

    /// Response body was not a key set
    #[error("Failed to parse signing keys: {0}")]
    Parse(String),

    /// No key set has been loaded yet and a refresh is not allowed right now
    #[error("Signing keys not loaded")]
    NotLoaded,
}

/// Where signing keys come from
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, JwksError>;
}

/// Fetches keys from the provider's well-known endpoint
#[derive(Debug, Clone)]
pub struct HttpKeySource {
    client: reqwest::Client,
    url: String,
}

impl HttpKeySource {
    /// Creates a source for an explicit URL
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, JwksError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| JwksError::Fetch(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Creates a source for an Auth0 tenant domain
    pub fn for_domain(domain: &str, timeout: Duration) -> Result<Self, JwksError> {
        Self::new(jwks_url(domain), timeout)
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn fetch(&self) -> Result<JwkSet, JwksError> {
        debug!(url = %self.url, "Fetching signing keys");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| JwksError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JwksError::Fetch(format!(
                "Key set request failed with status {}",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| JwksError::Parse(e.to_string()))
    }
}

/// Serves a fixed key set
#[derive(Debug, Clone)]
pub struct StaticKeySource {
    keys: JwkSet,
}

impl StaticKeySource {
    pub fn new(keys: JwkSet) -> Self {
        Self { keys }
    }

    /// Parses a JWKS document
    pub fn from_json(json: &str) -> Result<Self, JwksError> {
        let keys = serde_json::from_str(json).map_err(|e| JwksError::Parse(e.to_string()))?;
        Ok(Self { keys })
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn fetch(&self) -> Result<JwkSet, JwksError> {
        Ok(self.keys.clone())
    }
}

/// Well-known key set URL for a tenant domain
pub fn jwks_url(domain: &str) -> String {
    format!(
        "https://{}/.well-known/jwks.json",
        domain.trim_end_matches('/')
    )
}

#[derive(Default)]
struct CacheState {
    keys: HashMap<String, Jwk>,
    fetched_at: Option<Instant>,
    last_attempt: Option<Instant>,
}

/// Key cache keyed by `kid`
pub struct JwksCache {
    source: Arc<dyn KeySource>,
    ttl: Duration,
    min_refresh_interval: Duration,
    state: RwLock<CacheState>,
}

impl JwksCache {
    pub fn new(source: Arc<dyn KeySource>, ttl: Duration, min_refresh_interval: Duration) -> Self {
        Self {
            source,
            ttl,
            min_refresh_interval,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Looks up a key by `kid`
    ///
    /// Returns `Ok(None)` when the key set is available but has no such key.
    ///
    /// # Errors
    ///
    /// Fails only when the key set can't be fetched and no previously fetched
    /// copy of the requested key exists.
    pub async fn get(&self, kid: &str) -> Result<Option<Jwk>, JwksError> {
        {
            let state = self.state.read().await;
            if self.is_fresh(&state) {
                if let Some(jwk) = state.keys.get(kid) {
                    return Ok(Some(jwk.clone()));
                }
            }
        }

        // Refreshes are serialized behind the write lock
        let mut state = self.state.write().await;

        if self.is_fresh(&state) {
            if let Some(jwk) = state.keys.get(kid) {
                return Ok(Some(jwk.clone()));
            }
        }

        let now = Instant::now();
        let may_refresh = state
            .last_attempt
            .map_or(true, |at| now.duration_since(at) >= self.min_refresh_interval);

        if !may_refresh {
            debug!(kid, "Key set refresh throttled");
            if state.fetched_at.is_none() {
                return Err(JwksError::NotLoaded);
            }
            return Ok(state.keys.get(kid).cloned());
        }

        state.last_attempt = Some(now);

        match self.source.fetch().await {
            Ok(set) => {
                state.keys = index_by_kid(set);
                state.fetched_at = Some(now);
                info!(keys = state.keys.len(), "Signing keys refreshed");
                Ok(state.keys.get(kid).cloned())
            }
            Err(e) => match state.keys.get(kid) {
                Some(jwk) => {
                    warn!(error = %e, kid, "Key set refresh failed, serving cached key");
                    Ok(Some(jwk.clone()))
                }
                None => {
                    warn!(error = %e, kid, "Key set refresh failed");
                    Err(e)
                }
            },
        }
    }

    fn is_fresh(&self, state: &CacheState) -> bool {
        state
            .fetched_at
            .map_or(false, |at| at.elapsed() < self.ttl)
    }
}

fn index_by_kid(set: JwkSet) -> HashMap<String, Jwk> {
    set.keys
        .into_iter()
        .filter_map(|jwk| jwk.common.key_id.clone().map(|kid| (kid, jwk)))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    pub(crate) const FIXTURE_JWKS: &str = include_str!("../../tests/fixtures/jwks.json");

    /// Counts fetches and can be switched into a failing state
    pub(crate) struct FlakySource {
        inner: StaticKeySource,
        pub fetches: AtomicUsize,
        pub failing: AtomicBool,
    }

    impl FlakySource {
        pub(crate) fn new() -> Self {
            Self {
                inner: StaticKeySource::from_json(FIXTURE_JWKS).unwrap(),
                fetches: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl KeySource for FlakySource {
        async fn fetch(&self) -> Result<JwkSet, JwksError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(JwksError::Fetch("connection refused".to_string()));
            }
            self.inner.fetch().await
        }
    }

    fn cache(source: Arc<FlakySource>) -> JwksCache {
        JwksCache::new(source, Duration::from_secs(600), Duration::from_secs(12))
    }

    #[test]
    fn test_jwks_url() {
        assert_eq!(
            jwks_url("tenant.us.auth0.com"),
            "https://tenant.us.auth0.com/.well-known/jwks.json"
        );
        assert_eq!(
            jwks_url("tenant.us.auth0.com/"),
            "https://tenant.us.auth0.com/.well-known/jwks.json"
        );
    }

    #[test]
    fn test_static_source_rejects_garbage() {
        assert!(matches!(
            StaticKeySource::from_json("not json"),
            Err(JwksError::Parse(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_hits_do_not_refetch() {
        let source = Arc::new(FlakySource::new());
        let cache = cache(source.clone());

        assert!(cache.get("test-key-1").await.unwrap().is_some());
        assert!(cache.get("test-key-1").await.unwrap().is_some());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_kid_is_throttled() {
        let source = Arc::new(FlakySource::new());
        let cache = cache(source.clone());

        assert!(cache.get("missing").await.unwrap().is_none());
        assert!(cache.get("missing").await.unwrap().is_none());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(13)).await;
        assert!(cache.get("missing").await.unwrap().is_none());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_key_served_when_refresh_fails() {
        let source = Arc::new(FlakySource::new());
        let cache = cache(source.clone());

        assert!(cache.get("test-key-1").await.unwrap().is_some());

        source.failing.store(true, Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(601)).await;

        assert!(cache.get("test-key-1").await.unwrap().is_some());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_without_cached_key_is_an_error() {
        let source = Arc::new(FlakySource::new());
        source.failing.store(true, Ordering::SeqCst);
        let cache = cache(source.clone());

        assert!(matches!(
            cache.get("test-key-1").await,
            Err(JwksError::Fetch(_))
        ));

        // Throttled and nothing loaded yet
        assert!(matches!(
            cache.get("test-key-1").await,
            Err(JwksError::NotLoaded)
        ));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }
}
