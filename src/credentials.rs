//! Api key credentials and bearer tokens.
//!
//! Each configured api key is exchanged for a bearer token at startup and
//! then every 30 minutes. The sink reads the current token when it flushes a
//! batch, so a refresh never blocks a tick.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashboard_api::{DashboardClient, DashboardError};
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::ApiKeyConfig;
use crate::exposure::interpolate_env;
use crate::poll::ScheduledJob;

/// Schedule of the token refresh job.
pub const TOKEN_REFRESH_CRON: &str = "0 */30 * * * *";

/// Exchanges credentials for a bearer token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh_token(&self, secret_key: &str, uuid: &str) -> Result<String, DashboardError>;
}

#[async_trait]
impl TokenRefresher for DashboardClient {
    async fn refresh_token(&self, secret_key: &str, uuid: &str) -> Result<String, DashboardError> {
        DashboardClient::refresh_token(self, secret_key, uuid).await
    }
}

#[derive(Debug)]
struct ApiKeyState {
    credentials: ApiKeyConfig,
    token: Option<String>,
}

/// Shared map of api key name to credentials and current token.
///
/// Cloning is cheap; all clones see the same tokens.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    inner: Arc<RwLock<BTreeMap<String, ApiKeyState>>>,
}

impl ApiKeys {
    pub fn new(keys: &BTreeMap<String, ApiKeyConfig>) -> Self {
        let states = keys
            .iter()
            .map(|(name, credentials)| {
                let state = ApiKeyState {
                    credentials: credentials.clone(),
                    token: None,
                };
                (name.clone(), state)
            })
            .collect();

        Self {
            inner: Arc::new(RwLock::new(states)),
        }
    }

    /// The current token of a key, if one has been obtained.
    pub fn token(&self, name: &str) -> Option<String> {
        self.inner.read().get(name).and_then(|state| state.token.clone())
    }

    pub fn set_token(&self, name: &str, token: String) {
        if let Some(state) = self.inner.write().get_mut(name) {
            state.token = Some(token);
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }

    fn credentials(&self, name: &str) -> Option<ApiKeyConfig> {
        self.inner.read().get(name).map(|state| state.credentials.clone())
    }

    /// Refresh the token of every key. A key whose refresh fails keeps its
    /// previous token. Returns the number of keys refreshed.
    pub async fn refresh_all<R: TokenRefresher + ?Sized>(&self, refresher: &R) -> usize {
        let mut refreshed = 0;

        for name in self.names() {
            let Some(credentials) = self.credentials(&name) else {
                continue;
            };
            let secret_key = interpolate_env(&credentials.secret_key);
            let uuid = interpolate_env(&credentials.uuid);

            match refresher.refresh_token(&secret_key, &uuid).await {
                Ok(token) => {
                    self.set_token(&name, token);
                    refreshed += 1;
                }
                Err(e) => warn!(api_key = %name, error = %e, "token refresh failed"),
            }
        }

        info!(refreshed, total = self.inner.read().len(), "api key tokens refreshed");
        refreshed
    }
}

/// Scheduled job refreshing every api key token.
pub struct TokenRefreshJob<R> {
    keys: ApiKeys,
    refresher: R,
}

impl<R: TokenRefresher> TokenRefreshJob<R> {
    pub fn new(keys: ApiKeys, refresher: R) -> Self {
        Self { keys, refresher }
    }

    pub async fn refresh(&self) -> usize {
        self.keys.refresh_all(&self.refresher).await
    }
}

#[async_trait]
impl<R: TokenRefresher + 'static> ScheduledJob for TokenRefreshJob<R> {
    fn name(&self) -> &str {
        "token-refresh"
    }

    async fn run(&self) {
        self.refresh().await;
    }
}
