//! Process-wide access token cache with proactive refresh.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::client::TokenSource;
use crate::error::CredentialError;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: StdMutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: StdMutex::new(start),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A bearer token and its hard expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Still before hard expiry.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Before hard expiry minus the refresh margin.
    pub fn is_fresh(&self, now: DateTime<Utc>, margin: TimeDelta) -> bool {
        self.expires_at
            .checked_sub_signed(margin)
            .is_some_and(|refresh_at| now < refresh_at)
    }
}

/// Caches one credential and refreshes it before it expires.
///
/// Share it across the process with an `Arc`. Callers that miss the fast
/// path serialize on a refresh lock and re-check the cache once they hold it,
/// so a burst of callers on a cold or expiring cache causes one network call.
/// If a refresh fails while the cached token has not hit its hard expiry,
/// the cached token is served instead of the error.
pub struct TokenCache<S, C = SystemClock> {
    source: S,
    clock: C,
    refresh_margin: TimeDelta,
    credential: RwLock<Option<Credential>>,
    refresh_lock: Mutex<()>,
}

impl<S: TokenSource> TokenCache<S, SystemClock> {
    pub fn new(source: S, refresh_margin: TimeDelta) -> Self {
        Self::with_clock(source, refresh_margin, SystemClock)
    }
}

impl<S: TokenSource, C: Clock> TokenCache<S, C> {
    pub fn with_clock(source: S, refresh_margin: TimeDelta, clock: C) -> Self {
        Self {
            source,
            clock,
            refresh_margin,
            credential: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn refresh_margin(&self) -> TimeDelta {
        self.refresh_margin
    }

    /// Return a valid token, refreshing it if it is missing or near expiry.
    pub async fn get_token(&self) -> Result<String, CredentialError> {
        if let Some(token) = self.fresh_token().await {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(token) = self.fresh_token().await {
            return Ok(token);
        }

        match self.refresh().await {
            Ok(credential) => Ok(credential.token),
            Err(err) => {
                let now = self.clock.now();
                let cached = self.credential.read().await;
                match cached.as_ref().filter(|c| c.is_usable(now)) {
                    Some(stale) => {
                        warn!(
                            expires_at = %stale.expires_at,
                            "token refresh failed, serving cached token: {err}"
                        );
                        Ok(stale.token.clone())
                    }
                    None => Err(err),
                }
            }
        }
    }

    /// Snapshot of the cached credential, if any.
    pub async fn current(&self) -> Option<Credential> {
        self.credential.read().await.clone()
    }

    /// Drop the cached credential so the next `get_token` refreshes.
    pub async fn invalidate(&self) {
        let _guard = self.refresh_lock.lock().await;
        *self.credential.write().await = None;
        debug!("cached token invalidated");
    }

    async fn fresh_token(&self) -> Option<String> {
        let now = self.clock.now();
        self.credential
            .read()
            .await
            .as_ref()
            .filter(|c| c.is_fresh(now, self.refresh_margin))
            .map(|c| c.token.clone())
    }

    async fn refresh(&self) -> Result<Credential, CredentialError> {
        let issued = self.source.fetch_token().await?;
        if issued.token.is_empty() {
            return Err(CredentialError::MissingField {
                field: "access_token",
                raw: String::new(),
            });
        }
        let invalid_expiry = || CredentialError::InvalidExpiry {
            expires_in: issued.expires_in_secs,
        };
        if issued.expires_in_secs <= 0 {
            return Err(invalid_expiry());
        }
        let expires_at = TimeDelta::try_seconds(issued.expires_in_secs)
            .and_then(|lifetime| self.clock.now().checked_add_signed(lifetime))
            .ok_or_else(invalid_expiry)?;

        let credential = Credential {
            token: issued.token,
            expires_at,
        };
        *self.credential.write().await = Some(credential.clone());
        info!(expires_at = %credential.expires_at, "access token refreshed");
        Ok(credential)
    }
}
