//! Player identity and how it is obtained.
//!
//! Angler doesn't talk to an authentication service itself. An
//! [`IdentityBackend`] produces an online [`Identity`] from a stored
//! credential cache, and the [`IdentityResolver`] decides what to do when
//! that fails: log a warning and play offline under the configured name.
//!
//! # Why a trait?
//!
//! The backend is the one piece that depends on an account provider. The
//! resolver, the controller, and the tests don't care which provider it
//! is, so they only see the trait.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;

use crate::AuthError;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Who the bot plays as.
///
/// Immutable once produced. Re-authentication builds a new value instead
/// of editing the old one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Verified account: profile id and access token are present.
    Online {
        profile_id: String,
        access_token: String,
        username: String,
    },

    /// Display name only; enough for servers in offline mode.
    Offline { username: String },
}

impl Identity {
    /// Builds an offline identity.
    pub fn offline(username: impl Into<String>) -> Self {
        Self::Offline {
            username: username.into(),
        }
    }

    /// The display name.
    pub fn username(&self) -> &str {
        match self {
            Self::Online { username, .. } | Self::Offline { username } => username,
        }
    }

    /// Profile id, absent offline.
    pub fn profile_id(&self) -> Option<&str> {
        match self {
            Self::Online { profile_id, .. } => Some(profile_id),
            Self::Offline { .. } => None,
        }
    }

    /// Access token, absent offline.
    pub fn access_token(&self) -> Option<&str> {
        match self {
            Self::Online { access_token, .. } => Some(access_token),
            Self::Offline { .. } => None,
        }
    }

    /// Returns `true` for a verified identity.
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online { .. })
    }
}

// ---------------------------------------------------------------------------
// IdentityBackend
// ---------------------------------------------------------------------------

/// Produces an online identity from a stored credential cache.
///
/// # Example
///
/// ```rust
/// use std::path::Path;
/// use angler_session::{AuthError, Identity, IdentityBackend};
///
/// /// Always the same account. Only useful in tests.
/// struct Fixed;
///
/// impl IdentityBackend for Fixed {
///     async fn authenticate(&self, _cache: &Path) -> Result<Identity, AuthError> {
///         Ok(Identity::Online {
///             profile_id: "0f3c".into(),
///             access_token: "token".into(),
///             username: "Angler".into(),
///         })
///     }
/// }
/// ```
pub trait IdentityBackend: Send + Sync + 'static {
    /// Authenticates using the credentials cached at `cache`.
    fn authenticate(
        &self,
        cache: &Path,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send;
}

/// What an identity-cache file holds.
#[derive(Debug, Deserialize)]
struct CachedAccount {
    #[serde(default)]
    username: String,
    #[serde(default)]
    profile_id: String,
    #[serde(default)]
    access_token: String,
    /// Unix seconds; absent means the token does not expire.
    #[serde(default)]
    expires_at: Option<u64>,
}

/// Reads an identity written by an earlier login.
///
/// The file is JSON: `{"username", "profile_id", "access_token",
/// "expires_at"?}`. A missing, malformed, incomplete, or expired cache is
/// an [`AuthError`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountCacheBackend;

impl IdentityBackend for AccountCacheBackend {
    async fn authenticate(&self, cache: &Path) -> Result<Identity, AuthError> {
        let raw = tokio::fs::read_to_string(cache).await?;
        let account: CachedAccount = serde_json::from_str(&raw)?;

        if account.username.is_empty() {
            return Err(AuthError::Incomplete("username"));
        }
        if account.profile_id.is_empty() {
            return Err(AuthError::Incomplete("profile_id"));
        }
        if account.access_token.is_empty() {
            return Err(AuthError::Incomplete("access_token"));
        }
        if let Some(expires_at) = account.expires_at {
            if expires_at <= unix_now() {
                return Err(AuthError::Expired);
            }
        }

        Ok(Identity::Online {
            profile_id: account.profile_id,
            access_token: account.access_token,
            username: account.username,
        })
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

// ---------------------------------------------------------------------------
// IdentityResolver
// ---------------------------------------------------------------------------

/// Whether to try the account backend at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Online,
    Offline,
}

impl AuthMode {
    /// `Online` when `online_mode` is set.
    pub fn from_online_flag(online_mode: bool) -> Self {
        if online_mode { Self::Online } else { Self::Offline }
    }
}

/// The result of identity resolution. Always carries an identity.
#[derive(Debug)]
pub struct ResolvedIdentity {
    pub identity: Identity,
    /// Set when online authentication failed and the offline fallback was
    /// used instead.
    pub warning: Option<AuthError>,
}

/// Turns configuration into an [`Identity`], never failing.
pub struct IdentityResolver<A> {
    backend: A,
    username: String,
    cache: PathBuf,
}

impl<A: IdentityBackend> IdentityResolver<A> {
    /// `username` is the configured display name used for offline play.
    pub fn new(backend: A, username: impl Into<String>, cache: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            username: username.into(),
            cache: cache.into(),
        }
    }

    /// Path of the identity cache handed to the backend.
    pub fn cache_path(&self) -> &Path {
        &self.cache
    }

    /// Resolves an identity for `mode`.
    pub async fn resolve(&self, mode: AuthMode) -> ResolvedIdentity {
        if mode == AuthMode::Offline {
            tracing::info!(username = %self.username, "credentials-using-offline-mode");
            return ResolvedIdentity {
                identity: Identity::offline(&self.username),
                warning: None,
            };
        }

        match self.backend.authenticate(&self.cache).await {
            Ok(identity) => {
                tracing::info!(username = identity.username(), "auth-username");
                ResolvedIdentity {
                    identity,
                    warning: None,
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    cache = %self.cache.display(),
                    username = %self.username,
                    "authentication-failed-using-offline"
                );
                ResolvedIdentity {
                    identity: Identity::offline(&self.username),
                    warning: Some(e),
                }
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    struct Failing;

    impl IdentityBackend for Failing {
        async fn authenticate(&self, _: &Path) -> Result<Identity, AuthError> {
            Err(AuthError::Expired)
        }
    }

    fn cache_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    // -- Identity --

    #[test]
    fn test_identity_offline_has_no_token() {
        let id = Identity::offline("Steve");
        assert_eq!(id.username(), "Steve");
        assert_eq!(id.profile_id(), None);
        assert_eq!(id.access_token(), None);
        assert!(!id.is_online());
    }

    // -- AccountCacheBackend --

    #[tokio::test]
    async fn test_account_cache_valid_file_returns_online_identity() {
        let file = cache_file(
            r#"{"username":"Alex","profile_id":"abc","access_token":"tok"}"#,
        );

        let id = AccountCacheBackend.authenticate(file.path()).await.unwrap();

        assert_eq!(
            id,
            Identity::Online {
                profile_id: "abc".into(),
                access_token: "tok".into(),
                username: "Alex".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_account_cache_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = AccountCacheBackend
            .authenticate(&dir.path().join("nope.json"))
            .await;
        assert!(matches!(result, Err(AuthError::Io(_))));
    }

    #[tokio::test]
    async fn test_account_cache_malformed_is_json_error() {
        let file = cache_file("{not json");
        let result = AccountCacheBackend.authenticate(file.path()).await;
        assert!(matches!(result, Err(AuthError::Json(_))));
    }

    #[tokio::test]
    async fn test_account_cache_missing_token_is_incomplete() {
        let file = cache_file(r#"{"username":"Alex","profile_id":"abc"}"#);
        let result = AccountCacheBackend.authenticate(file.path()).await;
        assert!(matches!(result, Err(AuthError::Incomplete("access_token"))));
    }

    #[tokio::test]
    async fn test_account_cache_expired_token_is_rejected() {
        let file = cache_file(
            r#"{"username":"Alex","profile_id":"abc","access_token":"tok","expires_at":1}"#,
        );
        let result = AccountCacheBackend.authenticate(file.path()).await;
        assert!(matches!(result, Err(AuthError::Expired)));
    }

    // -- IdentityResolver --

    #[tokio::test]
    async fn test_resolve_offline_mode_never_calls_backend() {
        let resolver = IdentityResolver::new(Failing, "Steve", "account.json");

        let resolved = resolver.resolve(AuthMode::Offline).await;

        assert_eq!(resolved.identity, Identity::offline("Steve"));
        assert!(resolved.warning.is_none());
    }

    #[tokio::test]
    async fn test_resolve_online_failure_falls_back_to_offline() {
        let resolver = IdentityResolver::new(Failing, "Steve", "account.json");

        let resolved = resolver.resolve(AuthMode::Online).await;

        assert_eq!(resolved.identity, Identity::offline("Steve"));
        assert!(matches!(resolved.warning, Some(AuthError::Expired)));
    }

    #[tokio::test]
    async fn test_resolve_online_success_uses_backend_identity() {
        let file = cache_file(
            r#"{"username":"Alex","profile_id":"abc","access_token":"tok"}"#,
        );
        let resolver = IdentityResolver::new(AccountCacheBackend, "Steve", file.path());

        let resolved = resolver.resolve(AuthMode::Online).await;

        assert_eq!(resolved.identity.username(), "Alex");
        assert!(resolved.identity.is_online());
    }
}
