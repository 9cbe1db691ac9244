//! Endpoint resolution: where should the bot connect?
//!
//! Either the configured address is used as-is, or a hosted realm is
//! looked up in a [`RealmDirectory`]. A realm that is still waking up is
//! polled a bounded number of times before giving up.

use std::time::Duration;

use crate::{EndpointError, Identity, RealmDirectory};

/// Polls of the realm directory before the realm counts as unavailable.
pub const REALM_POLL_ATTEMPTS: u32 = 5;

/// Pause between two realm polls.
pub const REALM_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Which realm, if any, to join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealmSelection {
    /// Connect to the configured host directly.
    Disabled,
    /// A realm should be used, but the user hasn't picked one yet.
    Ask,
    /// Join this realm.
    Id(i64),
}

impl RealmSelection {
    /// Maps the configured realm id: `-1` disabled, `0` ask, anything
    /// else a realm id.
    pub fn from_id(id: i64) -> Self {
        match id {
            -1 => Self::Disabled,
            0 => Self::Ask,
            id => Self::Id(id),
        }
    }
}

/// What the resolver needs from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub host: String,
    pub port: u16,
    pub realm: RealmSelection,
    /// Whether the realm terms of service may be accepted on the user's
    /// behalf.
    pub accept_tos: bool,
}

/// Why no connection should be attempted yet. Both need the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotReadyReason {
    /// No realm picked; `realms` lists the candidates.
    AwaitingRealmSelection { realms: Vec<String> },
    /// The realm terms of service haven't been accepted.
    AwaitingTermsAcceptance,
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Ready { host: String, port: u16 },
    NotReady(NotReadyReason),
}

/// Turns an [`EndpointConfig`] into a concrete address.
pub struct EndpointResolver<D> {
    directory: D,
    attempts: u32,
    interval: Duration,
}

impl<D: RealmDirectory> EndpointResolver<D> {
    pub fn new(directory: D) -> Self {
        Self {
            directory,
            attempts: REALM_POLL_ATTEMPTS,
            interval: REALM_POLL_INTERVAL,
        }
    }

    /// The realm directory in use.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Resolves `config`.
    ///
    /// # Errors
    /// [`EndpointError::RealmUnavailable`] when the realm never reported
    /// an address; [`EndpointError::InvalidAddress`] when it reported
    /// garbage.
    pub async fn resolve(
        &self,
        config: &EndpointConfig,
        identity: &Identity,
    ) -> Result<Resolution, EndpointError> {
        let realm_id = match config.realm {
            RealmSelection::Disabled => {
                return Ok(Resolution::Ready {
                    host: config.host.clone(),
                    port: config.port,
                });
            }
            RealmSelection::Ask => {
                let realms = match self.directory.list_candidate_realms(identity).await {
                    Ok(realms) => realms,
                    Err(e) => {
                        tracing::warn!(error = %e, "realms-could-not-be-listed");
                        Vec::new()
                    }
                };
                for realm in &realms {
                    tracing::info!(%realm, "realms-candidate");
                }
                tracing::info!("realms-id-not-set");
                return Ok(Resolution::NotReady(NotReadyReason::AwaitingRealmSelection {
                    realms,
                }));
            }
            RealmSelection::Id(id) => id,
        };

        if !config.accept_tos {
            tracing::error!("realms-tos-agreement");
            return Ok(Resolution::NotReady(NotReadyReason::AwaitingTermsAcceptance));
        }
        if let Err(e) = self.directory.accept_terms(identity).await {
            tracing::warn!(error = %e, "realms-tos-could-not-be-accepted");
        }

        for attempt in 1..=self.attempts {
            match self.directory.resolve_address(identity, realm_id).await {
                Ok(Some(address)) => {
                    let (host, port) = parse_address(&address)?;
                    tracing::info!(realm_id, %host, port, "realms-address-found");
                    return Ok(Resolution::Ready { host, port });
                }
                Ok(None) => tracing::info!(attempt, realm_id, "realms-determining-address"),
                Err(e) => {
                    tracing::warn!(attempt, realm_id, error = %e, "realms-determining-address");
                }
            }
            if attempt < self.attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        tracing::error!(realm_id, attempts = self.attempts, "realms-address-not-found");
        Err(EndpointError::RealmUnavailable {
            attempts: self.attempts,
        })
    }
}

/// Splits `host:port`.
pub fn parse_address(address: &str) -> Result<(String, u16), EndpointError> {
    let invalid = || EndpointError::InvalidAddress(address.to_string());
    let (host, port) = address.rsplit_once(':').ok_or_else(invalid)?;
    if host.is_empty() {
        return Err(invalid());
    }
    let port = port.parse().map_err(|_| invalid())?;
    Ok((host.to_string(), port))
}

// =========================================================================
// Tests
// =========================================================================
