//! Connection admission
//!
//! The core performs no credential verification; identity is assumed
//! established by the time a participant is admitted. This module is the
//! seam where the transport's identity predicate plugs in: a table of
//! pre-shared tokens mapped to account ids, with a dev-mode bypass that
//! admits a `?account=` query parameter directly.
//!
//! A connection that was never admitted cannot produce a join; its upgrade
//! is refused with 401 and no session state is touched.

use std::collections::HashMap;

use tracing::info;

use crate::protocol::AccountId;

/// Admission predicate evaluated at WebSocket upgrade time.
pub struct AdmissionPolicy {
    tokens: HashMap<String, AccountId>,
    dev_mode: bool,
}

impl AdmissionPolicy {
    /// Build from a comma-separated `token=account` list.
    pub fn new(token_spec: Option<&str>, dev_mode: bool) -> Self {
        let tokens = token_spec
            .map(|spec| {
                spec.split(',')
                    .filter_map(|pair| {
                        let (token, account) = pair.split_once('=')?;
                        let token = token.trim();
                        let account = account.trim();
                        if token.is_empty() || account.is_empty() {
                            return None;
                        }
                        Some((token.to_string(), account.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { tokens, dev_mode }
    }

    pub fn is_configured(&self) -> bool {
        !self.tokens.is_empty()
    }

    /// Return the account id for this upgrade, or `None` to refuse.
    pub fn admit(&self, token: Option<&str>, dev_account: Option<&str>) -> Option<AccountId> {
        if let Some(token) = token {
            if let Some(account) = self.tokens.get(token) {
                return Some(account.clone());
            }
        }

        if self.dev_mode {
            if let Some(account) = dev_account {
                info!(account, "dev mode: admitting without token");
                return Some(account.to_string());
            }
        }

        None
    }
}
