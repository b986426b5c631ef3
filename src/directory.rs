//! Display-name resolution
//!
//! The hub resolves a joiner's display name through this injected trait
//! before any roster notification goes out; a participant is not considered
//! joined until the lookup resolves. The shipped implementation is a static
//! in-memory directory seeded from configuration.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::protocol::AccountId;

/// Resolver from account id to display name.
#[async_trait]
pub trait DisplayNameResolver: Send + Sync {
    /// Resolve `account_id` to a display name, or `None` if unknown.
    async fn resolve(&self, account_id: &str) -> Option<String>;
}

/// Static in-memory directory.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    names: HashMap<AccountId, String>,
}

impl StaticDirectory {
    pub fn new(names: HashMap<AccountId, String>) -> Self {
        Self { names }
    }

    /// Parse a comma-separated `account=Display Name` list.
    /// Malformed pairs are skipped.
    pub fn from_spec(spec: &str) -> Self {
        let names = spec
            .split(',')
            .filter_map(|pair| {
                let (account, name) = pair.split_once('=')?;
                let account = account.trim();
                let name = name.trim();
                if account.is_empty() || name.is_empty() {
                    return None;
                }
                Some((account.to_string(), name.to_string()))
            })
            .collect();
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[async_trait]
impl DisplayNameResolver for StaticDirectory {
    async fn resolve(&self, account_id: &str) -> Option<String> {
        self.names.get(account_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_spec_parses_pairs() {
        let dir = StaticDirectory::from_spec("alice=Alice Liddell, bob=Bob, =broken, junk");
        assert_eq!(dir.len(), 2);
        assert_eq!(
            dir.resolve("alice").await,
            Some("Alice Liddell".to_string())
        );
        assert_eq!(dir.resolve("bob").await, Some("Bob".to_string()));
        assert_eq!(dir.resolve("carol").await, None);
    }

    #[tokio::test]
    async fn test_empty_directory_resolves_nothing() {
        let dir = StaticDirectory::default();
        assert!(dir.is_empty());
        assert_eq!(dir.resolve("anyone").await, None);
    }
}
