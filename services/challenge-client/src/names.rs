//! Address → display name lookup
//!
//! [`NameCache`] is a bounded LRU owned by whoever renders addresses. It is
//! read-through: a miss asks the [`NameResolver`], and only a successful,
//! non-empty answer is stored. Failed or empty lookups are retried next
//! time. Addresses without a name fall back to a middle-truncated form.

use std::collections::HashSet;
use std::num::NonZeroUsize;

use async_trait::async_trait;
use futures::future::join_all;
use lru::LruCache;
use thiserror::Error;
use tracing::debug;

/// Width of the truncated address fallback.
pub const DISPLAY_ADDRESS_LENGTH: usize = 10;

/// Shown instead of the user's own address.
pub const OWN_ACCOUNT_LABEL: &str = "Your profile";

const SEPARATOR: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Name lookup failed: {0}")]
pub struct ResolveError(pub String);

/// Reverse name lookup (ENS, basenames, ...).
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// `Ok(None)` when the address has no name.
    async fn resolve(&self, address: &str) -> Result<Option<String>, ResolveError>;
}

/// Resolver for environments without a name service.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNames;

#[async_trait]
impl NameResolver for NoNames {
    async fn resolve(&self, _address: &str) -> Result<Option<String>, ResolveError> {
        Ok(None)
    }
}

pub struct NameCache<R: NameResolver> {
    resolver: R,
    entries: LruCache<String, String>,
    hits: u64,
    misses: u64,
    failures: u64,
}

impl<R: NameResolver> NameCache<R> {
    /// A zero capacity is bumped to one.
    pub fn new(resolver: R, capacity: usize) -> Self {
        Self {
            resolver,
            entries: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            hits: 0,
            misses: 0,
            failures: 0,
        }
    }

    /// Cached name, without consulting the resolver.
    pub fn cached(&mut self, address: &str) -> Option<&str> {
        self.entries.get(&cache_key(address)).map(String::as_str)
    }

    /// Name for `address`, resolving on a miss.
    pub async fn lookup(&mut self, address: &str) -> Option<String> {
        if address.is_empty() {
            return None;
        }

        let key = cache_key(address);
        if let Some(name) = self.entries.get(&key) {
            self.hits += 1;
            return Some(name.clone());
        }

        self.misses += 1;
        let resolved = self.resolver.resolve(address).await;
        self.store(key, resolved)
    }

    /// Name or truncated address.
    pub async fn display_name(&mut self, address: &str) -> String {
        match self.lookup(address).await {
            Some(name) => name,
            None => truncate_middle(address, DISPLAY_ADDRESS_LENGTH),
        }
    }

    /// Like [`display_name`](Self::display_name), but the user's own
    /// address is labelled as such.
    pub async fn label(&mut self, address: &str, own_address: Option<&str>) -> String {
        if is_own(address, own_address) {
            return OWN_ACCOUNT_LABEL.to_string();
        }
        self.display_name(address).await
    }

    /// Labels for many addresses, resolved like
    /// [`display_names`](Self::display_names).
    pub async fn labels(&mut self, addresses: &[String], own_address: Option<&str>) -> Vec<String> {
        let mut names = self.display_names(addresses).await;
        for (name, address) in names.iter_mut().zip(addresses) {
            if is_own(address, own_address) {
                *name = OWN_ACCOUNT_LABEL.to_string();
            }
        }
        names
    }

    /// Display names for many addresses; misses are resolved concurrently.
    pub async fn display_names(&mut self, addresses: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        let missing: Vec<&String> = addresses
            .iter()
            .filter(|address| !address.is_empty())
            .filter(|address| !self.entries.contains(&cache_key(address)))
            .filter(|address| seen.insert(cache_key(address)))
            .collect();

        if !missing.is_empty() {
            self.misses += missing.len() as u64;
            let resolver = &self.resolver;
            let resolved = join_all(missing.iter().map(|address| resolver.resolve(address))).await;
            for (address, result) in missing.into_iter().zip(resolved) {
                self.store(cache_key(address), result);
            }
        }

        let mut names = Vec::with_capacity(addresses.len());
        for address in addresses {
            names.push(match self.entries.get(&cache_key(address)) {
                Some(name) => name.clone(),
                None => truncate_middle(address, DISPLAY_ADDRESS_LENGTH),
            });
        }
        names
    }

    fn store(&mut self, key: String, resolved: Result<Option<String>, ResolveError>) -> Option<String> {
        match resolved {
            Ok(Some(name)) if !name.is_empty() => {
                self.entries.put(key, name.clone());
                Some(name)
            }
            Ok(_) => None,
            Err(e) => {
                self.failures += 1;
                debug!(address = %key, error = %e, "Name lookup failed");
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }
}

fn is_own(address: &str, own_address: Option<&str>) -> bool {
    own_address.is_some_and(|own| own.eq_ignore_ascii_case(address))
}

fn cache_key(address: &str) -> String {
    address.to_ascii_lowercase()
}

/// Shorten `text` to `max_length` characters by cutting out its middle.
pub fn truncate_middle(text: &str, max_length: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_length {
        return text.to_string();
    }

    let shown = max_length.saturating_sub(SEPARATOR.len());
    let front = shown.div_ceil(2);
    let back = shown / 2;

    let mut out = String::with_capacity(max_length);
    out.extend(&chars[..front]);
    out.push_str(SEPARATOR);
    out.extend(&chars[chars.len() - back..]);
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    const ALICE: &str = "0x8F3b2C41d6c6E5a09f1B3bD1a3F5d2E4c7B9a011";
    const BOB: &str = "0x1111111111111111111111111111111111111111";
    const CAROL: &str = "0x2222222222222222222222222222222222222222";

    /// Resolver with fixed answers that records every call.
    #[derive(Default)]
    struct FakeResolver {
        names: HashMap<String, Result<Option<String>, ResolveError>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeResolver {
        fn with(mut self, address: &str, answer: Result<Option<String>, ResolveError>) -> Self {
            self.names.insert(address.to_string(), answer);
            self
        }

        fn calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl NameResolver for FakeResolver {
        async fn resolve(&self, address: &str) -> Result<Option<String>, ResolveError> {
            self.calls.lock().unwrap().push(address.to_string());
            self.names.get(address).cloned().unwrap_or(Ok(None))
        }
    }

    #[test]
    fn test_truncate_middle() {
        assert_eq!(truncate_middle(ALICE, 10), "0x8F...011");
        assert_eq!(truncate_middle(ALICE, 10).chars().count(), 10);
        assert_eq!(truncate_middle("0x1234", 10), "0x1234");
        assert_eq!(truncate_middle("abcdefghijk", 3), "...");
    }

    #[tokio::test]
    async fn test_read_through_caches_success() {
        let resolver = FakeResolver::default().with(ALICE, Ok(Some("alice.base.eth".to_string())));
        let mut cache = NameCache::new(resolver, 8);

        assert_eq!(cache.lookup(ALICE).await.as_deref(), Some("alice.base.eth"));
        assert_eq!(cache.lookup(ALICE).await.as_deref(), Some("alice.base.eth"));
        assert_eq!(cache.resolver.calls(), 1);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let resolver = FakeResolver::default().with(ALICE, Ok(Some("alice.base.eth".to_string())));
        let mut cache = NameCache::new(resolver, 8);

        cache.lookup(ALICE).await;
        assert_eq!(cache.cached(&ALICE.to_lowercase()), Some("alice.base.eth"));
    }

    #[tokio::test]
    async fn test_failures_and_empty_names_not_cached() {
        let resolver = FakeResolver::default()
            .with(BOB, Err(ResolveError("timeout".to_string())))
            .with(CAROL, Ok(Some(String::new())));
        let mut cache = NameCache::new(resolver, 8);

        assert_eq!(cache.lookup(BOB).await, None);
        assert_eq!(cache.lookup(BOB).await, None);
        assert_eq!(cache.lookup(CAROL).await, None);
        assert_eq!(cache.lookup(CAROL).await, None);

        assert!(cache.is_empty());
        assert_eq!(cache.resolver.calls(), 4);
        assert_eq!(cache.failures(), 2);
    }

    #[tokio::test]
    async fn test_display_name_fallback() {
        let mut cache = NameCache::new(NoNames, 8);
        assert_eq!(cache.display_name(ALICE).await, "0x8F...011");
    }

    #[tokio::test]
    async fn test_own_address_label() {
        let mut cache = NameCache::new(NoNames, 8);
        let own = ALICE.to_lowercase();
        assert_eq!(cache.label(ALICE, Some(&own)).await, OWN_ACCOUNT_LABEL);
        assert_eq!(cache.label(BOB, Some(&own)).await, "0x11...111");
        assert_eq!(cache.label(BOB, None).await, "0x11...111");
    }

    #[tokio::test]
    async fn test_labels_mark_own_address() {
        let resolver = FakeResolver::default().with(BOB, Ok(Some("bob".to_string())));
        let mut cache = NameCache::new(resolver, 8);

        let addresses = vec![BOB.to_string(), ALICE.to_string(), CAROL.to_string()];
        let own = ALICE.to_lowercase();
        let labels = cache.labels(&addresses, Some(&own)).await;
        assert_eq!(labels, vec!["bob", OWN_ACCOUNT_LABEL, "0x22...222"]);

        let labels = cache.labels(&addresses, None).await;
        assert_eq!(labels, vec!["bob", "0x8F...011", "0x22...222"]);
    }

    #[tokio::test]
    async fn test_capacity_bound_evicts_least_recent() {
        let resolver = FakeResolver::default()
            .with(ALICE, Ok(Some("alice".to_string())))
            .with(BOB, Ok(Some("bob".to_string())))
            .with(CAROL, Ok(Some("carol".to_string())));
        let mut cache = NameCache::new(resolver, 2);

        cache.lookup(ALICE).await;
        cache.lookup(BOB).await;
        cache.lookup(ALICE).await;
        cache.lookup(CAROL).await;

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.cached(BOB), None);
        assert_eq!(cache.cached(ALICE), Some("alice"));
    }

    #[tokio::test]
    async fn test_display_names_resolves_each_address_once() {
        let resolver = FakeResolver::default().with(ALICE, Ok(Some("alice".to_string())));
        let mut cache = NameCache::new(resolver, 8);

        let addresses = vec![ALICE.to_string(), BOB.to_string(), ALICE.to_string()];
        let names = cache.display_names(&addresses).await;

        assert_eq!(names, vec!["alice", "0x11...111", "alice"]);
        assert_eq!(cache.resolver.calls(), 2);

        // Second pass: alice cached, bob asked again
        cache.display_names(&addresses).await;
        assert_eq!(cache.resolver.calls(), 3);
    }

    #[test]
    fn test_zero_capacity_bumped() {
        let cache = NameCache::new(NoNames, 0);
        assert_eq!(cache.capacity(), 1);
    }
}
