//! In-memory compute adapter and directory service for testing

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use warden_common::{DateTime, Utc};
use warden_credentials::SshPublicKey;

use crate::{
    ComputeAdapter, ComputeError, DirectoryGrant, DirectoryService, Fingerprint,
    GuestOsFamily, InstanceDescriptor, InstanceLocator, MetadataScope, MetadataValue,
};

#[derive(Debug, Default)]
struct ScopeState {
    items: BTreeMap<String, String>,
    generation: u64,
}

impl ScopeState {
    fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(format!("v{}", self.generation))
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    instances: HashMap<InstanceLocator, GuestOsFamily>,
    scopes: HashMap<MetadataScope, ScopeState>,
    denied: HashSet<MetadataScope>,
    outage: Option<String>,
    pending_conflicts: usize,
}

impl MemoryState {
    fn check(&self, scope: &MetadataScope) -> Result<(), ComputeError> {
        if let Some(reason) = &self.outage {
            return Err(ComputeError::Unavailable(reason.clone()));
        }
        if let MetadataScope::Instance(locator) = scope {
            if !self.instances.contains_key(locator) {
                return Err(ComputeError::NotFound(format!("Instance {locator}")));
            }
        }
        if self.denied.contains(scope) {
            return Err(ComputeError::PermissionDenied(format!(
                "Metadata of {scope} is not accessible"
            )));
        }
        Ok(())
    }

    fn items(&self, scope: &MetadataScope) -> BTreeMap<String, String> {
        self.scopes
            .get(scope)
            .map(|state| state.items.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default)]
struct Counters {
    calls: AtomicUsize,
    lookups: AtomicUsize,
    reads: AtomicUsize,
    writes: AtomicUsize,
    conflicts: AtomicUsize,
}

/// In-memory compute service.
///
/// Holds instances and metadata scopes that any number of adapters, created
/// with [`MemoryComputeProvider::connect`], share. Each scope carries a
/// generation counter that is bumped on every committed write and rendered
/// as fingerprint `v<generation>`.
///
/// # Examples
///
/// ```
/// use warden_compute::{
///     ComputeAdapter, GuestOsFamily, InstanceLocator, MemoryComputeProvider,
/// };
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let locator = InstanceLocator::new("project-1", "zone-1", "instance-1");
///
/// let provider = MemoryComputeProvider::new();
/// provider.add_instance(&locator, GuestOsFamily::Linux).await;
/// provider
///     .initialize_metadata(&locator.scope(), [("ssh-keys", "")], 7)
///     .await;
///
/// let compute = provider.connect();
/// let read = compute.read_metadata(&locator.scope(), "ssh-keys").await?;
/// let written = compute
///     .write_metadata(&locator.scope(), "ssh-keys", "alice:ssh-ed25519 AAAA", &read.fingerprint)
///     .await?;
///
/// assert_eq!(read.fingerprint.as_str(), "v7");
/// assert_eq!(written.as_str(), "v8");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MemoryComputeProvider {
    state: Arc<RwLock<MemoryState>>,
    counters: Arc<Counters>,
}

impl MemoryComputeProvider {
    /// Create a new empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new adapter connected to this provider
    pub fn connect(&self) -> MemoryCompute {
        MemoryCompute {
            state: Arc::clone(&self.state),
            counters: Arc::clone(&self.counters),
        }
    }

    /// Register an instance
    pub async fn add_instance(&self, locator: &InstanceLocator, guest_os: GuestOsFamily) {
        let mut state = self.state.write().await;
        state.instances.insert(locator.clone(), guest_os);
    }

    /// Replace all items of `scope` and set its generation
    pub async fn initialize_metadata<K, V>(
        &self,
        scope: &MetadataScope,
        items: impl IntoIterator<Item = (K, V)>,
        generation: u64,
    ) where
        K: Into<String>,
        V: Into<String>,
    {
        let mut state = self.state.write().await;
        state.scopes.insert(
            scope.clone(),
            ScopeState {
                items: items
                    .into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
                generation,
            },
        );
    }

    /// Set an item unconditionally, as another agent would
    pub async fn set_metadata(&self, scope: &MetadataScope, key: &str, value: &str) {
        let mut state = self.state.write().await;
        let scope = state.scopes.entry(scope.clone()).or_default();
        scope.items.insert(key.to_string(), value.to_string());
        scope.generation += 1;
    }

    /// The current value of an item
    pub async fn metadata(&self, scope: &MetadataScope, key: &str) -> Option<String> {
        let state = self.state.read().await;
        state
            .scopes
            .get(scope)
            .and_then(|scope| scope.items.get(key).cloned())
    }

    /// The current fingerprint of a scope
    pub async fn fingerprint(&self, scope: &MetadataScope) -> Fingerprint {
        let state = self.state.read().await;
        state
            .scopes
            .get(scope)
            .map(ScopeState::fingerprint)
            .unwrap_or_else(|| ScopeState::default().fingerprint())
    }

    /// Let a concurrent writer modify the target scope right before each of
    /// the next `count` conditional writes, so that those writes conflict
    pub async fn inject_conflicts(&self, count: usize) {
        self.state.write().await.pending_conflicts = count;
    }

    /// Reject reads and writes of `scope` with a permission error
    pub async fn deny(&self, scope: &MetadataScope) {
        self.state.write().await.denied.insert(scope.clone());
    }

    /// Fail every call with [`ComputeError::Unavailable`] until cleared
    /// with `None`
    pub async fn set_outage(&self, reason: Option<&str>) {
        self.state.write().await.outage = reason.map(str::to_string);
    }

    /// Total calls of any kind, including failed ones
    pub fn calls(&self) -> usize {
        self.counters.calls.load(Ordering::Relaxed)
    }

    /// Instance lookups
    pub fn lookups(&self) -> usize {
        self.counters.lookups.load(Ordering::Relaxed)
    }

    /// Metadata reads
    pub fn reads(&self) -> usize {
        self.counters.reads.load(Ordering::Relaxed)
    }

    /// Committed metadata writes
    pub fn writes(&self) -> usize {
        self.counters.writes.load(Ordering::Relaxed)
    }

    /// Writes rejected because of a fingerprint mismatch
    pub fn conflicts(&self) -> usize {
        self.counters.conflicts.load(Ordering::Relaxed)
    }
}

/// In-memory [`ComputeAdapter`].
///
/// This is created by calling `connect()` on a [`MemoryComputeProvider`].
/// All adapters share the same underlying state through the provider.
#[derive(Clone)]
pub struct MemoryCompute {
    state: Arc<RwLock<MemoryState>>,
    counters: Arc<Counters>,
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl ComputeAdapter for MemoryCompute {
    async fn get_instance(
        &self,
        locator: &InstanceLocator,
    ) -> Result<InstanceDescriptor, ComputeError> {
        self.counters.calls.fetch_add(1, Ordering::Relaxed);
        self.counters.lookups.fetch_add(1, Ordering::Relaxed);

        let state = self.state.read().await;
        let scope = locator.scope();
        state.check(&scope)?;

        let guest_os = state
            .instances
            .get(locator)
            .copied()
            .unwrap_or_default();

        Ok(InstanceDescriptor {
            locator: locator.clone(),
            guest_os,
            metadata: state.items(&scope),
            project_metadata: state.items(&locator.project_scope()),
        })
    }

    async fn read_metadata(
        &self,
        scope: &MetadataScope,
        key: &str,
    ) -> Result<MetadataValue, ComputeError> {
        self.counters.calls.fetch_add(1, Ordering::Relaxed);
        self.counters.reads.fetch_add(1, Ordering::Relaxed);

        let state = self.state.read().await;
        state.check(scope)?;

        Ok(match state.scopes.get(scope) {
            Some(current) => MetadataValue {
                value: current.items.get(key).cloned(),
                fingerprint: current.fingerprint(),
            },
            None => MetadataValue {
                value: None,
                fingerprint: ScopeState::default().fingerprint(),
            },
        })
    }

    async fn write_metadata(
        &self,
        scope: &MetadataScope,
        key: &str,
        value: &str,
        expected: &Fingerprint,
    ) -> Result<Fingerprint, ComputeError> {
        self.counters.calls.fetch_add(1, Ordering::Relaxed);

        let mut state = self.state.write().await;
        state.check(scope)?;

        let concurrent_writer = state.pending_conflicts > 0;
        if concurrent_writer {
            state.pending_conflicts -= 1;
        }

        let current = state.scopes.entry(scope.clone()).or_default();
        if concurrent_writer {
            current.generation += 1;
        }

        let actual = current.fingerprint();
        if &actual != expected {
            self.counters.conflicts.fetch_add(1, Ordering::Relaxed);
            return Err(ComputeError::FingerprintMismatch {
                scope: scope.clone(),
                expected: expected.clone(),
                actual,
            });
        }

        current.items.insert(key.to_string(), value.to_string());
        current.generation += 1;
        self.counters.writes.fetch_add(1, Ordering::Relaxed);

        Ok(current.fingerprint())
    }
}

/// A key imported into a [`MemoryDirectory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedKey {
    /// Instance the key was imported for
    pub instance: InstanceLocator,
    /// The public key
    pub key: SshPublicKey,
    /// When the directory stops honoring the key
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
struct DirectoryState {
    username: String,
    failure: Option<ComputeError>,
    keys: Vec<ImportedKey>,
}

/// In-memory [`DirectoryService`] that assigns every caller the same
/// username.
#[derive(Debug, Clone)]
pub struct MemoryDirectory {
    state: Arc<RwLock<DirectoryState>>,
    calls: Arc<AtomicUsize>,
}

impl MemoryDirectory {
    /// Create a directory that assigns `username`
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            state: Arc::new(RwLock::new(DirectoryState {
                username: username.into(),
                failure: None,
                keys: Vec::new(),
            })),
            calls: Arc::new(AtomicUsize::default()),
        }
    }

    /// Fail every import with `error` until [`MemoryDirectory::recover`]
    pub async fn fail_with(&self, error: ComputeError) {
        self.state.write().await.failure = Some(error);
    }

    /// Stop failing imports
    pub async fn recover(&self) {
        self.state.write().await.failure = None;
    }

    /// Keys imported so far, one entry per distinct key and instance
    pub async fn imported_keys(&self) -> Vec<ImportedKey> {
        self.state.read().await.keys.clone()
    }

    /// Number of import attempts, including failed ones
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl DirectoryService for MemoryDirectory {
    async fn import_key(
        &self,
        instance: &InstanceLocator,
        key: &SshPublicKey,
        expires_at: DateTime<Utc>,
    ) -> Result<DirectoryGrant, ComputeError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        let mut state = self.state.write().await;
        if let Some(error) = &state.failure {
            return Err(error.clone());
        }

        let existing = state
            .keys
            .iter_mut()
            .find(|imported| &imported.instance == instance && &imported.key == key);
        let expires_at = match existing {
            Some(imported) => {
                imported.expires_at = imported.expires_at.max(expires_at);
                imported.expires_at
            }
            None => {
                state.keys.push(ImportedKey {
                    instance: instance.clone(),
                    key: key.clone(),
                    expires_at,
                });
                expires_at
            }
        };

        Ok(DirectoryGrant {
            username: state.username.clone(),
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use pretty_assertions::assert_eq;
    use warden_common::Duration;

    #[cfg(not(target_arch = "wasm32"))]
    use tokio::test as async_test;

    fn locator() -> InstanceLocator {
        InstanceLocator::new("project-1", "us-central1-a", "instance-1")
    }

    async fn provider() -> MemoryComputeProvider {
        let provider = MemoryComputeProvider::new();
        provider.add_instance(&locator(), GuestOsFamily::Linux).await;
        provider
    }

    #[async_test]
    async fn it_shares_state_between_connections() -> Result<()> {
        let provider = provider().await;
        let scope = locator().scope();
        let first = provider.connect();
        let second = provider.connect();

        let read = first.read_metadata(&scope, "ssh-keys").await?;
        first
            .write_metadata(&scope, "ssh-keys", "alice:ssh-ed25519 AAAA", &read.fingerprint)
            .await?;

        let seen = second.read_metadata(&scope, "ssh-keys").await?;
        assert_eq!(seen.value.as_deref(), Some("alice:ssh-ed25519 AAAA"));
        assert_eq!(provider.reads(), 2);
        assert_eq!(provider.writes(), 1);
        Ok(())
    }

    #[async_test]
    async fn it_advances_fingerprints_on_write() -> Result<()> {
        let provider = provider().await;
        let scope = locator().scope();
        provider
            .initialize_metadata(&scope, [("ssh-keys", "")], 7)
            .await;
        let compute = provider.connect();

        let read = compute.read_metadata(&scope, "ssh-keys").await?;
        assert_eq!(read.fingerprint, Fingerprint::from("v7"));

        let written = compute
            .write_metadata(&scope, "ssh-keys", "x", &read.fingerprint)
            .await?;
        assert_eq!(written, Fingerprint::from("v8"));
        assert_eq!(provider.fingerprint(&scope).await, written);
        Ok(())
    }

    #[async_test]
    async fn it_rejects_writes_based_on_stale_fingerprints() -> Result<()> {
        let provider = provider().await;
        let scope = locator().scope();
        let compute = provider.connect();

        let read = compute.read_metadata(&scope, "ssh-keys").await?;
        provider.set_metadata(&scope, "startup-script", "echo").await;

        let result = compute
            .write_metadata(&scope, "ssh-keys", "x", &read.fingerprint)
            .await;

        assert!(matches!(
            result,
            Err(ComputeError::FingerprintMismatch { .. })
        ));
        assert_eq!(provider.metadata(&scope, "ssh-keys").await, None);
        assert_eq!(provider.conflicts(), 1);
        assert_eq!(provider.writes(), 0);
        Ok(())
    }

    #[async_test]
    async fn it_injects_concurrent_writers() -> Result<()> {
        let provider = provider().await;
        let scope = locator().project_scope();
        let compute = provider.connect();
        provider.inject_conflicts(1).await;

        let read = compute.read_metadata(&scope, "ssh-keys").await?;
        let first = compute
            .write_metadata(&scope, "ssh-keys", "x", &read.fingerprint)
            .await;
        assert!(first.as_ref().is_err_and(ComputeError::is_conflict));

        let read = compute.read_metadata(&scope, "ssh-keys").await?;
        compute
            .write_metadata(&scope, "ssh-keys", "x", &read.fingerprint)
            .await?;

        assert_eq!(provider.conflicts(), 1);
        assert_eq!(provider.writes(), 1);
        Ok(())
    }

    #[async_test]
    async fn it_describes_instances_with_inherited_metadata() -> Result<()> {
        let provider = provider().await;
        provider
            .set_metadata(&locator().project_scope(), "enable-oslogin", "true")
            .await;
        provider
            .set_metadata(&locator().scope(), "block-project-ssh-keys", "true")
            .await;

        let descriptor = provider.connect().get_instance(&locator()).await?;

        assert_eq!(descriptor.guest_os, GuestOsFamily::Linux);
        assert_eq!(descriptor.instance_item("block-project-ssh-keys"), Some("true"));
        assert_eq!(descriptor.effective_item("enable-oslogin"), Some("true"));
        assert_eq!(provider.lookups(), 1);
        Ok(())
    }

    #[async_test]
    async fn it_reports_missing_denied_and_unavailable() -> Result<()> {
        let provider = provider().await;
        let compute = provider.connect();
        let missing = InstanceLocator::new("project-1", "us-central1-a", "missing");

        assert!(matches!(
            compute.get_instance(&missing).await,
            Err(ComputeError::NotFound(_))
        ));

        provider.deny(&locator().project_scope()).await;
        assert!(matches!(
            compute
                .read_metadata(&locator().project_scope(), "ssh-keys")
                .await,
            Err(ComputeError::PermissionDenied(_))
        ));

        provider.set_outage(Some("maintenance")).await;
        assert_eq!(
            compute.read_metadata(&locator().scope(), "ssh-keys").await,
            Err(ComputeError::Unavailable("maintenance".into()))
        );

        provider.set_outage(None).await;
        compute.read_metadata(&locator().scope(), "ssh-keys").await?;
        assert_eq!(provider.calls(), 4);
        Ok(())
    }

    #[async_test]
    async fn it_imports_keys_into_the_directory() -> Result<()> {
        let directory = MemoryDirectory::new("alice_example_com");
        let key = SshPublicKey::ed25519(&[1; 32]);
        let now = warden_common::now();

        let first = directory.import_key(&locator(), &key, now).await?;
        let second = directory
            .import_key(&locator(), &key, now + Duration::hours(1))
            .await?;

        assert_eq!(first.username, "alice_example_com");
        assert_eq!(second.expires_at, now + Duration::hours(1));
        assert_eq!(directory.imported_keys().await.len(), 1);
        assert_eq!(directory.calls(), 2);
        Ok(())
    }

    #[async_test]
    async fn it_fails_imports_on_request() -> Result<()> {
        let directory = MemoryDirectory::new("alice");
        let key = SshPublicKey::ed25519(&[1; 32]);
        directory
            .fail_with(ComputeError::Unavailable("directory service unavailable".into()))
            .await;

        let result = directory.import_key(&locator(), &key, warden_common::now()).await;
        assert_eq!(
            result,
            Err(ComputeError::Unavailable("directory service unavailable".into()))
        );

        directory.recover().await;
        directory.import_key(&locator(), &key, warden_common::now()).await?;
        assert_eq!(directory.calls(), 2);
        Ok(())
    }
}
