use std::sync::Arc;

use async_trait::async_trait;
use warden_common::{ConditionalSync, DateTime, Utc};
use warden_credentials::SshPublicKey;

use crate::{
    ComputeError, Fingerprint, InstanceDescriptor, InstanceLocator, MetadataScope, MetadataValue,
};

/// Access to instances and their metadata.
///
/// Metadata writes use compare-and-swap semantics: `write_metadata` only
/// succeeds if the scope's current fingerprint equals `expected`. Otherwise
/// it fails with [`ComputeError::FingerprintMismatch`] and leaves the scope
/// untouched.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait ComputeAdapter: ConditionalSync {
    /// Look up an instance, including its instance and project metadata.
    async fn get_instance(
        &self,
        locator: &InstanceLocator,
    ) -> Result<InstanceDescriptor, ComputeError>;

    /// Read one metadata item along with the scope's current fingerprint.
    async fn read_metadata(
        &self,
        scope: &MetadataScope,
        key: &str,
    ) -> Result<MetadataValue, ComputeError>;

    /// Replace one metadata item, provided the scope still has fingerprint
    /// `expected`. Returns the scope's new fingerprint.
    async fn write_metadata(
        &self,
        scope: &MetadataScope,
        key: &str,
        value: &str,
        expected: &Fingerprint,
    ) -> Result<Fingerprint, ComputeError>;
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl<T> ComputeAdapter for Arc<T>
where
    T: ComputeAdapter + ?Sized,
{
    async fn get_instance(
        &self,
        locator: &InstanceLocator,
    ) -> Result<InstanceDescriptor, ComputeError> {
        (**self).get_instance(locator).await
    }

    async fn read_metadata(
        &self,
        scope: &MetadataScope,
        key: &str,
    ) -> Result<MetadataValue, ComputeError> {
        (**self).read_metadata(scope, key).await
    }

    async fn write_metadata(
        &self,
        scope: &MetadataScope,
        key: &str,
        value: &str,
        expected: &Fingerprint,
    ) -> Result<Fingerprint, ComputeError> {
        (**self).write_metadata(scope, key, value, expected).await
    }
}

/// What a directory service granted for an imported key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryGrant {
    /// POSIX username the directory assigned to the caller
    pub username: String,
    /// When the directory will stop honoring the key
    pub expires_at: DateTime<Utc>,
}

/// A user directory (OS Login) that associates public keys with the
/// caller's account and assigns the POSIX username.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait DirectoryService: ConditionalSync {
    /// Import `key` for use on `instance` until `expires_at`.
    async fn import_key(
        &self,
        instance: &InstanceLocator,
        key: &SshPublicKey,
        expires_at: DateTime<Utc>,
    ) -> Result<DirectoryGrant, ComputeError>;
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl<T> DirectoryService for Arc<T>
where
    T: DirectoryService + ?Sized,
{
    async fn import_key(
        &self,
        instance: &InstanceLocator,
        key: &SshPublicKey,
        expires_at: DateTime<Utc>,
    ) -> Result<DirectoryGrant, ComputeError> {
        (**self).import_key(instance, key, expires_at).await
    }
}
