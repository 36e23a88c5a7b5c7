use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use warden_compute::DirectoryService;
use warden_traits::{InstanceTrait, TraitSet};

use super::{AuthorizationChannel, ChannelGrant, ChannelRequest};
use crate::{AuthorizationMethod, ChannelError};

/// Imports the key into the caller's OS Login profile. The directory picks
/// the username; the caller's preference is ignored.
#[derive(Clone)]
pub struct OsLoginChannel {
    directory: Arc<dyn DirectoryService>,
}

impl OsLoginChannel {
    /// Create a channel backed by `directory`
    pub fn new(directory: Arc<dyn DirectoryService>) -> Self {
        Self { directory }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl AuthorizationChannel for OsLoginChannel {
    fn method(&self) -> AuthorizationMethod {
        AuthorizationMethod::OsLogin
    }

    fn is_applicable(&self, traits: &TraitSet) -> bool {
        // OS Login has no Windows support
        traits.contains(InstanceTrait::linux())
    }

    async fn authorize(
        &self,
        request: &ChannelRequest<'_>,
        token: &CancellationToken,
    ) -> Result<ChannelGrant, ChannelError> {
        if token.is_cancelled() {
            return Err(ChannelError::Cancelled);
        }

        let grant = self
            .directory
            .import_key(request.instance, request.key, request.expires_at)
            .await?;

        Ok(ChannelGrant {
            username: grant.username,
            expires_at: grant.expires_at,
        })
    }
}
