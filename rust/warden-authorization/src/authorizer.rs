use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use warden_common::{Clock, Duration, SystemClock};
use warden_compute::{ComputeAdapter, DirectoryService, InstanceDescriptor, InstanceLocator};
use warden_credentials::SshKeyPair;
use warden_traits::TraitSet;

use crate::{
    AuthorizationChannel, AuthorizationMethod, AuthorizationMethods, AuthorizationSettings,
    AuthorizedKeyPair, ChannelError, ChannelFailure, ChannelGrant, ChannelRequest,
    KeyAuthorizationError, MetadataChannel, OsLoginChannel, traits_of,
};

/// Authorizes keys on instances, falling back from one channel to the next.
///
/// Channels are attempted one at a time in the order
/// [`AuthorizationMethod::PRIORITY`] (OS Login, then instance metadata, then
/// project metadata), skipping those that were not requested or cannot work
/// for the instance. The first channel to succeed wins. A channel that
/// loses a race against a concurrent metadata writer is retried with a
/// fresh read, up to [`AuthorizationSettings::max_attempts`] times.
///
/// A `KeyAuthorizer` holds no per-call state and may be shared between
/// concurrent calls.
pub struct KeyAuthorizer {
    compute: Arc<dyn ComputeAdapter>,
    channels: Vec<Box<dyn AuthorizationChannel>>,
    account: String,
    settings: AuthorizationSettings,
    clock: Arc<dyn Clock>,
}

impl KeyAuthorizer {
    /// Create an authorizer acting on behalf of the account with e-mail
    /// `account`.
    pub fn new<C, D>(compute: C, directory: D, account: impl Into<String>) -> Self
    where
        C: ComputeAdapter + 'static,
        D: DirectoryService + 'static,
    {
        let compute: Arc<dyn ComputeAdapter> = Arc::new(compute);
        let directory: Arc<dyn DirectoryService> = Arc::new(directory);

        Self {
            channels: vec![
                Box::new(OsLoginChannel::new(directory)),
                Box::new(MetadataChannel::instance(compute.clone())),
                Box::new(MetadataChannel::project(compute.clone())),
            ],
            compute,
            account: account.into(),
            settings: AuthorizationSettings::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Use `settings` instead of the defaults.
    ///
    /// # Errors
    ///
    /// Fails with [`KeyAuthorizationError::InvalidArgument`] if the settings
    /// do not validate.
    pub fn with_settings(
        mut self,
        settings: AuthorizationSettings,
    ) -> Result<Self, KeyAuthorizationError> {
        settings.validate()?;
        self.settings = settings;
        Ok(self)
    }

    /// Take "now" from `clock` instead of the system time.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replace the channel that implements `channel.method()`.
    pub fn with_channel(mut self, channel: impl AuthorizationChannel + 'static) -> Self {
        let method = channel.method();
        self.channels.retain(|existing| existing.method() != method);
        self.channels.push(Box::new(channel));
        self
    }

    /// The settings in effect.
    pub fn settings(&self) -> &AuthorizationSettings {
        &self.settings
    }

    /// The methods that would be attempted for `instance` if the caller
    /// asked for [`AuthorizationMethods::ALL`].
    pub fn applicable_methods(&self, instance: &InstanceDescriptor) -> AuthorizationMethods {
        self.candidates(AuthorizationMethods::ALL, &traits_of(instance))
            .into_iter()
            .map(|channel| channel.method())
            .collect()
    }

    /// Look up `instance` and authorize `key_pair` on it.
    ///
    /// See [`KeyAuthorizer::authorize`].
    pub async fn authorize_instance(
        &self,
        instance: &InstanceLocator,
        key_pair: &dyn SshKeyPair,
        validity: Duration,
        preferred_username: Option<&str>,
        methods: AuthorizationMethods,
        token: &CancellationToken,
    ) -> Result<AuthorizedKeyPair, KeyAuthorizationError> {
        validate_arguments(validity, methods)?;
        if token.is_cancelled() {
            return Err(KeyAuthorizationError::Cancelled);
        }

        let descriptor = self
            .compute
            .get_instance(instance)
            .await
            .map_err(KeyAuthorizationError::Lookup)?;

        self.authorize(
            &descriptor,
            key_pair,
            validity,
            preferred_username,
            methods,
            token,
        )
        .await
    }

    /// Authorize the public half of `key_pair` on `instance` for
    /// `validity`.
    ///
    /// Metadata channels publish the key under `preferred_username` if it
    /// is a valid POSIX username and under a name derived from the account
    /// otherwise. OS Login always uses the username the directory assigns.
    ///
    /// # Errors
    ///
    /// - [`KeyAuthorizationError::InvalidArgument`] if `validity` is not
    ///   positive or `methods` is empty.
    /// - [`KeyAuthorizationError::NotApplicable`] if none of `methods` can
    ///   work for the instance. No remote calls are made in that case.
    /// - [`KeyAuthorizationError::Cancelled`] if `token` is cancelled before
    ///   a channel succeeds.
    /// - [`KeyAuthorizationError::AllChannelsFailed`] with one entry per
    ///   attempted channel if none succeeded.
    pub async fn authorize(
        &self,
        instance: &InstanceDescriptor,
        key_pair: &dyn SshKeyPair,
        validity: Duration,
        preferred_username: Option<&str>,
        methods: AuthorizationMethods,
        token: &CancellationToken,
    ) -> Result<AuthorizedKeyPair, KeyAuthorizationError> {
        validate_arguments(validity, methods)?;

        let traits = traits_of(instance);
        debug!("Instance {} has traits {traits}", instance.locator);

        let candidates = self.candidates(methods, &traits);
        if candidates.is_empty() {
            return Err(KeyAuthorizationError::NotApplicable {
                requested: methods,
                traits,
            });
        }
        debug!(
            "Candidate channels for {}: {}",
            instance.locator,
            candidates
                .iter()
                .map(|channel| channel.method())
                .collect::<AuthorizationMethods>()
        );

        let now = self.clock.now();
        let expires_at = now.checked_add_signed(validity).ok_or_else(|| {
            KeyAuthorizationError::InvalidArgument(format!(
                "Key validity {validity} is out of range"
            ))
        })?;
        let public_key = key_pair.public_key();
        let request = ChannelRequest {
            instance: &instance.locator,
            key: &public_key,
            preferred_username,
            account: &self.account,
            metadata_key: &self.settings.metadata_key,
            now,
            expires_at,
        };

        let mut failures = Vec::with_capacity(candidates.len());

        for channel in candidates {
            if token.is_cancelled() {
                return Err(KeyAuthorizationError::Cancelled);
            }

            let method = channel.method();
            debug!("Authorizing key {} via {method}", public_key.fingerprint());

            match self.attempt(channel, &request, token).await {
                Ok(grant) => {
                    info!(
                        "Authorized key {} for {} on {} via {method} until {}",
                        public_key.fingerprint(),
                        grant.username,
                        instance.locator,
                        grant.expires_at
                    );
                    return Ok(AuthorizedKeyPair {
                        public_key: public_key.clone(),
                        username: grant.username,
                        expires_at: grant.expires_at,
                        method,
                    });
                }
                Err(ChannelError::Cancelled) => return Err(KeyAuthorizationError::Cancelled),
                Err(error) => {
                    warn!("Authorizing key via {method} failed: {error}");
                    failures.push(ChannelFailure { method, error });
                }
            }
        }

        Err(KeyAuthorizationError::AllChannelsFailed(failures))
    }

    fn channel(&self, method: AuthorizationMethod) -> Option<&dyn AuthorizationChannel> {
        self.channels
            .iter()
            .find(|channel| channel.method() == method)
            .map(|channel| channel.as_ref())
    }

    fn candidates(
        &self,
        methods: AuthorizationMethods,
        traits: &TraitSet,
    ) -> Vec<&dyn AuthorizationChannel> {
        methods
            .iter()
            .filter_map(|method| self.channel(method))
            .filter(|channel| channel.is_applicable(traits))
            .collect()
    }

    /// Run one channel, retrying with a fresh read while it keeps losing
    /// races against concurrent writers.
    async fn attempt(
        &self,
        channel: &dyn AuthorizationChannel,
        request: &ChannelRequest<'_>,
        token: &CancellationToken,
    ) -> Result<ChannelGrant, ChannelError> {
        let max_attempts = self.settings.max_attempts;

        for attempt in 1..=max_attempts {
            match channel.authorize(request, token).await {
                Err(error) if error.is_conflict() => {
                    warn!(
                        "{} attempt {attempt}/{max_attempts} lost a concurrent update: {error}",
                        channel.method()
                    );

                    if attempt < max_attempts {
                        let delay = self.settings.delay_before_retry(attempt);
                        tokio::select! {
                            _ = token.cancelled() => return Err(ChannelError::Cancelled),
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                }
                result => return result,
            }
        }

        Err(ChannelError::ConcurrencyConflict {
            attempts: max_attempts,
        })
    }
}

fn validate_arguments(
    validity: Duration,
    methods: AuthorizationMethods,
) -> Result<(), KeyAuthorizationError> {
    if validity <= Duration::zero() {
        return Err(KeyAuthorizationError::InvalidArgument(format!(
            "Key validity must be positive, got {validity}"
        )));
    }
    if methods.is_empty() {
        return Err(KeyAuthorizationError::InvalidArgument(
            "At least one authorization method must be requested".into(),
        ));
    }
    Ok(())
}
