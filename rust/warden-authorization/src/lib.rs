//! Authorizes ephemeral SSH keys on compute instances.
//!
//! A [`KeyAuthorizer`] takes a locally generated key pair and gets its public
//! half accepted by an instance through one of three channels:
//!
//! - **OS Login**: the key is imported into the caller's directory profile
//!   and the directory assigns the POSIX username
//! - **Instance metadata**: the key is published in the instance's
//!   `ssh-keys` metadata item
//! - **Project metadata**: the key is published in the project's `ssh-keys`
//!   item, which every instance of the project inherits
//!
//! Which channels can work for an instance follows from its traits (see
//! [`traits_of`]): OS Login needs a Linux guest, and metadata keys are
//! ignored by guests that enforce OS Login. Metadata updates are
//! read-modify-write cycles conditioned on the fingerprint that was read,
//! and are retried when another writer gets there first. Every update also
//! prunes entries that have expired.
//!
//! ```
//! use tokio_util::sync::CancellationToken;
//! use warden_authorization::{AuthorizationMethod, AuthorizationMethods, KeyAuthorizer};
//! use warden_common::Duration;
//! use warden_compute::{GuestOsFamily, InstanceLocator, MemoryComputeProvider, MemoryDirectory};
//! use warden_credentials::Ed25519KeyPair;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let locator = InstanceLocator::new("project-1", "us-central1-a", "instance-1");
//! let provider = MemoryComputeProvider::new();
//! provider.add_instance(&locator, GuestOsFamily::Linux).await;
//!
//! let authorizer = KeyAuthorizer::new(
//!     provider.connect(),
//!     MemoryDirectory::new("jdoe_example_com"),
//!     "jdoe@example.com",
//! );
//!
//! let key_pair = Ed25519KeyPair::generate()?;
//! let authorized = authorizer
//!     .authorize_instance(
//!         &locator,
//!         &key_pair,
//!         Duration::minutes(5),
//!         None,
//!         AuthorizationMethods::INSTANCE_METADATA,
//!         &CancellationToken::new(),
//!     )
//!     .await?;
//!
//! assert_eq!(authorized.username, "jdoe");
//! assert_eq!(authorized.method, AuthorizationMethod::InstanceMetadata);
//! # Ok(())
//! # }
//! ```

mod authorized_key;
pub use authorized_key::*;

mod authorizer;
pub use authorizer::*;

mod capability;
pub use capability::*;

mod channel;
pub use channel::*;

mod error;
pub use error::*;

pub mod keys;
pub use keys::{AuthorizedKeyEntry, AuthorizedKeys};

mod methods;
pub use methods::*;

mod settings;
pub use settings::*;

mod username;
pub use username::*;
