//! The `ssh-keys` metadata format.
//!
//! The item holds one entry per line. Entries written by hand (or by tools
//! that do not manage expiry) look like
//!
//! ```text
//! alice:ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAI... alice@workstation
//! ```
//!
//! and are never pruned. Entries this crate writes carry an expiry:
//!
//! ```text
//! alice:ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAI... google-ssh {"userName":"alice@example.com","expireOn":"2024-05-01T12:00:00+0000"}
//! ```
//!
//! Lines that are neither are kept verbatim so that a rewrite never loses
//! data another tool put there.

use std::fmt::{Display, Formatter};

use chrono::SubsecRound;
use serde::{Deserialize, Serialize};
use warden_common::{DateTime, Duration, Utc};
use warden_credentials::SshPublicKey;

/// Marks an entry as carrying expiry information.
pub const MANAGED_KEY_MARKER: &str = "google-ssh";

const EXPIRE_ON_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// A key without expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmanagedKey {
    /// Login the key is authorized for
    pub username: String,
    /// The key
    pub key: SshPublicKey,
    /// Free-form trailing comment
    pub comment: Option<String>,
}

/// A key that stops being honored at `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedKey {
    /// Login the key is authorized for
    pub username: String,
    /// The key
    pub key: SshPublicKey,
    /// Account that published the key
    pub account: String,
    /// When the key expires, in whole seconds
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManagedKeyMetadata {
    user_name: String,
    expire_on: String,
}

/// One line of the `ssh-keys` item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizedKeyEntry {
    /// A key without expiry
    Unmanaged(UnmanagedKey),
    /// A key with expiry
    Managed(ManagedKey),
    /// A line that could not be interpreted, kept as is
    Unrecognized(String),
}

impl AuthorizedKeyEntry {
    /// Parse one line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        Some(Self::parse_key(trimmed).unwrap_or_else(|| Self::Unrecognized(line.to_string())))
    }

    fn parse_key(line: &str) -> Option<Self> {
        let (username, rest) = line.split_once(':')?;
        if username.is_empty() || username.contains(char::is_whitespace) {
            return None;
        }

        let (algorithm, rest) = next_token(rest)?;
        let (blob, rest) = next_token(rest)?;
        let key: SshPublicKey = format!("{algorithm} {blob}").parse().ok()?;
        let username = username.to_string();

        match next_token(rest) {
            None => Some(Self::Unmanaged(UnmanagedKey {
                username,
                key,
                comment: None,
            })),
            Some((MANAGED_KEY_MARKER, json)) => {
                let metadata: ManagedKeyMetadata = serde_json::from_str(json).ok()?;
                Some(Self::Managed(ManagedKey {
                    username,
                    key,
                    account: metadata.user_name,
                    expires_at: parse_expire_on(&metadata.expire_on)?,
                }))
            }
            Some(_) => Some(Self::Unmanaged(UnmanagedKey {
                username,
                key,
                comment: Some(rest.trim().to_string()),
            })),
        }
    }

    /// The login and key of this entry, unless it is unrecognized.
    pub fn authorizes(&self) -> Option<(&str, &SshPublicKey)> {
        match self {
            Self::Unmanaged(entry) => Some((&entry.username, &entry.key)),
            Self::Managed(entry) => Some((&entry.username, &entry.key)),
            Self::Unrecognized(_) => None,
        }
    }
}

impl Display for AuthorizedKeyEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unmanaged(entry) => {
                write!(f, "{}:{}", entry.username, entry.key)?;
                if let Some(comment) = &entry.comment {
                    write!(f, " {comment}")?;
                }
                Ok(())
            }
            Self::Managed(entry) => {
                let metadata = serde_json::to_string(&ManagedKeyMetadata {
                    user_name: entry.account.clone(),
                    expire_on: entry.expires_at.format(EXPIRE_ON_FORMAT).to_string(),
                })
                .map_err(|_| std::fmt::Error)?;
                write!(
                    f,
                    "{}:{} {MANAGED_KEY_MARKER} {metadata}",
                    entry.username, entry.key
                )
            }
            Self::Unrecognized(line) => f.write_str(line),
        }
    }
}

/// The parsed `ssh-keys` item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizedKeys {
    entries: Vec<AuthorizedKeyEntry>,
}

impl AuthorizedKeys {
    /// Parse the item's value. Parsing never fails: lines that cannot be
    /// interpreted become [`AuthorizedKeyEntry::Unrecognized`].
    pub fn parse(value: &str) -> Self {
        Self {
            entries: value.lines().filter_map(AuthorizedKeyEntry::parse).collect(),
        }
    }

    /// All entries in order.
    pub fn entries(&self) -> &[AuthorizedKeyEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove managed entries that expired at or before `now`. Returns the
    /// number of entries removed.
    pub fn prune_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| match entry {
            AuthorizedKeyEntry::Managed(entry) => entry.expires_at > now,
            _ => true,
        });
        before - self.entries.len()
    }

    /// Authorize `key` for `username` until `expires_at`.
    ///
    /// An existing managed entry for the same login and key is extended to
    /// the later of both expiries rather than duplicated. An unmanaged entry
    /// for the same login and key already authorizes the key indefinitely
    /// and is left alone. Returns when the key expires, rounded up to the
    /// next whole second.
    pub fn upsert(
        &mut self,
        username: &str,
        key: &SshPublicKey,
        account: &str,
        expires_at: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let expires_at = ceil_to_second(expires_at);

        for entry in self.entries.iter_mut() {
            match entry {
                AuthorizedKeyEntry::Unmanaged(existing)
                    if existing.username == username && &existing.key == key =>
                {
                    return expires_at;
                }
                AuthorizedKeyEntry::Managed(existing)
                    if existing.username == username && &existing.key == key =>
                {
                    existing.expires_at = existing.expires_at.max(expires_at);
                    existing.account = account.to_string();
                    return existing.expires_at;
                }
                _ => {}
            }
        }

        self.entries.push(AuthorizedKeyEntry::Managed(ManagedKey {
            username: username.to_string(),
            key: key.clone(),
            account: account.to_string(),
            expires_at,
        }));
        expires_at
    }
}

impl Display for AuthorizedKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, entry) in self.entries.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

// `expireOn` has no sub-second part; never publish an earlier expiry than asked for
fn ceil_to_second(instant: DateTime<Utc>) -> DateTime<Utc> {
    let truncated = instant.trunc_subsecs(0);
    if truncated < instant {
        truncated + Duration::seconds(1)
    } else {
        truncated
    }
}

fn next_token(value: &str) -> Option<(&str, &str)> {
    let value = value.trim_start();
    if value.is_empty() {
        return None;
    }
    Some(
        value
            .split_once(char::is_whitespace)
            .map_or((value, ""), |(token, rest)| (token, rest.trim_start())),
    )
}

fn parse_expire_on(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(value, EXPIRE_ON_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|instant| instant.with_timezone(&Utc))
}
