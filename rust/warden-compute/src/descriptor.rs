use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::InstanceLocator;

/// The operating system family a guest runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestOsFamily {
    /// A Linux distribution
    Linux,
    /// Windows or Windows Server
    Windows,
    /// The inventory could not tell
    #[default]
    Unknown,
}

/// What is known about an instance: where it is, what it runs, and the
/// metadata that governs how it accepts SSH keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDescriptor {
    /// The instance this describes
    pub locator: InstanceLocator,
    /// Guest OS family as reported by the inventory
    #[serde(default)]
    pub guest_os: GuestOsFamily,
    /// Instance metadata items
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Metadata items of the owning project
    #[serde(default)]
    pub project_metadata: BTreeMap<String, String>,
}

impl InstanceDescriptor {
    /// Describe an instance with no metadata.
    pub fn new(locator: InstanceLocator, guest_os: GuestOsFamily) -> Self {
        Self {
            locator,
            guest_os,
            metadata: BTreeMap::new(),
            project_metadata: BTreeMap::new(),
        }
    }

    /// Add an instance metadata item.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Add a project metadata item.
    pub fn with_project_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.project_metadata.insert(key.into(), value.into());
        self
    }

    /// The instance-level value of `key`.
    pub fn instance_item(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// The value of `key` as the guest sees it: the instance value if set,
    /// otherwise the value inherited from the project.
    pub fn effective_item(&self, key: &str) -> Option<&str> {
        self.instance_item(key)
            .or_else(|| self.project_metadata.get(key).map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_prefers_instance_metadata_over_project_metadata() {
        let descriptor = InstanceDescriptor::new(
            InstanceLocator::new("p", "z", "n"),
            GuestOsFamily::Linux,
        )
        .with_project_metadata("enable-oslogin", "TRUE")
        .with_project_metadata("startup-script", "echo")
        .with_metadata("enable-oslogin", "false");

        assert_eq!(descriptor.effective_item("enable-oslogin"), Some("false"));
        assert_eq!(descriptor.effective_item("startup-script"), Some("echo"));
        assert_eq!(descriptor.instance_item("startup-script"), None);
        assert_eq!(descriptor.effective_item("missing"), None);
    }

    #[test]
    fn it_deserializes_with_defaults() -> anyhow::Result<()> {
        let descriptor: InstanceDescriptor = serde_json::from_str(
            r#"{"locator": "projects/p/zones/z/instances/n", "guest_os": "windows"}"#,
        )?;

        assert_eq!(descriptor.guest_os, GuestOsFamily::Windows);
        assert!(descriptor.metadata.is_empty());
        assert!(descriptor.project_metadata.is_empty());
        Ok(())
    }
}
