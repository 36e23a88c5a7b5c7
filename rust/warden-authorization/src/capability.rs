//! Derives an instance's traits from what the inventory knows about it.

use warden_compute::{GuestOsFamily, InstanceDescriptor};
use warden_traits::{InstanceTrait, TraitSet};

/// Metadata item that turns on OS Login.
pub const ENABLE_OS_LOGIN: &str = "enable-oslogin";

/// Metadata item that makes an instance ignore project-wide keys.
pub const BLOCK_PROJECT_SSH_KEYS: &str = "block-project-ssh-keys";

/// Legacy instance-level keys item. Its presence also makes the guest
/// ignore project-wide keys.
pub const LEGACY_SSH_KEYS: &str = "sshKeys";

/// The traits that hold for `instance`.
///
/// This is a pure function of the descriptor: it performs no I/O and
/// returns a fresh set on every call.
pub fn traits_of(instance: &InstanceDescriptor) -> TraitSet {
    let mut traits = TraitSet::new();

    match instance.guest_os {
        GuestOsFamily::Linux => {
            traits.insert(*InstanceTrait::linux());
        }
        GuestOsFamily::Windows => {
            traits.insert(*InstanceTrait::windows());
        }
        GuestOsFamily::Unknown => {}
    }

    if is_true(instance.effective_item(ENABLE_OS_LOGIN)) {
        traits.insert(*InstanceTrait::os_login_enforced());
    }

    if is_true(instance.instance_item(BLOCK_PROJECT_SSH_KEYS))
        || instance.instance_item(LEGACY_SSH_KEYS).is_some()
    {
        traits.insert(*InstanceTrait::project_keys_blocked());
    }

    traits
}

fn is_true(value: Option<&str>) -> bool {
    value.is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
}
