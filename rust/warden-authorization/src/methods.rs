use std::fmt::{Display, Formatter};
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::KeyAuthorizationError;

/// One mechanism for getting a public key onto an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorizationMethod {
    /// Publish the key in the instance's own metadata.
    InstanceMetadata,
    /// Publish the key in project metadata, which every instance of the
    /// project inherits.
    ProjectMetadata,
    /// Import the key into the caller's OS Login profile.
    OsLogin,
}

impl AuthorizationMethod {
    /// Every method, in the order they are attempted.
    pub const PRIORITY: [AuthorizationMethod; 3] = [
        AuthorizationMethod::OsLogin,
        AuthorizationMethod::InstanceMetadata,
        AuthorizationMethod::ProjectMetadata,
    ];

    /// The flag value of this method inside [`AuthorizationMethods`].
    pub const fn bits(self) -> u8 {
        match self {
            AuthorizationMethod::InstanceMetadata => 1,
            AuthorizationMethod::ProjectMetadata => 2,
            AuthorizationMethod::OsLogin => 4,
        }
    }

    /// The method's name.
    pub fn name(self) -> &'static str {
        match self {
            AuthorizationMethod::InstanceMetadata => "InstanceMetadata",
            AuthorizationMethod::ProjectMetadata => "ProjectMetadata",
            AuthorizationMethod::OsLogin => "OsLogin",
        }
    }
}

impl Display for AuthorizationMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of [`AuthorizationMethod`]s, stored as bit flags.
///
/// The flag values are stable (`InstanceMetadata = 1`,
/// `ProjectMetadata = 2`, `OsLogin = 4`, `All = 7`) so a raw mask can be
/// persisted and compared. Masks with bits outside `All` cannot be
/// constructed.
///
/// ```
/// use warden_authorization::{AuthorizationMethod, AuthorizationMethods};
///
/// let methods = AuthorizationMethods::INSTANCE_METADATA | AuthorizationMethods::OS_LOGIN;
///
/// assert_eq!(methods.bits(), 5);
/// assert!(methods.contains(AuthorizationMethod::OsLogin));
/// assert_eq!(methods.to_string(), "InstanceMetadata|OsLogin");
/// assert_eq!("All".parse::<AuthorizationMethods>().unwrap(), AuthorizationMethods::ALL);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct AuthorizationMethods(u8);

impl AuthorizationMethods {
    /// No methods.
    pub const NONE: AuthorizationMethods = AuthorizationMethods(0);
    /// Instance metadata only.
    pub const INSTANCE_METADATA: AuthorizationMethods =
        AuthorizationMethods(AuthorizationMethod::InstanceMetadata.bits());
    /// Project metadata only.
    pub const PROJECT_METADATA: AuthorizationMethods =
        AuthorizationMethods(AuthorizationMethod::ProjectMetadata.bits());
    /// OS Login only.
    pub const OS_LOGIN: AuthorizationMethods =
        AuthorizationMethods(AuthorizationMethod::OsLogin.bits());
    /// Every method.
    pub const ALL: AuthorizationMethods = AuthorizationMethods(7);

    /// Interpret a raw mask.
    ///
    /// # Errors
    ///
    /// Fails with [`KeyAuthorizationError::InvalidArgument`] if the mask
    /// has bits outside [`AuthorizationMethods::ALL`].
    pub fn from_bits(bits: u8) -> Result<Self, KeyAuthorizationError> {
        if bits & !Self::ALL.0 != 0 {
            return Err(KeyAuthorizationError::InvalidArgument(format!(
                "Undefined authorization method flags in mask {bits:#04x}"
            )));
        }
        Ok(Self(bits))
    }

    /// The raw mask.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Whether no method is selected.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether `method` is selected.
    pub fn contains(self, method: AuthorizationMethod) -> bool {
        self.0 & method.bits() != 0
    }

    /// Add `method` to the set.
    pub fn insert(&mut self, method: AuthorizationMethod) {
        self.0 |= method.bits();
    }

    /// The selected methods in the order they are attempted.
    pub fn iter(self) -> impl Iterator<Item = AuthorizationMethod> {
        AuthorizationMethod::PRIORITY
            .into_iter()
            .filter(move |method| self.contains(*method))
    }
}

impl From<AuthorizationMethod> for AuthorizationMethods {
    fn from(method: AuthorizationMethod) -> Self {
        Self(method.bits())
    }
}

impl FromIterator<AuthorizationMethod> for AuthorizationMethods {
    fn from_iter<T: IntoIterator<Item = AuthorizationMethod>>(iter: T) -> Self {
        let mut methods = AuthorizationMethods::NONE;
        for method in iter {
            methods.insert(method);
        }
        methods
    }
}

impl BitOr for AuthorizationMethods {
    type Output = AuthorizationMethods;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOr<AuthorizationMethod> for AuthorizationMethods {
    type Output = AuthorizationMethods;

    fn bitor(self, rhs: AuthorizationMethod) -> Self::Output {
        Self(self.0 | rhs.bits())
    }
}

impl BitOrAssign for AuthorizationMethods {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl Display for AuthorizationMethods {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if *self == Self::ALL {
            return f.write_str("All");
        }
        if self.is_empty() {
            return f.write_str("None");
        }

        // Flag order, not priority order
        let names = [
            AuthorizationMethod::InstanceMetadata,
            AuthorizationMethod::ProjectMetadata,
            AuthorizationMethod::OsLogin,
        ]
        .into_iter()
        .filter(|method| self.contains(*method))
        .map(AuthorizationMethod::name)
        .collect::<Vec<_>>();

        f.write_str(&names.join("|"))
    }
}

impl FromStr for AuthorizationMethods {
    type Err = KeyAuthorizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut methods = AuthorizationMethods::NONE;

        for name in s.split('|').map(str::trim) {
            methods |= match name {
                "All" => AuthorizationMethods::ALL,
                "None" => AuthorizationMethods::NONE,
                "InstanceMetadata" => AuthorizationMethods::INSTANCE_METADATA,
                "ProjectMetadata" => AuthorizationMethods::PROJECT_METADATA,
                "OsLogin" => AuthorizationMethods::OS_LOGIN,
                other => {
                    return Err(KeyAuthorizationError::InvalidArgument(format!(
                        "Unknown authorization method '{other}'"
                    )));
                }
            };
        }

        Ok(methods)
    }
}

impl From<AuthorizationMethods> for String {
    fn from(value: AuthorizationMethods) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for AuthorizationMethods {
    type Error = KeyAuthorizationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
