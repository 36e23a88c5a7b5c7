use std::fmt::{Display, Formatter};

/// An opaque token naming the observed state of a metadata scope.
///
/// A write must present the fingerprint returned by the read it is based
/// on. If the scope has changed in the meantime the write is rejected with
/// [`crate::ComputeError::FingerprintMismatch`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap a fingerprint issued by a compute service
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw token
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Fingerprint {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Fingerprint {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The result of reading a metadata item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataValue {
    /// The item's value, or `None` if the scope has no such item
    pub value: Option<String>,
    /// Fingerprint of the scope at the time of the read
    pub fingerprint: Fingerprint,
}
