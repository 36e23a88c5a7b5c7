use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ComputeError;

/// Identifies a compute instance by project, zone and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct InstanceLocator {
    /// Project the instance belongs to
    pub project: String,
    /// Zone the instance runs in
    pub zone: String,
    /// Instance name
    pub name: String,
}

impl InstanceLocator {
    /// Create a new locator
    pub fn new(
        project: impl Into<String>,
        zone: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            zone: zone.into(),
            name: name.into(),
        }
    }

    /// The metadata scope of this instance
    pub fn scope(&self) -> MetadataScope {
        MetadataScope::Instance(self.clone())
    }

    /// The metadata scope of the project that owns this instance
    pub fn project_scope(&self) -> MetadataScope {
        MetadataScope::Project(self.project.clone())
    }
}

impl Display for InstanceLocator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "projects/{}/zones/{}/instances/{}",
            self.project, self.zone, self.name
        )
    }
}

impl FromStr for InstanceLocator {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split('/').collect::<Vec<_>>().as_slice() {
            ["projects", project, "zones", zone, "instances", name]
                if !project.is_empty() && !zone.is_empty() && !name.is_empty() =>
            {
                Ok(InstanceLocator::new(*project, *zone, *name))
            }
            _ => Err(ComputeError::Malformed(format!(
                "'{s}' is not of the form projects/<project>/zones/<zone>/instances/<name>"
            ))),
        }
    }
}

impl From<InstanceLocator> for String {
    fn from(value: InstanceLocator) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for InstanceLocator {
    type Error = ComputeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Where a metadata item lives.
///
/// Project metadata is inherited by every instance in the project; instance
/// metadata applies to one instance only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetadataScope {
    /// Metadata of a single instance
    Instance(InstanceLocator),
    /// Metadata shared by all instances of a project
    Project(String),
}

impl Display for MetadataScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataScope::Instance(locator) => write!(f, "{locator}"),
            MetadataScope::Project(project) => write!(f, "projects/{project}"),
        }
    }
}
