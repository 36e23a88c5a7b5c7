use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use crate::InstanceTrait;

/// The set of traits that apply to one instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraitSet(BTreeSet<InstanceTrait>);

impl TraitSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a trait, returning whether it was newly added.
    pub fn insert(&mut self, value: InstanceTrait) -> bool {
        self.0.insert(value)
    }

    /// Whether the set contains `value`.
    pub fn contains(&self, value: &InstanceTrait) -> bool {
        self.0.contains(value)
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of traits in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate the traits in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = &InstanceTrait> {
        self.0.iter()
    }
}

impl FromIterator<InstanceTrait> for TraitSet {
    fn from_iter<T: IntoIterator<Item = InstanceTrait>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<InstanceTrait> for TraitSet {
    fn extend<T: IntoIterator<Item = InstanceTrait>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl Display for TraitSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let expressions = self
            .0
            .iter()
            .map(InstanceTrait::expression)
            .collect::<Vec<_>>();
        write!(f, "{{{}}}", expressions.join(", "))
    }
}
