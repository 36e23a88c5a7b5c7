use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{TraitExpression, TraitParseError};

/// A capability marker describing one fact about a compute instance.
///
/// Every kind defined today is parameterless, so each is represented by a
/// single process-wide entry in [`InstanceTrait::all`]. Use the accessors
/// ([`InstanceTrait::linux`] and friends) or [`InstanceTrait::singleton`]
/// to obtain that entry.
///
/// Traits serialize as their expression string and deserialize by parsing
/// it, so configuration that names traits is validated on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum InstanceTrait {
    /// The guest runs a Linux distribution: `isLinux()`.
    Linux,
    /// The guest runs Windows: `isWindows()`.
    Windows,
    /// OS Login is enabled for the instance, so the guest ignores SSH keys
    /// published in metadata: `isOsLoginEnforced()`.
    OsLoginEnforced,
    /// The instance ignores project-wide SSH keys: `isProjectKeysBlocked()`.
    ProjectKeysBlocked,
}

static INSTANCE_TRAITS: [InstanceTrait; 4] = [
    InstanceTrait::Linux,
    InstanceTrait::Windows,
    InstanceTrait::OsLoginEnforced,
    InstanceTrait::ProjectKeysBlocked,
];

impl InstanceTrait {
    /// All trait kinds, one entry per kind.
    pub fn all() -> &'static [InstanceTrait] {
        &INSTANCE_TRAITS
    }

    /// The `isLinux()` trait.
    pub fn linux() -> &'static InstanceTrait {
        InstanceTrait::Linux.singleton()
    }

    /// The `isWindows()` trait.
    pub fn windows() -> &'static InstanceTrait {
        InstanceTrait::Windows.singleton()
    }

    /// The `isOsLoginEnforced()` trait.
    pub fn os_login_enforced() -> &'static InstanceTrait {
        InstanceTrait::OsLoginEnforced.singleton()
    }

    /// The `isProjectKeysBlocked()` trait.
    pub fn project_keys_blocked() -> &'static InstanceTrait {
        InstanceTrait::ProjectKeysBlocked.singleton()
    }

    /// The shared table entry for this kind.
    pub fn singleton(self) -> &'static InstanceTrait {
        let index = match self {
            InstanceTrait::Linux => 0,
            InstanceTrait::Windows => 1,
            InstanceTrait::OsLoginEnforced => 2,
            InstanceTrait::ProjectKeysBlocked => 3,
        };
        &INSTANCE_TRAITS[index]
    }

    /// The name used in trait expressions.
    pub fn name(&self) -> &'static str {
        match self {
            InstanceTrait::Linux => "isLinux",
            InstanceTrait::Windows => "isWindows",
            InstanceTrait::OsLoginEnforced => "isOsLoginEnforced",
            InstanceTrait::ProjectKeysBlocked => "isProjectKeysBlocked",
        }
    }

    /// Number of arguments the trait takes.
    pub fn arity(&self) -> usize {
        0
    }

    /// The canonical expression, e.g. `isLinux()`.
    pub fn expression(&self) -> String {
        TraitExpression::nullary(self.name()).to_string()
    }

    /// Human readable name. Identical to the expression.
    pub fn display_name(&self) -> String {
        self.expression()
    }

    /// Resolve a parsed expression to a known trait.
    pub fn from_expression(expression: &TraitExpression<'_>) -> Result<Self, TraitParseError> {
        let kind = InstanceTrait::all()
            .iter()
            .find(|kind| kind.name() == expression.name)
            .ok_or_else(|| TraitParseError::UnknownTrait(expression.name.to_string()))?;

        if expression.arguments.len() != kind.arity() {
            return Err(TraitParseError::Arity {
                name: expression.name.to_string(),
                expected: kind.arity(),
                actual: expression.arguments.len(),
            });
        }

        Ok(*kind)
    }

    /// Parse a trait expression, returning `None` for anything that is not
    /// a valid expression of a known trait.
    ///
    /// Use this as a validity predicate; use [`str::parse`] to learn why an
    /// expression was rejected.
    pub fn parse(expression: &str) -> Option<Self> {
        expression.parse().ok()
    }
}

impl FromStr for InstanceTrait {
    type Err = TraitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InstanceTrait::from_expression(&TraitExpression::parse(s)?)
    }
}

impl Display for InstanceTrait {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", TraitExpression::nullary(self.name()))
    }
}

impl From<InstanceTrait> for String {
    fn from(value: InstanceTrait) -> Self {
        value.expression()
    }
}

impl TryFrom<String> for InstanceTrait {
    type Error = TraitParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of(value: &InstanceTrait) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn it_renders_linux_as_expression() {
        assert_eq!(InstanceTrait::linux().expression(), "isLinux()");
        assert_eq!(InstanceTrait::linux().display_name(), "isLinux()");
        assert_eq!(InstanceTrait::linux().to_string(), "isLinux()");
    }

    #[test]
    fn it_round_trips_every_kind() {
        for kind in InstanceTrait::all() {
            let rendered = kind.to_string();
            let parsed = InstanceTrait::parse(&rendered).unwrap();

            assert_eq!(&parsed, kind);
            assert_eq!(parsed.to_string(), rendered);
        }
    }

    #[test]
    fn it_parses_expressions_with_whitespace() {
        for expression in ["isLinux()", " isLinux(  \n) \n\r\t "] {
            assert_eq!(InstanceTrait::parse(expression), Some(InstanceTrait::Linux));
        }
    }

    #[test]
    fn it_rejects_missing_or_blank_expressions() {
        for expression in [None, Some(""), Some(" \t"), Some("   ")] {
            assert!(expression.and_then(InstanceTrait::parse).is_none());
        }
    }

    #[test]
    fn it_is_case_sensitive() {
        assert_eq!(
            "islinux()".parse::<InstanceTrait>(),
            Err(TraitParseError::UnknownTrait("islinux".into()))
        );
        assert!(InstanceTrait::parse("IsLinux()").is_none());
    }

    #[test]
    fn it_rejects_arguments_for_nullary_traits() {
        assert_eq!(
            "isLinux(debian)".parse::<InstanceTrait>(),
            Err(TraitParseError::Arity {
                name: "isLinux".into(),
                expected: 0,
                actual: 1
            })
        );
    }

    #[test]
    fn it_hands_out_a_single_instance_per_kind() {
        let first = InstanceTrait::linux();
        let second = InstanceTrait::linux();
        assert_eq!(first, second);
        assert!(std::ptr::eq(first, second));

        let parsed = InstanceTrait::parse("isLinux()").unwrap();
        assert!(std::ptr::eq(parsed.singleton(), InstanceTrait::linux()));

        for kind in InstanceTrait::all() {
            assert!(std::ptr::eq(kind.singleton(), kind));
        }
    }

    #[test]
    fn it_compares_structurally() {
        let a = InstanceTrait::Linux;
        let b = InstanceTrait::parse("isLinux()").unwrap();
        let c = *InstanceTrait::linux();

        // reflexive, symmetric, transitive
        assert_eq!(a, a);
        assert_eq!(a == b, b == a);
        assert!(a == b && b == c && a == c);

        assert_eq!(hash_of(&a), hash_of(&b));
        assert_ne!(InstanceTrait::Linux, InstanceTrait::Windows);
    }

    #[test]
    fn it_serializes_as_expression() {
        let json = serde_json::to_string(&InstanceTrait::OsLoginEnforced).unwrap();
        assert_eq!(json, "\"isOsLoginEnforced()\"");

        let parsed: Vec<InstanceTrait> =
            serde_json::from_str(r#"["isWindows()", " isProjectKeysBlocked( ) "]"#).unwrap();
        assert_eq!(
            parsed,
            vec![InstanceTrait::Windows, InstanceTrait::ProjectKeysBlocked]
        );

        assert!(serde_json::from_str::<InstanceTrait>("\"isBsd()\"").is_err());
    }
}
