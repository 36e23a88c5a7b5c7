use thiserror::Error;

/// Reasons a trait expression is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraitParseError {
    /// The expression is empty or contains only whitespace.
    #[error("Trait expression is empty")]
    Empty,

    /// The expression does not follow the trait grammar.
    #[error("Expected {expected} at offset {offset}")]
    Syntax {
        /// Byte offset into the input where parsing stopped.
        offset: usize,
        /// What the parser was looking for.
        expected: &'static str,
    },

    /// The expression is well formed but names no known trait.
    #[error("Unknown trait '{0}'")]
    UnknownTrait(String),

    /// The trait exists but was given the wrong number of arguments.
    #[error("Trait '{name}' takes {expected} argument(s), got {actual}")]
    Arity {
        /// The trait name.
        name: String,
        /// Number of arguments the trait takes.
        expected: usize,
        /// Number of arguments supplied.
        actual: usize,
    },
}
