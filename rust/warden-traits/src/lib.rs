//! Instance traits - capability markers describing a compute instance.
//!
//! A trait states one fact about a target instance, such as the family of
//! its guest operating system. Traits have a canonical textual form, the
//! trait expression, which looks like a nullary function call:
//!
//! ```text
//! isLinux()
//! isOsLoginEnforced()
//! ```
//!
//! # Example
//!
//! ```
//! use warden_traits::{InstanceTrait, TraitSet};
//!
//! // Parsing tolerates surrounding and internal whitespace
//! let linux = InstanceTrait::parse(" isLinux(  \n) ").unwrap();
//! assert_eq!(linux, InstanceTrait::Linux);
//! assert_eq!(linux.to_string(), "isLinux()");
//!
//! // Malformed input is silently rejected
//! assert!(InstanceTrait::parse("isLinux").is_none());
//! assert!(InstanceTrait::parse("   ").is_none());
//!
//! let traits: TraitSet = [InstanceTrait::Linux].into_iter().collect();
//! assert!(traits.contains(InstanceTrait::linux()));
//! ```
//!
//! # Grammar
//!
//! ```text
//! expression := ws* name ws* "(" ws* arguments? ws* ")" ws*
//! name       := [A-Za-z_][A-Za-z0-9_]*
//! arguments  := argument (ws* "," ws* argument)*
//! argument   := any run of characters other than whitespace, ",", "(" or ")"
//! ```
//!
//! Every trait kind currently defined takes no arguments; the grammar
//! reserves comma-separated argument lists so that parameterized kinds can
//! be added without changing the syntax.

mod error;
pub use error::*;

mod expression;
pub use expression::*;

mod instance_trait;
pub use instance_trait::*;

mod set;
pub use set::*;
