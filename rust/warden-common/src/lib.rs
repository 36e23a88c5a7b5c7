//! Helpers shared by the warden crates: thread-safety bounds that relax on
//! `wasm32`, and the [`Clock`] that key expiries are computed from.

mod sync;
pub use sync::*;

mod time;
pub use time::*;
