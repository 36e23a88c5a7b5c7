//! The contract between key authorization and the cloud it runs against.
//!
//! Authorization never talks to a cloud API directly. Instead it goes through
//! two adapters:
//!
//! - [`ComputeAdapter`] looks up instances and reads or conditionally writes
//!   metadata items at instance or project scope. Every read returns a
//!   [`Fingerprint`] and every write must present the fingerprint it was based
//!   on, so that concurrent writers are detected rather than overwritten.
//! - [`DirectoryService`] imports a public key into a user directory (OS
//!   Login) and reports the POSIX username the directory assigned.
//!
//! [`MemoryComputeProvider`] and [`MemoryDirectory`] implement both in
//! memory, for tests and local simulation.

mod adapter;
pub use adapter::*;

mod descriptor;
pub use descriptor::*;

mod error;
pub use error::*;

mod fingerprint;
pub use fingerprint::*;

mod locator;
pub use locator::*;

mod memory;
pub use memory::*;
