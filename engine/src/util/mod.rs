//! Small utilities (component N): fully-qualified names, semantic versions,
//! hashing, deferred cleanup, and tri-state logic.

pub mod defer;
pub mod fqname;
pub mod hash;
pub mod logic;
pub mod semver;

pub use defer::Defer;
pub use fqname::Fqname;
pub use logic::Logic;
pub use semver::SemanticVersion;
