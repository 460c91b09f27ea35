//! Policy & authorization registry.
//!
//! Role registry, role↔skill matrix, role-policy schema and skill registry,
//! loaded and cross-validated into one immutable model that the preflight gate
//! and upstream task creation read from.

pub mod cache;
pub mod loader;
pub mod model;
pub mod query;

pub use cache::{RegistryCache, RegistrySnapshot, global_cache};
pub use loader::{FileStamp, RegistryLoad, load};
pub use model::{PolicyRegistry, RegistryIssue, RolePolicy, Skill};
pub use query::AuthorizationDenial;
