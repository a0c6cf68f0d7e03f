//! Persistence layer: libSQL-backed storage for profiles and the
//! interaction log.

pub mod libsql_backend;
pub mod migrations;
pub mod profiles;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use profiles::ProfileStore;
pub use traits::{Database, Interaction, InteractionRole};
