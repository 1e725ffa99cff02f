mod models;
mod scope;

pub use models::*;
pub use scope::{GLOBAL_SCOPE, ScopeId, filter_scope_ids};
