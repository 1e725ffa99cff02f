mod api;
pub mod dto;
pub mod response;
mod router;
pub mod validation;

pub use api::access::SCOPE_DENIED;
pub use router::{AppState, create_router};
