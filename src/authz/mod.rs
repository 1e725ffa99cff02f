//! Scope authorization.
//!
//! [`ScopeAuthorizer`] admits a principal for a scope id by checking the
//! global wildcard, the principal's own id, its directory groups and finally
//! chat participation through [`ChatParticipantGate`].

mod authorizer;
mod gate;

pub use authorizer::ScopeAuthorizer;
pub use gate::{ChatParticipantGate, DEFAULT_ROSTER_TIMEOUT, ParticipantRoster};
