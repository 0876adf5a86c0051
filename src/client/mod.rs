//! Typed client for the CRM API.
//!
//! Plays the part of a front end's data layer: it owns the login session,
//! attaches the bearer token to every request and drops the session as soon
//! as the server answers 401 or 403.

mod api;
mod board;
mod context;
mod error;
mod session;

pub use api::CrmClient;
pub use board::{Board, MoveOutcome, StageRemote};
pub use context::RequestContext;
pub use error::ClientError;
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionManager, SessionStore};
