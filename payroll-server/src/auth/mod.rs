//! Cookie sessions, route guards and login throttling

pub mod extractor;
pub mod rate_limit;
pub mod session;

pub use extractor::CurrentUser;
pub use session::{MemorySessionStore, Session, SessionStore, session_id_from_headers};
