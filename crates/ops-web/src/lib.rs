//! ops-web: Chat Server for ops-assist
//!
//! ```text
//! /api/chat     - One agent turn per POST, session carried in a signed cookie
//! /api/health   - Health check
//! /             - Static files (optional)
//! ```

pub mod handlers;
pub mod routes;
pub mod session;
pub mod state;

pub use routes::create_router;
pub use session::{SessionSigner, SESSION_COOKIE};
pub use state::AppState;
