//! GUI-hosted engine interaction: reply extraction, response stabilization
//! and session lifecycle.

pub mod extract;
pub mod session;
pub mod stabilize;

pub use extract::extract_reply;
pub use session::{ClipboardSurface, EngineTarget, Session, SessionTiming, Surface, compose_message};
pub use stabilize::{CancelToken, Outcome, StabilizationResult, StabilizeConfig, stabilize};
