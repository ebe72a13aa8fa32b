pub mod error;
pub mod handlers;
pub mod router;
pub mod service;
pub mod session_store;
pub mod state;

pub use router::build_router;
pub use service::{Action, ActionInput, TryonService, UploadedFile};
pub use session_store::SessionStore;
pub use state::AppState;
