pub mod session;

pub use session::{PhotoRole, Session, Stage};
