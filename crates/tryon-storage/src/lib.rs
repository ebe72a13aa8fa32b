pub mod cache;
pub mod error;
pub mod store;

pub use cache::ResultCache;
pub use error::{StorageError, StorageResult};
pub use store::UploadStore;
