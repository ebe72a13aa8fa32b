pub mod optimizer;
pub mod sniff;
pub mod stats;
pub mod validator;

pub use optimizer::ImageOptimizer;
pub use sniff::sniff_mime;
pub use stats::{image_stats, ImageStats};
pub use validator::{UploadValidator, ValidationError};
