//! Shared constants for the try-on service.

/// Stored-photo name prefix for user photos.
pub const USER_PHOTO_PREFIX: &str = "user_";

/// Stored-photo name prefix for jewelry photos.
pub const JEWELRY_PHOTO_PREFIX: &str = "jewel_";

/// Prefix prepended to a stored-photo name to form its thumbnail name.
pub const THUMBNAIL_PREFIX: &str = "thumb_";

/// Extension given to cached composition results.
pub const RESULT_EXTENSION: &str = "png";

/// Subfolder of the uploads root holding thumbnails.
pub const THUMBNAILS_SUBDIR: &str = "thumbnails";

/// Subfolder of the uploads root holding cached composition results.
pub const RESULTS_SUBDIR: &str = "results";

/// Marker file written at the uploads root to deny direct web access.
pub const ACCESS_MARKER_FILE: &str = ".htaccess";
pub const ACCESS_MARKER_CONTENT: &str = "deny from all\n";

/// Fixed text prompt sent alongside both photos on every webhook call.
pub const WEBHOOK_PROMPT: &str = "Try on this jewelry bracelet on the user's wrist";

/// Upper bound on any message surfaced to a user.
pub const MAX_USER_MESSAGE_LEN: usize = 256;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "tryon_session";
