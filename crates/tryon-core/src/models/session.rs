//! Per-user session state.
//!
//! The session is the authoritative record of where a user is in the
//! form → uploaded → processed flow. It is owned by the server-side session
//! store; handlers load it at request start, apply exactly one transition,
//! and persist it at request end. The pure state effects (reset, failure)
//! live here; transitions that touch collaborators live in the service layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discrete phase of the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Initial state; also reached via reset or any unrecoverable error.
    Form,
    /// Both photo references are set and were valid when stored.
    Uploaded,
    /// A composition result reference is set.
    Processed,
}

/// The two inbound photo roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoRole {
    User,
    Jewelry,
}

impl PhotoRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoRole::User => "user",
            PhotoRole::Jewelry => "jewelry",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub stage: Stage,
    /// Stored-photo file names (bare names, no path separators).
    pub user_photo: Option<String>,
    pub jewelry_photo: Option<String>,
    pub result_photo: Option<String>,
    /// A pinned photo reference survives a reset.
    pub pin_user: bool,
    pub pin_jewelry: bool,
    /// User-safe message only; technical detail goes to the log.
    pub last_error: Option<String>,
    /// Advisory; the session store applies no expiry of its own.
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        Session {
            stage: Stage::Form,
            user_photo: None,
            jewelry_photo: None,
            result_photo: None,
            pin_user: false,
            pin_jewelry: false,
            last_error: None,
            last_activity: Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// RESET effect: always drop the result, drop unpinned photo refs, clear
    /// the error, return to the form.
    pub fn apply_reset(&mut self) {
        self.stage = Stage::Form;
        self.result_photo = None;
        if !self.pin_user {
            self.user_photo = None;
        }
        if !self.pin_jewelry {
            self.jewelry_photo = None;
        }
        self.last_error = None;
        self.touch();
    }

    /// Failure effect: abandon whatever the transition was doing, keep the
    /// existing references, force the form stage, and record the user-safe
    /// message. This is the single state write for a failed transition.
    pub fn fail(&mut self, user_message: String) {
        self.stage = Stage::Form;
        self.last_error = Some(user_message);
        self.touch();
    }

    pub fn photo_ref(&self, role: PhotoRole) -> Option<&str> {
        match role {
            PhotoRole::User => self.user_photo.as_deref(),
            PhotoRole::Jewelry => self.jewelry_photo.as_deref(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processed_session() -> Session {
        Session {
            stage: Stage::Processed,
            user_photo: Some("user_a.jpg".to_string()),
            jewelry_photo: Some("jewel_b.png".to_string()),
            result_photo: Some("user_a-jewel_b.png".to_string()),
            pin_user: false,
            pin_jewelry: false,
            last_error: None,
            last_activity: Utc::now(),
        }
    }

    #[test]
    fn test_reset_clears_everything_unpinned() {
        let mut session = processed_session();
        session.apply_reset();
        assert_eq!(session.stage, Stage::Form);
        assert!(session.user_photo.is_none());
        assert!(session.jewelry_photo.is_none());
        assert!(session.result_photo.is_none());
        assert!(session.last_error.is_none());
    }

    #[test]
    fn test_reset_honors_pins() {
        let mut session = processed_session();
        session.pin_user = true;
        session.apply_reset();
        assert_eq!(session.user_photo.as_deref(), Some("user_a.jpg"));
        assert!(session.jewelry_photo.is_none());
        // The result is cleared unconditionally, pinned or not.
        assert!(session.result_photo.is_none());

        let mut session = processed_session();
        session.pin_jewelry = true;
        session.apply_reset();
        assert!(session.user_photo.is_none());
        assert_eq!(session.jewelry_photo.as_deref(), Some("jewel_b.png"));
    }

    #[test]
    fn test_fail_preserves_refs() {
        let mut session = processed_session();
        session.fail("Please try again.".to_string());
        assert_eq!(session.stage, Stage::Form);
        assert_eq!(session.last_error.as_deref(), Some("Please try again."));
        assert!(session.user_photo.is_some());
        assert!(session.jewelry_photo.is_some());
    }
}
