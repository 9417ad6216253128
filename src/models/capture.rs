use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A periodic screenshot artifact tied to a session. Append-only; retention
/// is handled outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenCapture {
    pub id: String,
    pub session_id: String,
    pub user_id: String,
    /// Opaque storage reference returned by blob upload.
    pub image_url: String,
    pub captured_at: DateTime<Utc>,
}

impl ScreenCapture {
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        image_url: impl Into<String>,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            user_id: user_id.into(),
            image_url: image_url.into(),
            captured_at,
        }
    }

    /// Blob path convention: `{user_id}/{session_id}/{timestamp}.jpg`.
    pub fn blob_path(user_id: &str, session_id: &str, captured_at: DateTime<Utc>) -> String {
        format!("{}/{}/{}.jpg", user_id, session_id, captured_at.timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_path_follows_convention() {
        let at = DateTime::parse_from_rfc3339("2024-06-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let path = ScreenCapture::blob_path("user-1", "session-1", at);
        assert_eq!(path, format!("user-1/session-1/{}.jpg", at.timestamp_millis()));
        assert!(path.ends_with(".jpg"));
    }
}
