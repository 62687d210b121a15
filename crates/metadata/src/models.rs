//! Database models mapping to the metadata schema.

use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// Processing status recorded for an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Completed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored audit row for a processed upload.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UploadAuditRow {
    pub id: i64,
    pub user_id: i64,
    pub filename: String,
    pub file_size: i64,
    pub total_rows: i64,
    pub valid_rows: i64,
    pub processed_rows: i64,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub processed_at: OffsetDateTime,
}

/// Values for a new audit row. The id is assigned by the database.
#[derive(Debug, Clone)]
pub struct NewUploadAudit {
    pub user_id: i64,
    pub filename: String,
    pub file_size: i64,
    pub total_rows: i64,
    pub valid_rows: i64,
    pub processed_rows: i64,
    pub status: UploadStatus,
    pub created_at: OffsetDateTime,
    pub processed_at: OffsetDateTime,
}

impl NewUploadAudit {
    /// A completed upload, with both timestamps set to now.
    pub fn completed(
        user_id: i64,
        filename: impl Into<String>,
        file_size: u64,
        total_rows: u64,
        valid_rows: u64,
        processed_rows: u64,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            user_id,
            filename: filename.into(),
            file_size: clamp_i64(file_size),
            total_rows: clamp_i64(total_rows),
            valid_rows: clamp_i64(valid_rows),
            processed_rows: clamp_i64(processed_rows),
            status: UploadStatus::Completed,
            created_at: now,
            processed_at: now,
        }
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
