//! Upload audit repository trait.

use crate::error::MetadataResult;
use crate::models::{NewUploadAudit, UploadAuditRow};
use async_trait::async_trait;

/// Repository for the `file_uploads` audit trail.
///
/// Rows are append-only: nothing here updates or deletes them.
#[async_trait]
pub trait UploadAuditRepo: Send + Sync {
    /// Insert one audit row and return its id.
    async fn record_upload(&self, audit: &NewUploadAudit) -> MetadataResult<i64>;

    /// List a user's uploads, newest first.
    async fn list_uploads(&self, user_id: i64, limit: u32) -> MetadataResult<Vec<UploadAuditRow>>;

    /// Count a user's uploads.
    async fn count_uploads(&self, user_id: i64) -> MetadataResult<u64>;
}
