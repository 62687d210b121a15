//! Best-effort upload audit writes.

use crate::metrics::AUDIT_WRITE_FAILURES;
use optipredict_metadata::repos::UploadAuditRepo;
use optipredict_metadata::{MetadataStore, NewUploadAudit};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Insert an audit row in the background.
///
/// The caller does not wait. A failed insert is logged at warn, counted, and
/// dropped.
pub fn spawn_audit(metadata: Arc<dyn MetadataStore>, audit: NewUploadAudit) -> JoinHandle<()> {
    tokio::spawn(async move {
        match metadata.record_upload(&audit).await {
            Ok(id) => tracing::debug!(
                audit_id = id,
                user_id = audit.user_id,
                "Upload audit recorded"
            ),
            Err(e) => {
                AUDIT_WRITE_FAILURES.inc();
                tracing::warn!(
                    user_id = audit.user_id,
                    filename = %audit.filename,
                    error = %e,
                    "Failed to record upload audit"
                );
            }
        }
    })
}
