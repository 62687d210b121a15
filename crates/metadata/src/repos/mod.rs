//! Repository traits for metadata operations.

pub mod audits;

pub use audits::UploadAuditRepo;
