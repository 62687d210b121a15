//! Size-tiered timeout selection.
//!
//! One tier table governs both the inbound request (chosen from the declared
//! `Content-Length` before the body is read) and the outbound relay to the ML
//! service (chosen from the stored file size). The inbound bound on the batch
//! route adds a grace period so a slow relay is reported by the relay timeout.

use crate::BYTES_PER_MB;
use std::time::Duration;

/// Uploads above this size use the medium tier.
pub const MEDIUM_UPLOAD_THRESHOLD_MB: u64 = 50;

/// Uploads above this size use the large tier.
pub const LARGE_UPLOAD_THRESHOLD_MB: u64 = 100;

/// Which kind of route a request targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteClass {
    /// The batch file upload route.
    BatchUpload,
    /// Everything else.
    Standard,
}

/// A discrete timeout band.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeoutTier {
    Standard,
    UploadSmall,
    UploadMedium,
    UploadLarge,
}

impl TimeoutTier {
    /// Select the tier for an upload of `size_bytes`.
    ///
    /// Boundaries are inclusive on the lower tier: exactly 50 MB is small,
    /// exactly 100 MB is medium.
    pub fn for_upload_size(size_bytes: u64) -> Self {
        if size_bytes > LARGE_UPLOAD_THRESHOLD_MB * BYTES_PER_MB {
            Self::UploadLarge
        } else if size_bytes > MEDIUM_UPLOAD_THRESHOLD_MB * BYTES_PER_MB {
            Self::UploadMedium
        } else {
            Self::UploadSmall
        }
    }

    /// Select the tier for a request on `route` with the declared content length.
    pub fn for_request(route: RouteClass, content_length: u64) -> Self {
        match route {
            RouteClass::BatchUpload => Self::for_upload_size(content_length),
            RouteClass::Standard => Self::Standard,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::UploadSmall => "upload_small",
            Self::UploadMedium => "upload_medium",
            Self::UploadLarge => "upload_large",
        }
    }
}

/// Durations for each tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub standard: Duration,
    pub upload_small: Duration,
    pub upload_medium: Duration,
    pub upload_large: Duration,
    /// Added to the inbound timeout of batch uploads.
    pub inbound_grace: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            standard: Duration::from_secs(10 * 60),
            upload_small: Duration::from_secs(60 * 60),
            upload_medium: Duration::from_secs(2 * 60 * 60),
            upload_large: Duration::from_secs(4 * 60 * 60),
            inbound_grace: Duration::from_secs(60),
        }
    }
}

impl TimeoutPolicy {
    /// Duration for a tier.
    pub fn duration(&self, tier: TimeoutTier) -> Duration {
        match tier {
            TimeoutTier::Standard => self.standard,
            TimeoutTier::UploadSmall => self.upload_small,
            TimeoutTier::UploadMedium => self.upload_medium,
            TimeoutTier::UploadLarge => self.upload_large,
        }
    }

    /// Inbound timeout for a request, from its raw `Content-Length` header.
    ///
    /// Batch uploads get their tier plus `inbound_grace`, which keeps the
    /// inbound bound strictly above the relay bound for the same file.
    pub fn for_request(&self, route: RouteClass, content_length: Option<&str>) -> Duration {
        let size = parse_content_length(content_length);
        let tier = self.duration(TimeoutTier::for_request(route, size));
        match route {
            RouteClass::BatchUpload => tier + self.inbound_grace,
            RouteClass::Standard => tier,
        }
    }

    /// Relay timeout for a stored upload of `size_bytes`.
    pub fn for_upload(&self, size_bytes: u64) -> Duration {
        self.duration(TimeoutTier::for_upload_size(size_bytes))
    }
}

/// Parse a declared content length; absent or unparseable values count as 0.
pub fn parse_content_length(header: Option<&str>) -> u64 {
    header
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = BYTES_PER_MB;

    fn upload(mb: u64) -> Duration {
        TimeoutPolicy::default().for_upload(mb * MB)
    }

    #[test]
    fn upload_tiers_follow_size_bands() {
        assert_eq!(upload(10), Duration::from_secs(3600));
        assert_eq!(upload(30), Duration::from_secs(3600));
        assert_eq!(upload(60), Duration::from_secs(7200));
        assert_eq!(upload(150), Duration::from_secs(14400));
    }

    #[test]
    fn upload_tier_boundaries_are_inclusive_on_lower_tier() {
        assert_eq!(
            TimeoutTier::for_upload_size(50 * MB),
            TimeoutTier::UploadSmall
        );
        assert_eq!(
            TimeoutTier::for_upload_size(50 * MB + 1),
            TimeoutTier::UploadMedium
        );
        assert_eq!(
            TimeoutTier::for_upload_size(100 * MB),
            TimeoutTier::UploadMedium
        );
        assert_eq!(
            TimeoutTier::for_upload_size(100 * MB + 1),
            TimeoutTier::UploadLarge
        );
    }

    #[test]
    fn standard_routes_ignore_size() {
        let policy = TimeoutPolicy::default();
        let big = (200 * MB).to_string();
        assert_eq!(
            policy.for_request(RouteClass::Standard, Some(&big)),
            Duration::from_secs(600)
        );
    }

    #[test]
    fn batch_route_reads_declared_length() {
        let policy = TimeoutPolicy::default();
        let declared = (60 * MB).to_string();
        assert_eq!(
            policy.for_request(RouteClass::BatchUpload, Some(&declared)),
            Duration::from_secs(7200 + 60)
        );
    }

    #[test]
    fn inbound_bound_exceeds_relay_bound_for_same_size() {
        let policy = TimeoutPolicy::default();
        for mb in [0, 10, 50, 51, 100, 101, 400] {
            let declared = (mb * MB).to_string();
            assert!(
                policy.for_request(RouteClass::BatchUpload, Some(&declared))
                    > policy.for_upload(mb * MB),
                "{mb} MB"
            );
        }
    }

    #[test]
    fn missing_or_garbage_content_length_is_zero() {
        assert_eq!(parse_content_length(None), 0);
        assert_eq!(parse_content_length(Some("lots")), 0);
        assert_eq!(parse_content_length(Some(" 42 ")), 42);

        let policy = TimeoutPolicy::default();
        assert_eq!(
            policy.for_request(RouteClass::BatchUpload, Some("-5")),
            Duration::from_secs(3600 + 60)
        );
    }
}
