//! Compatibility policies for pairing waiting requesters.
//!
//! The predicate is a trait so deployments can swap the rule without
//! touching the engine; the default pairs on matching video preference
//! with region filters treated as wildcards when absent.

use crate::models::JoinRequest;

/// Decides whether two waiting requesters may share a room
pub trait CompatibilityPolicy: Send + Sync {
    fn compatible(&self, a: &JoinRequest, b: &JoinRequest) -> bool;
}

/// Default policy: same video preference, overlapping region.
///
/// A requester without a region filter is global and pairs with anyone;
/// two non-global filters must name the same region.
#[derive(Debug, Default)]
pub struct VideoRegionPolicy;

impl CompatibilityPolicy for VideoRegionPolicy {
    fn compatible(&self, a: &JoinRequest, b: &JoinRequest) -> bool {
        if a.wants_video != b.wants_video {
            return false;
        }

        match (&a.region, &b.region) {
            (Some(left), Some(right)) => left == right,
            _ => true, // global is a wildcard
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn request(identity: &str, wants_video: bool, region: Option<&str>) -> JoinRequest {
        JoinRequest {
            identity: identity.to_string(),
            wants_video,
            region: region.map(str::to_string),
            enqueued_at: Utc::now(),
            seq: 0,
        }
    }

    #[test]
    fn test_video_preference_must_match() {
        let policy = VideoRegionPolicy;
        let a = request("a", true, None);
        let b = request("b", false, None);

        assert!(!policy.compatible(&a, &b));
        assert!(policy.compatible(&a, &request("c", true, None)));
    }

    #[test]
    fn test_global_region_is_wildcard() {
        let policy = VideoRegionPolicy;
        let global = request("a", true, None);
        let eu = request("b", true, Some("eu"));

        assert!(policy.compatible(&global, &eu));
        assert!(policy.compatible(&eu, &global));
    }

    #[test]
    fn test_distinct_regions_do_not_pair() {
        let policy = VideoRegionPolicy;
        let eu = request("a", true, Some("eu"));
        let us = request("b", true, Some("us"));

        assert!(!policy.compatible(&eu, &us));
        assert!(policy.compatible(&eu, &request("c", true, Some("eu"))));
    }
}
