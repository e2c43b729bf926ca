use serde::{Deserialize, Serialize};

use crate::tracker::config::LifecycleConfig;

/// Track lifecycle status: a maturity tier, independent of detection class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackStatus {
    /// Newly created track, not yet confirmed
    #[default]
    Acquiring,
    /// Confirmed track
    Tracking,
    /// Stable, high-confidence track
    Locked,
    /// Retired; never present in the live collection
    Removed,
}

impl TrackStatus {
    /// Status for the next frame given the track counters.
    ///
    /// Moves at most one tier per call. Death (`Removed`) takes precedence,
    /// then demotion, then promotion.
    pub fn next(self, hits: u32, misses: u32, confidence: f64, config: &LifecycleConfig) -> Self {
        use TrackStatus::*;

        let miss_limit = match self {
            Acquiring => config.acquiring_miss_tolerance,
            _ => config.max_misses,
        };
        if self == Removed || misses > miss_limit {
            return Removed;
        }

        let collapsed = config.demote_on_low_confidence && confidence < config.demote_confidence;
        match self {
            Locked if collapsed || misses >= config.lock_miss_tolerance => Tracking,
            Tracking if collapsed => Acquiring,
            Acquiring if !collapsed && hits >= config.confirm_hits => Tracking,
            Tracking
                if misses == 0
                    && hits >= config.lock_hits
                    && confidence >= config.lock_confidence =>
            {
                Locked
            }
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackStatus::Acquiring => "ACQUIRING",
            TrackStatus::Tracking => "TRACKING",
            TrackStatus::Locked => "LOCKED",
            TrackStatus::Removed => "REMOVED",
        }
    }
}

impl std::fmt::Display for TrackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
