use serde::{Deserialize, Serialize};

use crate::prediction::Prediction;
use crate::tracker::rect::Rect;
use crate::tracker::track::Track;
use crate::tracker::track_state::TrackStatus;

/// Read-only copy of a live track, handed to display and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub id: u64,
    pub status: TrackStatus,
    pub confidence: f64,
    pub age: u32,
    pub hits: u32,
    pub misses: u32,
    pub position: [f64; 2],
    pub velocity: [f64; 2],
    pub bbox: Rect,
    pub class_label: Option<String>,
    pub prediction: Option<Prediction>,
}

impl From<&Track> for TrackSnapshot {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id(),
            status: track.status(),
            confidence: track.confidence(),
            age: track.age(),
            hits: track.hits(),
            misses: track.misses(),
            position: track.position(),
            velocity: track.velocity(),
            bbox: track.bbox(),
            class_label: track.class_label().map(str::to_owned),
            prediction: track.prediction().cloned(),
        }
    }
}
