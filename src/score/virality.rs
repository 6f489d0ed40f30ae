// src/score/virality.rs
//! Engagement momentum with linear recency decay.
//!
//! velocity = (likes + shares + comments) / max(age_h, 1)
//! score    = min(velocity, 100) * max(0, 1 - age_h / 24)

use chrono::{DateTime, Utc};

use crate::model::Engagement;

/// Items this old (hours) or older always score 0.
pub const DECAY_HOURS: f32 = 24.0;
/// Engagements per hour treated as maximally viral.
pub const VIRAL_VELOCITY: f32 = 100.0;

/// Age in hours, clamped to >= 0 (future-dated items count as brand new).
pub fn age_hours(published: DateTime<Utc>, now: DateTime<Utc>) -> f32 {
    let ms = (now - published).num_milliseconds();
    (ms as f64 / 3_600_000.0).max(0.0) as f32
}

pub fn score(engagement: &Engagement, age_hours: f32) -> f32 {
    let total = engagement.total();
    if total == 0 {
        return 0.0;
    }
    let age = if age_hours.is_nan() {
        0.0
    } else {
        age_hours.max(0.0)
    };

    let time_factor = (1.0 - age / DECAY_HOURS).max(0.0);
    let velocity = total as f32 / age.max(1.0);
    let raw = velocity.min(VIRAL_VELOCITY);

    super::clamp_score(raw * time_factor)
}
