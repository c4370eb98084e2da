//! Publish and voting window rules.
//!
//! All predicates are pure: the caller passes `now`, usually from [`crate::clock::Clock`].

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::Question;

/// Where a question sits in its lifecycle. Transitions only move forward in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollState {
    Unpublished,
    Open,
    Closed,
}

/// True once `publish_at` has been reached.
pub fn is_published(question: &Question, now: DateTime<Utc>) -> bool {
    question.publish_at <= now
}

/// True inside the votable window: published, and `end_at` (inclusive) not yet passed.
pub fn can_vote(question: &Question, now: DateTime<Utc>) -> bool {
    is_published(question, now) && question.end_at.map_or(true, |end| now <= end)
}

/// True when published within the last day, both ends inclusive.
pub fn was_published_recently(question: &Question, now: DateTime<Utc>) -> bool {
    now - Duration::days(1) <= question.publish_at && question.publish_at <= now
}

pub fn poll_state(question: &Question, now: DateTime<Utc>) -> PollState {
    if !is_published(question, now) {
        PollState::Unpublished
    } else if can_vote(question, now) {
        PollState::Open
    } else {
        PollState::Closed
    }
}
