//! Vote model.

use serde::{Deserialize, Serialize};

/// One user's selection for one question.
///
/// There is at most one vote per (user, question); re-voting replaces `choice_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: i64,
    pub question_id: i64,
    pub choice_id: i64,
    pub user_id: i64,
}
