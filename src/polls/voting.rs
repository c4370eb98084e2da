//! Vote submission workflow.

use chrono::{DateTime, Utc};

use super::eligibility::can_vote;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{QuestionWithChoices, User, Vote};

pub const MSG_POLL_MISSING: &str = "Poll does not exist.";
pub const MSG_POLL_CLOSED: &str = "You can't vote on this poll because this poll is already ended.";
pub const MSG_NO_CHOICE: &str = "You didn't select a choice.";

/// Why a poll could not be shown for voting or a vote could not be recorded.
#[derive(Debug)]
pub enum PollError {
    /// No question with this id.
    NotFound(i64),
    /// The question exists but is outside its votable window.
    VotingClosed(i64),
    /// The `choice` field was missing, unparsable, or not one of the question's choices.
    NoChoiceSelected(QuestionWithChoices),
    /// Storage failure.
    Store(AppError),
}

impl PollError {
    /// Message shown to the voter.
    pub fn user_message(&self) -> String {
        match self {
            PollError::NotFound(_) => MSG_POLL_MISSING.to_string(),
            PollError::VotingClosed(_) => MSG_POLL_CLOSED.to_string(),
            PollError::NoChoiceSelected(_) => MSG_NO_CHOICE.to_string(),
            PollError::Store(err) => err.message(),
        }
    }
}

impl From<AppError> for PollError {
    fn from(err: AppError) -> Self {
        PollError::Store(err)
    }
}

/// Load a question and require that it is open for voting at `now`.
pub async fn open_question(
    repo: &Repository,
    question_id: i64,
    now: DateTime<Utc>,
) -> Result<QuestionWithChoices, PollError> {
    let question = repo
        .get_question_with_choices(question_id)
        .await?
        .ok_or(PollError::NotFound(question_id))?;

    if !can_vote(&question.question, now) {
        return Err(PollError::VotingClosed(question_id));
    }
    Ok(question)
}

/// Record `user`'s vote for the submitted choice.
///
/// `raw_choice` is the untrusted form value. A user may change their vote any
/// number of times while the window is open; each call replaces the previous one.
pub async fn cast_vote(
    repo: &Repository,
    question_id: i64,
    raw_choice: Option<&str>,
    user: &User,
    now: DateTime<Utc>,
) -> Result<Vote, PollError> {
    let question = open_question(repo, question_id, now).await?;

    let selected = raw_choice
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .and_then(|id| question.choice(id))
        .map(|choice| choice.id);
    let Some(choice_id) = selected else {
        return Err(PollError::NoChoiceSelected(question));
    };

    let vote = repo.record_vote(question_id, choice_id, user.id).await?;

    tracing::info!(
        user = %user.username,
        question_id,
        choice_id,
        "Vote recorded"
    );

    Ok(vote)
}
