//! Public poll views: listing, detail, results and vote submission.
//!
//! Failures a voter can cause are never surfaced as faults: a missing or closed
//! poll redirects to the listing with a message, and a bad selection re-renders
//! the detail view with an inline error.

use axum::{
    extract::{rejection::FormRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{success, ApiResult};
use crate::auth::{AuthUser, MaybeSession};
use crate::errors::{codes, AppError, ErrorResponse};
use crate::models::{Choice, Question, QuestionWithChoices, Vote};
use crate::polls::{can_vote, cast_vote, is_published, open_question, PollError};
use crate::AppState;

pub const MSG_NO_POLLS: &str = "No polls are available.";

/// Path of the poll listing.
pub const INDEX_PATH: &str = "/polls/";

/// Query parameters accepted by the listing.
#[derive(Debug, Deserialize)]
pub struct IndexParams {
    /// Message carried over from a redirect.
    #[serde(default)]
    pub error: Option<String>,
}

/// Listing view.
#[derive(Debug, Serialize)]
pub struct QuestionListing {
    pub questions: Vec<QuestionSummary>,
    pub messages: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSummary {
    pub id: i64,
    pub text: String,
    pub publish_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_at: Option<DateTime<Utc>>,
    pub can_vote: bool,
}

/// Detail view. Tallies only appear on the results page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDetail {
    #[serde(flatten)]
    pub question: Question,
    pub choices: Vec<ChoiceOption>,
    /// The current voter's existing selection, if any.
    pub selected_choice_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ChoiceOption {
    pub id: i64,
    pub text: String,
}

impl QuestionDetail {
    fn new(poll: QuestionWithChoices, selected_choice_id: Option<i64>) -> Self {
        Self {
            question: poll.question,
            choices: poll
                .choices
                .into_iter()
                .map(|c| ChoiceOption {
                    id: c.id,
                    text: c.text,
                })
                .collect(),
            selected_choice_id,
        }
    }
}

/// Results view.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResults {
    #[serde(flatten)]
    pub question: Question,
    pub choices: Vec<Choice>,
    pub total_votes: i64,
}

/// Vote form body.
#[derive(Debug, Deserialize)]
pub struct VoteForm {
    #[serde(default)]
    pub choice: Option<String>,
}

/// GET / - Redirect to the poll listing.
pub async fn root() -> Redirect {
    Redirect::to(INDEX_PATH)
}

/// GET /polls/ - Published questions, newest first.
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<IndexParams>,
) -> ApiResult<QuestionListing> {
    let now = state.clock.now();
    let questions: Vec<QuestionSummary> = state
        .repo
        .list_published_questions(now)
        .await?
        .into_iter()
        .map(|q| QuestionSummary {
            can_vote: can_vote(&q, now),
            id: q.id,
            text: q.text,
            publish_at: q.publish_at,
            end_at: q.end_at,
        })
        .collect();

    let mut messages: Vec<String> = params.error.into_iter().collect();
    if questions.is_empty() {
        messages.push(MSG_NO_POLLS.to_string());
    }

    success(QuestionListing {
        questions,
        messages,
    })
}

/// GET /polls/{id}/ - A votable question and its choices.
pub async fn detail(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Path(id): Path<i64>,
) -> Response {
    let poll = match open_question(&state.repo, id, state.clock.now()).await {
        Ok(poll) => poll,
        Err(err) => return poll_error_response(err),
    };

    let selected = match session {
        Some(session) => match state.repo.get_vote(session.user.id, id).await {
            Ok(vote) => vote.map(|v| v.choice_id),
            Err(e) => return e.into_response(),
        },
        None => None,
    };

    success(QuestionDetail::new(poll, selected)).into_response()
}

/// GET /polls/{id}/results/ - Current tallies.
pub async fn results(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<QuestionResults> {
    let poll = state
        .repo
        .get_question_with_choices(id)
        .await?
        .filter(|poll| is_published(&poll.question, state.clock.now()))
        .ok_or_else(|| AppError::NotFound(format!("Question {} not found", id)))?;

    let total_votes = state.repo.count_votes(id).await?;

    success(QuestionResults {
        question: poll.question,
        choices: poll.choices,
        total_votes,
    })
}

/// POST /polls/{id}/vote/ - Record the voter's choice and show the results.
pub async fn vote(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    form: Result<Form<VoteForm>, FormRejection>,
) -> Response {
    let raw_choice = form.ok().and_then(|Form(form)| form.choice);

    match cast_vote(
        &state.repo,
        id,
        raw_choice.as_deref(),
        &user,
        state.clock.now(),
    )
    .await
    {
        Ok(_) => Redirect::to(&format!("/polls/{}/results/", id)).into_response(),
        Err(err @ PollError::NoChoiceSelected(_)) => {
            // Keep the page usable: show the previous selection alongside the error.
            let selected = previous_choice(id, state.repo.get_vote(user.id, id).await);
            no_choice_response(err, selected)
        }
        Err(err) => poll_error_response(err),
    }
}

/// The voter's earlier selection, for re-rendering the form. Lookup failures are
/// logged and treated as no selection.
fn previous_choice(question_id: i64, vote: Result<Option<Vote>, AppError>) -> Option<i64> {
    match vote {
        Ok(vote) => vote.map(|v| v.choice_id),
        Err(e) => {
            tracing::warn!(question_id, "Failed to load previous vote: {}", e);
            None
        }
    }
}

fn poll_error_response(err: PollError) -> Response {
    match err {
        PollError::NotFound(_) | PollError::VotingClosed(_) => redirect_to_index(&err.user_message()),
        PollError::NoChoiceSelected(_) => no_choice_response(err, None),
        PollError::Store(e) => e.into_response(),
    }
}

fn no_choice_response(err: PollError, selected_choice_id: Option<i64>) -> Response {
    let message = err.user_message();
    let PollError::NoChoiceSelected(poll) = err else {
        return poll_error_response(err);
    };

    let mut body = ErrorResponse::new(codes::NO_CHOICE_SELECTED, message);
    match serde_json::to_value(QuestionDetail::new(poll, selected_choice_id)) {
        Ok(detail) => body = body.with_details(detail),
        Err(e) => return AppError::from(e).into_response(),
    }
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

fn redirect_to_index(message: &str) -> Response {
    let target = format!("{}?error={}", INDEX_PATH, urlencoding::encode(message));
    Redirect::to(&target).into_response()
}
