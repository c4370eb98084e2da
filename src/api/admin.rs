//! Admin API endpoints for managing questions, choices and users.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{success, ApiResult};
use crate::auth::hash_password;
use crate::errors::AppError;
use crate::models::{
    Choice, CreateChoiceRequest, CreateQuestionRequest, CreateUserRequest, QuestionWithChoices,
    UpdateQuestionRequest, User,
};
use crate::polls::{poll_state, was_published_recently, PollState};
use crate::AppState;

/// Maximum username length, in characters.
const MAX_USERNAME_LEN: usize = 150;

/// Maximum number of search results allowed.
const MAX_SEARCH_LIMIT: usize = 100;

/// A question as administrators see it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminQuestion {
    #[serde(flatten)]
    pub poll: QuestionWithChoices,
    pub state: PollState,
    pub was_published_recently: bool,
}

impl AdminQuestion {
    fn new(poll: QuestionWithChoices, now: DateTime<Utc>) -> Self {
        Self {
            state: poll_state(&poll.question, now),
            was_published_recently: was_published_recently(&poll.question, now),
            poll,
        }
    }
}

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    20
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    /// Matches across all pages.
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchResultItem {
    pub question: AdminQuestion,
    pub score: f32,
}

/// GET /admin/questions - Every question, newest first.
pub async fn list_questions(State(state): State<AppState>) -> ApiResult<Vec<AdminQuestion>> {
    let now = state.clock.now();
    let questions = state.repo.list_questions_with_choices().await?;
    success(
        questions
            .into_iter()
            .map(|q| AdminQuestion::new(q, now))
            .collect(),
    )
}

/// GET /admin/questions/{id} - A single question.
pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<AdminQuestion> {
    let poll = load_question(&state, id).await?;
    success(AdminQuestion::new(poll, state.clock.now()))
}

/// POST /admin/questions - Create a question with its initial choices.
pub async fn create_question(
    State(state): State<AppState>,
    Json(request): Json<CreateQuestionRequest>,
) -> ApiResult<AdminQuestion> {
    let request = request.validate()?;

    let poll = state.repo.create_question(&request).await?;
    tracing::info!(question_id = poll.question.id, "Question created");
    reindex(&state, &poll).await;

    success(AdminQuestion::new(poll, state.clock.now()))
}

/// PUT /admin/questions/{id} - Change text or publish window.
pub async fn update_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateQuestionRequest>,
) -> ApiResult<AdminQuestion> {
    let existing = state
        .repo
        .get_question(id)
        .await?
        .ok_or_else(|| question_not_found(id))?;

    let updated = request.apply(&existing)?;
    state.repo.update_question(&updated).await?;

    let poll = load_question(&state, id).await?;
    reindex(&state, &poll).await;

    success(AdminQuestion::new(poll, state.clock.now()))
}

/// DELETE /admin/questions/{id} - Delete a question with its choices and votes.
pub async fn delete_question(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    state.repo.delete_question(id).await?;
    tracing::info!(question_id = id, "Question deleted");

    if let Err(e) = state.search.remove_question(id).await {
        tracing::warn!("Failed to remove question from index: {}", e);
    }

    success(())
}

/// POST /admin/questions/{id}/choices - Add a choice.
pub async fn add_choice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<CreateChoiceRequest>,
) -> ApiResult<Choice> {
    request.validate()?;

    let choice = state.repo.add_choice(id, &request.text).await?;
    if let Ok(poll) = load_question(&state, id).await {
        reindex(&state, &poll).await;
    }

    success(choice)
}

/// DELETE /admin/choices/{id} - Remove a choice and the votes cast for it.
pub async fn delete_choice(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Choice> {
    let choice = state.repo.delete_choice(id).await?;
    if let Ok(poll) = load_question(&state, choice.question_id).await {
        reindex(&state, &poll).await;
    }

    success(choice)
}

/// POST /admin/users - Register a voter.
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<User> {
    let username = request.username.trim();
    if username.is_empty() {
        return Err(AppError::Validation("Username is required".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::Validation(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if request.password.is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }

    let password_hash = hash_password(&request.password)?;
    let user = state.repo.create_user(username, &password_hash).await?;
    tracing::info!(user = %user.username, "User created");

    success(user)
}

/// GET /admin/questions/search - Full-text search over questions and choices.
pub async fn search_questions(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<SearchResponse> {
    let limit = params.limit.min(MAX_SEARCH_LIMIT);
    let now = state.clock.now();

    let page = state.search.search(&params.q, limit, params.offset)?;
    let mut results = Vec::new();
    for hit in page.results {
        if let Some(poll) = state.repo.get_question_with_choices(hit.question_id).await? {
            results.push(SearchResultItem {
                question: AdminQuestion::new(poll, now),
                score: hit.score,
            });
        }
    }

    success(SearchResponse {
        results,
        total: page.total,
        limit,
        offset: params.offset,
    })
}

async fn load_question(state: &AppState, id: i64) -> Result<QuestionWithChoices, AppError> {
    state
        .repo
        .get_question_with_choices(id)
        .await?
        .ok_or_else(|| question_not_found(id))
}

async fn reindex(state: &AppState, poll: &QuestionWithChoices) {
    if let Err(e) = state.search.index_question(poll).await {
        tracing::warn!("Failed to index question {}: {}", poll.question.id, e);
    }
}

fn question_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Question {} not found", id))
}
