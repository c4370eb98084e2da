//! Question and choice models.

use chrono::{DateTime, Datelike, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::AppError;

/// Maximum length of question and choice text, in characters.
pub const MAX_TEXT_LEN: usize = 200;

/// Latest year a stored timestamp may carry.
pub const MAX_YEAR: i32 = 9999;

/// Fractional-second digits kept in storage.
const STORED_SUBSEC_DIGITS: u16 = 6;

/// A poll question with its publish window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,
    pub text: String,
    pub publish_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_at: Option<DateTime<Utc>>,
}

/// A selectable answer owned by exactly one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    /// Cached tally, recomputed from the votes table on every vote.
    pub votes: i64,
}

/// A question loaded together with its choices (ordered by id).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionWithChoices {
    #[serde(flatten)]
    pub question: Question,
    pub choices: Vec<Choice>,
}

impl QuestionWithChoices {
    /// Find one of this question's choices by id.
    pub fn choice(&self, choice_id: i64) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == choice_id)
    }
}

/// Request body for creating a new question.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    pub text: String,
    pub publish_at: DateTime<Utc>,
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
    /// Initial choice texts, created in order.
    #[serde(default)]
    pub choices: Vec<String>,
}

impl CreateQuestionRequest {
    /// Check the request and return it with timestamps at stored precision.
    pub fn validate(mut self) -> Result<Self, AppError> {
        validate_text("Question text", &self.text)?;
        (self.publish_at, self.end_at) = normalize_window(self.publish_at, self.end_at)?;
        for choice in &self.choices {
            validate_text("Choice text", choice)?;
        }
        Ok(self)
    }
}

/// Request body for updating an existing question.
///
/// `endAt: null` clears the end date; omitting it leaves it unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub publish_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub end_at: Option<Option<DateTime<Utc>>>,
}

impl UpdateQuestionRequest {
    /// Apply the changes to `existing`, validating the merged result.
    pub fn apply(&self, existing: &Question) -> Result<Question, AppError> {
        let text = self.text.clone().unwrap_or_else(|| existing.text.clone());
        let publish_at = self.publish_at.unwrap_or(existing.publish_at);
        let end_at = self.end_at.unwrap_or(existing.end_at);

        validate_text("Question text", &text)?;
        let (publish_at, end_at) = normalize_window(publish_at, end_at)?;

        Ok(Question {
            id: existing.id,
            text,
            publish_at,
            end_at,
        })
    }
}

/// Request body for adding a choice to a question.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChoiceRequest {
    pub text: String,
}

impl CreateChoiceRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_text("Choice text", &self.text)
    }
}

fn validate_text(field: &str, text: &str) -> Result<(), AppError> {
    if text.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, MAX_TEXT_LEN
        )));
    }
    Ok(())
}

/// Reject timestamps the store cannot hold and truncate the rest to stored precision.
pub fn normalize_timestamp(ts: DateTime<Utc>) -> Result<DateTime<Utc>, AppError> {
    if !(0..=MAX_YEAR).contains(&ts.year()) {
        return Err(AppError::Validation(format!(
            "Date {} is out of range (years 0 to {})",
            ts, MAX_YEAR
        )));
    }
    Ok(ts.trunc_subsecs(STORED_SUBSEC_DIGITS))
}

fn normalize_window(
    publish_at: DateTime<Utc>,
    end_at: Option<DateTime<Utc>>,
) -> Result<(DateTime<Utc>, Option<DateTime<Utc>>), AppError> {
    let publish_at = normalize_timestamp(publish_at)?;
    let end_at = end_at.map(normalize_timestamp).transpose()?;
    match end_at {
        Some(end) if end < publish_at => Err(AppError::Validation(
            "End date must not be before the publish date".to_string(),
        )),
        _ => Ok((publish_at, end_at)),
    }
}

fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}
