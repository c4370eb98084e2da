//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::{decode_timestamp, encode_timestamp};
use crate::errors::AppError;
use crate::models::{Choice, CreateQuestionRequest, Question, QuestionWithChoices, User, Vote};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== QUESTION OPERATIONS ====================

    /// List questions published at or before `now`, newest first.
    pub async fn list_published_questions(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Question>, AppError> {
        let rows = sqlx::query(
            "SELECT id, text, publish_at, end_at FROM questions WHERE publish_at <= ? ORDER BY publish_at DESC, id DESC",
        )
        .bind(encode_timestamp(now))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(question_from_row).collect()
    }

    /// List every question regardless of its window, newest first.
    pub async fn list_questions(&self) -> Result<Vec<Question>, AppError> {
        let rows = sqlx::query(
            "SELECT id, text, publish_at, end_at FROM questions ORDER BY publish_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(question_from_row).collect()
    }

    /// Every question with its choices, newest first.
    pub async fn list_questions_with_choices(&self) -> Result<Vec<QuestionWithChoices>, AppError> {
        let mut result = Vec::new();
        for question in self.list_questions().await? {
            let choices = self.list_choices(question.id).await?;
            result.push(QuestionWithChoices { question, choices });
        }
        Ok(result)
    }

    /// Get a question by ID.
    pub async fn get_question(&self, id: i64) -> Result<Option<Question>, AppError> {
        let row = sqlx::query("SELECT id, text, publish_at, end_at FROM questions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(question_from_row).transpose()
    }

    /// Get a question together with its choices.
    pub async fn get_question_with_choices(
        &self,
        id: i64,
    ) -> Result<Option<QuestionWithChoices>, AppError> {
        let Some(question) = self.get_question(id).await? else {
            return Ok(None);
        };
        let choices = self.list_choices(id).await?;
        Ok(Some(QuestionWithChoices { question, choices }))
    }

    /// Create a question and its initial choices in one transaction.
    ///
    /// `request` must come from [`CreateQuestionRequest::validate`], so its
    /// timestamps already sit at stored precision.
    pub async fn create_question(
        &self,
        request: &CreateQuestionRequest,
    ) -> Result<QuestionWithChoices, AppError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query("INSERT INTO questions (text, publish_at, end_at) VALUES (?, ?, ?)")
            .bind(&request.text)
            .bind(encode_timestamp(request.publish_at))
            .bind(request.end_at.map(encode_timestamp))
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        let mut choices = Vec::with_capacity(request.choices.len());
        for text in &request.choices {
            let choice_id =
                sqlx::query("INSERT INTO choices (question_id, text, votes) VALUES (?, ?, 0)")
                    .bind(id)
                    .bind(text)
                    .execute(&mut *tx)
                    .await?
                    .last_insert_rowid();
            choices.push(Choice {
                id: choice_id,
                question_id: id,
                text: text.clone(),
                votes: 0,
            });
        }

        tx.commit().await?;

        Ok(QuestionWithChoices {
            question: Question {
                id,
                text: request.text.clone(),
                publish_at: request.publish_at,
                end_at: request.end_at,
            },
            choices,
        })
    }

    /// Overwrite a question's text and window.
    pub async fn update_question(&self, question: &Question) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE questions SET text = ?, publish_at = ?, end_at = ? WHERE id = ?")
                .bind(&question.text)
                .bind(encode_timestamp(question.publish_at))
                .bind(question.end_at.map(encode_timestamp))
                .bind(question.id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Question {} not found",
                question.id
            )));
        }
        Ok(())
    }

    /// Delete a question; its choices and votes go with it.
    pub async fn delete_question(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Question {} not found", id)));
        }
        Ok(())
    }

    // ==================== CHOICE OPERATIONS ====================

    /// List a question's choices in creation order.
    pub async fn list_choices(&self, question_id: i64) -> Result<Vec<Choice>, AppError> {
        let rows = sqlx::query(
            "SELECT id, question_id, text, votes FROM choices WHERE question_id = ? ORDER BY id",
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(choice_from_row).collect())
    }

    /// Add a choice to an existing question.
    pub async fn add_choice(&self, question_id: i64, text: &str) -> Result<Choice, AppError> {
        if self.get_question(question_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Question {} not found",
                question_id
            )));
        }

        let id = sqlx::query("INSERT INTO choices (question_id, text, votes) VALUES (?, ?, 0)")
            .bind(question_id)
            .bind(text)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        Ok(Choice {
            id,
            question_id,
            text: text.to_string(),
            votes: 0,
        })
    }

    /// Delete a choice and the votes cast for it, returning the removed choice.
    pub async fn delete_choice(&self, id: i64) -> Result<Choice, AppError> {
        let row = sqlx::query(
            "DELETE FROM choices WHERE id = ? RETURNING id, question_id, text, votes",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(choice_from_row)
            .ok_or_else(|| AppError::NotFound(format!("Choice {} not found", id)))
    }

    // ==================== VOTE OPERATIONS ====================

    /// Record `user_id`'s vote on a question and refresh every choice tally.
    ///
    /// The upsert and the recount share one transaction. Its first statement is a
    /// write, so concurrent voters queue on the SQLite write lock instead of
    /// recounting against a half-applied vote set.
    pub async fn record_vote(
        &self,
        question_id: i64,
        choice_id: i64,
        user_id: i64,
    ) -> Result<Vote, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"INSERT INTO votes (question_id, choice_id, user_id) VALUES (?, ?, ?)
               ON CONFLICT (user_id, question_id) DO UPDATE SET choice_id = excluded.choice_id
               RETURNING id, question_id, choice_id, user_id"#,
        )
        .bind(question_id)
        .bind(choice_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        let vote = vote_from_row(&row);

        sqlx::query(
            r#"UPDATE choices
               SET votes = (SELECT COUNT(*) FROM votes WHERE votes.choice_id = choices.id)
               WHERE question_id = ?"#,
        )
        .bind(question_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(vote)
    }

    /// The user's current vote on a question, if any.
    pub async fn get_vote(&self, user_id: i64, question_id: i64) -> Result<Option<Vote>, AppError> {
        let row = sqlx::query(
            "SELECT id, question_id, choice_id, user_id FROM votes WHERE user_id = ? AND question_id = ?",
        )
        .bind(user_id)
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(vote_from_row))
    }

    /// Number of vote rows for a question.
    pub async fn count_votes(&self, question_id: i64) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM votes WHERE question_id = ?")
            .bind(question_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("total"))
    }

    // ==================== ACCOUNT OPERATIONS ====================

    /// Create a user with an already-hashed password.
    pub async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, AppError> {
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)",
        )
        .bind(username)
        .bind(password_hash)
        .bind(encode_timestamp(now))
        .execute(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => {
                AppError::Conflict(format!("Username {} is already taken", username))
            }
            other => other,
        })?
        .last_insert_rowid();

        Ok(User {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
        })
    }

    /// Look up a user by username.
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Open a session for a user at `now` and return its bearer token.
    pub async fn create_session(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let token = uuid::Uuid::new_v4().simple().to_string();
        sqlx::query("INSERT INTO sessions (token, user_id, created_at) VALUES (?, ?, ?)")
            .bind(&token)
            .bind(user_id)
            .bind(encode_timestamp(now))
            .execute(&self.pool)
            .await?;
        Ok(token)
    }

    /// Resolve a session token to its user. Sessions opened at or before
    /// `issued_after` have expired and resolve to nobody.
    pub async fn get_session_user(
        &self,
        token: &str,
        issued_after: DateTime<Utc>,
    ) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            r#"SELECT u.id, u.username, u.password_hash, u.created_at
               FROM sessions s JOIN users u ON u.id = s.user_id
               WHERE s.token = ? AND s.created_at > ?"#,
        )
        .bind(token)
        .bind(encode_timestamp(issued_after))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Drop sessions opened at or before `issued_before`. Returns how many went.
    pub async fn delete_expired_sessions(
        &self,
        issued_before: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE created_at <= ?")
            .bind(encode_timestamp(issued_before))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Close a session. Returns false if it did not exist.
    pub async fn delete_session(&self, token: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// Helper functions for row conversion

fn question_from_row(row: &SqliteRow) -> Result<Question, AppError> {
    let publish_at: String = row.get("publish_at");
    let end_at: Option<String> = row.get("end_at");
    Ok(Question {
        id: row.get("id"),
        text: row.get("text"),
        publish_at: decode_timestamp(&publish_at)?,
        end_at: end_at.as_deref().map(decode_timestamp).transpose()?,
    })
}

fn choice_from_row(row: &SqliteRow) -> Choice {
    Choice {
        id: row.get("id"),
        question_id: row.get("question_id"),
        text: row.get("text"),
        votes: row.get("votes"),
    }
}

fn vote_from_row(row: &SqliteRow) -> Vote {
    Vote {
        id: row.get("id"),
        question_id: row.get("question_id"),
        choice_id: row.get("choice_id"),
        user_id: row.get("user_id"),
    }
}

fn user_from_row(row: &SqliteRow) -> Result<User, AppError> {
    let created_at: String = row.get("created_at");
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        created_at: decode_timestamp(&created_at)?,
    })
}
