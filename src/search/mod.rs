//! Tantivy-based search index module.
//!
//! Full-text search over question text and choice text, used by the admin API.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{BooleanQuery, BoostQuery, Occur, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::QuestionWithChoices;

const BOOST_QUESTION: f32 = 10.0;
const BOOST_CHOICES: f32 = 4.0;

/// Search result with question id and relevance score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub question_id: i64,
    pub score: f32,
}

/// One page of hits plus the number of matches across all pages.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub results: Vec<SearchResult>,
    pub total: usize,
}

/// Search index schema fields.
struct SearchFields {
    question_id: Field,
    text: Field,
    choices: Field,
}

/// Tantivy search index for questions.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        let mut schema_builder = Schema::builder();
        // STRING so the id term can be deleted on re-index
        let question_id = schema_builder.add_text_field("question_id", STRING | STORED);
        let text = schema_builder.add_text_field("text", TEXT | STORED);
        let choices = schema_builder.add_text_field("choices", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            question_id,
            text,
            choices,
        };

        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema.clone()))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Rebuild the entire index from questions.
    pub async fn rebuild(&self, questions: &[QuestionWithChoices]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_all_documents()?;
        for question in questions {
            writer.add_document(self.create_document(question))?;
        }
        writer.commit()?;

        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} questions", questions.len());
        Ok(())
    }

    /// Index (or re-index) a single question.
    pub async fn index_question(&self, question: &QuestionWithChoices) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(self.id_term(question.question.id));
        writer.add_document(self.create_document(question))?;
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Remove a question from the index.
    pub async fn remove_question(&self, question_id: i64) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(self.id_term(question_id));
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Search for questions matching the query.
    pub fn search(
        &self,
        query_str: &str,
        limit: usize,
        offset: usize,
    ) -> Result<SearchPage, AppError> {
        if query_str.trim().is_empty() {
            return Ok(SearchPage::default());
        }

        let searcher = self.reader.searcher();

        let query_parser =
            QueryParser::for_index(&self.index, vec![self.fields.text, self.fields.choices]);
        let base_query = query_parser
            .parse_query(query_str)
            .map_err(|e| AppError::BadRequest(format!("Invalid search query: {}", e)))?;

        let mut subqueries: Vec<(Occur, Box<dyn tantivy::query::Query>)> = Vec::new();
        for (field, boost) in [
            (self.fields.text, BOOST_QUESTION),
            (self.fields.choices, BOOST_CHOICES),
        ] {
            let field_parser = QueryParser::for_index(&self.index, vec![field]);
            if let Ok(field_query) = field_parser.parse_query(query_str) {
                subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
            }
        }

        let combined_query = if subqueries.is_empty() {
            base_query
        } else {
            Box::new(BooleanQuery::new(subqueries))
        };

        // TopDocs panics on a zero limit
        let collector = (TopDocs::with_limit((limit + offset).max(1)), Count);
        let (top_docs, total) = searcher
            .search(&combined_query, &collector)
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let results = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let question_id = doc
                    .get_first(self.fields.question_id)?
                    .as_str()?
                    .parse()
                    .ok()?;
                Some(SearchResult { question_id, score })
            })
            .collect();

        Ok(SearchPage { results, total })
    }

    fn id_term(&self, question_id: i64) -> tantivy::Term {
        tantivy::Term::from_field_text(self.fields.question_id, &question_id.to_string())
    }

    fn create_document(&self, question: &QuestionWithChoices) -> TantivyDocument {
        let choices = question
            .choices
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        doc!(
            self.fields.question_id => question.question.id.to_string(),
            self.fields.text => question.question.text.clone(),
            self.fields.choices => choices
        )
    }
}
