//! A small in-memory document index for retrieval-augmented test runs.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AssistantsApi, Error, OpenAiError, Result};

/// How many of the latest user messages form the search query.
pub const RETRIEVAL_WINDOW: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit<'a> {
    pub document: &'a KnowledgeDocument,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct KnowledgeIndex {
    model: String,
    documents: Vec<KnowledgeDocument>,
    vectors: Vec<Vec<f32>>,
}

impl KnowledgeIndex {
    /// Reads a JSON array of `{ "title", "content" }` documents.
    pub fn load_documents(path: &Path) -> Result<Vec<KnowledgeDocument>> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn from_parts(
        model: impl Into<String>,
        documents: Vec<KnowledgeDocument>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self> {
        if documents.len() != vectors.len() {
            return Err(Error::Config(format!(
                "{} documents but {} embeddings",
                documents.len(),
                vectors.len()
            )));
        }
        Ok(KnowledgeIndex {
            model: model.into(),
            documents,
            vectors,
        })
    }

    /// Embeds every document with `model`.
    pub async fn build<A>(api: &A, model: &str, documents: Vec<KnowledgeDocument>) -> Result<Self>
    where
        A: AssistantsApi + ?Sized,
    {
        let inputs: Vec<String> = documents.iter().map(KnowledgeDocument::embedding_input).collect();
        let vectors = api.create_embeddings(model, &inputs).await?;
        info!(documents = documents.len(), model, "knowledge index built");
        Self::from_parts(model, documents, vectors)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The `k` documents most similar to `query`, best first.
    pub fn nearest(&self, query: &[f32], k: usize) -> Vec<Hit<'_>> {
        let mut hits: Vec<Hit<'_>> = self
            .documents
            .iter()
            .zip(&self.vectors)
            .map(|(document, vector)| Hit {
                document,
                score: cosine_similarity(query, vector),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        hits
    }

    pub async fn search<A>(&self, api: &A, query: &str, k: usize) -> Result<Vec<Hit<'_>>>
    where
        A: AssistantsApi + ?Sized,
    {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let mut vectors = api
            .create_embeddings(&self.model, &[query.to_string()])
            .await?;
        let vector = vectors.pop().ok_or_else(|| {
            OpenAiError::new(
                "no embedding returned for query".to_string(),
                "invalid_response".to_string(),
            )
        })?;
        Ok(self.nearest(&vector, k))
    }
}

impl KnowledgeDocument {
    fn embedding_input(&self) -> String {
        match &self.title {
            Some(title) => format!("{title}\n{}", self.content),
            None => self.content.clone(),
        }
    }
}

/// 0.0 when either vector is zero or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// The last `window` user messages, oldest first, one per line.
pub fn retrieval_query(history: &[String], window: usize) -> String {
    let start = history.len().saturating_sub(window);
    history[start..].join("\n")
}

/// Extra run instructions quoting the retrieved documents.
pub fn render_instructions(hits: &[Hit<'_>]) -> Option<String> {
    if hits.is_empty() {
        return None;
    }
    let mut instructions = String::from("回答时请优先参考以下资料：\n");
    for (i, hit) in hits.iter().enumerate() {
        match &hit.document.title {
            Some(title) => instructions.push_str(&format!("\n[{}] {title}\n", i + 1)),
            None => instructions.push_str(&format!("\n[{}]\n", i + 1)),
        }
        instructions.push_str(&hit.document.content);
        instructions.push('\n');
    }
    Some(instructions)
}
