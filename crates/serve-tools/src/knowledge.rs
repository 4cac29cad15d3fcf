//! Embedding-backed retrieval over course and class descriptions and client
//! notes.
//!
//! Availability is decided once at construction: the capability is either
//! `Ready` (config enabled and an API key resolved) or `Unavailable` with a
//! reason. An unavailable knowledge base never fails the process; searches
//! against it return a structured failure envelope the agent can relay.

use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_openai::Client;
use async_trait::async_trait;
use serde_json::{json, Value};
use serve_core::config::{KnowledgeConfig, ProviderConfig};
use serve_core::error::ServeError;
use serve_core::tool_registry::Tool;
use serve_data::Dataset;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// One searchable document with its provenance.
#[derive(Debug, Clone)]
struct CorpusEntry {
    kind: &'static str,
    name: String,
    text: String,
}

struct Ready {
    client: Client<OpenAIConfig>,
    model: String,
    top_k: usize,
    corpus: Vec<CorpusEntry>,
    /// Corpus embeddings, computed on first search.
    embeddings: OnceCell<Vec<Vec<f32>>>,
}

enum State {
    Ready(Ready),
    Unavailable { reason: String },
}

pub struct KnowledgeBase {
    state: State,
}

impl KnowledgeBase {
    pub fn new(config: &KnowledgeConfig, provider: &ProviderConfig, dataset: &Dataset) -> Self {
        if !config.enabled {
            return Self::unavailable("Knowledge search is disabled.");
        }
        let Some(api_key) = provider.resolve_api_key() else {
            return Self::unavailable("No API key configured for embeddings.");
        };

        let openai_config = OpenAIConfig::new()
            .with_api_base(&provider.api_base)
            .with_api_key(api_key);
        let corpus = build_corpus(dataset);
        info!(documents = corpus.len(), "Knowledge base ready");

        Self {
            state: State::Ready(Ready {
                client: Client::with_config(openai_config),
                model: config.embedding_model.clone(),
                top_k: config.top_k,
                corpus,
                embeddings: OnceCell::new(),
            }),
        }
    }

    fn unavailable(reason: &str) -> Self {
        info!(reason, "Knowledge base unavailable");
        Self {
            state: State::Unavailable {
                reason: reason.to_string(),
            },
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    /// Rank the corpus against the query and return the top matches as a
    /// JSON envelope. Unavailability is an envelope, not an error; provider
    /// faults during embedding propagate as `ServeError`.
    pub async fn search(&self, query: &str) -> Result<Value, ServeError> {
        let ready = match &self.state {
            State::Ready(ready) => ready,
            State::Unavailable { reason } => {
                return Ok(json!({ "success": false, "error": reason }));
            }
        };

        if ready.corpus.is_empty() {
            return Ok(json!({ "success": false, "error": "No knowledge data available." }));
        }

        let corpus_embeddings = ready
            .embeddings
            .get_or_try_init(|| async {
                let texts: Vec<String> =
                    ready.corpus.iter().map(|e| e.text.clone()).collect();
                debug!(count = texts.len(), "Embedding knowledge corpus");
                embed(ready, texts).await
            })
            .await?;

        let query_embedding = embed(ready, vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServeError::Provider("Empty embedding response".into()))?;

        let mut scored: Vec<(usize, f32)> = corpus_embeddings
            .iter()
            .enumerate()
            .map(|(i, emb)| (i, cosine_similarity(&query_embedding, emb)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(ready.top_k);

        let results: Vec<Value> = scored
            .into_iter()
            .map(|(i, score)| {
                let entry = &ready.corpus[i];
                json!({
                    "meta": { "type": entry.kind, "name": entry.name },
                    "text": entry.text,
                    "score": score,
                })
            })
            .collect();

        Ok(json!({ "success": true, "results": results }))
    }
}

fn build_corpus(dataset: &Dataset) -> Vec<CorpusEntry> {
    let mut corpus = Vec::new();
    for course in &dataset.courses {
        corpus.push(CorpusEntry {
            kind: "course",
            name: course.title.clone(),
            text: course.description.clone(),
        });
    }
    for class in &dataset.classes {
        corpus.push(CorpusEntry {
            kind: "class",
            name: class.title.clone(),
            text: class.description.clone(),
        });
    }
    for client in &dataset.clients {
        if let Some(notes) = &client.notes {
            corpus.push(CorpusEntry {
                kind: "client",
                name: client.name.clone(),
                text: notes.clone(),
            });
        }
    }
    corpus
}

async fn embed(ready: &Ready, texts: Vec<String>) -> Result<Vec<Vec<f32>>, ServeError> {
    let request = CreateEmbeddingRequestArgs::default()
        .model(&ready.model)
        .input(EmbeddingInput::StringArray(texts))
        .build()
        .map_err(|e| ServeError::Provider(e.to_string()))?;

    let response = ready
        .client
        .embeddings()
        .create(request)
        .await
        .map_err(|e| ServeError::Provider(e.to_string()))?;

    let mut data = response.data;
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Retrieval over the knowledge base, exposed to both agents.
pub struct KnowledgeSearchTool {
    base: Arc<KnowledgeBase>,
}

impl KnowledgeSearchTool {
    pub fn new(base: Arc<KnowledgeBase>) -> Self {
        Self { base }
    }
}

#[async_trait]
impl Tool for KnowledgeSearchTool {
    fn name(&self) -> &str {
        "knowledge_search"
    }

    fn description(&self) -> &str {
        "Retrieve relevant context from course descriptions, class descriptions, \
         and client notes for a given question."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to look up"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ServeError> {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| ServeError::ToolExecution {
                tool_name: "knowledge_search".into(),
                message: "Missing 'query' argument".into(),
            })?;
        let envelope = self.base.search(query).await?;
        Ok(envelope.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_bounds() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_corpus_covers_descriptions_and_notes() {
        let dataset = Dataset::fixture();
        let corpus = build_corpus(&dataset);
        let courses = corpus.iter().filter(|e| e.kind == "course").count();
        let classes = corpus.iter().filter(|e| e.kind == "class").count();
        let clients = corpus.iter().filter(|e| e.kind == "client").count();
        assert_eq!(courses, dataset.courses.len());
        assert_eq!(classes, dataset.classes.len());
        // Only clients with notes contribute.
        assert_eq!(
            clients,
            dataset.clients.iter().filter(|c| c.notes.is_some()).count()
        );
    }

    #[tokio::test]
    async fn test_disabled_capability_yields_structured_failure() {
        let config = KnowledgeConfig {
            enabled: false,
            ..Default::default()
        };
        let base = KnowledgeBase::new(&config, &ProviderConfig::default(), &Dataset::fixture());
        assert!(!base.is_available());

        let envelope = base.search("yoga classes").await.unwrap();
        assert_eq!(envelope["success"], false);
        assert_eq!(envelope["error"], "Knowledge search is disabled.");
    }

    #[tokio::test]
    async fn test_tool_wraps_unavailable_envelope() {
        let config = KnowledgeConfig {
            enabled: false,
            ..Default::default()
        };
        let base = Arc::new(KnowledgeBase::new(
            &config,
            &ProviderConfig::default(),
            &Dataset::fixture(),
        ));
        let tool = KnowledgeSearchTool::new(base);
        let out = tool.execute(json!({"query": "anything"})).await.unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["success"], false);

        let err = tool.execute(json!({})).await.unwrap_err();
        assert!(err.to_string().contains("Missing 'query' argument"));
    }
}
