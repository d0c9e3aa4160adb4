//! Answering client: retrieve top-K records for a question and ask a
//! language model to answer from them.
//!
//! The prompt strategy is deliberately external data, an [`AnswerPolicy`]
//! chosen by the caller, because no single strategy fits every deployment:
//! support surfaces want strict context-only answers, internal tools may
//! prefer inferential synthesis.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// One retrieved record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
}

/// How the model is instructed to use the retrieved context.
pub trait AnswerPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// The system prompt, given the site name and the retrieved hits.
    fn system_prompt(&self, site_name: &str, hits: &[SearchHit]) -> String;

    /// The canned reply when retrieval found nothing relevant.
    fn empty_answer(&self, site_name: &str) -> String {
        format!(
            "The information you requested was not found in the current {site_name} content."
        )
    }
}

fn context_block(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| {
            format!(
                "- Title: {}\n  URL: {}\n  Content: {}\n",
                h.title, h.url, h.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Answer strictly from the retrieved context, citing source URLs, and say
/// so when the context has no answer.
pub struct StrictContext;

impl AnswerPolicy for StrictContext {
    fn name(&self) -> &'static str {
        "strict-context"
    }

    fn system_prompt(&self, site_name: &str, hits: &[SearchHit]) -> String {
        format!(
            "You are an AI assistant for {site_name}. Answer user questions using only \
             the information from the context below. Each context entry includes a title \
             and a URL. When referencing a specific answer, always cite the corresponding \
             URL from the context. If you cannot find the answer in the context, reply: \
             '{}'\n\nContext:\n{}\n\
             Be concise, accurate, and reference the original content where appropriate.",
            self.empty_answer(site_name),
            context_block(hits)
        )
    }
}

/// Ground answers in the context but allow reasonable synthesis across
/// entries; still cites URLs and admits gaps.
pub struct Inferential;

impl AnswerPolicy for Inferential {
    fn name(&self) -> &'static str {
        "inferential"
    }

    fn system_prompt(&self, site_name: &str, hits: &[SearchHit]) -> String {
        format!(
            "You are an AI assistant for {site_name}. Ground your answer in the context \
             below, citing the URL of every entry you draw on. You may combine and infer \
             across entries, but state explicitly when the context does not cover part of \
             the question.\n\nContext:\n{}",
            context_block(hits)
        )
    }
}

/// A synthesized answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    question: &'a str,
    top_k: usize,
    namespace: &'a str,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Vec<SearchHit>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Client for the retrieval + answering collaborators.
pub struct AnswerClient {
    client: reqwest::Client,
    search_url: String,
    search_api_key: Option<String>,
    llm_url: String,
    llm_api_key: Option<String>,
    model: String,
    namespace: String,
    top_k: usize,
    site_name: String,
    policy: Box<dyn AnswerPolicy>,
}

impl AnswerClient {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        search_url: String,
        search_api_key: Option<String>,
        llm_url: String,
        llm_api_key: Option<String>,
        model: String,
        namespace: String,
        top_k: usize,
        site_name: String,
        policy: Box<dyn AnswerPolicy>,
    ) -> Result<Self> {
        anyhow::ensure!(
            search_url.starts_with("http://") || search_url.starts_with("https://"),
            "search endpoint must be an http(s) URL"
        );
        anyhow::ensure!(
            llm_url.starts_with("http://") || llm_url.starts_with("https://"),
            "LLM endpoint must be an http(s) URL"
        );
        anyhow::ensure!(top_k >= 1, "top_k must be at least 1");

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build answer HTTP client")?;

        Ok(Self {
            client,
            search_url,
            search_api_key,
            llm_url,
            llm_api_key,
            model,
            namespace,
            top_k,
            site_name,
            policy,
        })
    }

    /// Retrieve matching records and synthesize an answer.
    ///
    /// Zero hits short-circuit to the policy's not-found reply; the model
    /// is never asked to answer from an empty context.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let hits = self.search(question).await?;
        info!(hits = hits.len(), policy = self.policy.name(), "retrieval complete");

        if hits.is_empty() {
            return Ok(Answer {
                answer: self.policy.empty_answer(&self.site_name),
            });
        }

        let system = self.policy.system_prompt(&self.site_name, &hits);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: question,
                },
            ],
            temperature: 0.3,
            max_tokens: 512,
        };

        let mut req = self.client.post(&self.llm_url).json(&request);
        if let Some(key) = &self.llm_api_key {
            req = req.bearer_auth(key);
        }
        let response: ChatResponse = req
            .send()
            .await
            .context("LLM request failed")?
            .error_for_status()
            .context("LLM request rejected")?
            .json()
            .await
            .context("failed to parse LLM response")?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .context("LLM response had no choices")?;

        Ok(Answer { answer })
    }

    async fn search(&self, question: &str) -> Result<Vec<SearchHit>> {
        let request = SearchRequest {
            question,
            top_k: self.top_k,
            namespace: &self.namespace,
        };
        let mut req = self.client.post(&self.search_url).json(&request);
        if let Some(key) = &self.search_api_key {
            req = req.header("api-key", key);
        }
        let response: SearchResponse = req
            .send()
            .await
            .context("search request failed")?
            .error_for_status()
            .context("search request rejected")?
            .json()
            .await
            .context("failed to parse search response")?;
        Ok(response.hits)
    }
}
