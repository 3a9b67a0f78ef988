//! Retrieval-augmented chat against the OpenAI chat-completions API.
//!
//! Conversation state lives in an explicit [`ChatSession`] owned by the
//! caller (the CLI holds one per `ask`, the server one behind a mutex) —
//! there is no ambient global history.

use anyhow::{bail, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;
use crate::embedding::Embedder;
use crate::models::RetrievalResult;
use crate::retrieve::search_chunks;
use crate::store::VectorStore;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// One conversation: the system prompt plus alternating user/assistant
/// turns, in API wire order.
#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(system_prompt: &str) -> Self {
        Self {
            messages: vec![ChatMessage::new("system", system_prompt)],
        }
    }

    /// Drop all turns, keeping only a fresh system prompt.
    pub fn reset(&mut self, system_prompt: &str) {
        self.messages.clear();
        self.messages.push(ChatMessage::new("system", system_prompt));
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::new("user", content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::new("assistant", content));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of turns excluding the system prompt.
    pub fn turn_count(&self) -> usize {
        self.messages.len().saturating_sub(1)
    }
}

/// The assistant's reply plus which documents informed it.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub sources_used: Vec<String>,
    pub timestamp: String,
}

/// Render retrieved chunks as a numbered context block, quoting up to
/// `snippet_chars` characters of each chunk. Returns `None` when there is
/// nothing to cite.
pub fn build_context(results: &[RetrievalResult], snippet_chars: usize) -> Option<String> {
    if results.is_empty() {
        return None;
    }

    let mut context = String::from("Based on the available documents, here's what I found:\n\n");
    for (i, result) in results.iter().enumerate() {
        let snippet: String = result.text.chars().take(snippet_chars).collect();
        let ellipsis = if result.text.chars().count() > snippet_chars {
            "..."
        } else {
            ""
        };
        context.push_str(&format!(
            "Source {} ({}):\n{}{}\n\n",
            i + 1,
            result.metadata.file_name,
            snippet,
            ellipsis
        ));
    }
    Some(context)
}

/// Prefix the user's question with the retrieved context block, if any.
pub fn augment_question(question: &str, context: Option<&str>) -> String {
    match context {
        Some(ctx) => format!(
            "Context from documents:\n{}\n\nUser question: {}",
            ctx, question
        ),
        None => question.to_string(),
    }
}

/// Distinct source file names in ranking order.
pub fn source_names(results: &[RetrievalResult]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for result in results {
        if !names.contains(&result.metadata.file_name) {
            names.push(result.metadata.file_name.clone());
        }
    }
    names
}

/// Answer one question: retrieve context, augment the prompt, call the
/// chat model, and record both turns in the session.
///
/// Empty retrieval results are not an error — the model is simply asked
/// without document context.
pub async fn ask(
    config: &Config,
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    session: &mut ChatSession,
    question: &str,
) -> Result<ChatReply> {
    let question = question.trim();
    if question.is_empty() {
        bail!("question must not be empty");
    }

    let results = search_chunks(embedder, store, question, config.retrieval.top_k).await;
    let context = build_context(&results, config.retrieval.context_snippet_chars);
    let augmented = augment_question(question, context.as_deref());

    session.push_user(augmented);

    let response = match complete_chat(config, session.messages()).await {
        Ok(r) => r,
        Err(e) => {
            // Keep the session consistent: a failed call leaves no
            // half-recorded turn behind.
            session.messages.pop();
            return Err(e);
        }
    };

    session.push_assistant(response.clone());

    Ok(ChatReply {
        response,
        sources_used: source_names(&results),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: String,
}

async fn complete_chat(config: &Config, messages: &[ChatMessage]) -> Result<String> {
    let api_key =
        std::env::var("OPENAI_API_KEY").map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.chat.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "model": config.chat.model,
        "messages": messages,
        "max_tokens": config.chat.max_tokens,
    });

    let response = client
        .post(OPENAI_CHAT_URL)
        .bearer_auth(&api_key)
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        bail!("OpenAI API error {}: {}", status, body_text);
    }

    let parsed: CompletionResponse = response.json().await?;
    parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| anyhow::anyhow!("Empty completion response"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;

    fn result(file_name: &str, text: &str, distance: f64) -> RetrievalResult {
        RetrievalResult {
            text: text.to_string(),
            metadata: ChunkMetadata {
                file_name: file_name.to_string(),
                chunk_index: 0,
                total_chunks: 1,
                file_type: "txt".to_string(),
                processed_date: "2024-01-01T00:00:00+00:00".to_string(),
            },
            distance,
        }
    }

    #[test]
    fn session_starts_with_system_prompt_only() {
        let session = ChatSession::new("be helpful");
        assert_eq!(session.turn_count(), 0);
        assert_eq!(session.messages()[0].role, "system");
    }

    #[test]
    fn reset_drops_turns() {
        let mut session = ChatSession::new("be helpful");
        session.push_user("hi");
        session.push_assistant("hello");
        assert_eq!(session.turn_count(), 2);

        session.reset("be helpful");
        assert_eq!(session.turn_count(), 0);
    }

    #[test]
    fn no_results_means_no_context() {
        assert!(build_context(&[], 300).is_none());
        assert_eq!(augment_question("what?", None), "what?");
    }

    #[test]
    fn context_cites_sources_in_rank_order() {
        let results = vec![
            result("a.pdf", "alpha text", 0.1),
            result("b.txt", "beta text", 0.2),
        ];
        let context = build_context(&results, 300).unwrap();
        assert!(context.contains("Source 1 (a.pdf):\nalpha text"));
        assert!(context.contains("Source 2 (b.txt):\nbeta text"));

        let augmented = augment_question("what?", Some(&context));
        assert!(augmented.starts_with("Context from documents:"));
        assert!(augmented.ends_with("User question: what?"));
    }

    #[test]
    fn long_snippets_are_truncated_char_safe() {
        let text = "é".repeat(400);
        let results = vec![result("a.txt", &text, 0.1)];
        let context = build_context(&results, 300).unwrap();
        assert!(context.contains(&format!("{}...", "é".repeat(300))));
    }

    #[test]
    fn source_names_dedup_in_order() {
        let results = vec![
            result("a.pdf", "x", 0.1),
            result("b.txt", "y", 0.2),
            result("a.pdf", "z", 0.3),
        ];
        assert_eq!(source_names(&results), vec!["a.pdf", "b.txt"]);
    }
}
