//! Conversation state machine and chat model client.
//!
//! The orchestrator has two states: awaiting input and generating. On user
//! input it retrieves context chunks, assembles a prompt from system
//! instructions + retrieved chunks + a trailing window of the conversation +
//! the new message, and calls the chat model. A failed model call leaves the
//! conversation exactly as it was; only a successful exchange is appended.
//!
//! Conversation history lives in process memory and is discarded when the
//! session ends.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::RetrievedChunk;
use crate::retrieve::Retriever;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const CHAT_MODEL: &str = "gpt-4o";
const TIMEOUT_SECS: u64 = 60;

/// Trailing window of conversation messages included in each prompt.
const HISTORY_WINDOW: usize = 10;

const SYSTEM_PROMPT: &str = "You are a helpful assistant answering questions about a personal \
knowledge base of wiki pages and local notes. Answer using the context excerpts below. If the \
context does not contain the answer, say so instead of guessing. Cite the source of an excerpt \
when it backs your answer.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    AwaitingInput,
    Generating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Ordered (role, message) history for one chat session.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(Message::new(role, content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The trailing `n` messages.
    pub fn window(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Trait for chat completion backends.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String>;
}

/// Chat model backed by the OpenAI chat-completions API.
pub struct OpenAiChatModel {
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiChatModel {
    pub fn new(api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Model(e.to_string()))?;

        Ok(Self {
            api_key: api_key.to_string(),
            client,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let body = serde_json::json!({
            "model": CHAT_MODEL,
            "temperature": 0,
            "messages": messages
                .iter()
                .map(|m| serde_json::json!({ "role": m.role.as_str(), "content": m.content }))
                .collect::<Vec<_>>(),
        });

        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Model(format!("chat API request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::Model(format!(
                "chat API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Model(e.to_string()))?;

        json.get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| Error::Model("chat API returned no message content".to_string()))
    }
}

/// Assemble the prompt sent to the chat model.
///
/// Order: system instructions with context excerpts, trailing history
/// window, then the new user message.
pub fn assemble_prompt(
    context: &[RetrievedChunk],
    history: &[Message],
    input: &str,
) -> Vec<Message> {
    let mut system = String::from(SYSTEM_PROMPT);
    if context.is_empty() {
        system.push_str("\n\nNo context excerpts were found for this question.");
    } else {
        system.push_str("\n\nContext excerpts:");
        for chunk in context {
            system.push_str(&format!("\n\n[source: {}]\n{}", chunk.document_key, chunk.text));
        }
    }

    let mut messages = vec![Message::new(Role::System, system)];
    messages.extend(history.iter().cloned());
    messages.push(Message::new(Role::User, input));
    messages
}

/// The chat orchestrator: retriever + model + conversation + state.
pub struct ChatEngine {
    retriever: Retriever,
    model: Box<dyn ChatModel>,
    conversation: Conversation,
    state: ChatState,
}

impl ChatEngine {
    pub fn new(retriever: Retriever, model: Box<dyn ChatModel>) -> Self {
        Self {
            retriever,
            model,
            conversation: Conversation::default(),
            state: ChatState::AwaitingInput,
        }
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Process one user message and return the model's answer.
    ///
    /// On failure the conversation is left unchanged; no partial turn is
    /// ever appended.
    pub async fn respond(&mut self, input: &str) -> Result<String> {
        self.state = ChatState::Generating;
        let result = self.generate(input).await;
        self.state = ChatState::AwaitingInput;

        let answer = result?;
        self.conversation.push(Role::User, input);
        self.conversation.push(Role::Assistant, answer.clone());
        Ok(answer)
    }

    async fn generate(&self, input: &str) -> Result<String> {
        let context = self.retriever.retrieve(input).await?;
        let prompt = assemble_prompt(&context, self.conversation.window(HISTORY_WINDOW), input);
        self.model.complete(&prompt).await
    }

    /// Append an exchange that was produced outside the model (e.g. the
    /// in-chat reindex command), keeping the history consistent.
    pub fn record_exchange(&mut self, user: &str, assistant: &str) {
        self.conversation.push(Role::User, user);
        self.conversation.push(Role::Assistant, assistant);
    }
}
