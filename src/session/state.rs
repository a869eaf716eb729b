//! Session state for one user of the chat client
//!
//! The session is the single owner of everything that changes while a
//! question is answered:
//! - **Answer**: the accumulated text and the document derived from it
//! - **Request**: loading flag, generation counter, last error
//! - **Preferences**: role, API key, remembered context
//!
//! Every mutation goes through a method on [`Session`]; tokens carry the
//! [`Generation`] they were requested under and are dropped when it is no
//! longer current.

use crate::llm::request::ChatRequest;
use crate::render::Document;
use crate::session::context::ConversationContext;
use crate::stream::Accumulator;
use crate::{ParleyError, Result};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Tag identifying which question an in-flight stream belongs to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(&self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Request lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RequestState {
    /// Ready for a new question
    #[default]
    Ready,
    /// Waiting for, or receiving, an answer
    Streaming,
}

impl RequestState {
    pub fn is_streaming(&self) -> bool {
        matches!(self, RequestState::Streaming)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, RequestState::Ready)
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestState::Ready => write!(f, "Ready"),
            RequestState::Streaming => write!(f, "Streaming"),
        }
    }
}

/// A question accepted by [`Session::submit`], ready to be sent
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedQuestion {
    pub generation: Generation,
    /// The trimmed question as asked
    pub question: String,
    pub request: ChatRequest,
}

/// Explicit state record for the chat client
#[derive(Clone, Debug)]
pub struct Session {
    role: String,
    api_key: Option<String>,
    context: ConversationContext,
    answer: Accumulator,
    document: Document,
    state: RequestState,
    generation: Generation,
    /// Question being answered under the current generation
    active_question: Option<String>,
    last_question: Option<String>,
    error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(crate::llm::roles::DEFAULT_ROLE)
    }
}

impl Session {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            api_key: None,
            context: ConversationContext::default(),
            answer: Accumulator::new(),
            document: Document::default(),
            state: RequestState::Ready,
            generation: Generation::default(),
            active_question: None,
            last_question: None,
            error: None,
        }
    }

    /// Build a session from client configuration
    pub fn from_config(config: &crate::llm::ClientConfig) -> Self {
        let mut session = Self::new(config.default_role.clone());
        session.api_key = config.api_key.clone();
        session.context.set_enabled(config.remember_context);
        session
    }

    // === Question lifecycle ===

    /// Accept a finalized question and prepare its request
    ///
    /// A blank question only sets the user-facing error. Anything else starts
    /// a new generation, which supersedes a stream still in flight.
    pub fn submit(&mut self, question: &str) -> Result<PreparedQuestion> {
        let question = question.trim();
        if question.is_empty() {
            self.error = Some(ParleyError::EmptyInput.user_message());
            return Err(ParleyError::EmptyInput);
        }

        self.generation = self.generation.next();
        self.state = RequestState::Streaming;
        self.error = None;
        self.answer.reset();
        self.document = Document::default();
        self.last_question = Some(question.to_string());
        self.active_question = Some(question.to_string());

        let prompt = self.context.compose_prompt(question);
        debug!(
            "Question {} accepted ({} chars, context {})",
            self.generation,
            prompt.len(),
            if self.context.is_enabled() { "on" } else { "off" }
        );

        Ok(PreparedQuestion {
            generation: self.generation,
            question: question.to_string(),
            request: ChatRequest::new(prompt, self.role.clone()).with_api_key(self.api_key.clone()),
        })
    }

    /// Append a token for `generation` and return the rebuilt document
    ///
    /// Returns `None` when the token belongs to a superseded or cancelled
    /// question; the answer is left untouched.
    pub fn apply_token(&mut self, generation: Generation, token: &str) -> Option<&Document> {
        if !self.accepts(generation) {
            trace!("Discarding token for stale question {}", generation);
            return None;
        }

        let text = self.answer.append(token);
        self.document = Document::build(text);
        Some(&self.document)
    }

    /// Mark the answer for `generation` as complete
    pub fn complete(&mut self, generation: Generation) {
        if !self.accepts(generation) {
            return;
        }

        self.state = RequestState::Ready;
        if let Some(question) = self.active_question.take() {
            self.context.remember(&question);
        }
        debug!(
            "Question {} answered ({} tokens)",
            generation,
            self.answer.token_count()
        );
    }

    /// Record a failure for `generation`, keeping whatever was already streamed
    pub fn fail(&mut self, generation: Generation, error: &ParleyError) {
        if !self.accepts(generation) {
            return;
        }

        self.state = RequestState::Ready;
        self.active_question = None;
        self.error = Some(error.user_message());
        debug!("Question {} failed: {}", generation, error);
    }

    /// Stop the current answer; tokens still arriving for it are discarded
    pub fn cancel(&mut self) -> Generation {
        let cancelled = self.generation;
        self.generation = self.generation.next();
        self.state = RequestState::Ready;
        self.active_question = None;
        self.answer.reset();
        self.document = Document::default();
        self.error = None;
        debug!("Question {} cancelled", cancelled);
        cancelled
    }

    /// Whether tokens for `generation` should still be applied
    pub fn accepts(&self, generation: Generation) -> bool {
        self.state.is_streaming() && generation == self.generation
    }

    // === Preferences ===

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn set_role(&mut self, role: impl Into<String>) {
        self.role = role.into();
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn set_api_key(&mut self, api_key: Option<String>) {
        self.api_key = api_key;
    }

    pub fn remember_context(&self) -> bool {
        self.context.is_enabled()
    }

    pub fn set_remember_context(&mut self, enabled: bool) {
        self.context.set_enabled(enabled);
    }

    /// Flip "remember context" and return the new value
    pub fn toggle_remember_context(&mut self) -> bool {
        self.context.toggle()
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    // === Reads ===

    pub fn answer(&self) -> &str {
        self.answer.as_str()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_streaming()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// The most recently submitted question, for re-asking it
    pub fn recall_last_question(&self) -> Option<&str> {
        self.last_question.as_deref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            generation: self.generation,
            role: self.role.clone(),
            remember_context: self.context.is_enabled(),
            saved_questions: self.context.len(),
            answer: self.answer.as_str().to_string(),
            document: self.document.clone(),
            last_question: self.last_question.clone(),
            error: self.error.clone(),
        }
    }
}

/// Immutable copy of the session for display
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    pub state: RequestState,
    pub generation: Generation,
    pub role: String,
    pub remember_context: bool,
    pub saved_questions: usize,
    pub answer: String,
    pub document: Document,
    pub last_question: Option<String>,
    pub error: Option<String>,
}

/// Thread-safe handle to a session
///
/// Wraps [`Session`] in `Arc<RwLock<>>` so the pipeline worker can write
/// while the display reads.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<RwLock<Session>>,
}

impl Default for SharedSession {
    fn default() -> Self {
        Self::new(Session::default())
    }
}

impl SharedSession {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(RwLock::new(session)),
        }
    }

    /// Get a read lock on the session
    pub fn read(&self) -> parking_lot::RwLockReadGuard<'_, Session> {
        self.inner.read()
    }

    /// Get a write lock on the session
    pub fn write(&self) -> parking_lot::RwLockWriteGuard<'_, Session> {
        self.inner.write()
    }

    /// Get a snapshot (no lock held after return)
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.read().snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.read().is_loading()
    }

    pub fn answer(&self) -> String {
        self.inner.read().answer().to_string()
    }

    pub fn document(&self) -> Document {
        self.inner.read().document().clone()
    }

    pub fn error(&self) -> Option<String> {
        self.inner.read().error().map(str::to_string)
    }
}
