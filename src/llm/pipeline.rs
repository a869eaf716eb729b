//! Chat pipeline driving one question at a time
//!
//! A worker thread with its own tokio runtime takes [`ChatCommand`]s, opens
//! the answer stream through a [`ChatTransport`], feeds every decoded token
//! into the shared [`Session`](crate::session::Session) and publishes a
//! [`ChatEvent`] after each append. Commands are polled between tokens so a
//! stop or a new question takes effect mid-answer.

use crate::llm::client::ChatTransport;
use crate::render::Document;
use crate::session::{Generation, SharedSession};
use crate::stream::decode_tokens;
use crate::{ParleyError, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use futures::StreamExt;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, error, info, trace, warn};

/// How long the worker waits on the network before checking for commands
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Commands accepted by the pipeline worker
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatCommand {
    /// Answer a finalized question (supersedes any answer in flight)
    Ask(String),
    /// Stop the current answer
    Stop,
    /// Change the role instruction for later questions
    SetRole(String),
    /// Change or clear the API key for later questions
    SetApiKey(Option<String>),
    /// Turn "remember context" on or off
    SetRememberContext(bool),
    /// Shutdown the worker
    Shutdown,
}

/// Events emitted by the pipeline worker
#[derive(Clone, Debug)]
pub enum ChatEvent {
    /// A question was accepted and its request is being sent
    Started {
        generation: Generation,
        question: String,
    },
    /// A token was appended and the document rebuilt
    Updated {
        generation: Generation,
        token: String,
        document: Document,
    },
    /// The answer stream ended normally
    Complete {
        generation: Generation,
        answer: String,
        document: Document,
    },
    /// The answer was stopped or superseded
    Cancelled { generation: Generation },
    /// A question was rejected or its answer failed
    ///
    /// `generation` is `None` when the question never started.
    Error {
        generation: Option<Generation>,
        error: ParleyError,
    },
    /// Worker shut down
    Shutdown,
}

/// Handle for interacting with a running pipeline worker
pub struct ChatHandle {
    command_tx: Sender<ChatCommand>,
    event_rx: Receiver<ChatEvent>,
    session: SharedSession,
    worker_handle: Option<JoinHandle<()>>,
}

impl ChatHandle {
    fn send(&self, command: ChatCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|e| ParleyError::ChannelError(format!("Failed to send command: {}", e)))
    }

    /// Ask a question
    pub fn ask(&self, question: &str) -> Result<()> {
        self.send(ChatCommand::Ask(question.to_string()))
    }

    /// Stop the current answer
    pub fn stop(&self) -> Result<()> {
        self.send(ChatCommand::Stop)
    }

    pub fn set_role(&self, role: impl Into<String>) -> Result<()> {
        self.send(ChatCommand::SetRole(role.into()))
    }

    pub fn set_api_key(&self, api_key: Option<String>) -> Result<()> {
        self.send(ChatCommand::SetApiKey(api_key))
    }

    pub fn set_remember_context(&self, enabled: bool) -> Result<()> {
        self.send(ChatCommand::SetRememberContext(enabled))
    }

    /// Shutdown the worker and wait for it to exit
    pub fn shutdown(mut self) -> Result<()> {
        let _ = self.command_tx.send(ChatCommand::Shutdown);
        if let Some(handle) = self.worker_handle.take() {
            handle
                .join()
                .map_err(|_| ParleyError::ChannelError("Worker thread panicked".to_string()))?;
        }
        Ok(())
    }

    /// Try to receive an event without blocking
    pub fn try_recv_event(&self) -> Option<ChatEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive an event, blocking until available
    pub fn recv_event(&self) -> Result<ChatEvent> {
        self.event_rx
            .recv()
            .map_err(|e| ParleyError::ChannelError(format!("Failed to receive event: {}", e)))
    }

    /// Receive an event, giving up after `timeout`
    pub fn recv_event_timeout(&self, timeout: Duration) -> Result<Option<ChatEvent>> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(ParleyError::ChannelError(
                "Event channel disconnected".to_string(),
            )),
        }
    }

    /// Receiver for consuming events on another thread
    pub fn event_receiver(&self) -> Receiver<ChatEvent> {
        self.event_rx.clone()
    }

    /// The session the worker writes into
    pub fn session(&self) -> &SharedSession {
        &self.session
    }
}

/// Pipeline that owns the transport and session until the worker starts
pub struct ChatPipeline {
    transport: Arc<dyn ChatTransport>,
    session: SharedSession,
}

impl ChatPipeline {
    pub fn new(transport: Arc<dyn ChatTransport>, session: SharedSession) -> Self {
        Self { transport, session }
    }

    /// Start the pipeline worker thread
    ///
    /// The worker runs in a separate thread with its own tokio runtime.
    pub fn start_worker(self) -> Result<ChatHandle> {
        let (command_tx, command_rx) = bounded::<ChatCommand>(100);
        let (event_tx, event_rx) = bounded::<ChatEvent>(100);

        let worker = Worker {
            transport: self.transport,
            session: self.session.clone(),
            command_rx,
            event_tx,
        };

        let worker_handle = std::thread::Builder::new()
            .name("parley-chat".to_string())
            .spawn(move || {
                let runtime = match Runtime::new() {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("Failed to create tokio runtime: {}", e);
                        let _ = worker.event_tx.send(ChatEvent::Error {
                            generation: None,
                            error: ParleyError::ChannelError(format!(
                                "Runtime creation failed: {}",
                                e
                            )),
                        });
                        let _ = worker.event_tx.send(ChatEvent::Shutdown);
                        return;
                    }
                };

                runtime.block_on(worker.run());
            })?;

        Ok(ChatHandle {
            command_tx,
            event_rx,
            session: self.session,
            worker_handle: Some(worker_handle),
        })
    }
}

/// What the worker does after a question finishes or is interrupted
enum Flow {
    Idle,
    /// A new question superseded the running one
    Next(String),
    Shutdown,
    /// Nobody is listening for events any more
    Closed,
}

struct Worker {
    transport: Arc<dyn ChatTransport>,
    session: SharedSession,
    command_rx: Receiver<ChatCommand>,
    event_tx: Sender<ChatEvent>,
}

impl Worker {
    async fn run(self) {
        info!("Chat worker started");

        let mut next_question: Option<String> = None;

        loop {
            let command = match next_question.take() {
                Some(question) => ChatCommand::Ask(question),
                None => match self.command_rx.recv() {
                    Ok(command) => command,
                    Err(_) => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                },
            };

            match command {
                ChatCommand::Ask(question) => match self.answer(&question).await {
                    Flow::Idle => {}
                    Flow::Next(question) => next_question = Some(question),
                    Flow::Shutdown => break,
                    Flow::Closed => {
                        error!("Event channel closed");
                        break;
                    }
                },
                // Nothing in flight
                ChatCommand::Stop => debug!("Stop with no active question"),
                ChatCommand::Shutdown => {
                    info!("Received shutdown command");
                    break;
                }
                setting => self.apply_setting(setting),
            }
        }

        let _ = self.event_tx.send(ChatEvent::Shutdown);
        info!("Chat worker shutdown complete");
    }

    /// Run one question from submission to completion
    async fn answer(&self, question: &str) -> Flow {
        let submitted = self.session.write().submit(question);
        let prepared = match submitted {
            Ok(prepared) => prepared,
            Err(error) => {
                debug!("Question rejected: {}", error);
                return self.emit_or_close(ChatEvent::Error {
                    generation: None,
                    error,
                });
            }
        };

        let generation = prepared.generation;
        info!("Answering question {}", generation);

        if !self.emit(ChatEvent::Started {
            generation,
            question: prepared.question,
        }) {
            return Flow::Closed;
        }

        let mut open = self.transport.open_stream(&prepared.request);
        let opened = loop {
            if let Some(flow) = self.poll_commands(generation) {
                return flow;
            }
            match tokio::time::timeout(POLL_INTERVAL, &mut open).await {
                Ok(result) => break result,
                Err(_) => continue,
            }
        };

        let body = match opened {
            Ok(body) => body,
            Err(error) => return self.fail(generation, error),
        };

        let mut tokens = decode_tokens(body);
        loop {
            if let Some(flow) = self.poll_commands(generation) {
                return flow;
            }

            match tokio::time::timeout(POLL_INTERVAL, tokens.next()).await {
                Ok(Some(Ok(token))) => {
                    let document = match self.session.write().apply_token(generation, &token) {
                        Some(document) => document.clone(),
                        None => {
                            debug!("Question {} no longer current, dropping stream", generation);
                            return Flow::Idle;
                        }
                    };
                    trace!("Question {} token {:?}", generation, token);

                    if !self.emit(ChatEvent::Updated {
                        generation,
                        token,
                        document,
                    }) {
                        return Flow::Closed;
                    }
                }
                Ok(Some(Err(error))) => return self.fail(generation, error),
                Ok(None) => break,
                Err(_) => continue,
            }
        }

        let (answer, document) = {
            let mut session = self.session.write();
            session.complete(generation);
            (session.answer().to_string(), session.document().clone())
        };
        info!("Question {} complete ({} chars)", generation, answer.len());

        self.emit_or_close(ChatEvent::Complete {
            generation,
            answer,
            document,
        })
    }

    /// Drain pending commands while `generation` is streaming
    ///
    /// Returns a flow when the running answer has to end.
    fn poll_commands(&self, generation: Generation) -> Option<Flow> {
        while let Ok(command) = self.command_rx.try_recv() {
            match command {
                ChatCommand::Stop => {
                    warn!("Question {} stopped", generation);
                    self.session.write().cancel();
                    return Some(self.emit_or_close(ChatEvent::Cancelled { generation }));
                }
                ChatCommand::Ask(question) if question.trim().is_empty() => {
                    // Leaves the running answer alone, only reports the error
                    let rejected = self.session.write().submit(&question);
                    if let Err(error) = rejected {
                        if !self.emit(ChatEvent::Error {
                            generation: None,
                            error,
                        }) {
                            return Some(Flow::Closed);
                        }
                    }
                }
                ChatCommand::Ask(question) => {
                    debug!("Question {} superseded", generation);
                    if !self.emit(ChatEvent::Cancelled { generation }) {
                        return Some(Flow::Closed);
                    }
                    return Some(Flow::Next(question));
                }
                ChatCommand::Shutdown => {
                    warn!("Question {} interrupted by shutdown", generation);
                    self.session.write().cancel();
                    return Some(Flow::Shutdown);
                }
                setting => self.apply_setting(setting),
            }
        }
        None
    }

    fn apply_setting(&self, command: ChatCommand) {
        let mut session = self.session.write();
        match command {
            ChatCommand::SetRole(role) => {
                debug!("Role changed");
                session.set_role(role);
            }
            ChatCommand::SetApiKey(api_key) => {
                debug!("API key {}", if api_key.is_some() { "set" } else { "cleared" });
                session.set_api_key(api_key);
            }
            ChatCommand::SetRememberContext(enabled) => {
                debug!("Remember context {}", if enabled { "on" } else { "off" });
                session.set_remember_context(enabled);
            }
            other => warn!("Unexpected command in settings: {:?}", other),
        }
    }

    fn fail(&self, generation: Generation, error: ParleyError) -> Flow {
        warn!("Question {} failed: {}", generation, error);
        self.session.write().fail(generation, &error);
        self.emit_or_close(ChatEvent::Error {
            generation: Some(generation),
            error,
        })
    }

    fn emit(&self, event: ChatEvent) -> bool {
        self.event_tx.send(event).is_ok()
    }

    fn emit_or_close(&self, event: ChatEvent) -> Flow {
        if self.emit(event) {
            Flow::Idle
        } else {
            Flow::Closed
        }
    }
}
