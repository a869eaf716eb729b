//! End-to-end tests driving the chat pipeline with a scripted transport
//!
//! The transport replays canned response bodies so the whole path from
//! question to rendered document runs without a network.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use parley::llm::{ByteStream, ChatEvent, ChatHandle, ChatPipeline, ChatRequest, ChatTransport};
use parley::render::Block;
use parley::session::{Session, SharedSession};
use parley::{ParleyError, Result};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// One canned response
enum Script {
    /// Body chunks followed by end of stream
    Body(Vec<Result<Bytes>>),
    /// Body chunks after which the stream never ends
    Hang(Vec<String>),
    /// The request fails before a body is available
    Reject(ParleyError),
}

struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream> {
        self.requests.lock().push(request.clone());

        let script = self.scripts.lock().pop_front();
        match script {
            Some(Script::Body(chunks)) => Ok(futures::stream::iter(chunks).boxed()),
            Some(Script::Hang(chunks)) => {
                let chunks: Vec<Result<Bytes>> = chunks
                    .into_iter()
                    .map(|chunk| Ok(Bytes::from(chunk)))
                    .collect();
                Ok(futures::stream::iter(chunks)
                    .chain(futures::stream::pending())
                    .boxed())
            }
            Some(Script::Reject(error)) => Err(error),
            None => Err(ParleyError::NoStreamBody("no script left".to_string())),
        }
    }
}

fn frame(content: &str) -> String {
    format!(
        "data: {}\n",
        serde_json::json!({ "choices": [{ "delta": { "content": content } }] })
    )
}

fn body(frames: &[String]) -> Script {
    Script::Body(
        frames
            .iter()
            .map(|f| Ok(Bytes::from(f.clone())))
            .collect(),
    )
}

fn start(transport: Arc<ScriptedTransport>, session: Session) -> ChatHandle {
    ChatPipeline::new(transport, SharedSession::new(session))
        .start_worker()
        .expect("worker should start")
}

/// Collect events until one matches `done`
fn events_until(handle: &ChatHandle, done: impl Fn(&ChatEvent) -> bool) -> Vec<ChatEvent> {
    let mut events = Vec::new();
    loop {
        let event = handle
            .recv_event_timeout(Duration::from_secs(5))
            .expect("event channel open")
            .expect("timed out waiting for event");
        let finished = done(&event);
        events.push(event);
        if finished {
            return events;
        }
    }
}

fn is_complete(event: &ChatEvent) -> bool {
    matches!(event, ChatEvent::Complete { .. })
}

fn is_error(event: &ChatEvent) -> bool {
    matches!(event, ChatEvent::Error { .. })
}

fn tokens(events: &[ChatEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            ChatEvent::Updated { token, .. } => Some(token.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_answer_streams_into_document() {
    let transport = ScriptedTransport::new(vec![body(&[
        frame("Hel"),
        frame("lo"),
        "data: [DONE]\n".to_string(),
    ])]);
    let handle = start(transport.clone(), Session::new("Tutor"));

    handle.ask("  Say hello  ").unwrap();
    let events = events_until(&handle, is_complete);

    assert!(matches!(
        &events[0],
        ChatEvent::Started { question, .. } if question == "Say hello"
    ));
    assert_eq!(tokens(&events), vec!["Hel", "lo"]);

    match events.last() {
        Some(ChatEvent::Complete {
            answer, document, ..
        }) => {
            assert_eq!(answer, "Hello");
            assert_eq!(
                document.blocks().collect::<Vec<_>>(),
                vec![&Block::paragraph("Hello")]
            );
        }
        other => panic!("expected completion, got {:?}", other),
    }

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].prompt, "Say hello");
    assert_eq!(requests[0].role, "Tutor");
    assert!(!handle.session().is_loading());

    handle.shutdown().unwrap();
}

#[test]
fn test_each_update_carries_rebuilt_document() {
    let transport = ScriptedTransport::new(vec![body(&[
        frame("## Steps\n"),
        frame("1. a\n"),
        frame("2. b\n"),
        frame("```\nrun()"),
        frame("\n```"),
    ])]);
    let handle = start(transport, Session::default());

    handle.ask("how?").unwrap();
    let events = events_until(&handle, is_complete);

    let documents: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            ChatEvent::Updated { document, .. } => Some(document.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(documents.len(), 5);

    // Code is shown as code while its fence is still open
    let open_fence: Vec<_> = documents[3].blocks().cloned().collect();
    assert_eq!(open_fence.last(), Some(&Block::code("run()")));

    let last: Vec<_> = documents[4].blocks().cloned().collect();
    assert_eq!(
        last,
        vec![
            Block::heading(2, "Steps"),
            Block::NumberedList {
                items: vec!["a".to_string(), "b".to_string()]
            },
            Block::code("run()"),
        ]
    );

    handle.shutdown().unwrap();
}

#[test]
fn test_missing_body_reports_streaming_failed() {
    let transport = ScriptedTransport::new(vec![Script::Reject(ParleyError::NoStreamBody(
        "204".to_string(),
    ))]);
    let handle = start(transport, Session::default());

    handle.ask("anything").unwrap();
    let events = events_until(&handle, is_error);

    match events.last() {
        Some(ChatEvent::Error { generation, error }) => {
            assert!(generation.is_some());
            assert!(matches!(error, ParleyError::NoStreamBody(_)));
            assert_eq!(error.user_message(), "Streaming failed");
        }
        other => panic!("expected error, got {:?}", other),
    }

    let session = handle.session().snapshot();
    assert!(!session.state.is_streaming());
    assert_eq!(session.error.as_deref(), Some("Streaming failed"));
    assert!(session.answer.is_empty());

    handle.shutdown().unwrap();
}

#[test]
fn test_transport_failure_keeps_partial_answer() {
    let transport = ScriptedTransport::new(vec![Script::Body(vec![
        Ok(Bytes::from(frame("Partial "))),
        Ok(Bytes::from(frame("answer"))),
        Err(ParleyError::TransportFailure("connection reset".to_string())),
        Ok(Bytes::from(frame(" never seen"))),
    ])]);
    let handle = start(transport, Session::default());

    handle.ask("q").unwrap();
    let events = events_until(&handle, is_error);

    assert_eq!(tokens(&events), vec!["Partial ", "answer"]);
    assert_eq!(handle.session().answer(), "Partial answer");
    assert_eq!(handle.session().error().as_deref(), Some("Streaming failed"));
    assert!(!handle.session().is_loading());

    handle.shutdown().unwrap();
}

#[test]
fn test_malformed_frames_are_skipped() {
    let transport = ScriptedTransport::new(vec![body(&[
        "event: ping\n".to_string(),
        "data: {not json\n".to_string(),
        frame("ok"),
        "data: [DONE]\n".to_string(),
        frame("after done"),
    ])]);
    let handle = start(transport, Session::default());

    handle.ask("q").unwrap();
    let events = events_until(&handle, is_complete);

    assert_eq!(tokens(&events), vec!["ok"]);
    assert_eq!(handle.session().answer(), "ok");

    handle.shutdown().unwrap();
}

#[test]
fn test_stop_cancels_running_answer() {
    let transport = ScriptedTransport::new(vec![Script::Hang(vec![frame("Hel")])]);
    let handle = start(transport, Session::default());

    handle.ask("q").unwrap();
    let started = events_until(&handle, |event| matches!(event, ChatEvent::Updated { .. }));
    let generation = match &started[0] {
        ChatEvent::Started { generation, .. } => *generation,
        other => panic!("expected start, got {:?}", other),
    };

    handle.stop().unwrap();
    let events = events_until(&handle, |event| matches!(event, ChatEvent::Cancelled { .. }));

    assert!(matches!(
        events.last(),
        Some(ChatEvent::Cancelled { generation: cancelled }) if *cancelled == generation
    ));
    assert!(!handle.session().is_loading());
    assert!(handle.session().answer().is_empty());
    assert!(handle.session().document().is_empty());

    handle.shutdown().unwrap();
}

#[test]
fn test_new_question_supersedes_running_answer() {
    let transport = ScriptedTransport::new(vec![
        Script::Hang(vec![frame("stale")]),
        body(&[frame("fresh"), "data: [DONE]\n".to_string()]),
    ]);
    let handle = start(transport.clone(), Session::default());

    handle.ask("first").unwrap();
    events_until(&handle, |event| matches!(event, ChatEvent::Updated { .. }));

    handle.ask("second").unwrap();
    let events = events_until(&handle, is_complete);

    assert!(matches!(events[0], ChatEvent::Cancelled { .. }));
    assert!(matches!(
        &events[1],
        ChatEvent::Started { question, .. } if question == "second"
    ));
    assert_eq!(tokens(&events), vec!["fresh"]);
    assert_eq!(handle.session().answer(), "fresh");
    assert_eq!(handle.session().read().recall_last_question(), Some("second"));
    assert_eq!(transport.requests().len(), 2);

    handle.shutdown().unwrap();
}

#[test]
fn test_remembered_context_joins_prompts() {
    let done = || body(&[frame("ok"), "data: [DONE]\n".to_string()]);
    let transport = ScriptedTransport::new(vec![done(), done(), done()]);

    let mut session = Session::default();
    session.set_remember_context(true);
    let handle = start(transport.clone(), session);

    handle.ask("What is Java?").unwrap();
    events_until(&handle, is_complete);
    handle.ask("What is Spring?").unwrap();
    events_until(&handle, is_complete);

    handle.set_remember_context(false).unwrap();
    handle.ask("Unrelated").unwrap();
    events_until(&handle, is_complete);

    let prompts: Vec<String> = transport
        .requests()
        .into_iter()
        .map(|request| request.prompt)
        .collect();
    assert_eq!(
        prompts,
        vec![
            "What is Java?".to_string(),
            "What is Java? and also What is Spring?".to_string(),
            "Unrelated".to_string(),
        ]
    );
    assert!(handle.session().read().context().is_empty());

    handle.shutdown().unwrap();
}

#[test]
fn test_api_key_forwarded_after_change() {
    let done = || body(&["data: [DONE]\n".to_string()]);
    let transport = ScriptedTransport::new(vec![done(), done()]);
    let handle = start(transport.clone(), Session::default());

    handle.ask("one").unwrap();
    events_until(&handle, is_complete);
    handle.set_api_key(Some("secret".to_string())).unwrap();
    handle.ask("two").unwrap();
    events_until(&handle, is_complete);

    let requests = transport.requests();
    assert_eq!(requests[0].api_key, None);
    assert_eq!(requests[1].api_key.as_deref(), Some("secret"));

    handle.shutdown().unwrap();
}
