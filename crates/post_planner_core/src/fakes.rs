//! Scripted port implementations shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::oneshot;

use crate::domain::{CalendarCommand, ContentRequest, ContentResult, DictationTarget};
use crate::ports::{
    CacheStore, CalendarService, GenerationService, PortError, PortResult, RemoteReply,
    TranscriptionService,
};

fn next_scripted(queue: &Mutex<VecDeque<PortResult<RemoteReply>>>) -> PortResult<RemoteReply> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(PortError::Unexpected("no scripted reply left".to_string())))
}

//=========================================================================================
// Generation
//=========================================================================================

enum Script {
    Replies(Mutex<VecDeque<PortResult<RemoteReply>>>),
    Gated(Arc<GateInner>),
}

pub struct FakeGeneration {
    script: Script,
    requests: Mutex<Vec<ContentRequest>>,
}

impl FakeGeneration {
    pub fn replying(replies: Vec<PortResult<RemoteReply>>) -> Self {
        Self {
            script: Script::Replies(Mutex::new(replies.into())),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request waits until the test releases it through the returned gate.
    pub fn gated() -> (Self, Gate) {
        let inner = Arc::new(GateInner::default());
        let generation = Self {
            script: Script::Gated(inner.clone()),
            requests: Mutex::new(Vec::new()),
        };
        (generation, Gate { inner })
    }

    pub fn requests(&self) -> Vec<ContentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationService for FakeGeneration {
    async fn send(&self, request: &ContentRequest) -> PortResult<RemoteReply> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.script {
            Script::Replies(queue) => next_scripted(queue),
            Script::Gated(inner) => {
                let (tx, rx) = oneshot::channel();
                inner.waiting.lock().unwrap().push(Some(tx));
                rx.await
                    .map_err(|_| PortError::Network("gate dropped".to_string()))
            }
        }
    }
}

#[derive(Default)]
struct GateInner {
    waiting: Mutex<Vec<Option<oneshot::Sender<RemoteReply>>>>,
}

pub struct Gate {
    inner: Arc<GateInner>,
}

impl Gate {
    pub async fn wait_for_requests(&self, count: usize) {
        while self.inner.waiting.lock().unwrap().len() < count {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    pub fn release(&self, reply: RemoteReply) {
        let index = self
            .inner
            .waiting
            .lock()
            .unwrap()
            .iter()
            .position(Option::is_some)
            .expect("a waiting request");
        self.release_nth(index, reply);
    }

    pub fn release_nth(&self, index: usize, reply: RemoteReply) {
        let sender = self.inner.waiting.lock().unwrap()[index]
            .take()
            .expect("request not yet released");
        let _ = sender.send(reply);
    }
}

//=========================================================================================
// Calendar
//=========================================================================================

#[derive(Default)]
pub struct FakeCalendar {
    fetches: Mutex<VecDeque<PortResult<RemoteReply>>>,
    writes: Mutex<VecDeque<PortResult<RemoteReply>>>,
    commands: Mutex<Vec<CalendarCommand>>,
    fetch_count: Mutex<usize>,
}

impl FakeCalendar {
    pub fn new(
        fetches: Vec<PortResult<RemoteReply>>,
        writes: Vec<PortResult<RemoteReply>>,
    ) -> Self {
        Self {
            fetches: Mutex::new(fetches.into()),
            writes: Mutex::new(writes.into()),
            ..Default::default()
        }
    }

    pub fn commands(&self) -> Vec<CalendarCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetch_count.lock().unwrap()
    }
}

#[async_trait]
impl CalendarService for FakeCalendar {
    async fn fetch(&self) -> PortResult<RemoteReply> {
        *self.fetch_count.lock().unwrap() += 1;
        next_scripted(&self.fetches)
    }

    async fn write(&self, command: &CalendarCommand) -> PortResult<RemoteReply> {
        self.commands.lock().unwrap().push(command.clone());
        next_scripted(&self.writes)
    }
}

//=========================================================================================
// Transcription
//=========================================================================================

pub struct FakeTranscription {
    replies: Mutex<VecDeque<PortResult<RemoteReply>>>,
}

impl FakeTranscription {
    pub fn replying(replies: Vec<PortResult<RemoteReply>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
        }
    }
}

#[async_trait]
impl TranscriptionService for FakeTranscription {
    async fn transcribe(&self, _audio: Bytes, _target: DictationTarget) -> PortResult<RemoteReply> {
        next_scripted(&self.replies)
    }
}

//=========================================================================================
// Cache
//=========================================================================================

#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<ContentResult>>,
    failing: bool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn holding(result: ContentResult) -> Self {
        Self {
            slot: Mutex::new(Some(result)),
            failing: false,
        }
    }

    fn check(&self) -> PortResult<()> {
        if self.failing {
            Err(PortError::Storage("disk unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn load(&self) -> PortResult<Option<ContentResult>> {
        self.check()?;
        Ok(self.slot.lock().unwrap().clone())
    }

    async fn save(&self, result: &ContentResult) -> PortResult<()> {
        self.check()?;
        *self.slot.lock().unwrap() = Some(result.clone());
        Ok(())
    }

    async fn clear(&self) -> PortResult<()> {
        self.check()?;
        *self.slot.lock().unwrap() = None;
        Ok(())
    }
}
