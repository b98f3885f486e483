//! crates/post_planner_core/src/planner.rs
//!
//! The coordinator that owns the application state. Every mutation of the
//! workspace, the cache slot or the calendar snapshot goes through here.

use std::sync::Arc;

use bytes::Bytes;
use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cache::ContentCache;
use crate::calendar::{CalendarEngine, NewPost};
use crate::dispatcher::{BusyFlag, Dispatcher};
use crate::domain::{
    Action, CalendarSnapshot, ContentResult, DictationFragment, DictationTarget, Outcome,
    ScheduledPost, Workspace,
};
use crate::normalizer;
use crate::ports::{
    CacheStore, CalendarService, CoreError, CoreResult, ErrorKind, GenerationService,
    TranscriptionService,
};

pub struct Planner {
    workspace: Arc<Mutex<Workspace>>,
    dispatcher: Dispatcher,
    calendar: CalendarEngine,
    cache: ContentCache,
    transcription: Option<Arc<dyn TranscriptionService>>,
}

impl Planner {
    pub fn new(
        generation: Arc<dyn GenerationService>,
        calendar: Arc<dyn CalendarService>,
        cache_store: Arc<dyn CacheStore>,
        transcription: Option<Arc<dyn TranscriptionService>>,
    ) -> Self {
        let workspace = Arc::new(Mutex::new(Workspace::default()));
        let cache = ContentCache::new(cache_store);
        let dispatcher = Dispatcher::new(
            generation,
            cache.clone(),
            workspace.clone(),
            BusyFlag::default(),
        );
        Self {
            workspace,
            dispatcher,
            calendar: CalendarEngine::new(calendar),
            cache,
            transcription,
        }
    }

    /// Restores the draft, news text and image from the cache slot. Called once at startup.
    pub async fn restore(&self) -> Option<ContentResult> {
        let cached = self.cache.load().await?;
        self.workspace.lock().await.apply_result(&cached);
        info!("Restored the last generated content from the cache.");
        Some(cached)
    }

    pub async fn workspace(&self) -> Workspace {
        self.workspace.lock().await.clone()
    }

    /// Applies a user edit to the form, draft, image or scheduled date.
    pub async fn edit<F>(&self, apply: F) -> Workspace
    where
        F: FnOnce(&mut Workspace),
    {
        let mut workspace = self.workspace.lock().await;
        apply(&mut workspace);
        workspace.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.dispatcher.busy().is_busy()
    }

    /// Dispatches an action. A successful `schedule` also re-reads the calendar,
    /// since the generation service may have created an entry.
    pub async fn dispatch(&self, action: Action) -> CoreResult<Outcome> {
        let schedules = matches!(action, Action::Schedule);
        let outcome = self.dispatcher.dispatch(action).await?;
        if schedules {
            if let Err(e) = self.calendar.refresh().await {
                warn!("Calendar refresh after scheduling failed: {}", e);
            }
        }
        Ok(outcome)
    }

    /// Clears the cache slot and every field that depends on it.
    ///
    /// If the slot cannot be cleared the fields are left alone, so the visible
    /// text never disagrees with the cache.
    pub async fn reset(&self) -> CoreResult<()> {
        let mut workspace = self.workspace.lock().await;
        self.cache.reset().await?;
        workspace.clear();
        Ok(())
    }

    /// Transcribes a recording into one of the form fields.
    pub async fn dictate(
        &self,
        audio: Bytes,
        target: DictationTarget,
    ) -> CoreResult<DictationFragment> {
        let transcription = self.transcription.as_ref().ok_or_else(|| {
            CoreError::new(ErrorKind::Rejected, "Dictation is not configured")
        })?;
        if audio.is_empty() {
            return Err(CoreError::new(ErrorKind::Rejected, "The recording is empty"));
        }

        let fragment = {
            let _guard = self.dispatcher.busy().enter();
            let reply = transcription.transcribe(audio, target).await?;
            normalizer::normalize_transcription(reply, target)?
        };
        self.workspace.lock().await.apply_fragment(fragment.clone());
        info!(target = target.as_str(), "Transcription added.");
        Ok(fragment)
    }

    pub async fn calendar(&self) -> CalendarSnapshot {
        self.calendar.snapshot().await
    }

    pub async fn refresh_calendar(&self) -> CoreResult<CalendarSnapshot> {
        self.calendar.refresh().await
    }

    pub async fn schedule(&self, post: NewPost) -> CoreResult<CalendarSnapshot> {
        self.calendar.schedule(post).await
    }

    /// Schedules the current draft and image on `date`.
    pub async fn schedule_draft(
        &self,
        date: NaiveDate,
        title: String,
    ) -> CoreResult<CalendarSnapshot> {
        let post = {
            let workspace = self.workspace.lock().await;
            if workspace.draft.trim().is_empty() {
                return Err(CoreError::new(
                    ErrorKind::Rejected,
                    "There is no draft to schedule",
                ));
            }
            NewPost {
                date,
                title,
                content: workspace.draft.clone(),
                image_url: workspace
                    .image
                    .as_ref()
                    .and_then(|image| image.url())
                    .map(str::to_string),
            }
        };
        self.calendar.schedule(post).await
    }

    pub async fn reschedule(
        &self,
        post: &ScheduledPost,
        new_date: NaiveDate,
    ) -> CoreResult<CalendarSnapshot> {
        self.calendar.reschedule(post, new_date).await
    }

    pub async fn remove(&self, post: &ScheduledPost) -> CoreResult<CalendarSnapshot> {
        self.calendar.remove(post).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ImageRef;
    use crate::fakes::{FakeCalendar, FakeGeneration, FakeTranscription, MemoryStore};
    use crate::ports::RemoteReply;
    use serde_json::json;

    fn cached() -> ContentResult {
        ContentResult {
            text: "Cached draft".to_string(),
            is_news: false,
            image_url: "https://img.example/cached.png".to_string(),
        }
    }

    fn planner_with(
        generation: FakeGeneration,
        calendar: FakeCalendar,
        store: MemoryStore,
        transcription: Option<FakeTranscription>,
    ) -> Planner {
        Planner::new(
            Arc::new(generation),
            Arc::new(calendar),
            Arc::new(store),
            transcription.map(|t| Arc::new(t) as Arc<dyn TranscriptionService>),
        )
    }

    #[tokio::test]
    async fn restore_brings_back_text_and_image() {
        let planner = planner_with(
            FakeGeneration::replying(vec![]),
            FakeCalendar::default(),
            MemoryStore::holding(cached()),
            None,
        );

        assert_eq!(planner.restore().await, Some(cached()));

        let workspace = planner.workspace().await;
        assert_eq!(workspace.draft, "Cached draft");
        assert_eq!(
            workspace.image,
            Some(ImageRef::Url("https://img.example/cached.png".to_string()))
        );
    }

    #[tokio::test]
    async fn reset_clears_the_slot_and_the_fields_together() {
        let planner = planner_with(
            FakeGeneration::replying(vec![]),
            FakeCalendar::default(),
            MemoryStore::holding(cached()),
            None,
        );
        planner.restore().await;
        planner
            .edit(|w| w.form.personal = "I like rust".to_string())
            .await;

        planner.reset().await.unwrap();

        let workspace = planner.workspace().await;
        assert_eq!(workspace.draft, "");
        assert_eq!(workspace.form.personal, "");
        assert!(workspace.image.is_none());
        assert_eq!(planner.restore().await, None);
    }

    #[tokio::test]
    async fn failed_reset_leaves_the_fields_visible() {
        let planner = planner_with(
            FakeGeneration::replying(vec![]),
            FakeCalendar::default(),
            MemoryStore::failing(),
            None,
        );
        planner.edit(|w| w.draft = "still here".to_string()).await;

        assert!(planner.reset().await.is_err());
        assert_eq!(planner.workspace().await.draft, "still here");
    }

    #[tokio::test]
    async fn scheduling_through_the_dispatcher_refreshes_the_calendar() {
        let planner = planner_with(
            FakeGeneration::replying(vec![Ok(RemoteReply::ok(json!("Accepted")))]),
            FakeCalendar::new(
                vec![Ok(RemoteReply::ok(json!([
                    {"date": "2024-06-01", "title": "Draft", "status": "planned"}
                ])))],
                vec![],
            ),
            MemoryStore::default(),
            None,
        );
        planner
            .edit(|w| {
                w.draft = "Draft".to_string();
                w.scheduled_date = Some("2024-06-01".parse().unwrap());
            })
            .await;

        planner.dispatch(Action::Schedule).await.unwrap();

        assert_eq!(planner.calendar().await.len(), 1);
    }

    #[tokio::test]
    async fn schedule_draft_sends_the_current_draft_and_image_url() {
        let calendar = Arc::new(FakeCalendar::new(
            vec![Ok(RemoteReply::ok(json!([])))],
            vec![Ok(RemoteReply::ok(json!({"success": true})))],
        ));
        let planner = Planner::new(
            Arc::new(FakeGeneration::replying(vec![])),
            calendar.clone(),
            Arc::new(MemoryStore::default()),
            None,
        );
        planner
            .edit(|w| {
                w.draft = "Body".to_string();
                w.image = Some(ImageRef::Url("https://img.example/a.png".to_string()));
            })
            .await;

        planner
            .schedule_draft("2024-06-01".parse().unwrap(), "Title".to_string())
            .await
            .unwrap();

        let commands = calendar.commands();
        let crate::domain::CalendarCommand::AddItem {
            content, image_url, title, ..
        } = &commands[0]
        else {
            panic!("expected an add_item command");
        };
        assert_eq!(content, "Body");
        assert_eq!(title, "Title");
        assert_eq!(image_url.as_deref(), Some("https://img.example/a.png"));
    }

    #[tokio::test]
    async fn dictation_fills_the_target_field() {
        let planner = planner_with(
            FakeGeneration::replying(vec![]),
            FakeCalendar::default(),
            MemoryStore::default(),
            Some(FakeTranscription::replying(vec![Ok(RemoteReply::ok(json!({
                "transcription": "Hot take about tabs"
            })))])),
        );

        let fragment = planner
            .dictate(Bytes::from_static(b"RIFF"), DictationTarget::Controversial)
            .await
            .unwrap();

        assert_eq!(fragment.text, "Hot take about tabs");
        assert_eq!(
            planner.workspace().await.form.controversial,
            "Hot take about tabs"
        );
        assert!(!planner.is_busy());
    }

    #[tokio::test]
    async fn dictation_without_an_endpoint_is_rejected() {
        let planner = planner_with(
            FakeGeneration::replying(vec![]),
            FakeCalendar::default(),
            MemoryStore::default(),
            None,
        );
        let err = planner
            .dictate(Bytes::from_static(b"RIFF"), DictationTarget::Personal)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Rejected);
    }
}
