//! crates/post_planner_core/src/domain.rs
//!
//! Defines the canonical content model for the application.
//! These types are shared by the dispatcher, the normalizer and the calendar
//! engine; wire formats for the remote endpoints live in the adapters.

use bytes::Bytes;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

//=========================================================================================
// Actions
//=========================================================================================

/// Which remote operation a content request performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Generate,
    Improve,
    ReGenerate(ReGenerateOptions),
    GetNews,
    GenerateImage,
    Post,
    Schedule,
}

impl Action {
    /// The tag sent to the generation endpoint.
    pub fn tag(&self) -> &'static str {
        match self {
            Action::Generate => "generate",
            Action::Improve => "improve",
            Action::ReGenerate(_) => "re-generate",
            Action::GetNews => "get-news",
            Action::GenerateImage => "generate-image",
            Action::Post => "post",
            Action::Schedule => "schedule",
        }
    }

    /// Resolves an action tag. `re-generate` falls back to default options
    /// when none are supplied.
    pub fn from_tag(tag: &str, options: Option<ReGenerateOptions>) -> Option<Self> {
        let action = match tag {
            "generate" => Action::Generate,
            "improve" => Action::Improve,
            "re-generate" => Action::ReGenerate(options.unwrap_or_default()),
            "get-news" => Action::GetNews,
            "generate-image" => Action::GenerateImage,
            "post" => Action::Post,
            "schedule" => Action::Schedule,
            _ => return None,
        };
        Some(action)
    }

    /// Post-class actions only need an acknowledgement from the remote service;
    /// every other action expects a content payload back.
    pub fn is_post_class(&self) -> bool {
        matches!(self, Action::Post | Action::Schedule)
    }
}

/// Options the user picks in the re-generate dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReGenerateOptions {
    pub model: String,
    pub length: ContentLength,
    pub style: ContentStyle,
}

impl Default for ReGenerateOptions {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            length: ContentLength::Medium,
            style: ContentStyle::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentLength {
    Short,
    Medium,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStyle {
    Neutral,
    Formal,
    Casual,
}

//=========================================================================================
// Form state and requests
//=========================================================================================

/// The free-text inputs the user fills in before generating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFields {
    pub news: String,
    pub personal: String,
    pub controversial: String,
    pub projects: String,
}

/// The image attached to the current draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// An image hosted elsewhere, usually returned by the generation endpoint.
    Url(String),
    /// An image uploaded by the user, sent as a file part.
    Upload {
        data: Bytes,
        file_name: String,
        mime_type: String,
    },
}

impl ImageRef {
    pub fn url(&self) -> Option<&str> {
        match self {
            ImageRef::Url(url) => Some(url),
            ImageRef::Upload { .. } => None,
        }
    }
}

/// A request to the generation endpoint, built fresh for every dispatch.
#[derive(Debug, Clone)]
pub struct ContentRequest {
    pub action: Action,
    pub news: String,
    pub personal: String,
    pub controversial: String,
    pub projects: String,
    pub draft: Option<String>,
    pub image: Option<ImageRef>,
    pub file_name: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
}

impl ContentRequest {
    pub fn regenerate_options(&self) -> Option<&ReGenerateOptions> {
        match &self.action {
            Action::ReGenerate(options) => Some(options),
            _ => None,
        }
    }
}

/// Form field a dictated recording is transcribed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DictationTarget {
    Personal,
    Projects,
    Controversial,
}

impl DictationTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            DictationTarget::Personal => "personal",
            DictationTarget::Projects => "projects",
            DictationTarget::Controversial => "controversial",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "personal" => Some(DictationTarget::Personal),
            "projects" => Some(DictationTarget::Projects),
            "controversial" => Some(DictationTarget::Controversial),
            _ => None,
        }
    }
}

/// The part of a future request produced by a completed transcription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictationFragment {
    pub target: DictationTarget,
    pub text: String,
}

//=========================================================================================
// Results
//=========================================================================================

/// A sanitized generation result. `text` never carries escape artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentResult {
    pub text: String,
    pub is_news: bool,
    pub image_url: String,
}

/// The user-facing confirmation for a successful dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    Generated,
    Improved,
    ReGenerated,
    NewsFetched,
    ImageGenerated,
    Posted,
    Scheduled,
}

impl Notice {
    pub fn for_action(action: &Action) -> Self {
        match action {
            Action::Generate => Notice::Generated,
            Action::Improve => Notice::Improved,
            Action::ReGenerate(_) => Notice::ReGenerated,
            Action::GetNews => Notice::NewsFetched,
            Action::GenerateImage => Notice::ImageGenerated,
            Action::Post => Notice::Posted,
            Action::Schedule => Notice::Scheduled,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Notice::Generated => "Content generated successfully",
            Notice::Improved => "Content improved successfully",
            Notice::ReGenerated => "Content re-generated successfully",
            Notice::NewsFetched => "News fetched successfully",
            Notice::ImageGenerated => "Image generated successfully",
            Notice::Posted => "Content posted successfully",
            Notice::Scheduled => "Content scheduled successfully",
        }
    }
}

/// What a successful dispatch hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub action: &'static str,
    pub notice: Notice,
    /// `None` for post-class actions, which are only acknowledged.
    pub result: Option<ContentResult>,
}

//=========================================================================================
// Calendar
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Planned,
    Ready,
    Done,
    Removed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Planned => "planned",
            PostStatus::Ready => "ready",
            PostStatus::Done => "done",
            PostStatus::Removed => "removed",
        }
    }

    /// Unknown or missing labels are read as `Planned`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "ready" => PostStatus::Ready,
            "done" | "posted" => PostStatus::Done,
            "removed" => PostStatus::Removed,
            _ => PostStatus::Planned,
        }
    }

    pub fn can_transition_to(self, next: PostStatus) -> bool {
        matches!(
            (self, next),
            (PostStatus::Planned, PostStatus::Ready)
                | (PostStatus::Ready, PostStatus::Done)
                | (PostStatus::Planned, PostStatus::Removed)
                | (PostStatus::Ready, PostStatus::Removed)
        )
    }

    /// Only planned and ready posts may be moved or removed.
    pub fn is_mutable(self) -> bool {
        matches!(self, PostStatus::Planned | PostStatus::Ready)
    }
}

/// A local mutation that has been sent but not yet confirmed by a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingChange {
    Create,
    Reschedule { to: NaiveDate },
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledPost {
    /// `None` when the server sent a date that could not be parsed.
    pub date: Option<NaiveDate>,
    /// The date as shown to the user, or a fallback label for unparsable dates.
    pub date_label: String,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub status: PostStatus,
    pub pending: Option<PendingChange>,
}

impl ScheduledPost {
    /// Entries carry no server id, so identity is the visible triple.
    pub fn is_same_entry(&self, other: &ScheduledPost) -> bool {
        self.date_label == other.date_label
            && self.title == other.title
            && self.content == other.content
    }
}

/// The calendar as last confirmed by the server, ordered by date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarSnapshot {
    posts: Vec<ScheduledPost>,
}

impl CalendarSnapshot {
    /// Builds a snapshot, sorting ascending by date. Undated entries go last and
    /// the sort is stable, so equal keys keep their server order.
    pub fn new(mut posts: Vec<ScheduledPost>) -> Self {
        posts.sort_by_key(|post| (post.date.is_none(), post.date));
        Self { posts }
    }

    pub fn posts(&self) -> &[ScheduledPost] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn position_of(&self, post: &ScheduledPost) -> Option<usize> {
        self.posts.iter().position(|p| p.is_same_entry(post))
    }

    pub fn on_date(&self, date: NaiveDate) -> impl Iterator<Item = &ScheduledPost> {
        self.posts.iter().filter(move |p| p.date == Some(date))
    }

    pub(crate) fn posts_mut(&mut self) -> &mut Vec<ScheduledPost> {
        &mut self.posts
    }

    /// Drops entries the server reports as removed.
    pub(crate) fn without_removed(mut self) -> Self {
        self.posts.retain(|p| p.status != PostStatus::Removed);
        self
    }
}

/// A write request to the calendar endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CalendarCommand {
    AddItem {
        date: NaiveDate,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
        title: String,
    },
    Reschedule {
        date: NaiveDate,
        new_date: NaiveDate,
    },
    Remove {
        date: NaiveDate,
    },
}

impl CalendarCommand {
    pub fn tag(&self) -> &'static str {
        match self {
            CalendarCommand::AddItem { .. } => "add_item",
            CalendarCommand::Reschedule { .. } => "reschedule",
            CalendarCommand::Remove { .. } => "remove",
        }
    }
}

//=========================================================================================
// Application state
//=========================================================================================

/// The client-held state the dispatcher reads requests from and writes results into.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    pub form: FormFields,
    pub draft: String,
    pub image: Option<ImageRef>,
    pub scheduled_date: Option<NaiveDate>,
    pub last_result: Option<ContentResult>,
}

impl Workspace {
    pub fn build_request(&self, action: Action) -> ContentRequest {
        let file_name = match &self.image {
            Some(ImageRef::Upload { file_name, .. }) => Some(file_name.clone()),
            _ => None,
        };
        ContentRequest {
            action,
            news: self.form.news.clone(),
            personal: self.form.personal.clone(),
            controversial: self.form.controversial.clone(),
            projects: self.form.projects.clone(),
            draft: (!self.draft.is_empty()).then(|| self.draft.clone()),
            image: self.image.clone(),
            file_name,
            scheduled_date: self.scheduled_date,
        }
    }

    /// Routes a result into the form: news-flagged text lands in the news field,
    /// anything else replaces the draft. A non-empty image URL replaces the image.
    pub fn apply_result(&mut self, result: &ContentResult) {
        if result.is_news {
            self.form.news = result.text.clone();
        } else {
            self.draft = result.text.clone();
        }
        if !result.image_url.is_empty() {
            self.image = Some(ImageRef::Url(result.image_url.clone()));
        }
        self.last_result = Some(result.clone());
    }

    pub fn apply_fragment(&mut self, fragment: DictationFragment) {
        let field = match fragment.target {
            DictationTarget::Personal => &mut self.form.personal,
            DictationTarget::Projects => &mut self.form.projects,
            DictationTarget::Controversial => &mut self.form.controversial,
        };
        *field = fragment.text;
    }

    /// Clears every field that depends on the cached result.
    pub fn clear(&mut self) {
        *self = Workspace::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(date: Option<&str>, title: &str) -> ScheduledPost {
        ScheduledPost {
            date: date.map(|d| d.parse().unwrap()),
            date_label: date.unwrap_or("Unknown date").to_string(),
            title: title.to_string(),
            content: String::new(),
            image_url: None,
            status: PostStatus::Planned,
            pending: None,
        }
    }

    #[test]
    fn snapshot_sorts_undated_entries_last_and_keeps_their_order() {
        let snapshot = CalendarSnapshot::new(vec![
            post(None, "first undated"),
            post(Some("2024-06-03"), "c"),
            post(None, "second undated"),
            post(Some("2024-06-01"), "a"),
            post(Some("2024-06-01"), "b"),
        ]);
        let titles: Vec<_> = snapshot.posts().iter().map(|p| p.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["a", "b", "c", "first undated", "second undated"]
        );
    }

    #[test]
    fn done_posts_are_not_mutable() {
        assert!(PostStatus::Planned.is_mutable());
        assert!(PostStatus::Ready.is_mutable());
        assert!(!PostStatus::Done.is_mutable());
        assert!(!PostStatus::Removed.is_mutable());
        assert!(!PostStatus::Done.can_transition_to(PostStatus::Removed));
        assert!(PostStatus::Planned.can_transition_to(PostStatus::Ready));
        assert!(!PostStatus::Removed.can_transition_to(PostStatus::Planned));
    }

    #[test]
    fn news_results_update_the_news_field_not_the_draft() {
        let mut workspace = Workspace {
            draft: "existing draft".to_string(),
            ..Default::default()
        };
        workspace.apply_result(&ContentResult {
            text: "Acme raised funding.".to_string(),
            is_news: true,
            image_url: String::new(),
        });
        assert_eq!(workspace.form.news, "Acme raised funding.");
        assert_eq!(workspace.draft, "existing draft");
        assert!(workspace.image.is_none());
    }

    #[test]
    fn calendar_commands_carry_their_action_tag() {
        let command = CalendarCommand::Reschedule {
            date: "2024-06-01".parse().unwrap(),
            new_date: "2024-06-05".parse().unwrap(),
        };
        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["action"], "reschedule");
        assert_eq!(json["date"], "2024-06-01");
        assert_eq!(json["new_date"], "2024-06-05");
        assert_eq!(command.tag(), "reschedule");
    }

    #[test]
    fn regenerate_tag_uses_default_options_when_missing() {
        let action = Action::from_tag("re-generate", None).unwrap();
        assert_eq!(action, Action::ReGenerate(ReGenerateOptions::default()));
        assert!(Action::from_tag("dance", None).is_none());
    }
}
