//! services/api/src/web/protocol.rs
//!
//! Defines the JSON messages exchanged between the browser client and the API
//! server, and their conversions from the core types.

use chrono::NaiveDate;
use post_planner_core::domain::{
    CalendarSnapshot, ContentLength, ContentResult, ContentStyle, ImageRef, Outcome,
    PendingChange, ReGenerateOptions, ScheduledPost, Workspace,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct FormView {
    pub news: String,
    pub personal: String,
    pub controversial: String,
    pub projects: String,
}

/// The current image; uploads are not echoed back, only their file name.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageView {
    Url { url: String },
    Upload { file_name: String, mime_type: String },
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct ContentResultView {
    pub text: String,
    pub is_news: bool,
    pub image_url: String,
}

/// Everything the UI renders outside the calendar tab.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct WorkspaceView {
    pub form: FormView,
    pub draft: String,
    pub image: Option<ImageView>,
    pub scheduled_date: Option<NaiveDate>,
    /// Set while a dispatch is outstanding; triggers should be disabled.
    pub busy: bool,
    pub last_result: Option<ContentResultView>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct OutcomeResponse {
    pub action: String,
    pub notice: String,
    pub message: String,
    pub result: Option<ContentResultView>,
    pub workspace: WorkspaceView,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct ScheduledPostView {
    /// `null` when the server sent an unparsable date.
    pub date: Option<NaiveDate>,
    pub date_label: String,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    #[schema(example = "planned")]
    pub status: String,
    /// `create`, `reschedule` or `remove` while a change awaits confirmation.
    pub pending: Option<String>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct CalendarView {
    pub posts: Vec<ScheduledPostView>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct DictationResponse {
    pub target: String,
    pub text: String,
    pub workspace: WorkspaceView,
}

impl From<&ContentResult> for ContentResultView {
    fn from(result: &ContentResult) -> Self {
        Self {
            text: result.text.clone(),
            is_news: result.is_news,
            image_url: result.image_url.clone(),
        }
    }
}

impl WorkspaceView {
    pub fn new(workspace: &Workspace, busy: bool) -> Self {
        let image = workspace.image.as_ref().map(|image| match image {
            ImageRef::Url(url) => ImageView::Url { url: url.clone() },
            ImageRef::Upload {
                file_name,
                mime_type,
                ..
            } => ImageView::Upload {
                file_name: file_name.clone(),
                mime_type: mime_type.clone(),
            },
        });
        Self {
            form: FormView {
                news: workspace.form.news.clone(),
                personal: workspace.form.personal.clone(),
                controversial: workspace.form.controversial.clone(),
                projects: workspace.form.projects.clone(),
            },
            draft: workspace.draft.clone(),
            image,
            scheduled_date: workspace.scheduled_date,
            busy,
            last_result: workspace.last_result.as_ref().map(ContentResultView::from),
        }
    }
}

impl OutcomeResponse {
    pub fn new(outcome: &Outcome, workspace: WorkspaceView) -> Self {
        Self {
            action: outcome.action.to_string(),
            notice: notice_label(outcome),
            message: outcome.notice.message().to_string(),
            result: outcome.result.as_ref().map(ContentResultView::from),
            workspace,
        }
    }
}

fn notice_label(outcome: &Outcome) -> String {
    serde_json::to_value(outcome.notice)
        .ok()
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_default()
}

impl From<&ScheduledPost> for ScheduledPostView {
    fn from(post: &ScheduledPost) -> Self {
        let pending = post.pending.map(|change| {
            match change {
                PendingChange::Create => "create",
                PendingChange::Reschedule { .. } => "reschedule",
                PendingChange::Remove => "remove",
            }
            .to_string()
        });
        Self {
            date: post.date,
            date_label: post.date_label.clone(),
            title: post.title.clone(),
            content: post.content.clone(),
            image_url: post.image_url.clone(),
            status: post.status.as_str().to_string(),
            pending,
        }
    }
}

impl From<&CalendarSnapshot> for CalendarView {
    fn from(snapshot: &CalendarSnapshot) -> Self {
        Self {
            posts: snapshot.posts().iter().map(ScheduledPostView::from).collect(),
        }
    }
}

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// A partial edit of the workspace. Absent fields are left alone; an empty
/// `image_url` or `scheduled_date` clears the value.
#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(default)]
pub struct UpdateWorkspaceRequest {
    pub news: Option<String>,
    pub personal: Option<String>,
    pub controversial: Option<String>,
    pub projects: Option<String>,
    pub draft: Option<String>,
    pub image_url: Option<String>,
    #[schema(example = "2024-06-01")]
    pub scheduled_date: Option<String>,
}

/// Options for `re-generate`; missing fields take their defaults.
#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(default)]
pub struct ReGenerateBody {
    #[schema(example = "gpt-4")]
    pub model: Option<String>,
    #[schema(value_type = Option<String>, example = "short")]
    pub length: Option<ContentLength>,
    #[schema(value_type = Option<String>, example = "casual")]
    pub style: Option<ContentStyle>,
}

impl From<ReGenerateBody> for ReGenerateOptions {
    fn from(body: ReGenerateBody) -> Self {
        let defaults = ReGenerateOptions::default();
        Self {
            model: body.model.unwrap_or(defaults.model),
            length: body.length.unwrap_or(defaults.length),
            style: body.style.unwrap_or(defaults.style),
        }
    }
}

/// Adds a post. Without `content` the current draft and image are used.
#[derive(Deserialize, Debug, ToSchema)]
pub struct ScheduleRequest {
    pub date: NaiveDate,
    pub title: String,
    pub content: Option<String>,
    pub image_url: Option<String>,
}

/// Identifies a calendar entry the way the UI shows it.
#[derive(Deserialize, Debug, Clone, ToSchema)]
pub struct PostRef {
    pub date_label: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl PostRef {
    pub fn find_in(&self, snapshot: &CalendarSnapshot) -> Option<ScheduledPost> {
        snapshot
            .posts()
            .iter()
            .find(|post| {
                post.date_label == self.date_label
                    && post.title == self.title
                    && post.content == self.content
            })
            .cloned()
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct RescheduleRequest {
    pub post: PostRef,
    pub new_date: NaiveDate,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct RemoveRequest {
    pub post: PostRef,
}
