//! crates/post_planner_core/src/calendar.rs
//!
//! The calendar reconciliation engine. It owns the authoritative snapshot,
//! marks optimistic local changes as pending, and reconciles them against
//! what the calendar endpoint reports.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::{
    CalendarCommand, CalendarSnapshot, PendingChange, PostStatus, ScheduledPost,
};
use crate::normalizer::{self, Normalized};
use crate::ports::{CalendarService, CoreError, CoreResult, ErrorKind};

/// A post the user wants to add to the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub date: NaiveDate,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
}

pub struct CalendarEngine {
    service: Arc<dyn CalendarService>,
    snapshot: RwLock<CalendarSnapshot>,
}

impl CalendarEngine {
    pub fn new(service: Arc<dyn CalendarService>) -> Self {
        Self {
            service,
            snapshot: RwLock::new(CalendarSnapshot::default()),
        }
    }

    pub async fn snapshot(&self) -> CalendarSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Re-reads the whole calendar and replaces the snapshot with it.
    pub async fn refresh(&self) -> CoreResult<CalendarSnapshot> {
        let snapshot = self.read_calendar().await?;
        info!(entries = snapshot.len(), "Calendar refreshed.");
        *self.snapshot.write().await = snapshot.clone();
        Ok(snapshot)
    }

    /// Reads the calendar without committing it.
    async fn read_calendar(&self) -> CoreResult<CalendarSnapshot> {
        let reply = self.service.fetch().await?;
        Ok(normalizer::normalize_calendar_read(reply)?.without_removed())
    }

    /// Adds a post, then re-reads the calendar so server-derived fields win.
    ///
    /// A pending placeholder is shown until the refresh replaces it.
    pub async fn schedule(&self, post: NewPost) -> CoreResult<CalendarSnapshot> {
        let placeholder = ScheduledPost {
            date: Some(post.date),
            date_label: post.date.format("%Y-%m-%d").to_string(),
            title: post.title.clone(),
            content: post.content.clone(),
            image_url: post.image_url.clone(),
            status: PostStatus::Planned,
            pending: Some(PendingChange::Create),
        };
        {
            let mut snapshot = self.snapshot.write().await;
            let mut posts = snapshot.posts().to_vec();
            posts.push(placeholder.clone());
            *snapshot = CalendarSnapshot::new(posts);
        }

        let command = CalendarCommand::AddItem {
            date: post.date,
            content: post.content,
            image_url: post.image_url,
            title: post.title,
        };
        if let Err(e) = self.write(&command).await {
            self.snapshot.write().await.posts_mut().retain(|p| {
                !(p.pending == Some(PendingChange::Create) && p.is_same_entry(&placeholder))
            });
            return Err(e);
        }
        self.refresh().await
    }

    /// Moves a post to a new date.
    ///
    /// The updated list the server returns is adopted wholesale only if it
    /// contains the moved post; otherwise the change is rolled back.
    pub async fn reschedule(
        &self,
        post: &ScheduledPost,
        new_date: NaiveDate,
    ) -> CoreResult<CalendarSnapshot> {
        let from = ensure_mutable(post)?;
        if from == new_date {
            return Ok(self.snapshot().await);
        }
        self.mark_pending(post, PendingChange::Reschedule { to: new_date }, None)
            .await?;

        let command = CalendarCommand::Reschedule {
            date: from,
            new_date,
        };
        let written = match self.write(&command).await {
            Ok(written) => written,
            Err(e) => {
                self.restore(post).await;
                return Err(e);
            }
        };

        match written {
            Normalized::Calendar(updated) => {
                if !contains_moved(&updated, post, new_date) {
                    self.restore(post).await;
                    return Err(moved_post_missing(post, new_date));
                }
                *self.snapshot.write().await = updated.clone();
                info!(from = %from, to = %new_date, "Post rescheduled.");
                Ok(updated)
            }
            Normalized::Acknowledged => {
                let refreshed = match self.read_calendar().await {
                    Ok(refreshed) => refreshed,
                    Err(e) => {
                        self.restore(post).await;
                        return Err(e);
                    }
                };
                if !contains_moved(&refreshed, post, new_date) {
                    self.restore(post).await;
                    return Err(moved_post_missing(post, new_date));
                }
                *self.snapshot.write().await = refreshed.clone();
                info!(from = %from, to = %new_date, "Post rescheduled.");
                Ok(refreshed)
            }
            Normalized::Content(_) => {
                self.restore(post).await;
                Err(CoreError::new(
                    ErrorKind::UnexpectedShape,
                    "The calendar endpoint answered with generated content",
                ))
            }
        }
    }

    /// Removes every post on the given post's date, then re-reads the calendar.
    ///
    /// The re-read happens whether or not the write succeeded; a failed write
    /// still reports its own error.
    pub async fn remove(&self, post: &ScheduledPost) -> CoreResult<CalendarSnapshot> {
        let date = ensure_mutable(post)?;
        self.mark_pending(post, PendingChange::Remove, Some(PostStatus::Removed))
            .await?;

        if let Err(e) = self.write(&CalendarCommand::Remove { date }).await {
            self.restore(post).await;
            if let Err(refresh_err) = self.refresh().await {
                warn!("Calendar refresh after a failed removal failed: {}", refresh_err);
            }
            return Err(e);
        }
        self.refresh().await
    }

    async fn write(&self, command: &CalendarCommand) -> CoreResult<Normalized> {
        let reply = self.service.write(command).await.map_err(|e| {
            warn!(action = command.tag(), "Calendar write failed: {}", e);
            CoreError::from(e)
        })?;
        normalizer::normalize_calendar_write(reply)
    }

    async fn mark_pending(
        &self,
        post: &ScheduledPost,
        change: PendingChange,
        status: Option<PostStatus>,
    ) -> CoreResult<()> {
        let mut snapshot = self.snapshot.write().await;
        let index = snapshot.position_of(post).ok_or_else(|| {
            CoreError::new(
                ErrorKind::Rejected,
                format!("\"{}\" is no longer in the calendar", post.title),
            )
        })?;
        let entry = &mut snapshot.posts_mut()[index];
        if entry.pending.is_some() {
            return Err(CoreError::new(
                ErrorKind::Rejected,
                format!("\"{}\" already has a change in flight", post.title),
            ));
        }
        entry.pending = Some(change);
        if let Some(status) = status {
            entry.status = status;
        }
        Ok(())
    }

    /// Puts an entry back the way it was before a failed change.
    async fn restore(&self, previous: &ScheduledPost) {
        let mut snapshot = self.snapshot.write().await;
        if let Some(index) = snapshot.position_of(previous) {
            snapshot.posts_mut()[index] = previous.clone();
        }
    }

    #[cfg(test)]
    pub(crate) async fn replace_snapshot(&self, snapshot: CalendarSnapshot) {
        *self.snapshot.write().await = snapshot;
    }
}

/// Done and removed posts cannot be changed, nor can posts without a valid date.
fn ensure_mutable(post: &ScheduledPost) -> CoreResult<NaiveDate> {
    if !post.status.is_mutable() {
        return Err(CoreError::new(
            ErrorKind::Rejected,
            format!("A {} post cannot be changed", post.status.as_str()),
        ));
    }
    post.date.ok_or_else(|| {
        CoreError::new(
            ErrorKind::Rejected,
            format!("\"{}\" has no valid date", post.title),
        )
    })
}

/// The moved post must reappear on the new date with the same title and content.
fn contains_moved(snapshot: &CalendarSnapshot, post: &ScheduledPost, new_date: NaiveDate) -> bool {
    snapshot
        .on_date(new_date)
        .any(|p| p.title == post.title && p.content == post.content)
}

fn moved_post_missing(post: &ScheduledPost, new_date: NaiveDate) -> CoreError {
    warn!(title = %post.title, to = %new_date, "Rescheduled post missing from the server's list.");
    CoreError::new(
        ErrorKind::Rollback,
        format!(
            "The server did not confirm moving \"{}\" to {}",
            post.title, new_date
        ),
    )
}
