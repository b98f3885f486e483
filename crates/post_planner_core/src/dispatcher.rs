//! crates/post_planner_core/src/dispatcher.rs
//!
//! The action dispatcher: builds a request from the current workspace, sends it
//! to the generation endpoint, and routes the normalized result back.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::cache::ContentCache;
use crate::domain::{Action, Notice, Outcome, Workspace};
use crate::normalizer::{self, Normalized};
use crate::ports::{CoreError, CoreResult, ErrorKind, GenerationService};

//=========================================================================================
// Busy Flag
//=========================================================================================

/// Set while any dispatch is outstanding.
///
/// The flag is advisory: callers are expected to disable their triggers while
/// it is set, but overlapping dispatches are neither queued nor rejected.
#[derive(Clone, Default)]
pub struct BusyFlag {
    outstanding: Arc<AtomicUsize>,
}

impl BusyFlag {
    pub fn is_busy(&self) -> bool {
        self.outstanding.load(Ordering::SeqCst) > 0
    }

    pub(crate) fn enter(&self) -> BusyGuard {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        BusyGuard {
            outstanding: self.outstanding.clone(),
        }
    }
}

pub(crate) struct BusyGuard {
    outstanding: Arc<AtomicUsize>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}

//=========================================================================================
// Dispatcher
//=========================================================================================

pub struct Dispatcher {
    generation: Arc<dyn GenerationService>,
    cache: ContentCache,
    workspace: Arc<Mutex<Workspace>>,
    busy: BusyFlag,
}

impl Dispatcher {
    pub fn new(
        generation: Arc<dyn GenerationService>,
        cache: ContentCache,
        workspace: Arc<Mutex<Workspace>>,
        busy: BusyFlag,
    ) -> Self {
        Self {
            generation,
            cache,
            workspace,
            busy,
        }
    }

    pub fn busy(&self) -> &BusyFlag {
        &self.busy
    }

    /// Runs one action end to end.
    ///
    /// Responses are applied in arrival order: if an older dispatch answers
    /// after a newer one, its result overwrites the newer one.
    pub async fn dispatch(&self, action: Action) -> CoreResult<Outcome> {
        let dispatch_id = Uuid::new_v4();
        let span = info_span!("dispatch", %dispatch_id, action = action.tag());
        async move {
            let result = self.run(action).await;
            match &result {
                Ok(outcome) => info!("{}", outcome.notice.message()),
                Err(e) => error!(kind = ?e.kind, "Dispatch failed: {}", e),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, action: Action) -> CoreResult<Outcome> {
        let request = {
            let workspace = self.workspace.lock().await;
            check_preconditions(&action, &workspace)?;
            workspace.build_request(action)
        };

        let _guard = self.busy.enter();
        let reply = self.generation.send(&request).await?;
        let tag = request.action.tag();
        let notice = Notice::for_action(&request.action);

        match normalizer::normalize(&request.action, reply)? {
            Normalized::Content(result) => {
                self.workspace.lock().await.apply_result(&result);
                self.cache.save(&result).await;
                Ok(Outcome {
                    action: tag,
                    notice,
                    result: Some(result),
                })
            }
            Normalized::Acknowledged => Ok(Outcome {
                action: tag,
                notice,
                result: None,
            }),
            Normalized::Calendar(_) => Err(CoreError::new(
                ErrorKind::UnexpectedShape,
                "The generation endpoint answered with a calendar list",
            )),
        }
    }
}

fn check_preconditions(action: &Action, workspace: &Workspace) -> CoreResult<()> {
    if action.is_post_class() && workspace.draft.trim().is_empty() {
        return Err(CoreError::new(
            ErrorKind::Rejected,
            "There is no draft to send",
        ));
    }
    if matches!(action, Action::Schedule) && workspace.scheduled_date.is_none() {
        return Err(CoreError::new(
            ErrorKind::Rejected,
            "Pick a date before scheduling",
        ));
    }
    Ok(())
}
