pub mod cache;
pub mod calendar;
pub mod dispatcher;
pub mod domain;
pub mod normalizer;
pub mod planner;
pub mod ports;

#[cfg(test)]
mod fakes;

pub use calendar::{CalendarEngine, NewPost};
pub use dispatcher::{BusyFlag, Dispatcher};
pub use domain::{
    Action, CalendarCommand, CalendarSnapshot, ContentLength, ContentRequest, ContentResult,
    ContentStyle, DictationFragment, DictationTarget, FormFields, ImageRef, Notice, Outcome,
    PendingChange, PostStatus, ReGenerateOptions, ScheduledPost, Workspace,
};
pub use planner::Planner;
pub use ports::{
    CacheStore, CalendarService, CoreError, CoreResult, ErrorKind, GenerationService, PortError,
    PortResult, RemoteReply, TranscriptionService,
};
