pub mod cache;
pub mod calendar;
pub mod generation;
pub mod transcription;
pub mod webhook;

pub use cache::{FileCacheStore, MemoryCacheStore};
pub use calendar::WebhookCalendarAdapter;
pub use generation::WebhookGenerationAdapter;
pub use transcription::WebhookTranscriptionAdapter;
pub use webhook::WebhookClient;
