//! vantage-ingest library - Twitch ingestion service
//!
//! Consumes normalized Twitch events and periodic polls, maintains the
//! single-channel stream/session state, and persists everything the
//! dashboard reads:
//!
//! - `core::stream_state` - in-memory "is a stream live, and which one"
//! - `core::reconciler` - open/close view sessions against chat presence
//! - `core::drift` - periodic repair of missed online/offline transitions
//! - `core::chatters` - chatter snapshot polling while live
//! - `lifecycle` - stream/segment row handling shared by events and repair
//! - `gateway` - persistence operations behind a trait seam
//! - `twitch` - Helix polling client and anonymous IRC chat feed
//! - `dispatch` - event fan-in with per-event error isolation

pub mod analytics;
pub mod core;
pub mod dispatch;
pub mod gateway;
pub mod lifecycle;
pub mod twitch;

pub use analytics::ViewerAnalytics;
pub use core::chatters::ChatterPoller;
pub use core::drift::DriftCorrectionPoller;
pub use core::reconciler::ViewerSessionReconciler;
pub use core::stream_state::StreamStateTracker;
pub use dispatch::EventDispatcher;
pub use gateway::{Gateway, SqliteGateway};
pub use lifecycle::StreamLifecycle;
