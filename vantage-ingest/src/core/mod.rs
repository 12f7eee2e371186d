//! Ingestion core: stream state, session reconciliation, drift repair

pub mod chatters;
pub mod drift;
pub mod reconciler;
pub mod stream_state;
