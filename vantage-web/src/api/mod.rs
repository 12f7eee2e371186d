//! HTTP API handlers for vantage-web

pub mod error;
pub mod health;
pub mod leaderboards;
pub mod profiles;
pub mod streams;

pub use error::ApiError;
pub use health::health_check;
pub use leaderboards::user_leaderboard;
pub use profiles::viewer_profile;
pub use streams::{list_streams, stream_detail};
