//! YouTweet REST API
//!
//! Users, videos, comments, likes, tweets, playlists, subscriptions and a
//! creator dashboard on top of the document store.

pub mod config;
pub mod error;
pub mod extract;
pub mod mail;
pub mod middleware;
pub mod models;
pub mod read_models;
pub mod repositories;
pub mod response;
pub mod routes;
pub mod session;
pub mod state;

pub use config::AppConfig;
pub use routes::create_router;
pub use state::AppState;
