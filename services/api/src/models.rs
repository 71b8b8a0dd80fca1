//! Stored entities
//!
//! Each model maps one-to-one to a document in its collection. Field names
//! are camelCase and ids are UUID strings under `_id`.

pub mod comment;
pub mod like;
pub mod playlist;
pub mod subscription;
pub mod tweet;
pub mod user;
pub mod video;

pub use comment::Comment;
pub use like::{Like, LikeSubject};
pub use playlist::Playlist;
pub use subscription::Subscription;
pub use tweet::Tweet;
pub use user::{PublicUser, User};
pub use video::Video;

/// Collection names
pub mod collections {
    pub const USERS: &str = "users";
    pub const VIDEOS: &str = "videos";
    pub const COMMENTS: &str = "comments";
    pub const LIKES: &str = "likes";
    pub const TWEETS: &str = "tweets";
    pub const PLAYLISTS: &str = "playlists";
    pub const SUBSCRIPTIONS: &str = "subscriptions";
}
