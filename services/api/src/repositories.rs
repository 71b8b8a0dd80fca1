//! Repositories for document store operations
//!
//! One repository per collection, each a typed [`Collection`] plus the
//! queries its handlers need.

use common::store::{Collection, DocumentStore};
use std::sync::Arc;

pub mod comment;
pub mod like;
pub mod playlist;
pub mod subscription;
pub mod tweet;
pub mod user;
pub mod video;

pub use comment::CommentRepository;
pub use like::LikeRepository;
pub use playlist::PlaylistRepository;
pub use subscription::SubscriptionRepository;
pub use tweet::TweetRepository;
pub use user::UserRepository;
pub use video::VideoRepository;

/// Every repository over one store
#[derive(Clone)]
pub struct Repositories {
    pub users: UserRepository,
    pub videos: VideoRepository,
    pub comments: CommentRepository,
    pub likes: LikeRepository,
    pub tweets: TweetRepository,
    pub playlists: PlaylistRepository,
    pub subscriptions: SubscriptionRepository,
}

impl Repositories {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            users: UserRepository::new(store.clone()),
            videos: VideoRepository::new(store.clone()),
            comments: CommentRepository::new(store.clone()),
            likes: LikeRepository::new(store.clone()),
            tweets: TweetRepository::new(store.clone()),
            playlists: PlaylistRepository::new(store.clone()),
            subscriptions: SubscriptionRepository::new(store),
        }
    }
}

pub(crate) fn collection<T>(store: Arc<dyn DocumentStore>, name: &'static str) -> Collection<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    Collection::new(store, name)
}
