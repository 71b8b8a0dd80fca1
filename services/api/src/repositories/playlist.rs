//! Playlist repository

use common::error::StoreResult;
use common::store::{Collection, DocumentStore, Filter, Update};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Playlist, collections::PLAYLISTS};

#[derive(Clone)]
pub struct PlaylistRepository {
    playlists: Collection<Playlist>,
}

impl PlaylistRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            playlists: super::collection(store, PLAYLISTS),
        }
    }

    pub async fn create(&self, playlist: &Playlist) -> StoreResult<Playlist> {
        self.playlists.insert(playlist).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Playlist>> {
        self.playlists.find_by_id(id).await
    }

    pub async fn update_details(
        &self,
        id: Uuid,
        name: &str,
        description: &str,
    ) -> StoreResult<Option<Playlist>> {
        self.playlists
            .update_by_id(
                id,
                &[
                    Update::set("name", name),
                    Update::set("description", description),
                ],
            )
            .await
    }

    /// Append a video unless it is already listed
    pub async fn add_video(&self, id: Uuid, video: Uuid) -> StoreResult<Option<Playlist>> {
        self.playlists
            .update_by_id(
                id,
                &[Update::AddToSet("videos".to_string(), video.to_string().into())],
            )
            .await
    }

    pub async fn remove_video(&self, id: Uuid, video: Uuid) -> StoreResult<Option<Playlist>> {
        self.playlists
            .update_by_id(
                id,
                &[Update::Pull("videos".to_string(), video.to_string().into())],
            )
            .await
    }

    pub async fn delete(&self, id: Uuid) -> StoreResult<Option<Playlist>> {
        self.playlists.delete_one(&Filter::id(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::store::MemoryStore;

    #[tokio::test]
    async fn test_videos_keep_set_semantics_and_order() {
        let repo = PlaylistRepository::new(Arc::new(MemoryStore::new()));
        let playlist = repo
            .create(&Playlist::new(Uuid::new_v4(), "Mix".to_string(), "Songs".to_string()))
            .await
            .unwrap();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        repo.add_video(playlist.id, a).await.unwrap();
        repo.add_video(playlist.id, b).await.unwrap();
        let updated = repo.add_video(playlist.id, a).await.unwrap().unwrap();
        assert_eq!(updated.videos, vec![a, b]);

        let updated = repo.remove_video(playlist.id, a).await.unwrap().unwrap();
        assert_eq!(updated.videos, vec![b]);
    }
}
