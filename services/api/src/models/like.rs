use chrono::{DateTime, Utc};
use common::store::Filter;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a like points at; stored as a single `video`, `comment` or `tweet`
/// field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeSubject {
    Video(Uuid),
    Comment(Uuid),
    Tweet(Uuid),
}

impl LikeSubject {
    /// Document field holding the subject id
    pub fn field(&self) -> &'static str {
        match self {
            LikeSubject::Video(_) => "video",
            LikeSubject::Comment(_) => "comment",
            LikeSubject::Tweet(_) => "tweet",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            LikeSubject::Video(id) | LikeSubject::Comment(id) | LikeSubject::Tweet(id) => *id,
        }
    }

    /// Every like on this subject
    pub fn filter(&self) -> Filter {
        Filter::eq(self.field(), self.id().to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub subject: LikeSubject,
    pub liked_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Like {
    pub fn new(subject: LikeSubject, liked_by: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            subject,
            liked_by,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::store::{from_document, to_document};

    #[test]
    fn test_subject_is_stored_as_one_field() {
        let video = Uuid::new_v4();
        let like = Like::new(LikeSubject::Video(video), Uuid::new_v4());
        let doc = to_document(&like).unwrap();

        assert_eq!(doc["video"], video.to_string());
        assert!(!doc.contains_key("comment"));
        assert!(doc.contains_key("likedBy"));

        let back: Like = from_document(doc).unwrap();
        assert_eq!(back.subject, LikeSubject::Video(video));
    }
}
