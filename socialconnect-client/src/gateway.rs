use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use socialconnect_store::{CollectionStore, StoreError};
use thiserror::Error;

use crate::{CommentData, ContactMessage, NewComment, NewUser, Role, UpdatedUser, UserData, VideoData};

const USERS: &str = "users";
const VIDEOS: &str = "videos";
const COMMENTS: &str = "comments";
const CONTACT_SUBMISSIONS: &str = "contact_submissions";

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A stored record does not have the expected shape
    #[error("malformed {resource} record `{key}`: {source}")]
    Malformed {
        resource: &'static str,
        key: String,
        source: serde_json::Error,
    },
    /// A write payload could not be serialized
    #[error("failed to serialize {resource}: {source}")]
    Serialize {
        resource: &'static str,
        source: serde_json::Error,
    },
}

/// A user as stored, without its key
#[derive(Debug, Serialize, Deserialize)]
struct UserRecord {
    username: String,
    email: String,
    phone: String,
    #[serde(default)]
    cards: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<Role>,
}

#[derive(Debug, Deserialize)]
struct VideoRecord {
    title: String,
    url: String,
    #[serde(default)]
    thumbnail: Option<String>,
    description: String,
    category: Role,
    author: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentRecord {
    video_id: String,
    user_id: String,
    username: String,
    text: String,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    admin_reply: Option<String>,
}

impl UserRecord {
    fn into_data(self, id: String) -> UserData {
        UserData {
            id,
            username: self.username,
            email: self.email,
            phone: self.phone,
            cards: self.cards,
            role: self.role,
        }
    }
}

impl VideoRecord {
    fn into_data(self, id: String) -> VideoData {
        VideoData {
            id,
            title: self.title,
            url: self.url,
            thumbnail: self.thumbnail,
            description: self.description,
            category: self.category,
            author: self.author,
        }
    }
}

impl CommentRecord {
    fn into_data(self, id: String) -> CommentData {
        CommentData {
            id,
            video_id: self.video_id,
            user_id: self.user_id,
            username: self.username,
            text: self.text,
            created_at: self.created_at,
            admin_reply: self.admin_reply,
        }
    }
}

/// The data access gateway: every read and write against the remote
/// collection store goes through here, along with the client-side filtering
/// the store's query model cannot express.
pub struct Gateway<S> {
    store: Arc<S>,
}

impl<S> Gateway<S>
where
    S: CollectionStore,
{
    pub fn new(store: &Arc<S>) -> Self {
        Self {
            store: store.clone(),
        }
    }

    /// Returns true iff at least one account already uses `username`.
    ///
    /// Fails open: a store error reads as "not taken" so signup is never
    /// blocked on a flaky availability check, at the cost of admitting a
    /// duplicate while the store is unreachable.
    pub async fn username_exists(&self, username: &str) -> bool {
        match self.store.query_equal(USERS, "username", username).await {
            Ok(records) => !records.is_empty(),
            Err(e) => {
                warn!("username check failed, treating `{username}` as available: {e}");
                false
            }
        }
    }

    /// Creates an account with an empty card list.
    ///
    /// Uniqueness is only guarded by the `username_exists` pre-check; two
    /// concurrent signups racing the same username can both land.
    pub async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        let record = UserRecord {
            username: new_user.username,
            email: new_user.email,
            phone: new_user.phone,
            cards: Vec::new(),
            role: None,
        };

        let value = serialize("user", &record)?;
        let key = self.store.create(USERS, value).await?;

        Ok(record.into_data(key))
    }

    /// Finds the first account whose username, email, or phone equals
    /// `identifier`, in store-iteration order. No credential is checked;
    /// a miss is `Ok(None)`, never an error.
    pub async fn user_by_identifier(&self, identifier: &str) -> Result<Option<UserData>> {
        let records = self.store.fetch_all(USERS).await?;

        for (key, value) in records {
            let record: UserRecord = deserialize("user", &key, value)?;

            if record.username == identifier
                || record.email == identifier
                || record.phone == identifier
            {
                return Ok(Some(record.into_data(key)));
            }
        }

        Ok(None)
    }

    /// Lists videos in store-iteration order, narrowed to a category when
    /// one is given.
    pub async fn list_videos(&self, category: Option<Role>) -> Result<Vec<VideoData>> {
        let records = self.store.fetch_all(VIDEOS).await?;

        let mut videos = Vec::with_capacity(records.len());
        for (key, value) in records {
            let record: VideoRecord = deserialize("video", &key, value)?;
            videos.push(record.into_data(key));
        }

        if let Some(category) = category {
            videos.retain(|video| video.category == category);
        }

        Ok(videos)
    }

    /// Every comment under a video, in store-iteration order. Display code
    /// sorts these newest first.
    pub async fn comments_by_video(&self, video_id: &str) -> Result<Vec<CommentData>> {
        let records = self.store.fetch_all(COMMENTS).await?;

        let mut comments = Vec::new();
        for (key, value) in records {
            let record: CommentRecord = deserialize("comment", &key, value)?;

            if record.video_id == video_id {
                comments.push(record.into_data(key));
            }
        }

        Ok(comments)
    }

    /// Posts a comment, stamped with the wall clock at call time. The store
    /// never re-stamps, so a client with a wrong clock produces out-of-order
    /// timestamps.
    pub async fn create_comment(&self, new_comment: NewComment) -> Result<CommentData> {
        let record = CommentRecord {
            video_id: new_comment.video_id,
            user_id: new_comment.user_id,
            username: new_comment.username,
            text: new_comment.text,
            created_at: Utc::now(),
            admin_reply: None,
        };

        let value = serialize("comment", &record)?;
        let key = self.store.create(COMMENTS, value).await?;

        Ok(record.into_data(key))
    }

    /// Merge-writes a partial update into an account record. The merged
    /// record is not returned; callers apply the same delta locally.
    pub async fn update_user(&self, user_id: &str, update: &UpdatedUser) -> Result<()> {
        let value = serialize("user update", update)?;
        self.store.merge(USERS, user_id, value).await?;

        Ok(())
    }

    /// Fire-and-forget contact submission; a successful write is the only
    /// receipt.
    pub async fn create_contact_submission(&self, message: ContactMessage) -> Result<()> {
        let value = serialize("contact submission", &message)?;
        self.store.create(CONTACT_SUBMISSIONS, value).await?;

        Ok(())
    }
}

fn serialize<T>(resource: &'static str, value: &T) -> Result<Value>
where
    T: Serialize,
{
    serde_json::to_value(value).map_err(|source| GatewayError::Serialize { resource, source })
}

fn deserialize<T>(resource: &'static str, key: &str, value: Value) -> Result<T>
where
    T: DeserializeOwned,
{
    serde_json::from_value(value).map_err(|source| GatewayError::Malformed {
        resource,
        key: key.to_string(),
        source,
    })
}
