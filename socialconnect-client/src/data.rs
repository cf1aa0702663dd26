use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The audience a video targets, also used as an optional account tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Influencer,
    Seller,
}

/// A SocialConnect account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    pub id: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    /// Membership cards won so far, in the order they were won
    #[serde(default)]
    pub cards: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// A video in one of the role feeds. Created out-of-band; the client never
/// writes these.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoData {
    pub id: String,
    pub title: String,
    /// The playable URL
    pub url: String,
    pub thumbnail: Option<String>,
    pub description: String,
    pub category: Role,
    pub author: String,
}

impl VideoData {
    /// The thumbnail to display, falling back to a placeholder derived from
    /// the video's id when none is set.
    pub fn thumbnail_url(&self) -> String {
        self.thumbnail
            .as_deref()
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("https://picsum.photos/seed/{}/160/90", self.id))
    }

    /// The embeddable form of a watch-page URL, as players expect it.
    /// URLs without a watch path come back unchanged.
    pub fn embed_url(&self) -> String {
        self.url.replace("watch?v=", "embed/")
    }
}

/// A comment under a video
#[derive(Debug, Clone, PartialEq)]
pub struct CommentData {
    pub id: String,
    pub video_id: String,
    pub user_id: String,
    /// Denormalized at post time so display never needs a user lookup
    pub username: String,
    pub text: String,
    /// Stamped by the posting client's wall clock
    pub created_at: DateTime<Utc>,
    /// Attached out-of-band by a separate administrative surface
    pub admin_reply: Option<String>,
}

/// Sorts comments for display, newest first.
pub fn sort_newest_first(comments: &mut [CommentData]) {
    comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// A new account, written with an empty card list
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub phone: String,
}

/// A partial account update; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdatedUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<String>>,
}

impl UpdatedUser {
    /// An update replacing only the card list
    pub fn with_cards(cards: Vec<String>) -> Self {
        Self {
            cards: Some(cards),
            ..Default::default()
        }
    }

    /// Shallow-merges the update into a user snapshot.
    pub fn apply_to(&self, user: &mut UserData) {
        if let Some(email) = &self.email {
            user.email = email.clone();
        }

        if let Some(phone) = &self.phone {
            user.phone = phone.clone();
        }

        if let Some(cards) = &self.cards {
            user.cards = cards.clone();
        }
    }
}

/// A comment about to be posted; the gateway stamps the timestamp
#[derive(Debug, Clone)]
pub struct NewComment {
    pub video_id: String,
    pub user_id: String,
    pub username: String,
    pub text: String,
}

/// A message for the contact inbox
#[derive(Debug, Clone, Serialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}
