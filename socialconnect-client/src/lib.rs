mod data;
mod forms;
mod gateway;
mod rewards;
mod session;

use std::result::Result;
use std::sync::Arc;

pub use data::*;
pub use forms::*;
pub use gateway::*;
pub use rewards::*;
pub use session::*;

use socialconnect_store::CollectionStore;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

/// The SocialConnect client system, facilitating authentication, role feeds,
/// comments, contact, and the reward wheel.
pub struct SocialConnect<S, P> {
    gateway: Arc<Gateway<S>>,

    pub session: Session<P>,
    pub rewards: RewardEngine<S, P>,
}

#[derive(Debug, Error)]
pub enum ClientError {
    /// No account matches the submitted identifier
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Username is already taken")]
    UsernameTaken,
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("Comment text is empty")]
    EmptyComment,
    /// A form failed its client-side validation
    #[error("Form is invalid: {0}")]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl<S, P> SocialConnect<S, P>
where
    S: CollectionStore,
    P: SnapshotStorage,
{
    /// Creates the client system, restoring any persisted session.
    pub fn new(store: S, storage: P) -> Self {
        let store = Arc::new(store);
        let gateway = Arc::new(Gateway::new(&store));
        let session = Session::restore(storage);
        let rewards = RewardEngine::new(&gateway, &session);

        Self {
            gateway,
            session,
            rewards,
        }
    }

    /// Creates an account and logs it in.
    ///
    /// The username pre-check and the write are not atomic; a concurrent
    /// signup racing the same username can still land.
    pub async fn signup(&self, form: SignupForm) -> Result<UserData, ClientError> {
        form.validate()?;

        if self.gateway.username_exists(&form.username).await {
            return Err(ClientError::UsernameTaken);
        }

        let user = self
            .gateway
            .create_user(NewUser {
                username: form.username,
                email: form.email,
                phone: form.phone,
            })
            .await?;

        self.session.login(user.clone());

        Ok(user)
    }

    /// Logs in by username, email, or phone. The password is accepted
    /// without verification; this mechanism has no credential check at all.
    pub async fn login(&self, form: LoginForm) -> Result<UserData, ClientError> {
        form.validate()?;

        let user = self
            .gateway
            .user_by_identifier(&form.identifier)
            .await?
            .ok_or(ClientError::InvalidCredentials)?;

        self.session.login(user.clone());

        Ok(user)
    }

    /// Logs out and deletes the persisted session snapshot.
    pub fn logout(&self) {
        self.session.logout();
    }

    /// The feed for a role, or every video when no category is given.
    pub async fn videos(&self, category: Option<Role>) -> Result<Vec<VideoData>, ClientError> {
        Ok(self.gateway.list_videos(category).await?)
    }

    /// The comments under a video, newest first.
    pub async fn comments(&self, video_id: &str) -> Result<Vec<CommentData>, ClientError> {
        let mut comments = self.gateway.comments_by_video(video_id).await?;
        sort_newest_first(&mut comments);

        Ok(comments)
    }

    /// Posts a comment as the current user. Whitespace-only text is rejected
    /// before anything reaches the store.
    pub async fn post_comment(
        &self,
        video_id: &str,
        text: &str,
    ) -> Result<CommentData, ClientError> {
        let user = self.session.current_user().ok_or(ClientError::NotLoggedIn)?;

        if text.trim().is_empty() {
            return Err(ClientError::EmptyComment);
        }

        let comment = self
            .gateway
            .create_comment(NewComment {
                video_id: video_id.to_string(),
                user_id: user.id,
                username: user.username,
                text: text.to_string(),
            })
            .await?;

        Ok(comment)
    }

    /// Sends a contact message; delivery has no receipt beyond the write
    /// succeeding.
    pub async fn send_contact(&self, form: ContactForm) -> Result<(), ClientError> {
        form.validate()?;

        self.gateway
            .create_contact_submission(ContactMessage {
                name: form.name,
                email: form.email,
                message: form.message,
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use socialconnect_store::MemoryStore;

    use super::*;

    fn client() -> (
        SocialConnect<MemoryStore, MemorySnapshot>,
        MemoryStore,
        MemorySnapshot,
    ) {
        let store = MemoryStore::new();
        let snapshot = MemorySnapshot::new();
        let client = SocialConnect::new(store.clone(), snapshot.clone());

        (client, store, snapshot)
    }

    fn seed_alice(store: &MemoryStore) {
        store.insert(
            "users",
            "u1",
            json!({
                "username": "alice",
                "email": "alice@example.com",
                "phone": "111",
                "cards": [],
            }),
        );
    }

    fn signup_form(username: &str) -> SignupForm {
        SignupForm {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            phone: "555".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[tokio::test]
    async fn test_signup_rejects_taken_username() {
        let (client, store, _snapshot) = client();
        seed_alice(&store);

        let result = client.signup(signup_form("alice")).await;

        assert!(matches!(result, Err(ClientError::UsernameTaken)));
        assert!(!client.session.is_logged_in());
    }

    #[tokio::test]
    async fn test_signup_logs_in_and_persists_the_session() {
        let (client, _store, snapshot) = client();

        let user = client.signup(signup_form("carol")).await.unwrap();

        assert!(user.cards.is_empty());
        assert_eq!(client.session.current_user().unwrap().id, user.id);
        assert!(snapshot.raw().is_some());
    }

    #[tokio::test]
    async fn test_login_accepts_any_password_for_a_known_identifier() {
        let (client, store, _snapshot) = client();
        seed_alice(&store);

        let user = client
            .login(LoginForm {
                identifier: "alice@example.com".to_string(),
                password: "wrong password".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(user.username, "alice");
        assert!(client.session.is_logged_in());
    }

    #[tokio::test]
    async fn test_login_with_unknown_identifier_is_invalid_credentials() {
        let (client, store, _snapshot) = client();
        seed_alice(&store);

        let result = client
            .login(LoginForm {
                identifier: "nobody".to_string(),
                password: "anything".to_string(),
            })
            .await;

        assert!(matches!(result, Err(ClientError::InvalidCredentials)));
        assert!(!client.session.is_logged_in());
    }

    #[tokio::test]
    async fn test_login_validates_the_form_first() {
        let (client, _store, _snapshot) = client();

        let result = client
            .login(LoginForm {
                identifier: String::new(),
                password: "anything".to_string(),
            })
            .await;

        assert!(matches!(result, Err(ClientError::Validation(_))));
    }

    #[tokio::test]
    async fn test_logout_clears_the_persisted_snapshot() {
        let (client, store, snapshot) = client();
        seed_alice(&store);

        client
            .login(LoginForm {
                identifier: "alice".to_string(),
                password: "x".to_string(),
            })
            .await
            .unwrap();
        assert!(snapshot.raw().is_some());

        client.logout();

        assert!(!client.session.is_logged_in());
        assert!(snapshot.raw().is_none());
    }

    #[tokio::test]
    async fn test_comments_come_back_newest_first() {
        let (client, store, _snapshot) = client();

        for (key, created_at) in [
            ("c1", "2024-01-01T00:00:00Z"),
            ("c2", "2024-01-03T00:00:00Z"),
            ("c3", "2024-01-02T00:00:00Z"),
        ] {
            store.insert(
                "comments",
                key,
                json!({
                    "videoId": "v1",
                    "userId": "u1",
                    "username": "alice",
                    "text": key,
                    "createdAt": created_at,
                }),
            );
        }

        let comments = client.comments("v1").await.unwrap();

        let order: Vec<_> = comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(order, vec!["c2", "c3", "c1"]);
    }

    #[tokio::test]
    async fn test_posting_requires_a_session() {
        let (client, _store, _snapshot) = client();

        let result = client.post_comment("v1", "hello").await;

        assert!(matches!(result, Err(ClientError::NotLoggedIn)));
    }

    #[tokio::test]
    async fn test_whitespace_comment_never_reaches_the_store() {
        let (client, store, _snapshot) = client();
        seed_alice(&store);

        client
            .login(LoginForm {
                identifier: "alice".to_string(),
                password: "x".to_string(),
            })
            .await
            .unwrap();

        let result = client.post_comment("v1", " \t\n ").await;

        assert!(matches!(result, Err(ClientError::EmptyComment)));
        assert!(client.comments("v1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_posted_comment_carries_the_session_author() {
        let (client, store, _snapshot) = client();
        seed_alice(&store);

        client
            .login(LoginForm {
                identifier: "alice".to_string(),
                password: "x".to_string(),
            })
            .await
            .unwrap();

        let comment = client.post_comment("v1", "first!").await.unwrap();

        assert_eq!(comment.user_id, "u1");
        assert_eq!(comment.username, "alice");

        let listed = client.comments("v1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, comment.id);
    }

    #[tokio::test]
    async fn test_contact_form_is_validated_then_submitted() {
        let (client, store, _snapshot) = client();

        let invalid = client
            .send_contact(ContactForm {
                name: "alice".to_string(),
                email: "not-an-email".to_string(),
                message: "hi".to_string(),
            })
            .await;
        assert!(matches!(invalid, Err(ClientError::Validation(_))));

        client
            .send_contact(ContactForm {
                name: "alice".to_string(),
                email: "alice@example.com".to_string(),
                message: "hi".to_string(),
            })
            .await
            .unwrap();

        let submissions = store.fetch_all("contact_submissions").await.unwrap();
        assert_eq!(submissions.len(), 1);
    }
}
