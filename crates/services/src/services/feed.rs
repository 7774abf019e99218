//! Family feed: posts, comments, likes and shares.

use db::{
    entity::EntityKind,
    models::{
        notification::NotificationKind,
        post::{Comment, CreatePost, Post, Share},
        toggle_relation::ToggleRelation,
        user::User,
    },
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::{
    notification::NotificationService,
    realtime::RealtimeHub,
    toggle::{self, ToggleError, ToggleOutcome, ToggleResult},
};

const DEFAULT_FEED_LIMIT: i64 = 50;
const MAX_FEED_LIMIT: i64 = 200;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Toggle(#[from] ToggleError),
    #[error("{0}")]
    Validation(String),
    #[error("User not found")]
    UserNotFound,
    #[error("User has not joined a family")]
    NoFamily,
    #[error("Post not found")]
    PostNotFound,
    #[error("Comment not found")]
    CommentNotFound,
    #[error("Only the author can delete this")]
    Forbidden,
}

#[derive(Clone)]
pub struct FeedService {
    pool: SqlitePool,
    notifications: NotificationService,
    realtime: RealtimeHub,
}

impl FeedService {
    pub fn new(pool: SqlitePool, notifications: NotificationService, realtime: RealtimeHub) -> Self {
        Self {
            pool,
            notifications,
            realtime,
        }
    }

    /// Publish to the author's family. Text may be empty only when media is attached.
    pub async fn create_post(&self, author_id: Uuid, data: &CreatePost) -> Result<Post, FeedError> {
        let has_media = data
            .media_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty());
        if data.content.trim().is_empty() && !has_media {
            return Err(FeedError::Validation(
                "A post needs text or media".to_string(),
            ));
        }
        let author = User::find_by_id(&self.pool, author_id)
            .await?
            .ok_or(FeedError::UserNotFound)?;
        let family_id = author.family_id.ok_or(FeedError::NoFamily)?;

        let post = Post::create(&self.pool, Uuid::new_v4(), family_id, author_id, data).await?;
        info!(post_id = %post.id, family_id = %family_id, "Post created");
        self.realtime
            .publish(EntityKind::Post, Some(family_id), Some(author_id), &post);
        Ok(post)
    }

    pub async fn feed(&self, family_id: Uuid, limit: Option<i64>) -> Result<Vec<Post>, FeedError> {
        let limit = limit.unwrap_or(DEFAULT_FEED_LIMIT).clamp(1, MAX_FEED_LIMIT);
        Ok(Post::find_by_family_id(&self.pool, family_id, limit).await?)
    }

    pub async fn delete_post(&self, post_id: Uuid, user_id: Uuid) -> Result<(), FeedError> {
        if Post::delete_by_author(&self.pool, post_id, user_id).await? > 0 {
            return Ok(());
        }
        match Post::find_by_id(&self.pool, post_id).await? {
            Some(_) => Err(FeedError::Forbidden),
            None => Err(FeedError::PostNotFound),
        }
    }

    pub async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<ToggleResult, FeedError> {
        let post = self.post(post_id).await?;
        let outcome = toggle::toggle(&self.pool, ToggleRelation::PostLike, post_id, user_id).await?;
        if outcome == ToggleOutcome::Inserted && post.author_id != user_id {
            let title = format!("{} aime votre publication", self.actor_name(user_id).await);
            self.notifications
                .notify_best_effort(
                    post.author_id,
                    NotificationKind::Like,
                    title,
                    None,
                    Some(post_id),
                )
                .await;
        }
        Ok(outcome.into())
    }

    pub async fn like_count(&self, post_id: Uuid) -> Result<i64, FeedError> {
        Ok(ToggleRelation::PostLike.count(&self.pool, post_id).await?)
    }

    pub async fn is_liked(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, FeedError> {
        Ok(ToggleRelation::PostLike
            .exists(&self.pool, post_id, user_id)
            .await?)
    }

    pub async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> Result<Comment, FeedError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(FeedError::Validation(
                "Comment content cannot be empty".to_string(),
            ));
        }
        let post = self.post(post_id).await?;
        let comment = Comment::create(&self.pool, Uuid::new_v4(), post_id, author_id, content).await?;
        self.realtime.publish(
            EntityKind::Comment,
            Some(post.family_id),
            Some(author_id),
            &comment,
        );

        if post.author_id != author_id {
            let title = format!("{} a commenté votre publication", self.actor_name(author_id).await);
            self.notifications
                .notify_best_effort(
                    post.author_id,
                    NotificationKind::Comment,
                    title,
                    Some(comment.content.clone()),
                    Some(post_id),
                )
                .await;
        }
        Ok(comment)
    }

    pub async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>, FeedError> {
        Ok(Comment::find_by_post_id(&self.pool, post_id).await?)
    }

    pub async fn delete_comment(&self, comment_id: Uuid, user_id: Uuid) -> Result<(), FeedError> {
        if Comment::delete_by_author(&self.pool, comment_id, user_id).await? > 0 {
            return Ok(());
        }
        match Comment::find_by_id(&self.pool, comment_id).await? {
            Some(_) => Err(FeedError::Forbidden),
            None => Err(FeedError::CommentNotFound),
        }
    }

    pub async fn share(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        target_family_id: Option<Uuid>,
    ) -> Result<Share, FeedError> {
        let post = self.post(post_id).await?;
        let share = Share::create(&self.pool, post_id, user_id, target_family_id).await?;
        if post.author_id != user_id {
            let title = format!("{} a partagé votre publication", self.actor_name(user_id).await);
            self.notifications
                .notify_best_effort(
                    post.author_id,
                    NotificationKind::Share,
                    title,
                    None,
                    Some(post_id),
                )
                .await;
        }
        Ok(share)
    }

    pub async fn share_count(&self, post_id: Uuid) -> Result<i64, FeedError> {
        Ok(Share::count_by_post_id(&self.pool, post_id).await?)
    }

    async fn post(&self, post_id: Uuid) -> Result<Post, FeedError> {
        Post::find_by_id(&self.pool, post_id)
            .await?
            .ok_or(FeedError::PostNotFound)
    }

    async fn actor_name(&self, user_id: Uuid) -> String {
        match User::find_by_id(&self.pool, user_id).await {
            Ok(Some(user)) => user.display_name,
            _ => "Quelqu'un".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::{
            family::{CreateFamily, Family},
            notification::Notification,
            user::CreateUser,
        },
    };

    use super::*;

    struct Fixture {
        pool: SqlitePool,
        feed: FeedService,
        author: Uuid,
        reader: Uuid,
    }

    async fn setup() -> Fixture {
        let db = DBService::new_in_memory().await.unwrap();
        let mut ids = Vec::new();
        for name in ["Léa", "Noé"] {
            let id = Uuid::new_v4();
            User::create(
                &db.pool,
                &CreateUser {
                    display_name: name.to_string(),
                    email: None,
                    age: None,
                    role: None,
                },
                id,
            )
            .await
            .unwrap();
            ids.push(id);
        }
        let family = Family::create(
            &db.pool,
            Uuid::new_v4(),
            &CreateFamily {
                name: "Les Martin".to_string(),
                preferences: None,
            },
            ids[0],
        )
        .await
        .unwrap();
        for id in &ids {
            User::set_family(&db.pool, *id, Some(family.id)).await.unwrap();
        }

        let realtime = RealtimeHub::new();
        let notifications = NotificationService::new(db.pool.clone(), realtime.clone());
        Fixture {
            feed: FeedService::new(db.pool.clone(), notifications, realtime),
            pool: db.pool,
            author: ids[0],
            reader: ids[1],
        }
    }

    fn text_post(content: &str) -> CreatePost {
        CreatePost {
            content: content.to_string(),
            media_url: None,
        }
    }

    #[tokio::test]
    async fn empty_post_without_media_is_rejected() {
        let f = setup().await;
        assert!(matches!(
            f.feed.create_post(f.author, &text_post("   ")).await,
            Err(FeedError::Validation(_))
        ));
        let with_media = CreatePost {
            content: String::new(),
            media_url: Some("http://localhost/media/posts/a.jpg".to_string()),
        };
        assert!(f.feed.create_post(f.author, &with_media).await.is_ok());
    }

    #[tokio::test]
    async fn like_notifies_author_once_and_not_for_self_likes() {
        let f = setup().await;
        let post = f.feed.create_post(f.author, &text_post("Sortie au lac")).await.unwrap();

        assert!(f.feed.toggle_like(post.id, f.reader).await.unwrap().active);
        assert!(!f.feed.toggle_like(post.id, f.reader).await.unwrap().active);
        assert!(f.feed.toggle_like(post.id, f.author).await.unwrap().active);
        assert_eq!(f.feed.like_count(post.id).await.unwrap(), 1);

        let notes = Notification::find_by_user_id(&f.pool, f.author, false, 10)
            .await
            .unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::Like);
        assert_eq!(notes[0].reference_id, Some(post.id));
    }

    #[tokio::test]
    async fn only_the_author_deletes() {
        let f = setup().await;
        let post = f.feed.create_post(f.author, &text_post("Photo")).await.unwrap();
        let comment = f
            .feed
            .create_comment(post.id, f.reader, "Super !")
            .await
            .unwrap();

        assert!(matches!(
            f.feed.delete_comment(comment.id, f.author).await,
            Err(FeedError::Forbidden)
        ));
        f.feed.delete_comment(comment.id, f.reader).await.unwrap();

        assert!(matches!(
            f.feed.delete_post(post.id, f.reader).await,
            Err(FeedError::Forbidden)
        ));
        f.feed.delete_post(post.id, f.author).await.unwrap();
        assert!(matches!(
            f.feed.delete_post(post.id, f.author).await,
            Err(FeedError::PostNotFound)
        ));
    }

    #[tokio::test]
    async fn comments_and_shares_notify_the_author() {
        let f = setup().await;
        let post = f.feed.create_post(f.author, &text_post("Recette")).await.unwrap();

        assert!(matches!(
            f.feed.create_comment(post.id, f.reader, "  ").await,
            Err(FeedError::Validation(_))
        ));
        f.feed.create_comment(post.id, f.reader, "Miam").await.unwrap();
        f.feed.share(post.id, f.reader, None).await.unwrap();

        assert_eq!(f.feed.list_comments(post.id).await.unwrap().len(), 1);
        assert_eq!(f.feed.share_count(post.id).await.unwrap(), 1);
        let kinds: Vec<_> = Notification::find_by_user_id(&f.pool, f.author, true, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.kind)
            .collect();
        assert!(kinds.contains(&NotificationKind::Comment));
        assert!(kinds.contains(&NotificationKind::Share));
    }
}
