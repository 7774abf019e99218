//! The Nesti family assistant: a single-turn proxy to a completion API.

use std::sync::Arc;

use db::models::chat_message::ChatMessage;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::{claude_api::ChatCompletion, rate_limit::ChatSessions};

pub const SYSTEM_PERSONA: &str = "Tu es Nesti, l'assistant bienveillant d'un réseau social familial. \
Tu aides les familles à organiser leur quotidien, à trouver des activités à partager entre \
générations et à garder le lien. Réponds avec chaleur et concision, toujours dans la langue \
de l'utilisateur.";
pub const MAX_OUTPUT_TOKENS: u32 = 500;
pub const FALLBACK_REPLY: &str = "Désolé, je ne peux pas répondre pour le moment. \
Réessaie dans quelques instants !";
const MAX_MESSAGE_CHARS: usize = 4000;
const DEFAULT_HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Too many messages, slow down")]
    RateLimited,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct ChatReply {
    pub reply: String,
    pub fallback: bool, // The completion API failed and `reply` is the canned message
}

#[derive(Clone)]
pub struct ChatAssistant {
    pool: SqlitePool,
    completion: Arc<dyn ChatCompletion>,
    sessions: Arc<ChatSessions>,
    log_exchanges: bool,
}

impl ChatAssistant {
    pub fn new(
        pool: SqlitePool,
        completion: Arc<dyn ChatCompletion>,
        sessions: Arc<ChatSessions>,
        log_exchanges: bool,
    ) -> Self {
        Self {
            pool,
            completion,
            sessions,
            log_exchanges,
        }
    }

    /// Answer one message. Completion failures become the fallback reply, never an error.
    pub async fn reply(&self, user_id: Uuid, message: &str) -> Result<ChatReply, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::Validation("Message cannot be empty".to_string()));
        }
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ChatError::Validation(format!(
                "Message is longer than {MAX_MESSAGE_CHARS} characters"
            )));
        }
        if !self.sessions.check(user_id) {
            return Err(ChatError::RateLimited);
        }

        let reply = match self
            .completion
            .complete(SYSTEM_PERSONA, message, MAX_OUTPUT_TOKENS)
            .await
        {
            Ok(text) => ChatReply {
                reply: text,
                fallback: false,
            },
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Chat completion failed, using fallback reply");
                ChatReply {
                    reply: FALLBACK_REPLY.to_string(),
                    fallback: true,
                }
            }
        };

        if self.log_exchanges {
            // Best effort.
            if let Err(e) =
                ChatMessage::create(&self.pool, user_id, message, &reply.reply, reply.fallback).await
            {
                warn!(user_id = %user_id, error = %e, "Failed to log chat exchange");
            }
        }
        info!(user_id = %user_id, fallback = reply.fallback, "Chat reply sent");
        Ok(reply)
    }

    pub async fn history(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, 500);
        Ok(ChatMessage::find_by_user_id(&self.pool, user_id, limit).await?)
    }

    /// Drop the user's rate-limit session (logout).
    pub fn end_session(&self, user_id: Uuid) -> bool {
        self.sessions.end(user_id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use db::{
        DBService,
        models::user::{CreateUser, User},
    };

    use super::*;
    use crate::services::claude_api::{ClaudeApiError, UnconfiguredCompletion};

    #[derive(Default)]
    struct RecordingCompletion {
        calls: Mutex<Vec<(String, String, u32)>>,
    }

    #[async_trait]
    impl ChatCompletion for RecordingCompletion {
        async fn complete(
            &self,
            system_persona: &str,
            user_message: &str,
            max_tokens: u32,
        ) -> Result<String, ClaudeApiError> {
            self.calls.lock().unwrap().push((
                system_persona.to_string(),
                user_message.to_string(),
                max_tokens,
            ));
            Ok(format!("echo: {user_message}"))
        }
    }

    async fn setup(
        completion: Arc<dyn ChatCompletion>,
        log_exchanges: bool,
        per_minute: usize,
    ) -> (ChatAssistant, Uuid) {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = Uuid::new_v4();
        User::create(
            &db.pool,
            &CreateUser {
                display_name: "Lina".to_string(),
                email: None,
                age: Some(15),
                role: None,
            },
            user_id,
        )
        .await
        .unwrap();
        let sessions = Arc::new(ChatSessions::per_minute(per_minute));
        (
            ChatAssistant::new(db.pool, completion, sessions, log_exchanges),
            user_id,
        )
    }

    #[tokio::test]
    async fn forwards_persona_and_logs_exchange() {
        let completion = Arc::new(RecordingCompletion::default());
        let (assistant, user_id) = setup(completion.clone(), true, 10).await;

        let reply = assistant.reply(user_id, "  Une idée pour dimanche ? ").await.unwrap();
        assert_eq!(reply.reply, "echo: Une idée pour dimanche ?");
        assert!(!reply.fallback);

        let calls = completion.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, SYSTEM_PERSONA);
        assert_eq!(calls[0].2, MAX_OUTPUT_TOKENS);

        let history = assistant.history(user_id, None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].assistant_reply, reply.reply);
    }

    #[tokio::test]
    async fn completion_failure_yields_fallback() {
        let (assistant, user_id) = setup(Arc::new(UnconfiguredCompletion), true, 10).await;
        let reply = assistant.reply(user_id, "Bonjour").await.unwrap();
        assert_eq!(reply.reply, FALLBACK_REPLY);
        assert!(reply.fallback);
        assert!(assistant.history(user_id, None).await.unwrap()[0].fallback);
    }

    #[tokio::test]
    async fn empty_message_never_reaches_the_api() {
        let completion = Arc::new(RecordingCompletion::default());
        let (assistant, user_id) = setup(completion.clone(), true, 10).await;
        assert!(matches!(
            assistant.reply(user_id, "   ").await,
            Err(ChatError::Validation(_))
        ));
        assert!(completion.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn logging_can_be_disabled() {
        let (assistant, user_id) = setup(Arc::new(RecordingCompletion::default()), false, 10).await;
        assistant.reply(user_id, "Salut").await.unwrap();
        assert!(assistant.history(user_id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rate_limit_resets_with_session() {
        let (assistant, user_id) = setup(Arc::new(RecordingCompletion::default()), false, 1).await;
        assistant.reply(user_id, "Un").await.unwrap();
        assert!(matches!(
            assistant.reply(user_id, "Deux").await,
            Err(ChatError::RateLimited)
        ));
        assert!(assistant.end_session(user_id));
        assert!(assistant.reply(user_id, "Trois").await.is_ok());
    }
}
