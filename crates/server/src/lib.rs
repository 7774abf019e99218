use std::sync::Arc;

use db::DBService;
use services::services::{
    calendar::CalendarService,
    catalog::CatalogService,
    chat_assistant::ChatAssistant,
    claude_api::ChatCompletion,
    feed::FeedService,
    invitation::InvitationService,
    membership::MembershipService,
    notification::NotificationService,
    rate_limit::ChatSessions,
    realtime::RealtimeHub,
    recommendation::RecommendationService,
    storage::ObjectStorage,
};

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub db: DBService,
    pub realtime: RealtimeHub,
    pub notifications: NotificationService,
    pub recommendations: RecommendationService,
    pub catalog: CatalogService,
    pub membership: MembershipService,
    pub feed: FeedService,
    pub invitations: InvitationService,
    pub calendar: CalendarService,
    pub chat: ChatAssistant,
    pub chat_sessions: Arc<ChatSessions>,
    pub storage: Arc<dyn ObjectStorage>,
}

impl AppState {
    pub fn new(
        db: DBService,
        completion: Arc<dyn ChatCompletion>,
        storage: Arc<dyn ObjectStorage>,
        chat_log_enabled: bool,
        chat_rate_limit: usize,
    ) -> Self {
        let pool = db.pool.clone();
        let realtime = RealtimeHub::new();
        let notifications = NotificationService::new(pool.clone(), realtime.clone());
        let chat_sessions = Arc::new(ChatSessions::per_minute(chat_rate_limit));

        Self {
            recommendations: RecommendationService::new(&db),
            catalog: CatalogService::new(pool.clone()),
            membership: MembershipService::new(pool.clone()),
            feed: FeedService::new(pool.clone(), notifications.clone(), realtime.clone()),
            invitations: InvitationService::new(pool.clone(), notifications.clone()),
            calendar: CalendarService::new(pool.clone(), notifications.clone(), realtime.clone()),
            chat: ChatAssistant::new(pool, completion, chat_sessions.clone(), chat_log_enabled),
            chat_sessions,
            storage,
            notifications,
            realtime,
            db,
        }
    }
}
