pub mod calendar;
pub mod catalog;
pub mod chat_assistant;
pub mod claude_api;
pub mod feed;
pub mod invitation;
pub mod membership;
pub mod notification;
pub mod rate_limit;
pub mod realtime;
pub mod recommendation;
pub mod storage;
pub mod toggle;
