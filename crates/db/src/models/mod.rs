pub mod activity;
pub mod chat_message;
pub mod family;
pub mod family_event;
pub mod invitation;
pub mod notification;
pub mod post;
pub mod suggestion;
pub mod toggle_relation;
pub mod user;
