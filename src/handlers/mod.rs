pub mod auth_handler;
pub mod chat_handler;
pub mod view_handler;
