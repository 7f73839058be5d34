pub mod authenticated_user;
pub mod chat_message;
pub mod client_state;
pub mod client_storage;
pub mod language;
pub mod session_id;
