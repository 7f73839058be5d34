pub mod auth_service;
pub mod chat_service;
pub mod render_service;
pub mod transport_service;
pub mod view_service;
