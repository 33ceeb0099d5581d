pub mod auth_service;
pub mod sanitize_service;
