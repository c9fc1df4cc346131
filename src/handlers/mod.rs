pub mod chat;
pub mod endpoints;
