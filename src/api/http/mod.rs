// src/api/http/mod.rs

pub mod chat;
pub mod handlers;
pub mod router;
pub mod session;

pub use router::app_router;
