// src/lib.rs

pub mod api;
pub mod cache;
pub mod config;
pub mod continuity;
pub mod db;
pub mod escalation;
pub mod knowledge;
pub mod llm;
pub mod memory;
pub mod services;
pub mod session;
pub mod state;
