// Library root for the session auth service

pub mod api;
pub mod auth;
pub mod config;
pub mod core;
pub mod state;
