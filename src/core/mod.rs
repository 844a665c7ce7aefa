// Core domain: errors, models, session context and cookie signing

pub mod crypto;
pub mod errors;
pub mod models;
pub mod session;
