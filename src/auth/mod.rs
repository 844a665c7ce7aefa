// Authentication: credential storage, password hashing, service and middleware

pub mod audit_logger;
pub mod auth_middleware;
pub mod credential_store;
pub mod password;
pub mod service;
