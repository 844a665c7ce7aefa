// Session state storage

pub mod session_store;
