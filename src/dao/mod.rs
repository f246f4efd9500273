/// Database model definitions.
pub mod models;
/// Session store abstraction and its backends.
pub mod session_store;
/// Storage abstraction layer for database operations.
pub mod storage;
