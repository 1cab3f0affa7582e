pub mod blog;
pub mod cache;
pub mod checkpoint;
pub mod fetcher;
pub mod oral_history;
pub mod transcript;
