pub mod collections;
pub mod config;
pub mod error;
pub mod export;
pub mod kv_store;
pub mod notifier;
pub mod settings;
pub mod storage;
pub mod timer_repository;
