#![forbid(unsafe_code)]

pub mod content;
pub mod document;
pub mod repository;
pub mod sqlite;

pub use repository::{KeyValueStore, Storage, StorageError};
