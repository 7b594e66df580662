use crate::error::StorageError;

pub mod config;
pub mod documents;
pub mod nci_store;

type Result<T> = std::result::Result<T, StorageError>;
