#![forbid(unsafe_code)]

pub mod http;
pub mod repository;
pub mod token;

pub use http::{BackendConfig, HttpBackend, HttpInitError};
pub use repository::{
    AuthRepository, CourseRepository, InMemoryRepository, LoginGrant, ProgressRecord,
    ProgressRepository, Storage, StorageError, UserRecord,
};
pub use token::{InMemoryTokenStore, TokenStore};
