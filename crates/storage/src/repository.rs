use async_trait::async_trait;
use course_core::model::{CourseId, LessonId, LessonProgress, RawCourse};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("not authorized")]
    Unauthorized,

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("backend responded with status {0}")]
    HttpStatus(u16),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of a lesson's progress.
///
/// This mirrors the domain `LessonProgress` so backends can serialize it
/// without leaking wire concerns into the domain layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub watched_time: f64,
    pub completed: bool,
}

impl ProgressRecord {
    #[must_use]
    pub fn from_progress(progress: &LessonProgress) -> Self {
        Self {
            watched_time: progress.watched_time,
            completed: progress.completed,
        }
    }

    #[must_use]
    pub fn into_progress(self) -> LessonProgress {
        LessonProgress::new(self.watched_time, self.completed)
    }
}

/// Account details returned alongside a login token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    pub token: String,
    pub user: Option<UserRecord>,
}

/// Read access to course structures.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Fetch the nested structure of a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist, or other storage errors.
    async fn get_structure(&self, id: CourseId) -> Result<RawCourse, StorageError>;
}

/// Remote store of per-lesson progress.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch stored progress; `Ok(None)` when the lesson was never watched.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_progress(&self, lesson: LessonId) -> Result<Option<ProgressRecord>, StorageError>;

    /// Overwrite stored progress for a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write is not accepted.
    async fn put_progress(&self, lesson: LessonId, record: &ProgressRecord)
    -> Result<(), StorageError>;
}

/// Credential exchange.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    /// Exchange email and password for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Rejected` with the backend's reason on bad credentials.
    async fn login(&self, email: &str, password: &str) -> Result<LoginGrant, StorageError>;
}

struct Account {
    password: String,
    user: UserRecord,
}

/// Simple in-memory backend for testing and prototyping.
///
/// Records every accepted progress write so callers can inspect write
/// coalescing, and can be switched into failing reads or writes.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    courses: Arc<Mutex<HashMap<CourseId, RawCourse>>>,
    progress: Arc<Mutex<HashMap<LessonId, ProgressRecord>>>,
    writes: Arc<Mutex<Vec<(LessonId, ProgressRecord)>>>,
    accounts: Arc<Mutex<HashMap<String, Account>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a course structure under its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the structure has no usable id.
    pub fn insert_course(&self, course: RawCourse) -> Result<CourseId, StorageError> {
        let id = course
            .id
            .as_ref()
            .and_then(course_core::model::RawId::as_u64)
            .map(CourseId::new)
            .ok_or_else(|| StorageError::Serialization("course without id".into()))?;
        lock(&self.courses)?.insert(id, course);
        Ok(id)
    }

    /// Seed stored progress without recording a write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store is poisoned.
    pub fn seed_progress(&self, lesson: LessonId, record: ProgressRecord) -> Result<(), StorageError> {
        lock(&self.progress)?.insert(lesson, record);
        Ok(())
    }

    /// Register credentials accepted by `login`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store is poisoned.
    pub fn add_account(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<(), StorageError> {
        lock(&self.accounts)?.insert(
            email.to_owned(),
            Account {
                password: password.to_owned(),
                user: UserRecord {
                    email: email.to_owned(),
                    full_name: full_name.map(str::to_owned),
                },
            },
        );
        Ok(())
    }

    /// Every accepted progress write, oldest first.
    #[must_use]
    pub fn writes(&self) -> Vec<(LessonId, ProgressRecord)> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Accepted writes for one lesson.
    #[must_use]
    pub fn writes_for(&self, lesson: LessonId) -> Vec<ProgressRecord> {
        self.writes()
            .into_iter()
            .filter(|(id, _)| *id == lesson)
            .map(|(_, r)| r)
            .collect()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

fn lock<T>(m: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>, StorageError> {
    m.lock().map_err(|e| StorageError::Connection(e.to_string()))
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn get_structure(&self, id: CourseId) -> Result<RawCourse, StorageError> {
        lock(&self.courses)?
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(&self, lesson: LessonId) -> Result<Option<ProgressRecord>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("progress reads disabled".into()));
        }
        Ok(lock(&self.progress)?.get(&lesson).copied())
    }

    async fn put_progress(
        &self,
        lesson: LessonId,
        record: &ProgressRecord,
    ) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("progress writes disabled".into()));
        }
        lock(&self.progress)?.insert(lesson, *record);
        lock(&self.writes)?.push((lesson, *record));
        Ok(())
    }
}

#[async_trait]
impl AuthRepository for InMemoryRepository {
    async fn login(&self, email: &str, password: &str) -> Result<LoginGrant, StorageError> {
        let accounts = lock(&self.accounts)?;
        match accounts.get(email) {
            Some(account) if account.password == password => Ok(LoginGrant {
                token: format!("token-{email}"),
                user: Some(account.user.clone()),
            }),
            _ => Err(StorageError::Rejected("invalid credentials".into())),
        }
    }
}

/// Aggregates backend repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub auth: Arc<dyn AuthRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from(InMemoryRepository::new())
    }
}

impl From<InMemoryRepository> for Storage {
    fn from(repo: InMemoryRepository) -> Self {
        Self {
            courses: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            auth: Arc::new(repo),
        }
    }
}
