use course_core::model::LessonId;

use super::{HttpBackend, connection, send};
use crate::repository::{ProgressRecord, ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for HttpBackend {
    async fn get_progress(&self, lesson: LessonId) -> Result<Option<ProgressRecord>, StorageError> {
        match send(self.get(&format!("lesson-progress/{lesson}/"))).await {
            Ok(response) => response
                .json::<ProgressRecord>()
                .await
                .map(Some)
                .map_err(connection),
            Err(StorageError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn put_progress(
        &self,
        lesson: LessonId,
        record: &ProgressRecord,
    ) -> Result<(), StorageError> {
        send(self.put(&format!("lesson-progress/{lesson}/")).json(record)).await?;
        Ok(())
    }
}
