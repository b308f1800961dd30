use course_core::model::{CourseId, RawCourse};

use super::{HttpBackend, connection, send};
use crate::repository::{CourseRepository, StorageError};

#[async_trait::async_trait]
impl CourseRepository for HttpBackend {
    async fn get_structure(&self, id: CourseId) -> Result<RawCourse, StorageError> {
        let response = send(self.get(&format!("courses/{id}/structure/"))).await?;
        response.json::<RawCourse>().await.map_err(connection)
    }
}
