use async_trait::async_trait;
use reqwest::{Method, Url};

use lms_core::model::{CompletedLesson, Lesson, LessonId, Session};

use super::mapping::{CompletedLessonRow, CompletionIdRow, CompletionRow, LessonRow, lesson_ids};
use super::{RemoteBackend, connection, storage_error};
use crate::repository::{
    CompletionRepository, CompletionWrite, LessonRepository, NewCompletion, StorageError,
};

const LESSONS: &str = "rest/v1/lessons";
const COMPLETED_LESSONS: &str = "rest/v1/completed_lessons";

fn table_url(backend: &RemoteBackend, table: &str, query: &[(&str, &str)]) -> Result<Url, StorageError> {
    let mut url = backend.config.endpoint(table)?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

fn student_filter(session: &Session) -> String {
    format!("eq.{}", session.student_id())
}

impl RemoteBackend {
    async fn fetch_rows<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        session: &Session,
    ) -> Result<Vec<T>, StorageError> {
        let response = self
            .authed(Method::GET, url, session)
            .send()
            .await
            .map_err(connection)?;
        if !response.status().is_success() {
            return Err(storage_error(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl LessonRepository for RemoteBackend {
    async fn list_lessons(&self, session: &Session) -> Result<Vec<Lesson>, StorageError> {
        let url = table_url(self, LESSONS, &[("select", "id,title,description")])?;
        let rows: Vec<LessonRow> = self.fetch_rows(url, session).await?;
        rows.into_iter().map(LessonRow::into_lesson).collect()
    }
}

#[async_trait]
impl CompletionRepository for RemoteBackend {
    async fn completed_lesson_ids(
        &self,
        session: &Session,
    ) -> Result<Vec<LessonId>, StorageError> {
        let filter = student_filter(session);
        let url = table_url(
            self,
            COMPLETED_LESSONS,
            &[("select", "lesson_id"), ("student_id", filter.as_str())],
        )?;
        let rows: Vec<CompletionIdRow> = self.fetch_rows(url, session).await?;
        lesson_ids(rows)
    }

    async fn completed_lessons(
        &self,
        session: &Session,
    ) -> Result<Vec<CompletedLesson>, StorageError> {
        let filter = student_filter(session);
        let url = table_url(
            self,
            COMPLETED_LESSONS,
            &[
                ("select", "completed_at,lesson:lessons(id,title,description)"),
                ("student_id", filter.as_str()),
                ("order", "completed_at.desc"),
            ],
        )?;
        let rows: Vec<CompletedLessonRow> = self.fetch_rows(url, session).await?;

        let mut completed = Vec::with_capacity(rows.len());
        for row in rows {
            match row.into_completed()? {
                Some(item) => completed.push(item),
                None => log::warn!("completion without a visible lesson skipped"),
            }
        }
        Ok(completed)
    }

    async fn insert_completion(
        &self,
        session: &Session,
        completion: NewCompletion,
    ) -> Result<CompletionWrite, StorageError> {
        let record = completion.into_record(session.student_id().clone());
        let url = table_url(
            self,
            COMPLETED_LESSONS,
            &[("on_conflict", "student_id,lesson_id")],
        )?;

        // Needs a unique (student_id, lesson_id) constraint on the table.
        let response = self
            .authed(Method::POST, url, session)
            .header("Prefer", "resolution=ignore-duplicates,return=representation")
            .json(&[CompletionRow::from_record(&record)])
            .send()
            .await
            .map_err(connection)?;
        if !response.status().is_success() {
            return Err(storage_error(response).await);
        }

        let rows: Vec<CompletionRow> = response
            .json()
            .await
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        completion_write_from(rows)
    }
}

/// An ignored duplicate comes back as an empty representation.
fn completion_write_from(mut rows: Vec<CompletionRow>) -> Result<CompletionWrite, StorageError> {
    match rows.pop() {
        Some(row) => Ok(CompletionWrite::Inserted(row.into_record()?)),
        None => Ok(CompletionWrite::Duplicate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::BackendConfig;
    use lms_core::model::{AccessToken, SessionUser, StudentId};
    use lms_core::time::fixed_now;

    fn backend() -> RemoteBackend {
        RemoteBackend::new(BackendConfig::new("https://demo.backend.test", "anon").unwrap())
    }

    #[test]
    fn student_filter_is_url_encoded() {
        let session = Session::new(
            SessionUser::new(StudentId::new("a b&c").unwrap(), None),
            AccessToken::new("t"),
        );
        let filter = student_filter(&session);
        let url = table_url(
            &backend(),
            COMPLETED_LESSONS,
            &[("select", "lesson_id"), ("student_id", filter.as_str())],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://demo.backend.test/rest/v1/completed_lessons?select=lesson_id&student_id=eq.a+b%26c"
        );
    }

    #[test]
    fn embedded_select_keeps_its_shape() {
        let url = table_url(
            &backend(),
            COMPLETED_LESSONS,
            &[("select", "completed_at,lesson:lessons(id,title,description)")],
        )
        .unwrap();
        let select = url
            .query_pairs()
            .find(|(key, _)| key == "select")
            .map(|(_, value)| value.into_owned());
        assert_eq!(
            select.as_deref(),
            Some("completed_at,lesson:lessons(id,title,description)")
        );
    }

    #[test]
    fn empty_insert_representation_is_a_duplicate() {
        let rows: Vec<CompletionRow> = serde_json::from_str("[]").unwrap();
        assert_eq!(completion_write_from(rows).unwrap(), CompletionWrite::Duplicate);
    }

    #[test]
    fn returned_insert_row_is_the_stored_record() {
        let rows: Vec<CompletionRow> = serde_json::from_str(
            r#"[{"student_id":"u-1","lesson_id":"l-1","completed_at":"2023-11-14T22:13:20Z"}]"#,
        )
        .unwrap();
        match completion_write_from(rows).unwrap() {
            CompletionWrite::Inserted(record) => {
                assert_eq!(record.lesson_id.as_str(), "l-1");
                assert_eq!(record.completed_at, fixed_now());
            }
            CompletionWrite::Duplicate => panic!("row reported as duplicate"),
        }
    }

    #[test]
    fn malformed_insert_row_is_a_serialization_error() {
        let rows: Vec<CompletionRow> = serde_json::from_str(
            r#"[{"student_id":"u-1","lesson_id":"","completed_at":"2023-11-14T22:13:20Z"}]"#,
        )
        .unwrap();
        assert!(matches!(
            completion_write_from(rows),
            Err(StorageError::Serialization(_))
        ));
    }
}
