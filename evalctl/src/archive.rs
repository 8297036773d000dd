//! Run archive: history, search, and per-run curation.
//!
//! Curation mutations (favorite, tags, notes) are read-modify-write against
//! the [`EvaluationStore`] and return the updated run. Tags behave as a set:
//! whitespace is trimmed, empties dropped, and duplicates ignored. Notes are
//! append-only; an existing note is never overwritten, new text is appended
//! on its own line.

use crate::{
    errors::{Error, Result},
    evaluator::EvaluationRun,
    store::{EvaluationStore, RunFilter},
    types::RunId,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct EvaluationArchive {
    store: Arc<dyn EvaluationStore>,
}

impl EvaluationArchive {
    pub fn new(store: Arc<dyn EvaluationStore>) -> Self {
        Self { store }
    }

    /// Newest-first history, optionally filtered and truncated.
    pub async fn history(&self, filter: &RunFilter) -> Result<Vec<EvaluationRun>> {
        Ok(self.store.list(filter).await?)
    }

    pub async fn get(&self, id: RunId) -> Result<EvaluationRun> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound {
                resource: "Evaluation".to_string(),
                id: id.to_string(),
            })
    }

    pub async fn delete(&self, id: RunId) -> Result<()> {
        if !self.store.delete(id).await? {
            return Err(Error::NotFound {
                resource: "Evaluation".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    pub async fn toggle_favorite(&self, id: RunId) -> Result<EvaluationRun> {
        let mut run = self.get(id).await?;
        run.is_favorite = !run.is_favorite;
        self.store.update(&run).await?;
        Ok(run)
    }

    /// Add tags with set semantics; whitespace-only and duplicate entries
    /// are silently dropped.
    pub async fn add_tags(&self, id: RunId, tags: Vec<String>) -> Result<EvaluationRun> {
        let mut run = self.get(id).await?;
        for tag in tags {
            let tag = tag.trim();
            if tag.is_empty() {
                continue;
            }
            if !run.tags.iter().any(|existing| existing == tag) {
                run.tags.push(tag.to_string());
            }
        }
        self.store.update(&run).await?;
        Ok(run)
    }

    /// Append a note to the run. Blank input leaves the run untouched.
    pub async fn add_notes(&self, id: RunId, note: &str) -> Result<EvaluationRun> {
        let mut run = self.get(id).await?;
        let note = note.trim();
        if !note.is_empty() {
            if !run.notes.is_empty() {
                run.notes.push('\n');
            }
            run.notes.push_str(note);
            self.store.update(&run).await?;
        }
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryEvaluationStore;
    use chrono::Utc;

    async fn archive_with_run() -> (EvaluationArchive, RunId) {
        let store = Arc::new(InMemoryEvaluationStore::default());
        let run = EvaluationRun {
            id: RunId::new_v4(),
            prompt: "compare outputs".to_string(),
            requested_models: vec![],
            responses: vec![],
            created_by: None,
            tags: vec![],
            is_favorite: false,
            notes: String::new(),
            created_at: Utc::now(),
        };
        let id = run.id;
        store.create(&run).await.unwrap();
        (EvaluationArchive::new(store), id)
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (archive, _) = archive_with_run().await;
        let err = archive.get(RunId::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_toggle_favorite_flips_both_ways() {
        let (archive, id) = archive_with_run().await;
        assert!(archive.toggle_favorite(id).await.unwrap().is_favorite);
        assert!(!archive.toggle_favorite(id).await.unwrap().is_favorite);
    }

    #[tokio::test]
    async fn test_tags_have_set_semantics() {
        let (archive, id) = archive_with_run().await;
        archive
            .add_tags(id, vec!["baseline".to_string(), "  gpt4  ".to_string()])
            .await
            .unwrap();
        let run = archive
            .add_tags(id, vec!["baseline".to_string(), String::new(), "new".to_string()])
            .await
            .unwrap();
        assert_eq!(run.tags, vec!["baseline", "gpt4", "new"]);
    }

    #[tokio::test]
    async fn test_notes_append_without_overwriting() {
        let (archive, id) = archive_with_run().await;
        archive.add_notes(id, "first impression").await.unwrap();
        let run = archive.add_notes(id, "second pass").await.unwrap();
        assert_eq!(run.notes, "first impression\nsecond pass");

        // Blank input is a no-op
        let run = archive.add_notes(id, "   ").await.unwrap();
        assert_eq!(run.notes, "first impression\nsecond pass");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent_only_once() {
        let (archive, id) = archive_with_run().await;
        archive.delete(id).await.unwrap();
        assert!(matches!(archive.delete(id).await, Err(Error::NotFound { .. })));
    }
}
