//! Debounced draft autosave and user-mediated draft restore.
//!
//! `DraftManager` keeps its own copy of the form in local storage under
//! `task-form-draft`, separate from the form store's persisted slice. Changes
//! are detected by comparing each observed form against the previous one; a
//! change (re)starts a quiet-period timer and the draft is written only once
//! edits have stopped for the whole debounce window.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::form::{TaskFormData, TaskFormPatch};
use crate::storage::{KeyValueStore, StorageError};
use crate::store::FormStateStore;

/// Storage key of the single global draft slot.
pub const DRAFT_KEY: &str = "task-form-draft";

/// Version written into every draft. Older versions are not migrated.
pub const DRAFT_VERSION: u32 = 1;

/// Errors surfaced by draft operations.
#[derive(Error, Debug)]
pub enum DraftError {
    #[error("No content to save")]
    NoContent,

    #[error("failed to store draft: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to encode draft: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("draft was discarded while saving")]
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftMetadata {
    pub last_saved: DateTime<Utc>,
    pub version: u32,
}

/// The persisted draft snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDraft {
    pub data: TaskFormData,
    pub metadata: DraftMetadata,
}

impl StoredDraft {
    /// Whole minutes between the save and `now`, rounded down.
    pub fn age_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.metadata.last_saved).num_minutes().max(0)
    }
}

/// Draft manager settings.
#[derive(Debug, Clone)]
pub struct DraftConfig {
    pub storage_key: String,
    /// Quiet period after the last change before an autosave fires.
    pub debounce: Duration,
    /// Artificial latency of a save, standing in for a future network call.
    pub save_latency: Duration,
}

impl Default for DraftConfig {
    fn default() -> Self {
        DraftConfig {
            storage_key: DRAFT_KEY.to_string(),
            debounce: Duration::from_secs(30),
            save_latency: Duration::from_millis(300),
        }
    }
}

/// Observable draft state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DraftStatus {
    pub is_draft_saving: bool,
    pub has_draft_changes: bool,
    pub last_saved_time: Option<DateTime<Utc>>,
}

/// A pending decision about a draft found at session start.
#[derive(Debug, Clone, PartialEq)]
pub struct RestorePrompt {
    pub draft: StoredDraft,
    pub age_minutes: i64,
}

#[derive(Default)]
struct DraftState {
    status: DraftStatus,
    // Bumped on every detected change; a save only clears the change flag
    // when no change arrived while it was in flight.
    generation: u64,
    // Bumped by every clear; a save started before a clear must not write.
    epoch: u64,
}

struct Shared {
    storage: Arc<dyn KeyValueStore>,
    config: DraftConfig,
    state: Mutex<DraftState>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, DraftState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The common save path of manual save and autosave.
    async fn write(&self, data: TaskFormData) -> Result<StoredDraft, DraftError> {
        let (started, epoch) = {
            let mut state = self.state();
            state.status.is_draft_saving = true;
            (state.generation, state.epoch)
        };
        if !self.config.save_latency.is_zero() {
            tokio::time::sleep(self.config.save_latency).await;
        }

        // The write happens under the state lock so a clear cannot slip in
        // between the epoch check and the storage update.
        let mut state = self.state();
        state.status.is_draft_saving = false;
        if state.epoch != epoch {
            return Err(DraftError::Discarded);
        }
        let draft = self.persist(data)?;
        state.status.last_saved_time = Some(draft.metadata.last_saved);
        if state.generation == started {
            state.status.has_draft_changes = false;
        }
        Ok(draft)
    }

    fn persist(&self, data: TaskFormData) -> Result<StoredDraft, DraftError> {
        let draft = StoredDraft {
            data,
            metadata: DraftMetadata {
                last_saved: Utc::now(),
                version: DRAFT_VERSION,
            },
        };
        let raw = serde_json::to_string(&draft)?;
        self.storage.set(&self.config.storage_key, &raw)?;
        info!(key = %self.config.storage_key, bytes = raw.len(), "draft saved");
        Ok(draft)
    }

    async fn autosave(&self, data: TaskFormData) {
        if !self.state().status.has_draft_changes {
            debug!("autosave skipped: no pending changes");
            return;
        }
        if !data.has_meaningful_content() {
            debug!("autosave skipped: no meaningful content");
            return;
        }
        match self.write(data).await {
            Ok(_) => {}
            Err(DraftError::Discarded) => debug!("autosave dropped: draft was cleared"),
            Err(e) => warn!(error = %e, "autosave failed; will retry after the next change"),
        }
    }
}

/// Durable, debounced draft storage for one form-editing session.
///
/// `observe` spawns its timer on the ambient tokio runtime. Dropping the
/// manager cancels any pending timer.
pub struct DraftManager {
    shared: Arc<Shared>,
    last_seen: Option<TaskFormData>,
    pending: Option<JoinHandle<()>>,
}

impl DraftManager {
    pub fn new(storage: Arc<dyn KeyValueStore>, config: DraftConfig) -> Self {
        DraftManager {
            shared: Arc::new(Shared {
                storage,
                config,
                state: Mutex::new(DraftState::default()),
            }),
            last_seen: None,
            pending: None,
        }
    }

    pub fn status(&self) -> DraftStatus {
        self.shared.state().status
    }

    pub fn is_draft_saving(&self) -> bool {
        self.status().is_draft_saving
    }

    pub fn has_draft_changes(&self) -> bool {
        self.status().has_draft_changes
    }

    pub fn last_saved_time(&self) -> Option<DateTime<Utc>> {
        self.status().last_saved_time
    }

    /// Compare `data` with the previously observed form and, on a change,
    /// restart the autosave timer. The first observation only sets the baseline.
    pub fn observe(&mut self, data: &TaskFormData) -> bool {
        let first = self.last_seen.is_none();
        if self.last_seen.as_ref() == Some(data) {
            return false;
        }
        self.last_seen = Some(data.clone());
        if first {
            return false;
        }
        {
            let mut state = self.shared.state();
            state.generation += 1;
            state.status.has_draft_changes = true;
        }
        self.schedule(data.clone());
        true
    }

    fn schedule(&mut self, data: TaskFormData) {
        self.cancel_pending();
        let shared = Arc::clone(&self.shared);
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(shared.config.debounce).await;
            // Once the window has elapsed the save runs to completion even if
            // the timer is reset meanwhile.
            tokio::spawn(async move { shared.autosave(data).await });
        }));
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Save immediately. Fails with `NoContent` when the form is not worth keeping.
    pub async fn save_draft(&self, data: &TaskFormData) -> Result<StoredDraft, DraftError> {
        if !data.has_meaningful_content() {
            return Err(DraftError::NoContent);
        }
        self.shared.write(data.clone()).await.map_err(|e| {
            warn!(error = %e, "manual draft save failed");
            e
        })
    }

    // Read and parse without side effects.
    fn peek(&self) -> Result<Option<StoredDraft>, StorageError> {
        let key = &self.shared.config.storage_key;
        let Some(raw) = self.shared.storage.get(key)? else {
            return Ok(None);
        };
        Ok(parse_stored_draft(&raw))
    }

    /// Read the stored draft. Invalid entries are deleted and reported as no draft.
    pub fn load_draft(&self) -> Option<StoredDraft> {
        let key = &self.shared.config.storage_key;
        let raw = match self.shared.storage.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to read draft");
                return None;
            }
        };
        match parse_stored_draft(&raw) {
            Some(draft) => Some(draft),
            None => {
                warn!(key = %key, "removing invalid draft");
                if let Err(e) = self.shared.storage.remove(key) {
                    warn!(key = %key, error = %e, "failed to remove invalid draft");
                }
                None
            }
        }
    }

    /// Load the draft into `store`. Returns whether a draft was applied.
    pub fn restore_draft(&mut self, store: &mut FormStateStore) -> bool {
        match self.load_draft() {
            Some(draft) => {
                self.apply(&draft, store);
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, draft: &StoredDraft, store: &mut FormStateStore) {
        self.cancel_pending();
        store.update_form_data(TaskFormPatch::from(draft.data.clone()));
        {
            let mut state = self.shared.state();
            state.status.last_saved_time = Some(draft.metadata.last_saved);
            state.status.has_draft_changes = false;
        }
        // The restored form is the new baseline, not a change to autosave.
        self.last_seen = Some(store.form_data().clone());
        info!(age_minutes = draft.age_minutes(Utc::now()), "draft restored");
    }

    /// Delete the stored draft and reset the draft state.
    ///
    /// A save already in flight is abandoned rather than written afterwards.
    pub fn clear_draft(&mut self) -> Result<(), DraftError> {
        self.cancel_pending();
        let mut state = self.shared.state();
        state.epoch += 1;
        self.shared.storage.remove(&self.shared.config.storage_key)?;
        state.status.last_saved_time = None;
        state.status.has_draft_changes = false;
        info!(key = %self.shared.config.storage_key, "draft cleared");
        Ok(())
    }

    pub fn has_draft(&self) -> bool {
        matches!(
            self.shared.storage.get(&self.shared.config.storage_key),
            Ok(Some(_))
        )
    }

    /// Minutes since the stored draft was saved, if there is a readable one.
    pub fn get_draft_age(&self) -> Option<i64> {
        match self.peek() {
            Ok(draft) => draft.map(|d| d.age_minutes(Utc::now())),
            Err(e) => {
                warn!(error = %e, "failed to read draft");
                None
            }
        }
    }

    /// Look for a draft to offer at session start.
    pub fn check_for_draft(&self) -> Option<RestorePrompt> {
        self.load_draft().map(|draft| RestorePrompt {
            age_minutes: draft.age_minutes(Utc::now()),
            draft,
        })
    }

    /// Apply the offered draft to `store` and hand it back to the caller.
    pub fn accept_restore(
        &mut self,
        prompt: RestorePrompt,
        store: &mut FormStateStore,
    ) -> StoredDraft {
        self.apply(&prompt.draft, store);
        prompt.draft
    }

    /// Decline the offered draft and delete it.
    pub fn reject_restore(&mut self, _prompt: RestorePrompt) -> Result<(), DraftError> {
        self.clear_draft()
    }

    /// Cancel any pending autosave timer.
    pub fn shutdown(&mut self) {
        self.cancel_pending();
    }
}

impl Drop for DraftManager {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

/// Parse a stored draft, rejecting entries without both `data` and `metadata` objects.
fn parse_stored_draft(raw: &str) -> Option<StoredDraft> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let structurally_valid = value.get("data").is_some_and(|d| d.is_object())
        && value.get("metadata").is_some_and(|m| m.is_object());
    if !structurally_valid {
        return None;
    }
    serde_json::from_value(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FieldUpdate;
    use crate::storage::MemoryStorage;
    use chrono::Duration as ChronoDuration;
    use tokio::time::sleep;

    fn manager(storage: &Arc<MemoryStorage>) -> DraftManager {
        DraftManager::new(storage.clone(), DraftConfig::default())
    }

    fn titled(title: &str) -> TaskFormData {
        TaskFormData {
            title: title.into(),
            unit_id: "1".into(),
            label_ids: vec!["l1".into()],
            ..Default::default()
        }
    }

    fn stored_title(storage: &MemoryStorage) -> Option<String> {
        let raw = storage.get(DRAFT_KEY).unwrap()?;
        let draft: StoredDraft = serde_json::from_str(&raw).unwrap();
        Some(draft.data.title)
    }

    #[tokio::test(start_paused = true)]
    async fn manual_save_without_content_writes_nothing() {
        let storage = Arc::new(MemoryStorage::new());
        let drafts = manager(&storage);
        let err = drafts.save_draft(&TaskFormData::default()).await.unwrap_err();
        assert!(matches!(err, DraftError::NoContent));
        assert_eq!(err.to_string(), "No content to save");
        assert_eq!(storage.get(DRAFT_KEY).unwrap(), None);
        assert_eq!(storage.write_count(DRAFT_KEY), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn save_then_load_round_trips() {
        let storage = Arc::new(MemoryStorage::new());
        let drafts = manager(&storage);
        let mut data = titled("Fix bug");
        data.assignment_date = "2024-01-10".into();
        data.is_recurring = true;

        let saved = drafts.save_draft(&data).await.unwrap();
        assert_eq!(saved.metadata.version, DRAFT_VERSION);
        assert!(!drafts.is_draft_saving());
        assert_eq!(drafts.last_saved_time(), Some(saved.metadata.last_saved));

        let loaded = drafts.load_draft().unwrap();
        assert_eq!(loaded.data, data);
        assert_eq!(loaded, saved);
        assert!(drafts.has_draft());
    }

    #[tokio::test(start_paused = true)]
    async fn stored_layout_is_data_plus_metadata() {
        let storage = Arc::new(MemoryStorage::new());
        let drafts = manager(&storage);
        drafts.save_draft(&titled("Layout")).await.unwrap();
        let raw = storage.get(DRAFT_KEY).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["data"]["title"], "Layout");
        assert_eq!(json["metadata"]["version"], 1);
        assert!(json["metadata"]["lastSaved"].is_string());
    }

    #[tokio::test(start_paused = true)]
    async fn clear_then_load_is_absent() {
        let storage = Arc::new(MemoryStorage::new());
        let mut drafts = manager(&storage);
        drafts.save_draft(&titled("Gone")).await.unwrap();
        drafts.clear_draft().unwrap();
        assert!(drafts.load_draft().is_none());
        assert!(!drafts.has_draft());
        assert_eq!(drafts.last_saved_time(), None);
        assert_eq!(drafts.get_draft_age(), None);
    }

    #[test]
    fn invalid_draft_is_deleted_on_load() {
        for raw in [
            "{\"data\":{}}",
            "{\"metadata\":{}}",
            "not json",
            "{\"data\":{},\"metadata\":{}}",
        ] {
            let storage = Arc::new(MemoryStorage::new());
            storage.set(DRAFT_KEY, raw).unwrap();
            let drafts = manager(&storage);
            assert!(drafts.has_draft());
            assert!(drafts.load_draft().is_none(), "{raw} should be rejected");
            assert_eq!(storage.get(DRAFT_KEY).unwrap(), None);
        }
    }

    #[test]
    fn age_is_whole_minutes_rounded_down() {
        let storage = Arc::new(MemoryStorage::new());
        let draft = StoredDraft {
            data: titled("Old"),
            metadata: DraftMetadata {
                last_saved: Utc::now() - ChronoDuration::minutes(90) - ChronoDuration::seconds(20),
                version: DRAFT_VERSION,
            },
        };
        storage.set(DRAFT_KEY, &serde_json::to_string(&draft).unwrap()).unwrap();
        let drafts = manager(&storage);
        assert_eq!(drafts.get_draft_age(), Some(90));

        let now = draft.metadata.last_saved + ChronoDuration::seconds(59);
        assert_eq!(draft.age_minutes(now), 0);
    }

    #[test]
    fn draft_saved_in_the_future_is_zero_minutes_old() {
        let storage = Arc::new(MemoryStorage::new());
        let draft = StoredDraft {
            data: titled("Skewed"),
            metadata: DraftMetadata {
                last_saved: Utc::now() + ChronoDuration::minutes(45),
                version: DRAFT_VERSION,
            },
        };
        storage.set(DRAFT_KEY, &serde_json::to_string(&draft).unwrap()).unwrap();
        let drafts = manager(&storage);
        assert_eq!(drafts.get_draft_age(), Some(0));
        assert_eq!(drafts.check_for_draft().unwrap().age_minutes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_produces_one_trailing_save() {
        let storage = Arc::new(MemoryStorage::new());
        let mut drafts = manager(&storage);
        assert!(!drafts.observe(&TaskFormData::default()));

        for i in 1..=5 {
            assert!(drafts.observe(&titled(&format!("edit {i}"))));
            sleep(Duration::from_secs(5)).await;
        }
        assert!(drafts.has_draft_changes());

        // 25s since the last edit: still quiet-period.
        sleep(Duration::from_secs(20)).await;
        assert_eq!(storage.write_count(DRAFT_KEY), 0);

        sleep(Duration::from_secs(6)).await;
        assert_eq!(storage.write_count(DRAFT_KEY), 1);
        assert_eq!(stored_title(&storage).as_deref(), Some("edit 5"));
        assert!(!drafts.has_draft_changes());
        assert!(drafts.last_saved_time().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_data_does_not_reschedule() {
        let storage = Arc::new(MemoryStorage::new());
        let mut drafts = manager(&storage);
        drafts.observe(&TaskFormData::default());
        assert!(drafts.observe(&titled("same")));
        assert!(!drafts.observe(&titled("same")));
        sleep(Duration::from_secs(31)).await;
        assert_eq!(storage.write_count(DRAFT_KEY), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_skips_forms_without_content() {
        let storage = Arc::new(MemoryStorage::new());
        let mut drafts = manager(&storage);
        drafts.observe(&TaskFormData::default());
        let data = TaskFormData {
            topic_id: "4".into(),
            ..Default::default()
        };
        assert!(drafts.observe(&data));
        sleep(Duration::from_secs(31)).await;
        assert_eq!(storage.write_count(DRAFT_KEY), 0);
        assert!(drafts.has_draft_changes());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_autosave() {
        let storage = Arc::new(MemoryStorage::new());
        let mut drafts = manager(&storage);
        drafts.observe(&TaskFormData::default());
        drafts.observe(&titled("never saved"));
        drafts.shutdown();
        sleep(Duration::from_secs(60)).await;
        assert_eq!(storage.write_count(DRAFT_KEY), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_manager_cancels_pending_autosave() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let mut drafts = manager(&storage);
            drafts.observe(&TaskFormData::default());
            drafts.observe(&titled("never saved"));
        }
        sleep(Duration::from_secs(60)).await;
        assert_eq!(storage.write_count(DRAFT_KEY), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_manual_save_keeps_change_flag() {
        let storage = Arc::new(MemoryStorage::with_quota(64));
        let mut drafts = manager(&storage);
        drafts.observe(&TaskFormData::default());
        let data = titled("far too large for the quota");
        drafts.observe(&data);
        drafts.shutdown();

        let err = drafts.save_draft(&data).await.unwrap_err();
        assert!(matches!(err, DraftError::Storage(StorageError::QuotaExceeded { .. })));
        assert!(drafts.has_draft_changes());
        assert!(!drafts.is_draft_saving());
        assert_eq!(drafts.last_saved_time(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_autosave_retries_on_next_change() {
        let sample = serde_json::to_string(&StoredDraft {
            data: titled("ok"),
            metadata: DraftMetadata {
                last_saved: Utc::now(),
                version: DRAFT_VERSION,
            },
        })
        .unwrap();
        let storage = Arc::new(MemoryStorage::with_quota(DRAFT_KEY.len() + sample.len() + 32));
        let mut drafts = manager(&storage);
        drafts.observe(&TaskFormData::default());

        let mut big = titled("ok");
        big.description = "x".repeat(200);
        drafts.observe(&big);
        sleep(Duration::from_secs(31)).await;
        assert_eq!(storage.write_count(DRAFT_KEY), 0);
        assert!(drafts.has_draft_changes());

        drafts.observe(&titled("ok"));
        sleep(Duration::from_secs(31)).await;
        assert_eq!(storage.write_count(DRAFT_KEY), 1);
        assert_eq!(stored_title(&storage).as_deref(), Some("ok"));
        assert!(!drafts.has_draft_changes());
    }

    #[tokio::test(start_paused = true)]
    async fn edit_during_in_flight_save_is_saved_next_cycle() {
        let storage = Arc::new(MemoryStorage::new());
        let config = DraftConfig {
            save_latency: Duration::from_secs(10),
            ..DraftConfig::default()
        };
        let mut drafts = DraftManager::new(storage.clone(), config);
        drafts.observe(&TaskFormData::default());
        drafts.observe(&titled("first"));

        // Save starts at 30s and completes at 40s.
        sleep(Duration::from_secs(35)).await;
        assert!(drafts.is_draft_saving());
        drafts.observe(&titled("second"));

        sleep(Duration::from_secs(6)).await;
        assert_eq!(stored_title(&storage).as_deref(), Some("first"));
        assert!(drafts.has_draft_changes());

        sleep(Duration::from_secs(40)).await;
        assert_eq!(stored_title(&storage).as_deref(), Some("second"));
        assert_eq!(storage.write_count(DRAFT_KEY), 2);
        assert!(!drafts.has_draft_changes());
    }

    #[tokio::test(start_paused = true)]
    async fn clear_during_in_flight_autosave_keeps_draft_deleted() {
        let storage = Arc::new(MemoryStorage::new());
        let mut drafts = manager(&storage);
        drafts.observe(&TaskFormData::default());
        drafts.observe(&titled("submitted"));

        // The debounce has elapsed and the 300ms write is under way.
        sleep(Duration::from_millis(30_100)).await;
        assert!(drafts.is_draft_saving());
        drafts.clear_draft().unwrap();

        sleep(Duration::from_secs(1)).await;
        assert!(!drafts.has_draft());
        assert_eq!(storage.write_count(DRAFT_KEY), 0);
        assert_eq!(drafts.last_saved_time(), None);
        assert!(!drafts.is_draft_saving());
        assert!(!drafts.has_draft_changes());
    }

    #[tokio::test(start_paused = true)]
    async fn manual_save_racing_a_clear_reports_discarded() {
        let storage = Arc::new(MemoryStorage::new());
        let mut drafts = manager(&storage);
        let shared = Arc::clone(&drafts.shared);
        let save = tokio::spawn(async move { shared.write(titled("late")).await });
        sleep(Duration::from_millis(100)).await;
        drafts.clear_draft().unwrap();

        let result = save.await.unwrap();
        assert!(matches!(result, Err(DraftError::Discarded)));
        assert_eq!(storage.get(DRAFT_KEY).unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn save_after_clear_writes_normally() {
        let storage = Arc::new(MemoryStorage::new());
        let mut drafts = manager(&storage);
        drafts.save_draft(&titled("before")).await.unwrap();
        drafts.clear_draft().unwrap();
        drafts.save_draft(&titled("after")).await.unwrap();
        assert_eq!(stored_title(&storage).as_deref(), Some("after"));
        assert!(drafts.last_saved_time().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn saving_recovers_from_a_corrupt_storage_file() {
        use crate::storage::tests::scratch_dir;
        use crate::storage::FileStorage;

        let dir = scratch_dir("draft_corrupt_file");
        let path = dir.join("storage.json");
        std::fs::write(&path, "{\"task-form-draft\":").unwrap();
        let storage = Arc::new(FileStorage::new(&path));
        let drafts = DraftManager::new(storage.clone(), DraftConfig::default());

        drafts.save_draft(&titled("after corruption")).await.unwrap();
        assert_eq!(drafts.load_draft().unwrap().data.title, "after corruption");
        assert!(storage.corrupt_path().exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn restore_pushes_draft_into_store() {
        let storage = Arc::new(MemoryStorage::new());
        let mut drafts = manager(&storage);
        let data = titled("Recovered");
        let saved = drafts.save_draft(&data).await.unwrap();

        let mut store = FormStateStore::new();
        store.update_field(FieldUpdate::TopicId("stale".into()));
        drafts.observe(store.form_data());

        assert!(drafts.restore_draft(&mut store));
        assert_eq!(store.form_data(), &data);
        assert!(!drafts.has_draft_changes());
        assert_eq!(drafts.last_saved_time(), Some(saved.metadata.last_saved));

        // The restored form is the baseline, so nothing is rescheduled.
        assert!(!drafts.observe(store.form_data()));
    }

    #[test]
    fn restore_without_draft_is_a_no_op() {
        let storage = Arc::new(MemoryStorage::new());
        let mut drafts = manager(&storage);
        let mut store = FormStateStore::new();
        assert!(!drafts.restore_draft(&mut store));
        assert_eq!(store.form_data(), &TaskFormData::default());
    }

    #[tokio::test(start_paused = true)]
    async fn prompt_accept_applies_and_returns_draft() {
        let storage = Arc::new(MemoryStorage::new());
        let mut drafts = manager(&storage);
        drafts.save_draft(&titled("Prompted")).await.unwrap();

        let prompt = drafts.check_for_draft().unwrap();
        assert_eq!(prompt.age_minutes, 0);
        let mut store = FormStateStore::new();
        let draft = drafts.accept_restore(prompt, &mut store);
        assert_eq!(draft.data.title, "Prompted");
        assert_eq!(store.form_data().title, "Prompted");
        assert!(drafts.has_draft());
    }

    #[tokio::test(start_paused = true)]
    async fn prompt_reject_deletes_draft() {
        let storage = Arc::new(MemoryStorage::new());
        let mut drafts = manager(&storage);
        drafts.save_draft(&titled("Declined")).await.unwrap();

        let prompt = drafts.check_for_draft().unwrap();
        drafts.reject_restore(prompt).unwrap();
        assert!(!drafts.has_draft());
        assert!(drafts.check_for_draft().is_none());
    }
}
