//! crates/recruit_core/src/sync.rs
//!
//! The synchronization layer: applies each mutation to the in-memory
//! roster first (optimistic), then issues the corresponding remote write.
//! When the remote write fails, the local mutation is rolled back from the
//! prior state captured before the call, and the error is returned for the
//! caller to surface. No retries; the user re-attempts the action.

use std::sync::Arc;

use crate::domain::{ConfigChange, ConfigData, SchoolData, StudentProfile, VisitOutcome};
use crate::ports::{PortError, PortResult, SpreadsheetStore};
use crate::roster::Roster;

/// Orchestrates optimistic local mutation plus remote write per user
/// action. Holds the backend behind the port trait so tests can drive it
/// with an in-memory fake.
#[derive(Clone)]
pub struct SyncService {
    store: Arc<dyn SpreadsheetStore>,
}

impl SyncService {
    pub fn new(store: Arc<dyn SpreadsheetStore>) -> Self {
        Self { store }
    }

    /// Creates a student: identifier and sequence number are assigned
    /// locally, then the row is appended remotely. On append failure the
    /// local row is removed again.
    pub async fn create_student(
        &self,
        roster: &mut Roster,
        access_token: &str,
        draft: StudentProfile,
    ) -> PortResult<StudentProfile> {
        let created = roster.add_student(draft);
        if let Err(err) = self.store.append_student(access_token, &created).await {
            roster.remove_student(&created.id);
            return Err(err);
        }
        Ok(created)
    }

    /// Full-record update. The remote row is resolved by identifier; a
    /// record unknown locally or remotely is [`PortError::NotFound`].
    pub async fn update_student(
        &self,
        roster: &mut Roster,
        access_token: &str,
        record: StudentProfile,
    ) -> PortResult<StudentProfile> {
        let prior = roster
            .replace_student(record.clone())
            .ok_or_else(|| PortError::NotFound(format!("student {}", record.id)))?;
        if let Err(err) = self.store.update_student(access_token, &record).await {
            roster.replace_student(prior);
            return Err(err);
        }
        Ok(record)
    }

    /// Applies a visit outcome (the coupled `visit_date`/`result` update)
    /// and pushes the resulting record as one remote write.
    pub async fn record_visit(
        &self,
        roster: &mut Roster,
        access_token: &str,
        student_id: &str,
        outcome: &VisitOutcome,
    ) -> PortResult<StudentProfile> {
        let prior = roster
            .record_visit(student_id, outcome)
            .ok_or_else(|| PortError::NotFound(format!("student {student_id}")))?;
        let updated = roster
            .student(student_id)
            .cloned()
            .ok_or_else(|| PortError::Unexpected("record vanished mid-update".to_string()))?;
        if let Err(err) = self.store.update_student(access_token, &updated).await {
            roster.replace_student(prior);
            return Err(err);
        }
        Ok(updated)
    }

    /// Saves the detail-view memo.
    pub async fn update_notes(
        &self,
        roster: &mut Roster,
        access_token: &str,
        student_id: &str,
        notes: &str,
    ) -> PortResult<StudentProfile> {
        let prior = roster
            .update_notes(student_id, notes)
            .ok_or_else(|| PortError::NotFound(format!("student {student_id}")))?;
        let updated = roster
            .student(student_id)
            .cloned()
            .ok_or_else(|| PortError::Unexpected("record vanished mid-update".to_string()))?;
        if let Err(err) = self.store.update_student(access_token, &updated).await {
            roster.replace_student(prior);
            return Err(err);
        }
        Ok(updated)
    }

    /// Deletes a student. Unknown identifiers, locally or remotely, are
    /// treated as already-deleted: the operation is an idempotent no-op.
    /// On remote failure the local row is restored at its old position.
    pub async fn delete_student(
        &self,
        roster: &mut Roster,
        access_token: &str,
        student_id: &str,
    ) -> PortResult<()> {
        let Some((index, removed)) = roster.remove_student(student_id) else {
            return Ok(());
        };
        if let Err(err) = self.store.delete_student(access_token, student_id).await {
            roster.restore_student(index, removed);
            return Err(err);
        }
        Ok(())
    }

    /// Adds a school (code assigned locally) and pushes the whole master
    /// set, because the backend contract for master data is a bulk
    /// overwrite of the range.
    pub async fn add_school(
        &self,
        roster: &mut Roster,
        access_token: &str,
        draft: SchoolData,
    ) -> PortResult<SchoolData> {
        let created = roster.add_school(draft);
        if let Err(err) = self.sync_master(roster, access_token).await {
            roster.schools.retain(|s| s.code != created.code);
            return Err(err);
        }
        Ok(created)
    }

    /// Replaces schools, clubs and recruiters wholesale and pushes the
    /// result. On failure the prior collections are restored.
    pub async fn replace_master(
        &self,
        roster: &mut Roster,
        access_token: &str,
        schools: Vec<SchoolData>,
        clubs: Vec<String>,
        recruiters: Vec<String>,
    ) -> PortResult<()> {
        let (prior_schools, prior_clubs, prior_recruiters) =
            roster.replace_master(schools, clubs, recruiters);
        if let Err(err) = self.sync_master(roster, access_token).await {
            roster.replace_master(prior_schools, prior_clubs, prior_recruiters);
            return Err(err);
        }
        Ok(())
    }

    /// Applies one configuration change and overwrites the remote Config
    /// range with the full current configuration.
    pub async fn change_config(
        &self,
        roster: &mut Roster,
        access_token: &str,
        change: &ConfigChange,
    ) -> PortResult<ConfigData> {
        let prior = roster.apply_config_change(change);
        if let Err(err) = self.store.sync_config(access_token, &roster.config).await {
            roster.config = prior;
            return Err(err);
        }
        Ok(roster.config.clone())
    }

    async fn sync_master(&self, roster: &Roster, access_token: &str) -> PortResult<()> {
        self.store
            .sync_master_data(
                access_token,
                &roster.schools,
                &roster.clubs,
                &roster.recruiters,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConfigList, RESULT_PENDING, VISIT_DECLINED};
    use crate::ports::SheetSnapshot;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory stand-in for the remote spreadsheet: rows keyed by the
    /// identifier column, with a switch that makes every write fail.
    #[derive(Default)]
    struct FakeStore {
        rows: Mutex<Vec<StudentProfile>>,
        schools: Mutex<Vec<SchoolData>>,
        config: Mutex<ConfigData>,
        fail_writes: std::sync::atomic::AtomicBool,
    }

    impl FakeStore {
        fn failing(&self) -> bool {
            self.fail_writes.load(std::sync::atomic::Ordering::SeqCst)
        }

        fn set_failing(&self, value: bool) {
            self.fail_writes
                .store(value, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl SpreadsheetStore for FakeStore {
        async fn fetch_all(&self, _access_token: &str) -> PortResult<SheetSnapshot> {
            Ok(SheetSnapshot {
                students: self.rows.lock().unwrap().clone(),
                schools: self.schools.lock().unwrap().clone(),
                clubs: Vec::new(),
                recruiters: Vec::new(),
                config: self.config.lock().unwrap().clone(),
            })
        }

        async fn append_student(
            &self,
            _access_token: &str,
            student: &StudentProfile,
        ) -> PortResult<()> {
            if self.failing() {
                return Err(PortError::Unexpected("write rejected".to_string()));
            }
            self.rows.lock().unwrap().push(student.clone());
            Ok(())
        }

        async fn update_student(
            &self,
            _access_token: &str,
            student: &StudentProfile,
        ) -> PortResult<()> {
            if self.failing() {
                return Err(PortError::Unexpected("write rejected".to_string()));
            }
            let mut rows = self.rows.lock().unwrap();
            let slot = rows
                .iter_mut()
                .find(|r| r.id == student.id)
                .ok_or_else(|| PortError::NotFound(format!("student {}", student.id)))?;
            *slot = student.clone();
            Ok(())
        }

        async fn delete_student(&self, _access_token: &str, student_id: &str) -> PortResult<()> {
            if self.failing() {
                return Err(PortError::Unexpected("write rejected".to_string()));
            }
            // Unknown identifiers are a no-op, same as the real backend path.
            self.rows.lock().unwrap().retain(|r| r.id != student_id);
            Ok(())
        }

        async fn sync_master_data(
            &self,
            _access_token: &str,
            schools: &[SchoolData],
            _clubs: &[String],
            _recruiters: &[String],
        ) -> PortResult<()> {
            if self.failing() {
                return Err(PortError::Unexpected("write rejected".to_string()));
            }
            *self.schools.lock().unwrap() = schools.to_vec();
            Ok(())
        }

        async fn sync_config(&self, _access_token: &str, config: &ConfigData) -> PortResult<()> {
            if self.failing() {
                return Err(PortError::Unexpected("write rejected".to_string()));
            }
            *self.config.lock().unwrap() = config.clone();
            Ok(())
        }
    }

    fn setup() -> (Arc<FakeStore>, SyncService, Roster) {
        let store = Arc::new(FakeStore::default());
        let sync = SyncService::new(store.clone());
        (store, sync, Roster::default())
    }

    fn draft(name: &str) -> StudentProfile {
        StudentProfile {
            student_name: name.to_string(),
            municipality: "水戸市".to_string(),
            school_name: "水戸一中".to_string(),
            club_name: "野球".to_string(),
            ..StudentProfile::default()
        }
    }

    #[tokio::test]
    async fn created_student_round_trips_field_for_field() {
        let (store, sync, mut roster) = setup();
        let created = sync
            .create_student(&mut roster, "token", draft("山田"))
            .await
            .unwrap();

        let snapshot = store.fetch_all("token").await.unwrap();
        let fetched = snapshot
            .students
            .iter()
            .find(|s| s.id == created.id)
            .unwrap();
        assert_eq!(fetched, &created);
    }

    #[tokio::test]
    async fn failed_append_rolls_back_local_row() {
        let (store, sync, mut roster) = setup();
        store.set_failing(true);

        let err = sync
            .create_student(&mut roster, "token", draft("山田"))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));
        assert!(roster.students.is_empty());
    }

    #[tokio::test]
    async fn failed_update_restores_prior_record() {
        let (store, sync, mut roster) = setup();
        let created = sync
            .create_student(&mut roster, "token", draft("山田"))
            .await
            .unwrap();

        store.set_failing(true);
        let mut edited = created.clone();
        edited.notes = "edited".to_string();
        sync.update_student(&mut roster, "token", edited)
            .await
            .unwrap_err();

        assert_eq!(roster.student(&created.id).unwrap(), &created);
    }

    #[tokio::test]
    async fn update_of_remotely_missing_record_reports_not_found_and_rolls_back() {
        let (store, sync, mut roster) = setup();
        let created = sync
            .create_student(&mut roster, "token", draft("山田"))
            .await
            .unwrap();

        // Simulate an external deletion of the remote row.
        store.rows.lock().unwrap().clear();

        let mut edited = created.clone();
        edited.notes = "edited".to_string();
        let err = sync
            .update_student(&mut roster, "token", edited)
            .await
            .unwrap_err();

        assert!(matches!(err, PortError::NotFound(_)));
        assert_eq!(roster.student(&created.id).unwrap(), &created);
    }

    #[tokio::test]
    async fn visit_declined_is_never_observable_half_applied() {
        let (store, sync, mut roster) = setup();
        let created = sync
            .create_student(&mut roster, "token", draft("山田"))
            .await
            .unwrap();

        let updated = sync
            .record_visit(&mut roster, "token", &created.id, &VisitOutcome::Declined)
            .await
            .unwrap();

        let declined = roster.config.declined_result();
        assert_eq!(updated.visit_date, VISIT_DECLINED);
        assert_eq!(updated.result, declined);

        // The remote row received both fields in the same write.
        let remote = store.fetch_all("token").await.unwrap();
        let row = remote.students.iter().find(|s| s.id == created.id).unwrap();
        assert_eq!(row.visit_date, VISIT_DECLINED);
        assert_eq!(row.result, declined);
    }

    #[tokio::test]
    async fn failed_visit_write_restores_both_fields() {
        let (store, sync, mut roster) = setup();
        let created = sync
            .create_student(&mut roster, "token", draft("山田"))
            .await
            .unwrap();

        store.set_failing(true);
        sync.record_visit(&mut roster, "token", &created.id, &VisitOutcome::Declined)
            .await
            .unwrap_err();

        let local = roster.student(&created.id).unwrap();
        assert_eq!(local.visit_date, "");
        assert_eq!(local.result, RESULT_PENDING);
    }

    #[tokio::test]
    async fn deleting_unknown_identifier_is_a_no_op() {
        let (store, sync, mut roster) = setup();
        sync.create_student(&mut roster, "token", draft("山田"))
            .await
            .unwrap();

        sync.delete_student(&mut roster, "token", "no-such-id")
            .await
            .unwrap();

        assert_eq!(roster.students.len(), 1);
        assert_eq!(store.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_delete_restores_row_at_position() {
        let (store, sync, mut roster) = setup();
        let a = sync
            .create_student(&mut roster, "token", draft("A"))
            .await
            .unwrap();
        sync.create_student(&mut roster, "token", draft("B"))
            .await
            .unwrap();

        store.set_failing(true);
        sync.delete_student(&mut roster, "token", &a.id)
            .await
            .unwrap_err();

        assert_eq!(roster.students[0].id, a.id);
    }

    #[tokio::test]
    async fn failed_master_sync_restores_collections() {
        let (store, sync, mut roster) = setup();
        roster.clubs = vec!["野球".to_string()];

        store.set_failing(true);
        sync.replace_master(&mut roster, "token", Vec::new(), Vec::new(), Vec::new())
            .await
            .unwrap_err();

        assert_eq!(roster.clubs, vec!["野球".to_string()]);
    }

    #[tokio::test]
    async fn config_change_pushes_full_configuration() {
        let (store, sync, mut roster) = setup();

        let updated = sync
            .change_config(
                &mut roster,
                "token",
                &ConfigChange::Add {
                    list: ConfigList::Ranks,
                    value: "S5".to_string(),
                },
            )
            .await
            .unwrap();

        assert!(updated.ranks.iter().any(|r| r == "S5"));
        assert_eq!(*store.config.lock().unwrap(), updated);

        store.set_failing(true);
        sync.change_config(&mut roster, "token", &ConfigChange::SetTarget { target: 99 })
            .await
            .unwrap_err();
        assert_eq!(roster.config.recruitment_target, updated.recruitment_target);
    }
}
