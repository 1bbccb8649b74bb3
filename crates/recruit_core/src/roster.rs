//! crates/recruit_core/src/roster.rs
//!
//! The in-memory collections for one authenticated session, with the pure
//! mutation operations the synchronization layer applies optimistically.
//! Nothing here talks to the backend; every method is synchronous and
//! reversible via the values it returns.

use uuid::Uuid;

use crate::domain::{
    ConfigChange, ConfigData, ConfigList, SchoolData, StudentProfile, VisitOutcome,
    RESULT_PENDING, VISIT_DECLINED,
};
use crate::ports::SheetSnapshot;

/// All collections of one session. Held for the lifetime of a login; a
/// reload re-fetches everything from the backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    pub students: Vec<StudentProfile>,
    pub schools: Vec<SchoolData>,
    pub clubs: Vec<String>,
    pub recruiters: Vec<String>,
    pub config: ConfigData,
}

impl From<SheetSnapshot> for Roster {
    fn from(snapshot: SheetSnapshot) -> Self {
        Roster {
            students: snapshot.students,
            schools: snapshot.schools,
            clubs: snapshot.clubs,
            recruiters: snapshot.recruiters,
            config: snapshot.config,
        }
    }
}

impl Roster {
    //------------------------------------------------------------------
    // Students
    //------------------------------------------------------------------

    /// Next display sequence number: `max(existing) + 1`, 1 when empty.
    /// Not unique after deletions; a display convenience only.
    pub fn next_no(&self) -> u32 {
        self.students.iter().map(|s| s.no).max().map_or(1, |max| max + 1)
    }

    /// Adds a draft record, assigning a fresh identifier and sequence
    /// number. Blank classification fields default to pending so the
    /// derivation engine never sees an empty result.
    pub fn add_student(&mut self, mut draft: StudentProfile) -> StudentProfile {
        draft.id = Uuid::new_v4().to_string();
        draft.no = self.next_no();
        if draft.prospect.is_empty() {
            draft.prospect = RESULT_PENDING.to_string();
        }
        if draft.result.is_empty() {
            draft.result = RESULT_PENDING.to_string();
        }
        self.students.push(draft.clone());
        draft
    }

    pub fn student(&self, id: &str) -> Option<&StudentProfile> {
        self.students.iter().find(|s| s.id == id)
    }

    /// Full-record overwrite by identifier. Returns the prior record so a
    /// failed remote write can be rolled back.
    pub fn replace_student(&mut self, record: StudentProfile) -> Option<StudentProfile> {
        let slot = self.students.iter_mut().find(|s| s.id == record.id)?;
        Some(std::mem::replace(slot, record))
    }

    /// Removes by identifier, returning the position and the record so a
    /// failed remote delete can restore the row where it was.
    pub fn remove_student(&mut self, id: &str) -> Option<(usize, StudentProfile)> {
        let index = self.students.iter().position(|s| s.id == id)?;
        Some((index, self.students.remove(index)))
    }

    pub fn restore_student(&mut self, index: usize, record: StudentProfile) {
        let index = index.min(self.students.len());
        self.students.insert(index, record);
    }

    /// Applies a visit outcome as one transactional field-group update:
    /// a declined visit sets `visit_date` to the sentinel and `result` to
    /// the configured declined value in the same call, so no caller can
    /// observe or persist a half-updated record. Returns the prior record.
    pub fn record_visit(&mut self, id: &str, outcome: &VisitOutcome) -> Option<StudentProfile> {
        let declined = self.config.declined_result();
        let student = self.students.iter_mut().find(|s| s.id == id)?;
        let prior = student.clone();
        match outcome {
            VisitOutcome::Scheduled { date } => {
                student.visit_date = date.clone();
            }
            VisitOutcome::Declined => {
                student.visit_date = VISIT_DECLINED.to_string();
                student.result = declined;
            }
        }
        Some(prior)
    }

    /// Detail-view memo save. Returns the prior record for rollback.
    pub fn update_notes(&mut self, id: &str, notes: &str) -> Option<StudentProfile> {
        let student = self.students.iter_mut().find(|s| s.id == id)?;
        let prior = student.clone();
        student.notes = notes.to_string();
        Some(prior)
    }

    //------------------------------------------------------------------
    // Schools
    //------------------------------------------------------------------

    /// Next school code: numeric maximum of existing codes plus one.
    pub fn next_school_code(&self) -> String {
        let max = self
            .schools
            .iter()
            .filter_map(|s| s.code.trim().parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        (max + 1).to_string()
    }

    pub fn add_school(&mut self, mut draft: SchoolData) -> SchoolData {
        draft.code = self.next_school_code();
        self.schools.push(draft.clone());
        draft
    }

    /// Replaces the whole master-data set in one step (the master view
    /// edits local copies and pushes everything at once). Returns the
    /// prior collections for rollback.
    pub fn replace_master(
        &mut self,
        schools: Vec<SchoolData>,
        clubs: Vec<String>,
        recruiters: Vec<String>,
    ) -> (Vec<SchoolData>, Vec<String>, Vec<String>) {
        (
            std::mem::replace(&mut self.schools, schools),
            std::mem::replace(&mut self.clubs, clubs),
            std::mem::replace(&mut self.recruiters, recruiters),
        )
    }

    //------------------------------------------------------------------
    // Configuration
    //------------------------------------------------------------------

    /// Applies one configuration mutation, returning the prior
    /// configuration for rollback. Adds deduplicate; removes of unknown
    /// values are no-ops.
    pub fn apply_config_change(&mut self, change: &ConfigChange) -> ConfigData {
        let prior = self.config.clone();
        match change {
            ConfigChange::Add { list, value } => {
                let target = self.config_list_mut(*list);
                if !value.is_empty() && !target.iter().any(|v| v == value) {
                    target.push(value.clone());
                }
            }
            ConfigChange::Remove { list, value } => {
                self.config_list_mut(*list).retain(|v| v != value);
            }
            ConfigChange::SetTarget { target } => {
                self.config.recruitment_target = *target;
            }
        }
        prior
    }

    fn config_list_mut(&mut self, list: ConfigList) -> &mut Vec<String> {
        match list {
            ConfigList::Ranks => &mut self.config.ranks,
            ConfigList::Results => &mut self.config.results,
            ConfigList::Prospects => &mut self.config.prospects,
        }
    }
}
