//! crates/recruit_core/src/domain.rs
//!
//! Defines the pure, core data structures for the recruitment tracker.
//! These structs are independent of the spreadsheet backend; the serde
//! derives exist so the web layer can project them without a parallel DTO
//! hierarchy.

use serde::{Deserialize, Serialize};

/// Sentinel stored in `visit_date` when a school visit was declined or is
/// impossible. The same glyph doubles as the "declined" member of the
/// result vocabulary in the source data.
pub const VISIT_DECLINED: &str = "×";

/// Result vocabulary member meaning "no outcome recorded yet".
pub const RESULT_PENDING: &str = "未定";

/// Result vocabulary member meaning "decision on hold".
pub const RESULT_HOLD: &str = "保留";

/// Result vocabulary member meaning a confirmed acceptance.
pub const RESULT_ACCEPTED: &str = "確約/合格";

/// Prospect marker for a recruit considered likely to enroll.
pub const PROSPECT_HIGH: &str = "○";

/// Prospect marker for a recruit who is not expected to enroll.
pub const PROSPECT_LOW: &str = "×";

/// One prospective recruit. Field order matches the 22-column layout of
/// the Students range (A through V); the school fields are denormalized
/// copies taken from the school master at entry time, not live references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    /// Opaque stable identifier, assigned client-side at creation.
    pub id: String,
    /// Display sequence number (`max(existing) + 1`), not an identity.
    pub no: u32,
    pub municipality: String,
    pub school_name: String,
    pub school_code: String,
    pub principal_name: String,
    pub teacher_in_charge: String,
    pub school_phone: String,
    pub club_name: String,
    pub student_name: String,
    pub student_furigana: String,
    pub gender: String,
    pub club_achievements: String,
    pub score_info: String,
    pub scholarship_rank: String,
    pub recruiter_type: String,
    /// Date the principal/vice-principal called, or empty.
    pub call_date_principal: String,
    /// Date the club advisor called, or empty.
    pub call_date_advisor: String,
    /// Visit date, empty, or [`VISIT_DECLINED`].
    pub visit_date: String,
    pub prospect: String,
    pub result: String,
    pub notes: String,
}

/// A school master-data record (Schools range, columns A through F).
/// Student rows hold copies of these fields, so editing a school does not
/// retroactively update existing students.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchoolData {
    /// Unique numeric-string code, auto-assigned as `max(existing) + 1`.
    pub code: String,
    pub name: String,
    pub municipality: String,
    pub principal: String,
    pub phone: String,
    pub head_teacher: String,
}

/// The authenticated user identity returned by the OAuth userinfo endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleUser {
    pub email: String,
    pub name: String,
    pub picture: String,
    /// Hosted-domain claim (e.g. `kiryo.ac.jp`), absent for consumer accounts.
    pub hd: Option<String>,
}

impl GoogleUser {
    /// True when the identity's hosted-domain claim matches `allowed`.
    pub fn domain_matches(&self, allowed: &str) -> bool {
        self.hd.as_deref() == Some(allowed)
    }
}

/// Which configurable vocabulary a [`ConfigChange`] targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigList {
    Ranks,
    Results,
    Prospects,
}

/// A single mutation of the session configuration. Every change is pushed
/// to the backend as a full overwrite of the Config range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ConfigChange {
    Add { list: ConfigList, value: String },
    Remove { list: ConfigList, value: String },
    SetTarget { target: u32 },
}

/// Process-wide configuration: the legal vocabularies for rank, result and
/// prospect values, plus the recruitment goal. Loaded once per session from
/// the backend and pushed back on every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigData {
    pub ranks: Vec<String>,
    pub results: Vec<String>,
    pub prospects: Vec<String>,
    pub recruitment_target: u32,
}

impl Default for ConfigData {
    /// Fallback vocabularies used when the backend carries no Config range.
    fn default() -> Self {
        Self {
            ranks: ["S1", "S2", "S3", "S4", "なし"]
                .into_iter()
                .map(String::from)
                .collect(),
            results: [RESULT_PENDING, RESULT_ACCEPTED, "辞退", RESULT_HOLD]
                .into_iter()
                .map(String::from)
                .collect(),
            prospects: [PROSPECT_HIGH, PROSPECT_LOW, RESULT_PENDING]
                .into_iter()
                .map(String::from)
                .collect(),
            recruitment_target: 30,
        }
    }
}

impl ConfigData {
    /// True when `result` still means "no decision": the pending or hold
    /// sentinel, or a blank cell. The loader defaults blanks to pending, so
    /// a blank must never classify as complete.
    pub fn is_open_result(&self, result: &str) -> bool {
        result.is_empty() || result == RESULT_PENDING || result == RESULT_HOLD
    }

    /// The configured "declined" member of the result vocabulary: the
    /// literal `×` if the vocabulary carries it, otherwise the first member
    /// containing `辞退`, otherwise `×` itself.
    pub fn declined_result(&self) -> String {
        if self.results.iter().any(|r| r == VISIT_DECLINED) {
            return VISIT_DECLINED.to_string();
        }
        self.results
            .iter()
            .find(|r| r.contains("辞退"))
            .cloned()
            .unwrap_or_else(|| VISIT_DECLINED.to_string())
    }

    /// True when `result` counts toward the acceptance funnel: a configured
    /// rank label or the fixed accepted sentinel. The declined member never
    /// qualifies.
    pub fn is_accepted_result(&self, result: &str) -> bool {
        result == RESULT_ACCEPTED || self.ranks.iter().any(|r| r == result)
    }

    /// Checks the vocabularies against the fixed sentinels the derivation
    /// and funnel logic depend on. Returns human-readable warnings instead
    /// of failing: operators may edit the vocabularies freely, but renaming
    /// or removing these members silently changes what the dashboard counts.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.results.iter().any(|r| r == RESULT_PENDING) {
            warnings.push(format!(
                "結果リストに「{RESULT_PENDING}」がありません。新規生徒の結果が判定できなくなります"
            ));
        }
        if !self.results.iter().any(|r| self.is_accepted_result(r)) {
            warnings.push(
                "結果リストに合格扱いの値がありません。ダッシュボードの確約数は常に0になります"
                    .to_string(),
            );
        }
        if !self.prospects.iter().any(|p| p == PROSPECT_HIGH) {
            warnings.push(format!(
                "見込みリストに「{PROSPECT_HIGH}」がありません。「結果待」の判定が機能しません"
            ));
        }
        if !self.prospects.iter().any(|p| p == PROSPECT_LOW) {
            warnings.push(format!(
                "見込みリストに「{PROSPECT_LOW}」がありません。「見送り」の判定が機能しません"
            ));
        }
        warnings
    }
}

/// The transactional field-group update covering `visit_date` and its
/// coupled `result` side effect. Recording a declined visit sets both
/// fields in one operation so no intermediate state is ever observable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VisitOutcome {
    /// A visit happened (or is scheduled) on the given date.
    Scheduled { date: String },
    /// The visit was declined; the record's result becomes the configured
    /// declined value at the same moment.
    Declined,
}
