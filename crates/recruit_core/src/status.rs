//! crates/recruit_core/src/status.rs
//!
//! Derives the single next action outreach staff should take for a
//! student. The derivation is an ordered chain of predicates over the
//! record; the order encodes the outreach priority policy, not just a
//! classification.

use crate::domain::{ConfigData, StudentProfile, PROSPECT_HIGH, PROSPECT_LOW, VISIT_DECLINED};

/// The next outreach step for one student, ordered by urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NextAction {
    /// No contact yet: call the principal or vice-principal first.
    CallPrincipal,
    /// Management called; the club advisor is next.
    CallAdvisor,
    /// Both calls done; schedule the school visit.
    ScheduleVisit,
    /// A visit happened but no outcome is recorded yet.
    EnterResult,
    /// Prospect looks good; waiting on the admission result.
    AwaitResult,
    /// A final result is recorded; nothing left to do.
    Complete,
    /// Prospect declined; deprioritized, no further action expected.
    Pass,
}

impl NextAction {
    /// Every action in priority order (most urgent first).
    pub const ALL: [NextAction; 7] = [
        NextAction::CallPrincipal,
        NextAction::CallAdvisor,
        NextAction::ScheduleVisit,
        NextAction::EnterResult,
        NextAction::AwaitResult,
        NextAction::Complete,
        NextAction::Pass,
    ];

    /// Fixed sort rank; 1 is the most urgent.
    pub fn priority(self) -> u8 {
        match self {
            NextAction::CallPrincipal => 1,
            NextAction::CallAdvisor => 2,
            NextAction::ScheduleVisit => 3,
            NextAction::EnterResult => 4,
            NextAction::AwaitResult => 5,
            NextAction::Complete => 6,
            NextAction::Pass => 7,
        }
    }

    /// The badge text shown in the list view and used by the action filter.
    pub fn label(self) -> &'static str {
        match self {
            NextAction::CallPrincipal => "管理職TEL",
            NextAction::CallAdvisor => "顧問TEL",
            NextAction::ScheduleVisit => "訪問日設定",
            NextAction::EnterResult => "結果記入",
            NextAction::AwaitResult => "結果待",
            NextAction::Complete => "完了",
            NextAction::Pass => "見送り",
        }
    }
}

/// Maps a student record to its next action. First matching rule wins:
///
/// 1. a recorded final result terminates the flow,
/// 2. a declined prospect is passed over,
/// 3. a promising prospect waits on the result,
/// 4. a completed visit needs its outcome entered,
/// 5. an advisor call needs a visit scheduled,
/// 6. a management call needs the advisor called,
/// 7. otherwise the management call is still outstanding.
///
/// Never panics: values outside the active vocabularies simply fall
/// through to the most urgent default branch.
pub fn next_action(student: &StudentProfile, config: &ConfigData) -> NextAction {
    if !config.is_open_result(&student.result) {
        return NextAction::Complete;
    }
    if student.prospect == PROSPECT_LOW {
        return NextAction::Pass;
    }
    if student.prospect == PROSPECT_HIGH {
        return NextAction::AwaitResult;
    }
    if !student.visit_date.is_empty() && student.visit_date != VISIT_DECLINED {
        return NextAction::EnterResult;
    }
    if !student.call_date_advisor.is_empty() {
        return NextAction::ScheduleVisit;
    }
    if !student.call_date_principal.is_empty() {
        return NextAction::CallAdvisor;
    }
    NextAction::CallPrincipal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RESULT_HOLD, RESULT_PENDING};

    fn student() -> StudentProfile {
        StudentProfile {
            id: "s-1".to_string(),
            student_name: "山田太郎".to_string(),
            prospect: RESULT_PENDING.to_string(),
            result: RESULT_PENDING.to_string(),
            ..StudentProfile::default()
        }
    }

    #[test]
    fn recorded_result_always_means_complete() {
        let config = ConfigData::default();
        for result in ["確約/合格", "辞退", "S2", "なし", "something else"] {
            let mut s = student();
            s.result = result.to_string();
            // Outreach fields must be irrelevant once a result is in.
            s.call_date_principal = "2025-04-01".to_string();
            s.prospect = PROSPECT_HIGH.to_string();
            assert_eq!(next_action(&s, &config), NextAction::Complete, "{result}");
        }
    }

    #[test]
    fn declined_prospect_is_passed_while_result_open() {
        let config = ConfigData::default();
        for result in [RESULT_PENDING, RESULT_HOLD] {
            let mut s = student();
            s.result = result.to_string();
            s.prospect = PROSPECT_LOW.to_string();
            assert_eq!(next_action(&s, &config), NextAction::Pass);
        }
    }

    #[test]
    fn high_prospect_waits_on_result() {
        let mut s = student();
        s.prospect = PROSPECT_HIGH.to_string();
        assert_eq!(next_action(&s, &ConfigData::default()), NextAction::AwaitResult);
    }

    #[test]
    fn visit_without_outcome_demands_result_entry() {
        let mut s = student();
        s.visit_date = "2025-06-10".to_string();
        assert_eq!(next_action(&s, &ConfigData::default()), NextAction::EnterResult);

        // A declined visit is not a visit that needs an outcome.
        s.visit_date = VISIT_DECLINED.to_string();
        assert_ne!(next_action(&s, &ConfigData::default()), NextAction::EnterResult);
    }

    #[test]
    fn call_chain_advances_in_order() {
        let config = ConfigData::default();
        let mut s = student();
        assert_eq!(next_action(&s, &config), NextAction::CallPrincipal);

        s.call_date_principal = "2025-04-01".to_string();
        assert_eq!(next_action(&s, &config), NextAction::CallAdvisor);

        s.call_date_advisor = "2025-04-03".to_string();
        assert_eq!(next_action(&s, &config), NextAction::ScheduleVisit);
    }

    #[test]
    fn blank_result_is_treated_as_pending() {
        let mut s = student();
        s.result = String::new();
        assert_eq!(next_action(&s, &ConfigData::default()), NextAction::CallPrincipal);
    }

    #[test]
    fn unknown_prospect_falls_through_to_urgent_branches() {
        let mut s = student();
        s.prospect = "orphaned value".to_string();
        assert_eq!(next_action(&s, &ConfigData::default()), NextAction::CallPrincipal);
    }

    #[test]
    fn emptied_vocabularies_never_panic() {
        let config = ConfigData {
            ranks: Vec::new(),
            results: Vec::new(),
            prospects: Vec::new(),
            recruitment_target: 0,
        };
        let s = student();
        assert_eq!(next_action(&s, &config), NextAction::CallPrincipal);
    }

    #[test]
    fn priorities_are_total_and_fixed() {
        let priorities: Vec<u8> = NextAction::ALL.iter().map(|a| a.priority()).collect();
        assert_eq!(priorities, vec![1, 2, 3, 4, 5, 6, 7]);
    }
}
