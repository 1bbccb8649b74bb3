//! crates/recruit_core/src/query.rs
//!
//! Filtered, sorted and aggregated read-only views over the student and
//! master-data collections. Nothing in this module mutates the
//! collections it is given; the list view and the dashboard recompute
//! their projections from current session state on every request.

use serde::{Deserialize, Serialize};

use crate::domain::{ConfigData, SchoolData, StudentProfile, VISIT_DECLINED};
use crate::status::next_action;

/// Code value used for schools whose code is missing or not numeric; makes
/// them sort after every real code in ascending order.
const CODE_MAX: u32 = u32::MAX;

/// Parses a numeric-string school code for sorting. Non-numeric and empty
/// codes sort as the maximum possible code.
pub fn numeric_code(code: &str) -> u32 {
    code.trim().parse().unwrap_or(CODE_MAX)
}

//=========================================================================================
// Filtering
//=========================================================================================

/// Selected filter values per dimension. An empty dimension means "no
/// filter"; dimensions combine with AND, values within a dimension with OR.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub municipalities: Vec<String>,
    pub school_names: Vec<String>,
    pub club_names: Vec<String>,
    pub recruiter_types: Vec<String>,
    /// Next-action labels (see [`crate::status::NextAction::label`]).
    pub actions: Vec<String>,
}

fn toggle_value(list: &mut Vec<String>, value: &str) {
    if let Some(pos) = list.iter().position(|v| v == value) {
        list.remove(pos);
    } else {
        list.push(value.to_string());
    }
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        self.municipalities.is_empty()
            && self.school_names.is_empty()
            && self.club_names.is_empty()
            && self.recruiter_types.is_empty()
            && self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        *self = FilterState::default();
    }

    /// Toggles one municipality and cascades into the school dimension:
    /// selecting adds exactly the municipality's schools, deselecting
    /// removes exactly those schools. Schools of other municipalities that
    /// the user selected independently are left alone, so the two
    /// dimensions can never contradict each other.
    pub fn toggle_municipality(&mut self, municipality: &str, schools: &[SchoolData]) {
        let in_muni: Vec<&str> = schools
            .iter()
            .filter(|s| s.municipality == municipality)
            .map(|s| s.name.as_str())
            .collect();

        if let Some(pos) = self.municipalities.iter().position(|m| m == municipality) {
            self.municipalities.remove(pos);
            self.school_names.retain(|name| !in_muni.contains(&name.as_str()));
        } else {
            self.municipalities.push(municipality.to_string());
            for name in in_muni {
                if !self.school_names.iter().any(|n| n == name) {
                    self.school_names.push(name.to_string());
                }
            }
        }
    }

    /// Selects every municipality (and with it every school), or clears
    /// both dimensions when everything is already selected.
    pub fn toggle_all_municipalities(&mut self, schools: &[SchoolData]) {
        let all = municipalities_by_code(schools);
        let all_selected = all.iter().all(|m| self.municipalities.contains(m));

        if all_selected {
            self.municipalities.clear();
            self.school_names.clear();
        } else {
            self.municipalities = all;
            self.school_names = schools.iter().map(|s| s.name.clone()).collect();
        }
    }

    pub fn toggle_school(&mut self, name: &str) {
        toggle_value(&mut self.school_names, name);
    }

    pub fn toggle_club(&mut self, name: &str) {
        toggle_value(&mut self.club_names, name);
    }

    pub fn toggle_recruiter(&mut self, name: &str) {
        toggle_value(&mut self.recruiter_types, name);
    }

    pub fn toggle_action(&mut self, label: &str) {
        toggle_value(&mut self.actions, label);
    }

    /// Membership test for one student against every dimension.
    pub fn matches(&self, student: &StudentProfile, config: &ConfigData) -> bool {
        let dim = |selected: &Vec<String>, value: &str| {
            selected.is_empty() || selected.iter().any(|v| v == value)
        };

        dim(&self.municipalities, &student.municipality)
            && dim(&self.school_names, &student.school_name)
            && dim(&self.club_names, &student.club_name)
            && dim(&self.recruiter_types, &student.recruiter_type)
            && dim(&self.actions, next_action(student, config).label())
    }
}

/// Returns the students passing `filter`, in their original order.
pub fn filter_students(
    students: &[StudentProfile],
    filter: &FilterState,
    config: &ConfigData,
) -> Vec<StudentProfile> {
    students
        .iter()
        .filter(|s| filter.matches(s, config))
        .cloned()
        .collect()
}

//=========================================================================================
// Sorting
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    No,
    NextAction,
    Municipality,
    SchoolName,
    SchoolCode,
    StudentName,
    ClubName,
    ScholarshipRank,
    CallDatePrincipal,
    CallDateAdvisor,
    VisitDate,
    Prospect,
    Result,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Single-key sort state. Clicking the active key flips the direction;
/// clicking a new key resets to ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortState {
    pub fn toggle(current: Option<SortState>, key: SortKey) -> SortState {
        match current {
            Some(state) if state.key == key && state.direction == SortDirection::Asc => SortState {
                key,
                direction: SortDirection::Desc,
            },
            _ => SortState {
                key,
                direction: SortDirection::Asc,
            },
        }
    }
}

/// Sorts in place with a stable sort. String keys compare by code point
/// (stable for the source script); `no` compares numerically; school codes
/// compare numerically with missing codes last; the next-action key
/// compares by derived priority.
pub fn sort_students(students: &mut [StudentProfile], sort: SortState, config: &ConfigData) {
    students.sort_by(|a, b| {
        let ordering = match sort.key {
            SortKey::No => a.no.cmp(&b.no),
            SortKey::NextAction => next_action(a, config)
                .priority()
                .cmp(&next_action(b, config).priority()),
            SortKey::Municipality => a.municipality.cmp(&b.municipality),
            SortKey::SchoolName => a.school_name.cmp(&b.school_name),
            SortKey::SchoolCode => numeric_code(&a.school_code).cmp(&numeric_code(&b.school_code)),
            SortKey::StudentName => a.student_name.cmp(&b.student_name),
            SortKey::ClubName => a.club_name.cmp(&b.club_name),
            SortKey::ScholarshipRank => a.scholarship_rank.cmp(&b.scholarship_rank),
            SortKey::CallDatePrincipal => a.call_date_principal.cmp(&b.call_date_principal),
            SortKey::CallDateAdvisor => a.call_date_advisor.cmp(&b.call_date_advisor),
            SortKey::VisitDate => a.visit_date.cmp(&b.visit_date),
            SortKey::Prospect => a.prospect.cmp(&b.prospect),
            SortKey::Result => a.result.cmp(&b.result),
        };
        match sort.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

/// Schools in ascending numeric code order (missing codes last).
pub fn schools_by_code(schools: &[SchoolData]) -> Vec<SchoolData> {
    let mut sorted = schools.to_vec();
    sorted.sort_by_key(|s| numeric_code(&s.code));
    sorted
}

/// Municipality names ordered by the minimum school code within each
/// municipality, so the filter dialog lists regions in roster order.
pub fn municipalities_by_code(schools: &[SchoolData]) -> Vec<String> {
    let mut min_codes: Vec<(String, u32)> = Vec::new();
    for school in schools {
        let code = numeric_code(&school.code);
        match min_codes.iter_mut().find(|(m, _)| m == &school.municipality) {
            Some((_, min)) => *min = (*min).min(code),
            None => min_codes.push((school.municipality.clone(), code)),
        }
    }
    min_codes.sort_by_key(|(_, code)| *code);
    min_codes.into_iter().map(|(m, _)| m).collect()
}

//=========================================================================================
// Aggregation
//=========================================================================================

/// One bar of a grouped count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountEntry {
    pub name: String,
    pub count: usize,
}

/// Dashboard projection over an (already filtered) student set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total: usize,
    /// Either call-date field set.
    pub contacted: usize,
    /// Visit date set and not the declined sentinel.
    pub visited: usize,
    /// Result within the accepted subset (rank labels + accepted sentinel).
    pub accepted: usize,
    pub high_prospects: usize,
    pub by_prospect: Vec<CountEntry>,
    pub by_rank: Vec<CountEntry>,
    pub by_result: Vec<CountEntry>,
    /// Club distribution in master order, so charts keep a fixed axis.
    pub by_club: Vec<CountEntry>,
    pub recruitment_target: u32,
    pub achievement_rate: u32,
}

/// Percentage of the recruitment target reached, rounded and capped at
/// 100. A target of zero yields zero rather than a division error.
pub fn achievement_rate(accepted: usize, target: u32) -> u32 {
    if target == 0 {
        return 0;
    }
    let rate = (accepted as f64 / f64::from(target) * 100.0).round() as u32;
    rate.min(100)
}

impl DashboardSummary {
    pub fn compute(students: &[StudentProfile], clubs: &[String], config: &ConfigData) -> Self {
        let vocab_counts = |vocab: &[String], field: fn(&StudentProfile) -> &str| {
            vocab
                .iter()
                .map(|value| CountEntry {
                    name: value.clone(),
                    count: students.iter().filter(|s| field(s) == value).count(),
                })
                .collect::<Vec<_>>()
        };

        let total = students.len();
        let contacted = students
            .iter()
            .filter(|s| !s.call_date_principal.is_empty() || !s.call_date_advisor.is_empty())
            .count();
        let visited = students
            .iter()
            .filter(|s| !s.visit_date.is_empty() && s.visit_date != VISIT_DECLINED)
            .count();
        let accepted = students
            .iter()
            .filter(|s| config.is_accepted_result(&s.result))
            .count();
        let high_prospects = students
            .iter()
            .filter(|s| s.prospect == crate::domain::PROSPECT_HIGH)
            .count();

        DashboardSummary {
            total,
            contacted,
            visited,
            accepted,
            high_prospects,
            by_prospect: vocab_counts(&config.prospects, |s| &s.prospect),
            by_rank: vocab_counts(&config.ranks, |s| &s.scholarship_rank),
            by_result: vocab_counts(&config.results, |s| &s.result),
            by_club: vocab_counts(clubs, |s| &s.club_name),
            recruitment_target: config.recruitment_target,
            achievement_rate: achievement_rate(accepted, config.recruitment_target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PROSPECT_HIGH, RESULT_ACCEPTED, RESULT_PENDING};

    fn school(code: &str, name: &str, municipality: &str) -> SchoolData {
        SchoolData {
            code: code.to_string(),
            name: name.to_string(),
            municipality: municipality.to_string(),
            ..SchoolData::default()
        }
    }

    fn student(name: &str, school_name: &str, club: &str) -> StudentProfile {
        StudentProfile {
            id: format!("id-{name}"),
            student_name: name.to_string(),
            school_name: school_name.to_string(),
            club_name: club.to_string(),
            prospect: RESULT_PENDING.to_string(),
            result: RESULT_PENDING.to_string(),
            ..StudentProfile::default()
        }
    }

    fn sample_schools() -> Vec<SchoolData> {
        vec![
            school("1", "水戸一中", "水戸市"),
            school("2", "水戸二中", "水戸市"),
            school("3", "日立一中", "日立市"),
        ]
    }

    #[test]
    fn municipality_cascade_selects_exactly_its_schools() {
        let schools = sample_schools();
        let mut filter = FilterState::default();

        filter.toggle_municipality("水戸市", &schools);
        assert_eq!(filter.municipalities, vec!["水戸市"]);
        assert_eq!(filter.school_names, vec!["水戸一中", "水戸二中"]);
    }

    #[test]
    fn municipality_cascade_preserves_independent_selections() {
        let schools = sample_schools();
        let mut filter = FilterState::default();

        // User picks a school of a different municipality by hand first.
        filter.toggle_school("日立一中");
        filter.toggle_municipality("水戸市", &schools);
        filter.toggle_municipality("水戸市", &schools);

        assert!(filter.municipalities.is_empty());
        assert_eq!(filter.school_names, vec!["日立一中"]);
    }

    #[test]
    fn toggle_all_municipalities_is_symmetric() {
        let schools = sample_schools();
        let mut filter = FilterState::default();

        filter.toggle_all_municipalities(&schools);
        assert_eq!(filter.municipalities.len(), 2);
        assert_eq!(filter.school_names.len(), 3);

        filter.toggle_all_municipalities(&schools);
        assert!(filter.is_empty());
    }

    #[test]
    fn dimensions_and_together_values_or_together() {
        let config = ConfigData::default();
        let a = student("A", "水戸一中", "野球");
        let b = student("B", "水戸二中", "サッカー");
        let c = student("C", "日立一中", "野球");

        let filter = FilterState {
            school_names: vec!["水戸一中".to_string(), "水戸二中".to_string()],
            club_names: vec!["野球".to_string()],
            ..FilterState::default()
        };

        let kept = filter_students(&[a, b, c], &filter, &config);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].student_name, "A");
    }

    #[test]
    fn action_filter_matches_derived_label() {
        let config = ConfigData::default();
        let mut visited = student("A", "水戸一中", "野球");
        visited.visit_date = "2025-06-01".to_string();
        let fresh = student("B", "水戸二中", "野球");

        let filter = FilterState {
            actions: vec!["結果記入".to_string()],
            ..FilterState::default()
        };
        let kept = filter_students(&[visited, fresh], &filter, &config);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].student_name, "A");
    }

    #[test]
    fn numeric_codes_sort_numerically_not_lexicographically() {
        let schools = vec![
            school("2", "b", "m"),
            school("10", "c", "m"),
            school("1", "a", "m"),
        ];
        let codes: Vec<String> = schools_by_code(&schools)
            .into_iter()
            .map(|s| s.code)
            .collect();
        assert_eq!(codes, vec!["1", "2", "10"]);
    }

    #[test]
    fn missing_code_sorts_last_ascending() {
        let schools = vec![school("", "x", "m"), school("5", "y", "m")];
        let names: Vec<String> = schools_by_code(&schools)
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["y", "x"]);
    }

    #[test]
    fn municipalities_order_by_minimum_school_code() {
        let schools = vec![
            school("7", "a", "日立市"),
            school("3", "b", "水戸市"),
            school("4", "c", "日立市"),
        ];
        assert_eq!(municipalities_by_code(&schools), vec!["水戸市", "日立市"]);
    }

    #[test]
    fn sort_toggle_flips_then_resets() {
        let first = SortState::toggle(None, SortKey::StudentName);
        assert_eq!(first.direction, SortDirection::Asc);

        let flipped = SortState::toggle(Some(first), SortKey::StudentName);
        assert_eq!(flipped.direction, SortDirection::Desc);

        let other = SortState::toggle(Some(flipped), SortKey::No);
        assert_eq!(other.key, SortKey::No);
        assert_eq!(other.direction, SortDirection::Asc);
    }

    #[test]
    fn priority_sort_is_idempotent() {
        let config = ConfigData::default();
        let mut a = student("田中", "水戸一中", "野球");
        a.prospect = PROSPECT_HIGH.to_string();
        let mut b = student("鈴木", "水戸二中", "野球");
        b.call_date_principal = "2025-04-01".to_string();
        let c = student("青木", "日立一中", "サッカー");

        let mut students = vec![a, b, c];
        // Stable composite sort: derived priority, then name.
        students.sort_by(|x, y| {
            next_action(x, &config)
                .priority()
                .cmp(&next_action(y, &config).priority())
                .then_with(|| x.student_name.cmp(&y.student_name))
        });
        let once = students.clone();
        students.sort_by(|x, y| {
            next_action(x, &config)
                .priority()
                .cmp(&next_action(y, &config).priority())
                .then_with(|| x.student_name.cmp(&y.student_name))
        });
        assert_eq!(students, once);
    }

    #[test]
    fn sort_students_by_next_action_puts_urgent_first() {
        let config = ConfigData::default();
        let mut done = student("A", "s", "c");
        done.result = RESULT_ACCEPTED.to_string();
        let fresh = student("B", "s", "c");

        let mut students = vec![done, fresh];
        sort_students(
            &mut students,
            SortState {
                key: SortKey::NextAction,
                direction: SortDirection::Asc,
            },
            &config,
        );
        assert_eq!(students[0].student_name, "B");
    }

    #[test]
    fn achievement_rate_edges() {
        assert_eq!(achievement_rate(0, 30), 0);
        assert_eq!(achievement_rate(30, 30), 100);
        assert_eq!(achievement_rate(45, 30), 100);
        assert_eq!(achievement_rate(10, 0), 0);
        assert_eq!(achievement_rate(1, 3), 33);
    }

    #[test]
    fn funnel_counts_follow_field_semantics() {
        let config = ConfigData::default();
        let mut a = student("A", "s", "野球");
        a.call_date_principal = "2025-04-01".to_string();
        a.visit_date = "2025-05-01".to_string();
        a.result = RESULT_ACCEPTED.to_string();
        let mut b = student("B", "s", "野球");
        b.call_date_advisor = "2025-04-02".to_string();
        b.visit_date = VISIT_DECLINED.to_string();
        let c = student("C", "s", "サッカー");

        let clubs = vec!["野球".to_string(), "サッカー".to_string()];
        let summary = DashboardSummary::compute(&[a, b, c], &clubs, &config);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.contacted, 2);
        assert_eq!(summary.visited, 1);
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.by_club[0].count, 2);
        assert_eq!(summary.by_club[1].count, 1);
        assert_eq!(summary.achievement_rate, 3);
    }

    #[test]
    fn filtering_does_not_mutate_input() {
        let config = ConfigData::default();
        let original = vec![student("A", "s", "c")];
        let filter = FilterState {
            club_names: vec!["other".to_string()],
            ..FilterState::default()
        };
        let kept = filter_students(&original, &filter, &config);
        assert!(kept.is_empty());
        assert_eq!(original.len(), 1);
    }
}
