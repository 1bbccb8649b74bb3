//! services/api/src/adapters/sheets.rs
//!
//! This module contains the spreadsheet adapter, the concrete implementation
//! of the `SpreadsheetStore` port from the `core` crate. It talks to the
//! spreadsheet HTTP API with `reqwest`, using the caller's bearer token on
//! every request. Column layout is positional and fixed: 22 columns for
//! Students (A:V), 6 for Schools (A:F), 1 each for Clubs/Recruiters, 4 for
//! Config with the fourth column carrying the target on the first data row.

use async_trait::async_trait;
use recruit_core::domain::{ConfigData, SchoolData, StudentProfile, RESULT_PENDING};
use recruit_core::ports::{PortError, PortResult, SheetSnapshot, SpreadsheetStore};
use serde::Deserialize;
use serde_json::{json, Value};

const STUDENTS_SHEET: &str = "Students";
const STUDENTS_RANGE: &str = "Students!A2:V";
const STUDENTS_ID_COLUMN: &str = "Students!A:A";
const SCHOOLS_RANGE: &str = "Schools!A2:F";
const CLUBS_RANGE: &str = "Clubs!A2:A";
const RECRUITERS_RANGE: &str = "Recruiters!A2:A";
const CONFIG_RANGE: &str = "Config!A2:D";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A spreadsheet adapter that implements the `SpreadsheetStore` port.
#[derive(Clone)]
pub struct SheetsAdapter {
    client: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
}

impl SheetsAdapter {
    /// Creates a new `SheetsAdapter` for one spreadsheet.
    pub fn new(base_url: &str, spreadsheet_id: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
        }
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url, self.spreadsheet_id, range
        )
    }

    /// Reads one value range as formatted strings. Missing trailing cells
    /// and a missing `values` key both come back as empty.
    async fn get_values(&self, access_token: &str, range: &str) -> PortResult<Vec<Vec<Value>>> {
        let response = self
            .client
            .get(self.values_url(range))
            .query(&[("valueRenderOption", "FORMATTED_VALUE")])
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let response = check_status(response, range).await?;
        let body: ValueRange = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(body.values.unwrap_or_default())
    }

    /// Overwrites one value range with the given rows.
    async fn put_values(
        &self,
        access_token: &str,
        range: &str,
        values: Vec<Vec<Value>>,
    ) -> PortResult<()> {
        let response = self
            .client
            .put(self.values_url(range))
            .query(&[("valueInputOption", "USER_ENTERED")])
            .bearer_auth(access_token)
            .json(&json!({ "values": values }))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        check_status(response, range).await?;
        Ok(())
    }

    /// Scans the identifier column for an exact match and returns the
    /// zero-based row index. Positions shift after deletions, so this is
    /// re-resolved on every mutation and never cached.
    async fn student_row_index(&self, access_token: &str, id: &str) -> PortResult<Option<usize>> {
        let rows = self.get_values(access_token, STUDENTS_ID_COLUMN).await?;
        Ok(rows
            .iter()
            .position(|row| row.first().map(cell_text).as_deref() == Some(id)))
    }

    /// Looks up the numeric sheet id of the Students sheet, needed by the
    /// row-deletion request.
    async fn students_sheet_id(&self, access_token: &str) -> PortResult<Option<i64>> {
        let url = format!("{}/v4/spreadsheets/{}", self.base_url, self.spreadsheet_id);
        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let response = check_status(response, STUDENTS_SHEET).await?;
        let meta: SpreadsheetMeta = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(meta
            .sheets
            .into_iter()
            .find(|sheet| sheet.properties.title == STUDENTS_SHEET)
            .map(|sheet| sheet.properties.sheet_id))
    }
}

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Deserialize)]
struct ValueRange {
    values: Option<Vec<Vec<Value>>>,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
    #[serde(rename = "sheetId")]
    sheet_id: i64,
}

/// Maps the backend's HTTP error signals onto the port error taxonomy so
/// callers can tell a missing range from a permission problem.
async fn check_status(response: reqwest::Response, context: &str) -> PortResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(match status.as_u16() {
        401 => PortError::Unauthorized,
        403 => PortError::PermissionDenied(context.to_string()),
        400 | 404 => PortError::NotFound(format!("{context}: {body}")),
        _ => PortError::Unexpected(format!("{context}: {status}: {body}")),
    })
}

//=========================================================================================
// Row Mappers
//=========================================================================================

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn col(row: &[Value], index: usize) -> String {
    row.get(index).map(cell_text).unwrap_or_default()
}

fn row_to_student(row: &[Value]) -> StudentProfile {
    let or_pending = |value: String| {
        if value.is_empty() {
            RESULT_PENDING.to_string()
        } else {
            value
        }
    };
    StudentProfile {
        id: col(row, 0),
        no: col(row, 1).trim().parse().unwrap_or(0),
        municipality: col(row, 2),
        school_name: col(row, 3),
        school_code: col(row, 4),
        principal_name: col(row, 5),
        teacher_in_charge: col(row, 6),
        school_phone: col(row, 7),
        club_name: col(row, 8),
        student_name: col(row, 9),
        student_furigana: col(row, 10),
        gender: col(row, 11),
        club_achievements: col(row, 12),
        score_info: col(row, 13),
        scholarship_rank: col(row, 14),
        recruiter_type: col(row, 15),
        call_date_principal: col(row, 16),
        call_date_advisor: col(row, 17),
        visit_date: col(row, 18),
        prospect: or_pending(col(row, 19)),
        result: or_pending(col(row, 20)),
        notes: col(row, 21),
    }
}

fn student_to_row(s: &StudentProfile) -> Vec<Value> {
    vec![
        json!(s.id),
        json!(s.no),
        json!(s.municipality),
        json!(s.school_name),
        json!(s.school_code),
        json!(s.principal_name),
        json!(s.teacher_in_charge),
        json!(s.school_phone),
        json!(s.club_name),
        json!(s.student_name),
        json!(s.student_furigana),
        json!(s.gender),
        json!(s.club_achievements),
        json!(s.score_info),
        json!(s.scholarship_rank),
        json!(s.recruiter_type),
        json!(s.call_date_principal),
        json!(s.call_date_advisor),
        json!(s.visit_date),
        json!(s.prospect),
        json!(s.result),
        json!(s.notes),
    ]
}

fn row_to_school(row: &[Value]) -> SchoolData {
    SchoolData {
        code: col(row, 0),
        name: col(row, 1),
        municipality: col(row, 2),
        principal: col(row, 3),
        phone: col(row, 4),
        head_teacher: col(row, 5),
    }
}

fn school_to_row(s: &SchoolData) -> Vec<Value> {
    vec![
        json!(s.code),
        json!(s.name),
        json!(s.municipality),
        json!(s.principal),
        json!(s.phone),
        json!(s.head_teacher),
    ]
}

fn first_cells(rows: &[Vec<Value>]) -> Vec<String> {
    rows.iter()
        .map(|row| col(row, 0))
        .filter(|value| !value.is_empty())
        .collect()
}

fn rows_to_config(rows: &[Vec<Value>]) -> ConfigData {
    if rows.is_empty() {
        return ConfigData::default();
    }
    let column = |index: usize| {
        rows.iter()
            .map(|row| col(row, index))
            .filter(|value| !value.is_empty())
            .collect::<Vec<_>>()
    };
    let defaults = ConfigData::default();
    ConfigData {
        ranks: column(0),
        results: column(1),
        prospects: column(2),
        recruitment_target: col(&rows[0], 3)
            .trim()
            .parse()
            .unwrap_or(defaults.recruitment_target),
    }
}

fn config_to_rows(config: &ConfigData) -> Vec<Vec<Value>> {
    let len = config
        .ranks
        .len()
        .max(config.results.len())
        .max(config.prospects.len())
        .max(1);
    (0..len)
        .map(|i| {
            let cell = |list: &[String]| json!(list.get(i).cloned().unwrap_or_default());
            vec![
                cell(&config.ranks),
                cell(&config.results),
                cell(&config.prospects),
                if i == 0 {
                    json!(config.recruitment_target)
                } else {
                    json!("")
                },
            ]
        })
        .collect()
}

//=========================================================================================
// `SpreadsheetStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SpreadsheetStore for SheetsAdapter {
    async fn fetch_all(&self, access_token: &str) -> PortResult<SheetSnapshot> {
        let students = self.get_values(access_token, STUDENTS_RANGE).await?;
        let schools = self.get_values(access_token, SCHOOLS_RANGE).await?;
        let clubs = self.get_values(access_token, CLUBS_RANGE).await?;
        let recruiters = self.get_values(access_token, RECRUITERS_RANGE).await?;

        // The Config range is optional: older spreadsheets predate it and
        // fall back to the built-in vocabularies.
        let config = match self.get_values(access_token, CONFIG_RANGE).await {
            Ok(rows) => rows_to_config(&rows),
            Err(PortError::NotFound(_)) => ConfigData::default(),
            Err(err) => return Err(err),
        };

        Ok(SheetSnapshot {
            students: students.iter().map(|row| row_to_student(row)).collect(),
            schools: schools.iter().map(|row| row_to_school(row)).collect(),
            clubs: first_cells(&clubs),
            recruiters: first_cells(&recruiters),
            config,
        })
    }

    async fn append_student(
        &self,
        access_token: &str,
        student: &StudentProfile,
    ) -> PortResult<()> {
        let url = format!("{}:append", self.values_url(STUDENTS_ID_COLUMN));
        let response = self
            .client
            .post(url)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .bearer_auth(access_token)
            .json(&json!({ "values": [student_to_row(student)] }))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        check_status(response, STUDENTS_SHEET).await?;
        Ok(())
    }

    async fn update_student(
        &self,
        access_token: &str,
        student: &StudentProfile,
    ) -> PortResult<()> {
        let index = self
            .student_row_index(access_token, &student.id)
            .await?
            .ok_or_else(|| {
                PortError::NotFound(format!("student {} not present in sheet", student.id))
            })?;
        let row_number = index + 1;
        let range = format!("Students!A{row_number}:V{row_number}");
        self.put_values(access_token, &range, vec![student_to_row(student)])
            .await
    }

    async fn delete_student(&self, access_token: &str, student_id: &str) -> PortResult<()> {
        // An identifier that is already gone remotely makes the deletion
        // an explicit no-op.
        let Some(index) = self.student_row_index(access_token, student_id).await? else {
            return Ok(());
        };
        let Some(sheet_id) = self.students_sheet_id(access_token).await? else {
            return Ok(());
        };

        let url = format!(
            "{}/v4/spreadsheets/{}:batchUpdate",
            self.base_url, self.spreadsheet_id
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(access_token)
            .json(&json!({
                "requests": [{
                    "deleteDimension": {
                        "range": {
                            "sheetId": sheet_id,
                            "dimension": "ROWS",
                            "startIndex": index,
                            "endIndex": index + 1
                        }
                    }
                }]
            }))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        check_status(response, STUDENTS_SHEET).await?;
        Ok(())
    }

    async fn sync_master_data(
        &self,
        access_token: &str,
        schools: &[SchoolData],
        clubs: &[String],
        recruiters: &[String],
    ) -> PortResult<()> {
        let school_rows = schools.iter().map(school_to_row).collect();
        self.put_values(access_token, SCHOOLS_RANGE, school_rows)
            .await?;

        let club_rows = clubs.iter().map(|c| vec![json!(c)]).collect();
        self.put_values(access_token, CLUBS_RANGE, club_rows).await?;

        let recruiter_rows = recruiters.iter().map(|r| vec![json!(r)]).collect();
        self.put_values(access_token, RECRUITERS_RANGE, recruiter_rows)
            .await
    }

    async fn sync_config(&self, access_token: &str, config: &ConfigData) -> PortResult<()> {
        self.put_values(access_token, CONFIG_RANGE, config_to_rows(config))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn student_row_mapping_round_trips_all_columns() {
        let student = StudentProfile {
            id: "abc-123".to_string(),
            no: 7,
            municipality: "水戸市".to_string(),
            school_name: "水戸一中".to_string(),
            school_code: "12".to_string(),
            principal_name: "校長".to_string(),
            teacher_in_charge: "主任".to_string(),
            school_phone: "029-000-0000".to_string(),
            club_name: "野球".to_string(),
            student_name: "山田太郎".to_string(),
            student_furigana: "やまだたろう".to_string(),
            gender: "男".to_string(),
            club_achievements: "県大会優勝".to_string(),
            score_info: "4.2".to_string(),
            scholarship_rank: "S1".to_string(),
            recruiter_type: "校長".to_string(),
            call_date_principal: "2025-04-01".to_string(),
            call_date_advisor: "2025-04-05".to_string(),
            visit_date: "2025-05-01".to_string(),
            prospect: "○".to_string(),
            result: "未定".to_string(),
            notes: "備考".to_string(),
        };

        let row = student_to_row(&student);
        assert_eq!(row.len(), 22);
        assert_eq!(row_to_student(&row), student);
    }

    #[test]
    fn short_rows_default_missing_cells() {
        let row = vec![json!("id-1"), json!("3"), json!("水戸市")];
        let student = row_to_student(&row);
        assert_eq!(student.id, "id-1");
        assert_eq!(student.no, 3);
        assert_eq!(student.municipality, "水戸市");
        assert_eq!(student.school_name, "");
        // Blank classification cells fall back to pending.
        assert_eq!(student.prospect, RESULT_PENDING);
        assert_eq!(student.result, RESULT_PENDING);
    }

    #[test]
    fn numeric_cells_are_read_as_text() {
        let row = vec![json!(12345), json!(9)];
        let student = row_to_student(&row);
        assert_eq!(student.id, "12345");
        assert_eq!(student.no, 9);
    }

    #[test]
    fn school_row_mapping_round_trips() {
        let school = SchoolData {
            code: "3".to_string(),
            name: "日立一中".to_string(),
            municipality: "日立市".to_string(),
            principal: "校長A".to_string(),
            phone: "0294-00-0000".to_string(),
            head_teacher: "主任B".to_string(),
        };
        let row = school_to_row(&school);
        assert_eq!(row.len(), 6);
        assert_eq!(row_to_school(&row), school);
    }

    #[test]
    fn config_rows_zip_columns_of_unequal_length() {
        let config = ConfigData {
            ranks: vec!["S1".to_string(), "S2".to_string(), "S3".to_string()],
            results: vec!["未定".to_string()],
            prospects: vec!["○".to_string(), "×".to_string()],
            recruitment_target: 25,
        };
        let rows = config_to_rows(&config);
        assert_eq!(rows.len(), 3);
        // Target lives only in the fourth column of the first row.
        assert_eq!(rows[0][3], json!(25));
        assert_eq!(rows[1][3], json!(""));
        assert_eq!(rows_to_config(&rows), config);
    }

    #[test]
    fn empty_config_range_falls_back_to_defaults() {
        assert_eq!(rows_to_config(&[]), ConfigData::default());
    }

    #[test]
    fn malformed_target_keeps_default() {
        let rows = vec![vec![json!("S1"), json!("未定"), json!("○"), json!("目標")]];
        let config = rows_to_config(&rows);
        assert_eq!(
            config.recruitment_target,
            ConfigData::default().recruitment_target
        );
    }
}
