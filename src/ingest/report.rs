//! CSV reports written by the diff script
//!
//! Both reports start with a header row and have a fixed column layout.
//! Rows with the wrong column count are rejected rather than guessed at.

use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use crate::error::IngestError;
use crate::model::{CommitRow, DiffRow, DiffStatus};
use crate::util::parse_report_date;

const PROJECT_REPORT: &str = "project";
const COMMIT_REPORT: &str = "commit";

/// Date, Downstream Project, Upstream Project, Diff Status, Files Changed,
/// Line Insertions, Line Deletions, Line Changes, Commits Not Upstreamed
pub const PROJECT_COLUMNS: usize = 9;

/// Date, Commit, Downstream Project, Author, Subject
pub const COMMIT_COLUMNS: usize = 5;

pub fn read_diff_rows(path: &Path) -> Result<Vec<DiffRow>, IngestError> {
    parse_diff_rows(open(path)?)
}

pub fn read_commit_rows(path: &Path) -> Result<Vec<CommitRow>, IngestError> {
    parse_commit_rows(open(path)?)
}

pub fn parse_diff_rows<R: Read>(reader: R) -> Result<Vec<DiffRow>, IngestError> {
    records(reader, PROJECT_REPORT, PROJECT_COLUMNS, |fields| {
        Ok(DiffRow {
            date: fields.date(0)?,
            downstream_project: fields.text(1),
            upstream_project: fields.text(2),
            status: fields.parse::<DiffStatus>(3, "diff status")?,
            files_changed: fields.parse(4, "files changed")?,
            line_insertions: fields.parse(5, "line insertions")?,
            line_deletions: fields.parse(6, "line deletions")?,
            line_changes: fields.parse(7, "line changes")?,
            commits_not_upstreamed: fields.parse(8, "commits not upstreamed")?,
        })
    })
}

pub fn parse_commit_rows<R: Read>(reader: R) -> Result<Vec<CommitRow>, IngestError> {
    records(reader, COMMIT_REPORT, COMMIT_COLUMNS, |fields| {
        Ok(CommitRow {
            date: fields.date(0)?,
            commit: fields.text(1),
            downstream_project: fields.text(2),
            author: fields.text(3),
            subject: fields.text(4),
        })
    })
}

fn open(path: &Path) -> Result<File, IngestError> {
    File::open(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Walk data records, validating the column count before mapping each one
fn records<R, T, F>(
    reader: R,
    report: &'static str,
    expected: usize,
    mut map: F,
) -> Result<Vec<T>, IngestError>
where
    R: Read,
    F: FnMut(&Fields<'_>) -> Result<T, IngestError>,
{
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut out = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|source| IngestError::Csv { report, source })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.len() != expected {
            return Err(IngestError::ColumnCount {
                report,
                line,
                expected,
                found: record.len(),
            });
        }

        out.push(map(&Fields { record: &record, report, line })?);
    }
    Ok(out)
}

/// Column accessor that attaches report and line to every parse failure
struct Fields<'a> {
    record: &'a StringRecord,
    report: &'static str,
    line: u64,
}

impl Fields<'_> {
    fn raw(&self, i: usize) -> &str {
        self.record.get(i).unwrap_or("")
    }

    fn text(&self, i: usize) -> String {
        self.raw(i).to_string()
    }

    fn invalid(&self, i: usize, field: &'static str, message: String) -> IngestError {
        IngestError::InvalidField {
            report: self.report,
            line: self.line,
            field,
            value: self.raw(i).to_string(),
            message,
        }
    }

    fn date(&self, i: usize) -> Result<time::Date, IngestError> {
        parse_report_date(self.raw(i)).map_err(|e| self.invalid(i, "date", e.to_string()))
    }

    fn parse<T>(&self, i: usize, field: &'static str) -> Result<T, IngestError>
    where
        T: FromStr,
        T::Err: ToString,
    {
        self.raw(i)
            .parse::<T>()
            .map_err(|e| self.invalid(i, field, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Month};

    const PROJECT_HEADER: &str = "Date,Downstream Project,Upstream Project,Diff Status,Files Changed,\
        Line Insertions,Line Deletions,Line Changes,Commits Not Upstreamed\n";
    const COMMIT_HEADER: &str = "Date,Commit,Downstream Project,Author,Subject\n";

    #[test]
    fn test_parse_project_row() {
        let input = format!("{}2018/02/20,foo,foo,Modified Projects,34,7,25,32,0\n", PROJECT_HEADER);
        let rows = parse_diff_rows(input.as_bytes()).unwrap();

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.date, Date::from_calendar_date(2018, Month::February, 20).unwrap());
        assert_eq!(row.downstream_project, "foo");
        assert_eq!(row.upstream_project, "foo");
        assert_eq!(row.status, DiffStatus::Modified);
        assert_eq!(row.files_changed, 34);
        assert_eq!(row.line_insertions, 7);
        assert_eq!(row.line_deletions, 25);
        assert_eq!(row.line_changes, 32);
        assert_eq!(row.commits_not_upstreamed, 0);
    }

    #[test]
    fn test_upstream_only_row_has_empty_downstream() {
        let input = format!("{}2018/02/20,,platform/foo,Upstream Only Projects,0,0,0,0,0\n", PROJECT_HEADER);
        let rows = parse_diff_rows(input.as_bytes()).unwrap();
        assert_eq!(rows[0].downstream_project, "");
        assert_eq!(rows[0].status, DiffStatus::UpstreamOnly);
    }

    #[test]
    fn test_non_integer_field_rejected() {
        let input = format!("{}2018/02/20,foo,foo,Modified Projects,34,seven,25,32,0\n", PROJECT_HEADER);
        let err = parse_diff_rows(input.as_bytes()).unwrap_err();
        match err {
            IngestError::InvalidField { field, value, line, .. } => {
                assert_eq!(field, "line insertions");
                assert_eq!(value, "seven");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_column_count_mismatch_rejected() {
        let input = format!("{}2018/02/20,foo,foo,Modified Projects,34,7,25,32\n", PROJECT_HEADER);
        let err = parse_diff_rows(input.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            IngestError::ColumnCount { expected: 9, found: 8, .. }
        ));
    }

    #[test]
    fn test_unknown_status_rejected() {
        let input = format!("{}2018/02/20,foo,foo,Renamed Projects,1,1,1,2,0\n", PROJECT_HEADER);
        let err = parse_diff_rows(input.as_bytes()).unwrap_err();
        assert!(matches!(err, IngestError::InvalidField { field: "diff status", .. }));
    }

    #[test]
    fn test_bad_date_rejected() {
        let input = format!("{}20-02-2018,foo,foo,Modified Projects,1,1,1,2,0\n", PROJECT_HEADER);
        let err = parse_diff_rows(input.as_bytes()).unwrap_err();
        assert!(matches!(err, IngestError::InvalidField { field: "date", .. }));
    }

    #[test]
    fn test_parse_commit_rows_with_quoted_subject() {
        let input = format!(
            "{}2018/02/20,0123abcd,platform/foo,dev@example.com,\"Fix a, b and c\"\n\
             2018/02/20,4567ef01,platform/bar,other@example.com,Plain subject\n",
            COMMIT_HEADER
        );
        let rows = parse_commit_rows(input.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].commit, "0123abcd");
        assert_eq!(rows[0].subject, "Fix a, b and c");
        assert_eq!(rows[1].downstream_project, "platform/bar");
    }

    #[test]
    fn test_header_only_is_empty() {
        assert!(parse_commit_rows(COMMIT_HEADER.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = read_commit_rows(Path::new("/nonexistent/commit.csv")).unwrap_err();
        assert!(matches!(err, IngestError::Io { .. }));
    }
}
