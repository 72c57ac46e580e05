//! Yearly completion reports and their CSV export.

use std::fs;
use std::path::{Path, PathBuf};

use jiff::Zoned;
use jiff::civil::Date;
use jiff::tz::TimeZone;
use slug::slugify;
use thiserror::Error;

use crate::{
    models::store::Store,
    services::lookup::{self, LookupError},
};

pub const CSV_HEADERS: [&str; 7] = [
    "Task Title",
    "Group",
    "Assigned To",
    "Due Date",
    "Completed At",
    "Year",
    "Status",
];

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Failed to write report to '{path}': {source}")]
    ExportFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct ReportFilter {
    pub year: i16,
    /// Employee name or email
    pub employee: Option<String>,
    /// Matched against title and description
    pub query: Option<String>,
}

#[derive(Debug)]
pub struct ReportRow {
    pub task_number: u64,
    pub title: String,
    pub group: String,
    pub assignee: String,
    pub due_date: Option<Date>,
    pub completed_at: Zoned,
}

#[derive(Debug)]
pub struct Report {
    pub year: i16,
    /// Name of the employee the report is narrowed to
    pub employee: Option<String>,
    pub rows: Vec<ReportRow>,
}

/// Completed root tasks finished in the filter's year, newest first.
pub fn build_report(
    store: &Store,
    filter: &ReportFilter,
    tz: &TimeZone,
) -> Result<Report, ReportError> {
    let employee_id = filter
        .employee
        .as_deref()
        .map(|query| lookup::resolve_employee(store, query))
        .transpose()?;
    let needle = filter
        .query
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .unwrap_or_default();

    let mut rows: Vec<ReportRow> = store
        .tasks
        .iter()
        .filter(|t| t.completed)
        .filter_map(|t| t.completed_at.map(|at| (t, at.to_zoned(tz.clone()))))
        .filter(|(_, completed_at)| completed_at.year() == filter.year)
        .filter(|(t, _)| employee_id.is_none_or(|id| t.assignee == Some(id)))
        .filter(|(t, _)| {
            needle.is_empty()
                || t.title.to_lowercase().contains(&needle)
                || t
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
        })
        .map(|(t, completed_at)| ReportRow {
            task_number: t.task_number,
            title: t.title.clone(),
            group: store
                .get_group(t.group_id)
                .map(|g| g.name.clone())
                .unwrap_or_else(|| "General".to_string()),
            assignee: t
                .assignee
                .and_then(|id| store.employee_name(id))
                .unwrap_or("Unassigned")
                .to_string(),
            due_date: t.due_date,
            completed_at,
        })
        .collect();
    rows.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

    Ok(Report {
        year: filter.year,
        employee: employee_id
            .and_then(|id| store.employee_name(id))
            .map(str::to_string),
        rows,
    })
}

/// Years that have completions or due dates, plus the current one, newest
/// first.
pub fn available_years(store: &Store, current_year: i16, tz: &TimeZone) -> Vec<i16> {
    let mut years: Vec<i16> = store
        .tasks
        .iter()
        .flat_map(|t| {
            let completed = t.completed_at.map(|at| at.to_zoned(tz.clone()).year());
            let due = t.due_date.map(|d| d.year());
            [completed, due]
        })
        .flatten()
        .chain([current_year])
        .collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years
}

fn escape_field(field: &str) -> String {
    if field.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn to_csv(report: &Report) -> String {
    let mut csv = CSV_HEADERS.join(",");
    csv.push('\n');

    for row in &report.rows {
        let fields = [
            row.title.clone(),
            row.group.clone(),
            row.assignee.clone(),
            row.due_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            row.completed_at.strftime("%Y-%m-%d %H:%M").to_string(),
            row.completed_at.year().to_string(),
            "Completed".to_string(),
        ];
        let line: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
        csv.push_str(&line.join(","));
        csv.push('\n');
    }
    csv
}

pub fn default_file_name(report: &Report) -> String {
    let employee = report
        .employee
        .as_deref()
        .map(slugify)
        .unwrap_or_else(|| "all".to_string());
    format!("TaskFlow_Report_{}_{employee}.csv", report.year)
}

/// Writes the report as CSV to `path`, or to the default file name in the
/// working directory.
pub fn export_csv(report: &Report, path: Option<&Path>) -> Result<PathBuf, ReportError> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(default_file_name(report)));

    fs::write(&path, to_csv(report)).map_err(|source| ReportError::ExportFailed {
        path: path.clone(),
        source,
    })?;

    log::info!("exported {} report rows to {}", report.rows.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use tempfile::tempdir;

    use super::*;
    use crate::models::task::Task;

    fn store() -> Store {
        let mut store = Store::seeded("2025-03-05".parse().unwrap());
        let rahul = store.employees[0].id;
        let complete = |task: &mut Task, at: &str| {
            task.completed = true;
            task.completed_at = Some(at.parse::<Timestamp>().unwrap());
        };

        complete(&mut store.tasks[0], "2025-03-12T09:00:00Z");
        complete(&mut store.tasks[1], "2025-06-01T09:00:00Z");
        store.tasks[1].assignee = Some(rahul);
        store.tasks.push(Task {
            title: "Audit, \"Phase 1\"".into(),
            group_id: uuid::Uuid::new_v4(),
            completed: true,
            completed_at: Some("2024-07-01T09:00:00Z".parse::<Timestamp>().unwrap()),
            ..Task::default()
        });
        store
    }

    fn filter(year: i16) -> ReportFilter {
        ReportFilter {
            year,
            employee: None,
            query: None,
        }
    }

    #[test]
    fn test_report_filters_by_year_newest_first() {
        let store = store();
        let report = build_report(&store, &filter(2025), &TimeZone::UTC).unwrap();
        let titles: Vec<_> = report.rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Pay Advance Tax Installment", "File GSTR-1 for Client Alpha"]
        );
        assert_eq!(report.rows[0].assignee, "Rahul Sharma");
        assert_eq!(report.rows[1].assignee, "Unassigned");
        assert_eq!(report.rows[1].group, "Group 2");
    }

    #[test]
    fn test_report_employee_and_text_filters() {
        let store = store();
        let by_employee = ReportFilter {
            employee: Some("rahul".into()),
            ..filter(2025)
        };
        let report = build_report(&store, &by_employee, &TimeZone::UTC).unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.employee.as_deref(), Some("Rahul Sharma"));

        let by_text = ReportFilter {
            query: Some("E-INVOICES".into()),
            ..filter(2025)
        };
        let report = build_report(&store, &by_text, &TimeZone::UTC).unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].task_number, 2);
    }

    #[test]
    fn test_available_years() {
        let store = store();
        assert_eq!(
            available_years(&store, 2026, &TimeZone::UTC),
            vec![2026, 2025, 2024]
        );
    }

    #[test]
    fn test_csv_quotes_and_fallbacks() {
        let store = store();
        let report = build_report(&store, &filter(2024), &TimeZone::UTC).unwrap();
        let csv = to_csv(&report);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "Task Title,Group,Assigned To,Due Date,Completed At,Year,Status"
        );
        assert_eq!(
            lines[1],
            "\"Audit, \"\"Phase 1\"\"\",General,Unassigned,N/A,2024-07-01 09:00,2024,Completed"
        );
        assert_eq!(default_file_name(&report), "TaskFlow_Report_2024_all.csv");
    }

    #[test]
    fn test_export_writes_file() {
        let store = store();
        let report = build_report(
            &store,
            &ReportFilter {
                employee: Some("rahul@taskflow.com".into()),
                ..filter(2025)
            },
            &TimeZone::UTC,
        )
        .unwrap();
        assert_eq!(
            default_file_name(&report),
            "TaskFlow_Report_2025_rahul-sharma.csv"
        );

        let dir = tempdir().unwrap();
        let path = dir.path().join("report.csv");
        let written = export_csv(&report, Some(&path)).unwrap();
        let content = fs::read_to_string(written).unwrap();
        assert!(content.contains("Pay Advance Tax Installment,Group 1,Rahul Sharma,2025-03-05,"));
    }
}
