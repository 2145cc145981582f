//! Public status lookup by reference number. Read-only; needs no session.

use crate::error::{Result, WorkflowError};
use crate::report::Report;

fn matches(report: &Report, needle: &str) -> bool {
    report.fields.no_surat.to_lowercase().contains(needle)
        || report.fields.no_agenda.to_lowercase().contains(needle)
}

/// Blank queries are rejected; otherwise the query is matched as typed, only lowercased.
fn needle(query: &str) -> Result<String> {
    if query.trim().is_empty() {
        return Err(WorkflowError::validation("enter a letter or agenda number"));
    }
    Ok(query.to_lowercase())
}

/// First report whose `noSurat` or `noAgenda` contains `query`, ignoring case.
pub fn find_report<'a>(reports: &'a [Report], query: &str) -> Result<&'a Report> {
    let needle = needle(query)?;
    reports
        .iter()
        .find(|r| matches(r, &needle))
        .ok_or_else(|| WorkflowError::not_found("report", query))
}

/// Every matching report, in collection order.
pub fn find_reports<'a>(reports: &'a [Report], query: &str) -> Result<Vec<&'a Report>> {
    let needle = needle(query)?;
    Ok(reports.iter().filter(|r| matches(r, &needle)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::create_report;
    use crate::report::tests::{sample_fields, tu_session};

    fn reports() -> Vec<Report> {
        let mut a = sample_fields("001/TU/2024");
        a.no_agenda = "AG-001".into();
        let mut b = sample_fields("002/TU/2024");
        b.no_agenda = "AG-002".into();
        vec![
            create_report(1, a, &tu_session()).unwrap(),
            create_report(2, b, &tu_session()).unwrap(),
        ]
    }

    #[test]
    fn test_find_by_either_number_ignoring_case() {
        let rs = reports();
        assert_eq!(find_report(&rs, "002/tu").unwrap().id, 2);
        assert_eq!(find_report(&rs, "ag-001").unwrap().id, 1);
        assert_eq!(find_report(&rs, "AG-002").unwrap().id, 2);
    }

    #[test]
    fn test_query_is_not_trimmed() {
        let rs = reports();
        assert!(matches!(find_report(&rs, "001 "), Err(WorkflowError::NotFound { .. })));
        assert!(matches!(find_report(&rs, " ag-002"), Err(WorkflowError::NotFound { .. })));
        assert!(find_reports(&rs, "002 ").unwrap().is_empty());
    }

    #[test]
    fn test_first_match_wins() {
        let rs = reports();
        assert_eq!(find_report(&rs, "/TU/2024").unwrap().id, 1);
        let all: Vec<u64> = find_reports(&rs, "/TU/2024").unwrap().iter().map(|r| r.id).collect();
        assert_eq!(all, vec![1, 2]);
    }

    #[test]
    fn test_miss_and_blank() {
        let rs = reports();
        assert!(matches!(find_report(&rs, "999"), Err(WorkflowError::NotFound { .. })));
        assert!(find_reports(&rs, "999").unwrap().is_empty());
        assert!(matches!(find_report(&rs, "  "), Err(WorkflowError::ValidationFailed(_))));
    }
}
