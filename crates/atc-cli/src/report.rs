//! JSON rendering of a conflict report.
//!
//! Undefined (NaN) values serialize as `null`.

use anyhow::{Context, Result};
use atc_conflicts::{ConflictKey, ConflictReport, ConflictTable, Omission};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Summary {
    pub tables: usize,
    pub active_tables: usize,
    pub omissions: usize,
    pub skipped_aircraft: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ConflictEntry<'a> {
    /// Flat identifier such as `A1_A2_C0`
    pub id: String,
    pub key: &'a ConflictKey,
    pub conflict_times: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<&'a ConflictTable>,
}

#[derive(Debug, Serialize)]
pub struct ReportFile<'a> {
    pub scenario: &'a str,
    pub summary: Summary,
    pub conflicts: Vec<ConflictEntry<'a>>,
    pub omissions: &'a [Omission],
}

impl<'a> ReportFile<'a> {
    /// Borrow `report` for output; `with_rows = false` keeps only the summary columns.
    pub fn new(
        scenario: &'a str,
        report: &'a ConflictReport,
        skipped_aircraft: Vec<String>,
        with_rows: bool,
    ) -> Self {
        let conflicts: Vec<ConflictEntry<'a>> = report
            .tables
            .iter()
            .map(|(key, table)| ConflictEntry {
                id: key.to_string(),
                key,
                conflict_times: table.conflict_times(),
                table: with_rows.then_some(table),
            })
            .collect();

        Self {
            scenario,
            summary: Summary {
                tables: conflicts.len(),
                active_tables: report.tables.values().filter(|t| t.is_active()).count(),
                omissions: report.omissions.len(),
                skipped_aircraft,
            },
            conflicts,
            omissions: &report.omissions,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize conflict report")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atc_conflicts::compute_conflicts;

    #[test]
    fn trailing_demo_report_lists_the_overlap() {
        let params = atc_conflicts::ConflictParams {
            worker_threads: Some(1),
            ..Default::default()
        };
        let loaded = crate::demos::trailing().build(&params).unwrap();
        let report = compute_conflicts(&loaded.scenario, &loaded.trajectories, &params);
        let file = ReportFile::new(&loaded.name, &report, loaded.skipped.clone(), false);

        assert_eq!(file.summary.tables, 1);
        assert_eq!(file.conflicts[0].id, "T1_T2_O0");
        assert!(file.conflicts[0].table.is_none());

        let json: serde_json::Value = serde_json::from_str(&file.to_json().unwrap()).unwrap();
        assert_eq!(json["scenario"], "trailing");
        assert_eq!(json["conflicts"][0]["key"]["kind"], "overlap");
        assert!(json["conflicts"][0].get("table").is_none());
    }
}
