use std::collections::HashSet;

use indexmap::IndexSet;

use crate::audit::AuditSink;
use crate::model::{cell, Row, SectorDataset, UnmatchedReport};

/// Collect, per ready sector, the join keys that do not exist in the template.
///
/// Directional: template keys that a sector does not cover are allowed and
/// resolve to null in the join. Sectors without a join column are skipped.
pub fn check_unmatched(
    template_rows: &[Row],
    template_join_column: &str,
    ready_sectors: &[&SectorDataset],
    audit: &mut dyn AuditSink,
) -> UnmatchedReport {
    let template_keys: HashSet<String> = template_rows
        .iter()
        .map(|row| cell(row, template_join_column).key_string())
        .collect();

    let mut report = UnmatchedReport::default();

    for sector in ready_sectors {
        let Some(join_column) = sector.join_column.as_deref() else {
            continue;
        };

        let sector_keys: IndexSet<String> = sector
            .rows
            .iter()
            .map(|row| cell(row, join_column).key_string())
            .collect();

        let unmatched: Vec<String> = sector_keys
            .into_iter()
            .filter(|key| !template_keys.contains(key))
            .collect();

        if !unmatched.is_empty() {
            log::warn!("{}: {} join key(s) missing from template", sector.name, unmatched.len());
            audit.record(format!("{}: {} unmatched values found", sector.name, unmatched.len()));
            report.sectors.insert(sector.name.clone(), unmatched);
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLog;
    use crate::model::row_from;

    fn keyed(keys: &[&str]) -> Vec<Row> {
        keys.iter().map(|k| row_from([("id", *k)])).collect()
    }

    fn sector(name: &str, keys: &[&str]) -> SectorDataset {
        SectorDataset::new(name, keyed(keys))
            .with_columns("id", "pin", "sev")
            .mark_ready(true)
    }

    #[test]
    fn all_matched_gives_empty_report() {
        let template = keyed(&["A", "B", "C"]);
        let health = sector("Health", &["A", "C"]);
        let mut audit = AuditLog::new();
        let report = check_unmatched(&template, "id", &[&health], &mut audit);
        assert!(report.is_empty());
        assert!(audit.is_empty());
    }

    #[test]
    fn reports_values_verbatim_in_first_seen_order() {
        let template = keyed(&["A", "B"]);
        let health = sector("Health", &["Z", "A", "Y", "Z"]);
        let mut audit = AuditLog::new();
        let report = check_unmatched(&template, "id", &[&health], &mut audit);
        assert_eq!(report.get("Health").unwrap(), &["Z".to_string(), "Y".to_string()]);
        assert_eq!(audit.messages(), vec!["Health: 2 unmatched values found"]);
    }

    #[test]
    fn template_keys_missing_from_sector_are_allowed() {
        let template = keyed(&["A", "B", "C", "D"]);
        let wash = sector("WASH", &["B"]);
        let report = check_unmatched(&template, "id", &[&wash], &mut AuditLog::new());
        assert!(report.is_empty());
    }

    #[test]
    fn numeric_and_text_keys_compare_by_string_form() {
        let template = vec![row_from([("id", 5.0)]), row_from([("id", 7.0)])];
        let health = sector("Health", &["5", "7"]);
        let report = check_unmatched(&template, "id", &[&health], &mut AuditLog::new());
        assert!(report.is_empty());
    }

    #[test]
    fn each_sector_reported_separately() {
        let template = keyed(&["A"]);
        let health = sector("Health", &["A", "X"]);
        let wash = sector("WASH", &["Q"]);
        let shelter = sector("Shelter", &["A"]);
        let report =
            check_unmatched(&template, "id", &[&health, &wash, &shelter], &mut AuditLog::new());
        assert_eq!(report.sectors.len(), 2);
        assert_eq!(report.total(), 2);
        let names: Vec<&String> = report.sectors.keys().collect();
        assert_eq!(names, vec!["Health", "WASH"]);
    }

    #[test]
    fn missing_join_value_keys_as_empty_string() {
        let template = keyed(&["A"]);
        let mut health = sector("Health", &["A"]);
        health.rows.push(row_from([("other", "x")]));
        let report = check_unmatched(&template, "id", &[&health], &mut AuditLog::new());
        assert_eq!(report.get("Health").unwrap(), &[String::new()]);
    }
}
