use jaws_merge::model::row_from;
use jaws_merge::{
    merge, AuditLog, CellValue, MergeConfig, MergeError, MergeInput, MergeState, Merger, Row,
    SectorDataset, TemplateDataset,
};

fn num(n: f64) -> CellValue {
    CellValue::Number(n)
}

fn text(s: &str) -> CellValue {
    CellValue::from(s)
}

fn config() -> MergeConfig {
    MergeConfig::default().with_population_column("Population")
}

fn template(rows: &[(&str, f64)]) -> TemplateDataset {
    let rows = rows
        .iter()
        .map(|(id, pop)| row_from([("id", text(id)), ("Population", num(*pop))]))
        .collect();
    TemplateDataset::new(Some("id".into()), rows)
}

fn sector(name: &str, rows: &[(&str, CellValue, CellValue)]) -> SectorDataset {
    let rows: Vec<Row> = rows
        .iter()
        .map(|(id, pin, sev)| {
            row_from([("id", text(id)), ("pin", pin.clone()), ("sev", sev.clone())])
        })
        .collect();
    SectorDataset::new(name, rows)
        .with_columns("id", "pin", "sev")
        .mark_ready(true)
}

// -------------------------------------------------------------------------
// Worked example
// -------------------------------------------------------------------------

#[test]
fn single_sector_worked_example() {
    let input = MergeInput {
        template: template(&[("A", 100.0), ("B", 200.0)]),
        sectors: vec![sector("Health", &[("A", num(50.0), num(2.0))])],
    };
    let out = merge(&input, &config(), &mut AuditLog::new()).unwrap();

    let a = &out.pin[0];
    assert_eq!(a["id"], text("A"));
    assert_eq!(a["PiN_Health"], num(50.0));
    assert_eq!(a["PiN_Health_%"], num(50.0));
    assert_eq!(a["Highest PiN"], num(50.0));
    assert_eq!(a["Highest PiN Sector"], text("Health"));
    assert_eq!(a["Second Highest PiN"], CellValue::Null);

    let b = &out.pin[1];
    assert_eq!(b["PiN_Health"], CellValue::Null);
    assert_eq!(b["PiN_Health_%"], num(0.0));
    assert_eq!(b["Highest PiN"], num(0.0));
    assert_eq!(b["Highest PiN Sector"], text("Health"));

    assert_eq!(out.severity[0]["Severity_Health"], num(2.0));
    assert_eq!(out.severity[1]["Severity_Health"], CellValue::Null);
}

// -------------------------------------------------------------------------
// Multi-sector
// -------------------------------------------------------------------------

fn three_sector_input() -> MergeInput {
    MergeInput {
        template: template(&[("D1", 1000.0), ("D2", 500.0), ("D3", 0.0)]),
        sectors: vec![
            sector(
                "Nutrition",
                &[("D1", num(100.0), num(3.0)), ("D2", num(60.0), num(2.0))],
            ),
            sector(
                "Health",
                &[("D1", num(300.0), num(4.0)), ("D3", text("12"), text("x"))],
            ),
            sector("WASH", &[("D1", num(250.0), num(3.0)), ("D2", num(60.0), num(1.0))]),
        ],
    }
}

#[test]
fn multi_sector_ranking_and_flags() {
    let out = merge(&three_sector_input(), &config(), &mut AuditLog::new()).unwrap();
    assert_eq!(out.row_count(), 3);

    let d1 = &out.pin[0];
    assert_eq!(d1["Highest PiN Sector"], text("Health"));
    assert_eq!(d1["Second Highest PiN Sector"], text("WASH"));
    assert_eq!(d1["Third Highest PiN Sector"], text("Nutrition"));
    assert_eq!(d1["Highest PiN %"], num(30.0));
    assert_eq!(d1["Difference Highest and 2nd Highest"], num(50.0));
    assert_eq!(d1["% Difference Highest and 2nd Highest"], num(20.0));
    assert_eq!(d1["Difference over threshold"], CellValue::Bool(false));
    assert_eq!(d1["% Difference Highest and 3rd Highest"], num(200.0));
    assert_eq!(d1["Difference over threshold 3rd"], CellValue::Bool(true));
    assert_eq!(d1["Total Flagged"], num(1.0));
    assert_eq!(d1["Row Flagged"], CellValue::Bool(true));

    // D2: Nutrition and WASH tie at 60, Health missing ranks at 0.
    let d2 = &out.pin[1];
    assert_eq!(d2["PiN_Health"], CellValue::Null);
    assert_eq!(d2["Highest PiN Sector"], text("Nutrition"));
    assert_eq!(d2["Second Highest PiN Sector"], text("WASH"));
    assert_eq!(d2["Third Highest PiN Sector"], text("Health"));
    assert_eq!(d2["% Difference Highest and 2nd Highest"], num(0.0));
    assert_eq!(d2["% Difference Highest and 3rd Highest"], CellValue::Infinite { negative: false });
    assert_eq!(d2["Difference over threshold 3rd"], CellValue::Bool(true));

    // D3: population 0 gives null percentages; Health text coerced.
    let d3 = &out.pin[2];
    assert_eq!(d3["PiN_Health"], num(12.0));
    assert_eq!(d3["PiN_Health_%"], CellValue::Null);
    assert_eq!(d3["Highest PiN Sector"], text("Health"));
    assert_eq!(out.severity[2]["Severity_Health"], CellValue::NotANumber);
}

#[test]
fn severity_table_carries_no_analytics() {
    let out = merge(&three_sector_input(), &config(), &mut AuditLog::new()).unwrap();
    let cols: Vec<&str> = out.severity[0].keys().map(|k| k.as_str()).collect();
    assert_eq!(
        cols,
        vec!["id", "Population", "Severity_Nutrition", "Severity_Health", "Severity_WASH"]
    );
    assert_eq!(out.severity_columns.len(), 5);
    assert_eq!(out.pin_columns.len(), out.pin_column_count());
}

#[test]
fn thresholds_change_flags() {
    let cfg = config().with_thresholds(10.0, 500.0);
    let out = merge(&three_sector_input(), &cfg, &mut AuditLog::new()).unwrap();
    let d1 = &out.pin[0];
    assert_eq!(d1["Difference over threshold"], CellValue::Bool(true));
    assert_eq!(d1["Difference over threshold 3rd"], CellValue::Bool(false));
    assert_eq!(d1["Total Flagged"], num(1.0));
}

#[test]
fn unready_sector_is_ignored() {
    let mut input = three_sector_input();
    input.sectors[1].ready = false;
    // Would be unmatched if it participated.
    input.sectors[1].rows.push(row_from([("id", "ZZ")]));
    let out = merge(&input, &config(), &mut AuditLog::new()).unwrap();
    assert!(!out.pin[0].contains_key("PiN_Health"));
    assert!(out.pin[0].contains_key("PiN_WASH"));
}

#[test]
fn sector_without_join_column_does_not_participate() {
    let mut input = three_sector_input();
    input.sectors[2].join_column = None;
    let out = merge(&input, &config(), &mut AuditLog::new()).unwrap();
    assert!(!out.pin[0].contains_key("PiN_WASH"));
}

// -------------------------------------------------------------------------
// Integrity gate
// -------------------------------------------------------------------------

#[test]
fn integrity_gate_lists_values_verbatim() {
    let mut input = three_sector_input();
    input.sectors[0]
        .rows
        .push(row_from([("id", text("D9 ")), ("pin", num(1.0)), ("sev", num(1.0))]));
    input.sectors[2]
        .rows
        .push(row_from([("id", text("d1")), ("pin", num(1.0)), ("sev", num(1.0))]));

    let mut audit = AuditLog::new();
    let err = merge(&input, &config(), &mut audit).unwrap_err();
    let MergeError::UnmatchedKeys(report) = err else {
        panic!("expected unmatched keys, got {err:?}");
    };
    assert_eq!(report.get("Nutrition").unwrap(), &["D9 ".to_string()]);
    assert_eq!(report.get("WASH").unwrap(), &["d1".to_string()]);
    assert!(report.get("Health").is_none());

    let messages = audit.messages();
    assert!(messages.contains(&"Nutrition: 1 unmatched values found"));
    assert!(messages.contains(&"WASH: 1 unmatched values found"));
    assert_eq!(messages.last(), Some(&"Merge failed: Unmatched values found"));
}

#[test]
fn failed_run_leaves_previous_output_unchanged() {
    let mut merger = Merger::new(config());
    let mut audit = AuditLog::new();
    merger.run(&three_sector_input(), &mut audit).unwrap();
    let before = serde_json::to_string(merger.output().unwrap()).unwrap();

    let mut bad = three_sector_input();
    bad.sectors[0].rows.push(row_from([("id", "nowhere")]));
    assert!(merger.run(&bad, &mut audit).is_err());
    assert_eq!(merger.state(), MergeState::Failed);

    let after = serde_json::to_string(merger.output().unwrap()).unwrap();
    assert_eq!(before, after);
}

// -------------------------------------------------------------------------
// Determinism
// -------------------------------------------------------------------------

#[test]
fn repeated_merges_are_identical() {
    let input = three_sector_input();
    let first = merge(&input, &config(), &mut AuditLog::new()).unwrap();
    let second = merge(&input, &config(), &mut AuditLog::new()).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn json_uses_text_for_non_finite_values() {
    let out = merge(&three_sector_input(), &config(), &mut AuditLog::new()).unwrap();
    let value = serde_json::to_value(&out).unwrap();
    assert_eq!(value["pin"][1]["% Difference Highest and 3rd Highest"], "Infinity");
    assert_eq!(value["severity"][2]["Severity_Health"], "NaN");
    assert!(value["pin"][1]["PiN_Health"].is_null());
}
