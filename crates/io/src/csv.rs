// CSV/TSV import/export

use std::io::Read;
use std::path::Path;

use jaws_merge::{CellValue, Row};

/// Read a delimited file into header-keyed rows.
///
/// `.tsv` files are always tab-separated; everything else is sniffed.
pub fn read_rows(path: &Path) -> Result<Vec<Row>, String> {
    let content = read_file_as_utf8(path)?;
    let is_tsv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("tsv"))
        .unwrap_or(false);
    let delimiter = if is_tsv { b'\t' } else { sniff_delimiter(&content) };
    parse_rows(&content, delimiter)
}

/// Parse delimited text. The first record is the header; every field is text.
///
/// Rows shorter than the header simply lack the trailing columns. Fields past
/// the header width are dropped. Blank lines are skipped.
pub fn parse_rows(content: &str, delimiter: u8) -> Result<Vec<Row>, String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        if record.len() <= 1 && record.get(0).map(|f| f.is_empty()).unwrap_or(true) {
            continue;
        }
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(h, f)| (h.clone(), CellValue::Text(f.to_string())))
            .collect();
        rows.push(row);
    }

    log::debug!("parsed {} csv row(s), {} column(s)", rows.len(), headers.len());
    Ok(rows)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Header line must split
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Ties go to the wider split
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Excel-exported CSVs are usually Windows-1252
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Column names across all rows, in first-seen order.
pub fn union_columns(rows: &[Row]) -> Vec<&str> {
    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }
    columns
}

/// Write rows as comma-separated text with a header line.
pub fn write_csv(path: &Path, rows: &[Row]) -> Result<(), String> {
    let mut writer = csv::WriterBuilder::new()
        .from_path(path)
        .map_err(|e| e.to_string())?;

    let columns = union_columns(rows);
    writer.write_record(&columns).map_err(|e| e.to_string())?;

    for row in rows {
        let record: Vec<String> = columns
            .iter()
            .map(|c| row.get(*c).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        writer.write_record(&record).map_err(|e| e.to_string())?;
    }

    writer.flush().map_err(|e| e.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    use jaws_merge::model::row_from;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "Name;Age;City\nAlice;30;Paris\nBob;25;London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "admin2,Population,pin\nD1,100,5\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "Name\tAge\tCity\nAlice\t30\tParis\nBob\t25\tLondon\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "Name;Address;City\n\"Doe, Jane\";\"123 Main St, Apt 4\";Paris\nBob;\"456 Elm\";London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_fields_are_text() {
        let rows = parse_rows("id,pin\nA,50\nB,\n", b',').unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], CellValue::from("A"));
        assert_eq!(rows[0]["pin"], CellValue::from("50"));
        assert_eq!(rows[1]["pin"], CellValue::from(""));
    }

    #[test]
    fn test_short_rows_omit_columns() {
        let rows = parse_rows("id,pin,sev\nA,50\n", b',').unwrap();
        assert_eq!(rows[0].len(), 2);
        assert!(!rows[0].contains_key("sev"));
    }

    #[test]
    fn test_blank_lines_skipped_and_header_kept_verbatim() {
        let rows = parse_rows("\u{feff}id, Population \nA,100\n\nB,200\n", b',').unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][" Population "], CellValue::from("200"));
        assert!(rows[0].contains_key("id"));
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "Région" with 0xE9
        fs::write(&path, b"id,name\nA,R\xe9gion\n").unwrap();
        let rows = read_rows(&path).unwrap();
        assert_eq!(rows[0]["name"], CellValue::from("Région"));
    }

    #[test]
    fn test_tsv_extension_forces_tab() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.tsv");
        fs::write(&path, "id\tnote\nA\tx,y,z\n").unwrap();
        let rows = read_rows(&path).unwrap();
        assert_eq!(rows[0]["note"], CellValue::from("x,y,z"));
    }

    #[test]
    fn test_write_csv_uses_union_of_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let rows = vec![
            row_from([("id", CellValue::from("A")), ("pin", CellValue::Number(5.0))]),
            row_from([
                ("id", CellValue::from("B")),
                ("pin", CellValue::Null),
                ("flag", CellValue::Bool(true)),
            ]),
        ];
        write_csv(&path, &rows).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["id,pin,flag", "A,5,", "B,,true"]);
    }
}
