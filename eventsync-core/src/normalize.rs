//! Record normalizer.
//!
//! Scrapers hand over their results as CSV or JSON files using a common
//! column set (`Subject, Start_date, End_date, ...`). This module reads those
//! files and maps each row into a typed `EventRecord`. Rows that cannot be
//! used (no subject, no parseable start date, no city) are dropped here and
//! counted, so later stages never see them.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Deserialize;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

use crate::error::{EventsyncError, EventsyncResult};
use crate::event::{Colour, EventRecord};

/// Columns every input file must carry, with the spellings seen in the wild.
const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("Subject", &["Subject"]),
    ("Start_date", &["Start_date", "Start Date", "Start_Date"]),
    ("City", &["City"]),
];

/// Cities whose suburbs and districts are folded into the city itself.
const MAJOR_CITIES: &[&str] = &[
    "Hamburg",
    "Luebeck",
    "Norderstedt",
    "Hannover",
    "Bremen",
    "Braunschweig",
];

/// One row as written by a scraper. Every field is optional text; typing
/// happens in `normalize_record`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "Subject", default)]
    pub subject: Option<String>,
    #[serde(rename = "Start_date", alias = "Start Date", alias = "Start_Date", default)]
    pub start_date: Option<String>,
    #[serde(rename = "End_date", alias = "End Date", alias = "End_Date", default)]
    pub end_date: Option<String>,
    #[serde(rename = "Start_time", alias = "Start Time", alias = "Start_Time", default)]
    pub start_time: Option<String>,
    #[serde(rename = "End_time", alias = "End Time", alias = "End_Time", default)]
    pub end_time: Option<String>,
    #[serde(rename = "Location", default)]
    pub location: Option<String>,
    #[serde(rename = "City", default)]
    pub city: Option<String>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Category", default)]
    pub category: Option<String>,
    #[serde(rename = "Music_label", alias = "Music Label", default)]
    pub music_label: Option<FlagValue>,
}

/// Boolean column as found in scraper output: a real bool in JSON,
/// `True`/`False` text or `1`/`0` in CSV.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FlagValue {
    pub fn is_set(&self) -> bool {
        match self {
            FlagValue::Bool(b) => *b,
            FlagValue::Number(n) => *n != 0.0,
            FlagValue::Text(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes" | "ja" | "x"
            ),
        }
    }
}

/// Why a raw row was not turned into an `EventRecord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DropReason {
    MissingSubject,
    MissingStartDate,
    InvalidStartDate,
    MissingCity,
    InvalidCity,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DropReason::MissingSubject => "missing subject",
            DropReason::MissingStartDate => "missing start date",
            DropReason::InvalidStartDate => "unparseable start date",
            DropReason::MissingCity => "missing city",
            DropReason::InvalidCity => "invalid city",
        };
        write!(f, "{}", text)
    }
}

/// Counts of accepted and dropped rows for one normalization pass.
#[derive(Debug, Clone, Default)]
pub struct NormalizeReport {
    pub accepted: usize,
    pub dropped: BTreeMap<DropReason, usize>,
}

impl NormalizeReport {
    pub fn dropped_total(&self) -> usize {
        self.dropped.values().sum()
    }
}

/// Normalize all raw rows, dropping the unusable ones.
pub fn normalize_all(raws: Vec<RawRecord>) -> (Vec<EventRecord>, NormalizeReport) {
    let mut report = NormalizeReport::default();
    let mut records = Vec::with_capacity(raws.len());

    for raw in raws {
        match normalize_record(raw) {
            Ok(record) => {
                report.accepted += 1;
                records.push(record);
            }
            Err(reason) => {
                *report.dropped.entry(reason).or_insert(0) += 1;
            }
        }
    }

    for (reason, count) in &report.dropped {
        warn!(%reason, count, "Dropped input rows");
    }

    (records, report)
}

/// Map one raw row into the canonical schema.
pub fn normalize_record(raw: RawRecord) -> Result<EventRecord, DropReason> {
    let subject = non_blank(raw.subject).ok_or(DropReason::MissingSubject)?;

    let start_raw = non_blank(raw.start_date).ok_or(DropReason::MissingStartDate)?;
    let start_date = parse_date(&start_raw).ok_or(DropReason::InvalidStartDate)?;

    let city_raw = non_blank(raw.city).ok_or(DropReason::MissingCity)?;
    let city = normalize_city(&city_raw).ok_or(DropReason::InvalidCity)?;

    // An end before the start carries no usable information
    let end_date = non_blank(raw.end_date)
        .and_then(|s| parse_date(&s))
        .filter(|end| *end >= start_date);

    Ok(EventRecord {
        subject,
        start_date,
        end_date,
        start_time: non_blank(raw.start_time).and_then(|s| parse_time(&s)),
        end_time: non_blank(raw.end_time).and_then(|s| parse_time(&s)),
        location: non_blank(raw.location),
        city,
        description: non_blank(raw.description).unwrap_or_default(),
        category: non_blank(raw.category),
        music_label: raw.music_label.is_some_and(|flag| flag.is_set()),
        counter: 0,
        colour: Colour::default(),
    })
}

/// Trim a text field; blank and whitespace-only values become `None`.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("nan"))
}

/// Parse the date formats produced by the scrapers.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    for format in ["%Y-%m-%d", "%d.%m.%Y", "%d.%m.%y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime.date());
        }
    }

    None
}

/// Parse a clock time into `HH:MM` precision.
///
/// Accepts `19:00`, `9:00`, `19.00`, `19:00:00`, `19 Uhr`, `1900` and `19`.
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let lowered = value.trim().to_lowercase();
    let cleaned = lowered.trim_end_matches("uhr").trim().replace('.', ":");

    if cleaned.chars().all(|c| c.is_ascii_digit()) {
        let (hour, minute) = match cleaned.len() {
            1 | 2 => (cleaned.parse().ok()?, 0),
            3 | 4 => {
                let split = cleaned.len() - 2;
                (cleaned[..split].parse().ok()?, cleaned[split..].parse().ok()?)
            }
            _ => return None,
        };
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }

    for format in ["%H:%M:%S", "%H:%M"] {
        if let Ok(time) = NaiveTime::parse_from_str(&cleaned, format) {
            return NaiveTime::from_hms_opt(time.hour(), time.minute(), 0);
        }
    }

    None
}

/// Fold a scraped city name into the ASCII form used for partitioning.
///
/// Returns `None` for values that are not a city at all (URLs, lone
/// separators).
pub fn normalize_city(value: &str) -> Option<String> {
    let value = value.trim();
    if value.to_lowercase().contains("http") {
        return None;
    }
    let all_caps =
        value.chars().any(char::is_alphabetic) && !value.chars().any(char::is_lowercase);

    let mut city = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            'ä' => city.push_str("ae"),
            'ö' => city.push_str("oe"),
            'ü' => city.push_str("ue"),
            'Ä' => city.push_str("Ae"),
            'Ö' => city.push_str("Oe"),
            'Ü' => city.push_str("Ue"),
            'ß' => city.push_str("ss"),
            ' ' => city.push('_'),
            '/' | '.' | ',' | '(' | ')' | '-' => {}
            other => city.push(other),
        }
    }

    // Anything still outside ASCII loses its accents
    let mut city: String = city.nfkd().filter(|c| c.is_ascii()).collect();

    if let Some(major) = MAJOR_CITIES.iter().find(|major| city.contains(*major)) {
        city = major.to_string();
    }

    if city == "inselweit" {
        city = "Amrum_inselweit".to_string();
    }

    if all_caps {
        city = title_case(&city);
    }

    let city = city.trim_matches('_').to_string();
    if city.is_empty() { None } else { Some(city) }
}

fn title_case(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut at_word_start = true;
    for c in value.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                result.extend(c.to_uppercase());
            } else {
                result.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            result.push(c);
            at_word_start = true;
        }
    }
    result
}

/// Check that a file's header carries every required column.
fn check_columns<'a>(
    columns: impl IntoIterator<Item = &'a str>,
    source: &str,
) -> EventsyncResult<()> {
    let present: HashSet<&str> = columns.into_iter().map(str::trim).collect();

    for (name, spellings) in REQUIRED_COLUMNS {
        if !spellings.iter().any(|s| present.contains(s)) {
            return Err(EventsyncError::MissingColumn {
                file: source.to_string(),
                column: name.to_string(),
            });
        }
    }

    Ok(())
}

/// Read scraper rows from CSV. A leading unnamed index column is ignored.
pub fn read_csv<R: Read>(reader: R, source: &str) -> EventsyncResult<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| EventsyncError::Input(format!("{source}: {e}")))?
        .clone();
    check_columns(headers.iter(), source)?;

    let mut rows = Vec::new();
    for (line, result) in reader.deserialize::<RawRecord>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            // A single broken row is a data error, not a schema error
            Err(e) => warn!(source, row = line + 1, error = %e, "Skipping unreadable row"),
        }
    }

    Ok(rows)
}

/// Read scraper rows from a JSON array of objects.
pub fn read_json(content: &str, source: &str) -> EventsyncResult<Vec<RawRecord>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(content)
        .map_err(|e| EventsyncError::Input(format!("{source}: {e}")))?;

    if let Some(first) = values.first() {
        let object = first.as_object().ok_or_else(|| {
            EventsyncError::Input(format!("{source}: expected an array of objects"))
        })?;
        check_columns(object.keys().map(String::as_str), source)?;
    }

    let mut rows = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<RawRecord>(value) {
            Ok(row) => rows.push(row),
            Err(e) => warn!(source, row = index + 1, error = %e, "Skipping unreadable row"),
        }
    }

    Ok(rows)
}

/// Input files in a directory, sorted by name for a stable scan order.
fn input_files(dir: &Path) -> EventsyncResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        EventsyncError::Input(format!("Could not read input directory {}: {e}", dir.display()))
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext == "csv" || ext == "json")
        })
        .collect();

    files.sort();
    Ok(files)
}

/// Load and merge every scraper output file in `dir`.
///
/// Empty files are skipped; a file without the required columns aborts the
/// whole load.
pub fn load_dir(dir: &Path) -> EventsyncResult<Vec<RawRecord>> {
    let mut rows = Vec::new();

    for path in input_files(dir)? {
        let source = path.display().to_string();
        let content = std::fs::read_to_string(&path)?;

        if content.trim().is_empty() {
            warn!(file = %source, "Skipping empty input file");
            continue;
        }

        let mut file_rows = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => read_json(&content, &source)?,
            _ => read_csv(content.as_bytes(), &source)?,
        };

        debug!(file = %source, rows = file_rows.len(), "Loaded input file");
        rows.append(&mut file_rows);
    }

    info!(rows = rows.len(), dir = %dir.display(), "Loaded scraper output");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(subject: &str, start_date: &str, city: &str) -> RawRecord {
        RawRecord {
            subject: Some(subject.to_string()),
            start_date: Some(start_date.to_string()),
            city: Some(city.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_time_variants() {
        let seven_pm = NaiveTime::from_hms_opt(19, 0, 0);
        assert_eq!(parse_time("19:00"), seven_pm);
        assert_eq!(parse_time("19.00"), seven_pm);
        assert_eq!(parse_time("19:00:00"), seven_pm);
        assert_eq!(parse_time("19 Uhr"), seven_pm);
        assert_eq!(parse_time("1900"), seven_pm);
        assert_eq!(parse_time("9:30"), NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(parse_time("930"), NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(parse_time("abends"), None);
        assert_eq!(parse_time("25:00"), None);
    }

    #[test]
    fn test_parse_date_variants() {
        let expected = NaiveDate::from_ymd_opt(2024, 11, 1);
        assert_eq!(parse_date("2024-11-01"), expected);
        assert_eq!(parse_date("01.11.2024"), expected);
        assert_eq!(parse_date("2024-11-01 00:00:00"), expected);
        assert_eq!(parse_date("nächsten Freitag"), None);
    }

    #[test]
    fn test_normalize_city_folding() {
        assert_eq!(normalize_city("Lübeck").as_deref(), Some("Luebeck"));
        assert_eq!(normalize_city("Hamburg-Altona").as_deref(), Some("Hamburg"));
        assert_eq!(normalize_city("Bad Segeberg").as_deref(), Some("Bad_Segeberg"));
        assert_eq!(normalize_city("NEUMÜNSTER").as_deref(), Some("Neumuenster"));
        assert_eq!(normalize_city("inselweit").as_deref(), Some("Amrum_inselweit"));
        assert_eq!(normalize_city("Wyk (Föhr)").as_deref(), Some("Wyk_Foehr"));
        assert_eq!(normalize_city("https://example.org/kiel"), None);
        assert_eq!(normalize_city(" - "), None);
    }

    #[test]
    fn test_blank_fields_become_none() {
        let mut row = raw("Konzert A", "2024-11-01", "Kiel");
        row.location = Some("   ".to_string());
        row.start_time = Some(String::new());
        row.category = Some("nan".to_string());

        let record = normalize_record(row).unwrap();
        assert_eq!(record.location, None);
        assert_eq!(record.start_time, None);
        assert_eq!(record.category, None);
        assert_eq!(record.description, "");
        assert_eq!(record.counter, 0);
    }

    #[test]
    fn test_inverted_end_date_is_dropped() {
        let mut row = raw("Konzert A", "2024-11-02", "Kiel");
        row.end_date = Some("2024-11-01".to_string());

        let record = normalize_record(row).unwrap();
        assert_eq!(record.end_date, None);
    }

    #[test]
    fn test_unusable_rows_are_counted() {
        let rows = vec![
            raw("Konzert A", "2024-11-01", "Kiel"),
            raw("", "2024-11-01", "Kiel"),
            raw("Konzert B", "   ", "Kiel"),
            raw("Konzert C", "irgendwann", "Kiel"),
            raw("Konzert D", "2024-11-01", ""),
        ];

        let (records, report) = normalize_all(rows);
        assert_eq!(records.len(), 1);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.dropped_total(), 4);
        assert_eq!(report.dropped[&DropReason::MissingSubject], 1);
        assert_eq!(report.dropped[&DropReason::MissingStartDate], 1);
        assert_eq!(report.dropped[&DropReason::InvalidStartDate], 1);
        assert_eq!(report.dropped[&DropReason::MissingCity], 1);
    }

    #[test]
    fn test_read_csv_with_pandas_index_column() {
        let csv = "\
,Subject,Start_date,End_date,Start_time,End_time,Location,City,Description,Category,Music_label
0,Jazz Night,2024-11-01,2024-11-01,20:00,,Pumpe,Kiel,https://example.org/1,Konzert,True
1,Flohmarkt,2024-11-02,,,,,Kiel,,Markt,False
";
        let rows = read_csv(csv.as_bytes(), "test.csv").unwrap();
        assert_eq!(rows.len(), 2);

        let (records, _) = normalize_all(rows);
        assert!(records[0].music_label);
        assert_eq!(records[0].start_time, NaiveTime::from_hms_opt(20, 0, 0));
        assert_eq!(records[0].end_time, None);
        assert!(!records[1].music_label);
        assert_eq!(records[1].location, None);
    }

    #[test]
    fn test_read_csv_accepts_spaced_column_names() {
        let csv = "Subject,Start Date,Start Time,City\nLesung,01.11.2024,19.30,Heide\n";
        let rows = read_csv(csv.as_bytes(), "test.csv").unwrap();

        let (records, _) = normalize_all(rows);
        assert_eq!(records[0].start_date, NaiveDate::from_ymd_opt(2024, 11, 1).unwrap());
        assert_eq!(records[0].start_time, NaiveTime::from_hms_opt(19, 30, 0));
    }

    #[test]
    fn test_missing_required_column_is_a_schema_error() {
        let csv = "Subject,Start_date,Location\nLesung,2024-11-01,Bibliothek\n";
        let err = read_csv(csv.as_bytes(), "broken.csv").unwrap_err();

        match err {
            EventsyncError::MissingColumn { file, column } => {
                assert_eq!(file, "broken.csv");
                assert_eq!(column, "City");
            }
            other => panic!("Expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_read_json_rows() {
        let json = r#"[
            {"Subject": "Lesung", "Start_date": "2024-11-01", "City": "Husum", "Music_label": false},
            {"Subject": "Rock", "Start_date": "2024-11-03", "City": "Husum", "Music_label": true, "Location": null}
        ]"#;

        let rows = read_json(json, "test.json").unwrap();
        let (records, _) = normalize_all(rows);
        assert_eq!(records.len(), 2);
        assert!(!records[0].music_label);
        assert!(records[1].music_label);
    }

    #[test]
    fn test_load_dir_merges_files_and_skips_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.csv"),
            "Subject,Start_date,City\nKonzert A,2024-11-01,Kiel\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("b.csv"), "").unwrap();
        std::fs::write(
            dir.path().join("c.json"),
            r#"[{"Subject": "Konzert B", "Start_date": "2024-11-02", "City": "Kiel"}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let rows = load_dir(dir.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].subject.as_deref(), Some("Konzert A"));
        assert_eq!(rows[1].subject.as_deref(), Some("Konzert B"));
    }
}
