//! Capture ingest (CSV or JSON) → `RawSample`s.
//!
//! Acquisition logs come from several tools that disagree on column names, so
//! the three fields are resolved once through a [`FieldMap`] synonym table.
//!
//! Design goals:
//! - **Strict schema**: a field with no matching column is an error (exit code 2)
//! - **Lenient rows**: an empty or unparsable cell becomes `NaN` and the row is
//!   dropped later by the preprocessor
//! - **No identification logic here**

use std::collections::HashMap;
use std::path::Path;

use csv::StringRecord;
use serde_json::Value;

use crate::domain::RawSample;
use crate::error::AppError;

/// Column-name synonyms for each capture field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMap {
    pub time: Vec<String>,
    pub input: Vec<String>,
    pub output: Vec<String>,
}

impl Default for FieldMap {
    fn default() -> Self {
        fn names(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }
        Self {
            time: names(&["tiempo", "time", "t"]),
            input: names(&["pwm", "u", "input", "entrada"]),
            output: names(&["conversion", "adc", "y", "output", "valor", "salida"]),
        }
    }
}

/// Which source column feeds each field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub time: String,
    pub input: String,
    pub output: String,
}

impl FieldMap {
    /// Resolve field names against the available (already normalized) column names.
    ///
    /// Synonyms are tried in table order, so the first listed name wins when a
    /// file has several candidates.
    pub fn resolve<'a, I>(&self, columns: I) -> Result<ResolvedColumns, AppError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let available: Vec<&str> = columns.into_iter().collect();
        let pick = |field: &str, synonyms: &[String]| -> Result<String, AppError> {
            synonyms
                .iter()
                .find(|s| available.contains(&s.as_str()))
                .cloned()
                .ok_or_else(|| {
                    AppError::new(
                        2,
                        format!(
                            "Missing required column for `{field}`: expected one of {}",
                            synonyms.join(", ")
                        ),
                    )
                })
        };

        Ok(ResolvedColumns {
            time: pick("time", &self.time)?,
            input: pick("input", &self.input)?,
            output: pick("output", &self.output)?,
        })
    }
}

/// Input file flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    Csv,
    Json,
}

/// Ingest output.
#[derive(Debug, Clone)]
pub struct Capture {
    pub samples: Vec<RawSample>,
    pub format: CaptureFormat,
    pub columns: ResolvedColumns,
}

/// Load a capture file, detecting CSV vs JSON.
pub fn load_capture(path: &Path, fields: &FieldMap) -> Result<Capture, AppError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read capture '{}': {e}", path.display())))?;

    match detect_format(path, &text) {
        CaptureFormat::Csv => parse_csv(&text, fields),
        CaptureFormat::Json => parse_json(&text, fields),
    }
}

fn detect_format(path: &Path, text: &str) -> CaptureFormat {
    let by_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let looks_json = text.trim_start_matches('\u{feff}').trim_start().starts_with('[');
    if by_ext || looks_json {
        CaptureFormat::Json
    } else {
        CaptureFormat::Csv
    }
}

/// Parse CSV text with a header row.
pub fn parse_csv(text: &str, fields: &FieldMap) -> Result<Capture, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    let columns = fields.resolve(header_map.keys().map(String::as_str))?;

    let idx_time = header_map[&columns.time];
    let idx_input = header_map[&columns.input];
    let idx_output = header_map[&columns.output];

    let mut samples = Vec::new();
    for result in reader.records() {
        // A malformed record still counts as a (dropped) row.
        let Ok(record) = result else {
            samples.push(RawSample::new(f64::NAN, f64::NAN, f64::NAN));
            continue;
        };
        samples.push(RawSample::new(
            cell_f64(&record, idx_time),
            cell_f64(&record, idx_input),
            cell_f64(&record, idx_output),
        ));
    }

    Ok(Capture {
        samples,
        format: CaptureFormat::Csv,
        columns,
    })
}

/// Parse a JSON array of row objects.
pub fn parse_json(text: &str, fields: &FieldMap) -> Result<Capture, AppError> {
    let value: Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))
        .map_err(|e| AppError::new(2, format!("Failed to parse capture JSON: {e}")))?;
    let Value::Array(rows) = value else {
        return Err(AppError::new(2, "Capture JSON must be an array of row objects."));
    };

    // Normalize keys once per row, and collect every key seen for schema resolution.
    let mut normalized_rows: Vec<HashMap<String, &Value>> = Vec::with_capacity(rows.len());
    let mut seen: Vec<String> = Vec::new();
    for row in &rows {
        let mut map = HashMap::new();
        if let Value::Object(obj) = row {
            for (k, v) in obj {
                let key = normalize_header_name(k);
                if !seen.contains(&key) {
                    seen.push(key.clone());
                }
                map.insert(key, v);
            }
        }
        normalized_rows.push(map);
    }

    let columns = fields.resolve(seen.iter().map(String::as_str))?;

    let samples = normalized_rows
        .iter()
        .map(|row| {
            RawSample::new(
                json_f64(row.get(&columns.time).copied()),
                json_f64(row.get(&columns.input).copied()),
                json_f64(row.get(&columns.output).copied()),
            )
        })
        .collect();

    Ok(Capture {
        samples,
        format: CaptureFormat::Json,
        columns,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // Keep the first occurrence of a duplicated header.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn cell_f64(record: &StringRecord, idx: usize) -> f64 {
    record
        .get(idx)
        .map(str::trim)
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

fn json_f64(v: Option<&Value>) -> f64 {
    match v {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_with_spanish_headers_and_bom() {
        let text = "\u{feff}Tiempo,PWM,Conversion\n0.0,100,200\n0.05,110,\n0.10,abc,220\n";
        let cap = parse_csv(text, &FieldMap::default()).unwrap();
        assert_eq!(cap.format, CaptureFormat::Csv);
        assert_eq!(cap.columns.time, "tiempo");
        assert_eq!(cap.columns.input, "pwm");
        assert_eq!(cap.columns.output, "conversion");
        assert_eq!(cap.samples.len(), 3);
        assert_eq!(cap.samples[0], RawSample::new(0.0, 100.0, 200.0));
        assert!(cap.samples[1].output.is_nan());
        assert!(cap.samples[2].input.is_nan());
    }

    #[test]
    fn csv_first_synonym_wins() {
        let text = "t,u,y,adc\n1,2,3,4\n";
        let cap = parse_csv(text, &FieldMap::default()).unwrap();
        // "adc" is listed before "y" for the output field.
        assert_eq!(cap.columns.output, "adc");
        assert_eq!(cap.samples[0].output, 4.0);
    }

    #[test]
    fn csv_missing_column_is_exit_code_2() {
        let err = parse_csv("time,input\n0,1\n", &FieldMap::default()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("output"));
    }

    #[test]
    fn json_rows_with_mixed_value_types() {
        let text = r#"[
            {"time": 0.0, "Input": 100, "Output": "250"},
            {"time": 0.05, "Input": null, "Output": 260},
            {"time": 0.10, "Output": 270}
        ]"#;
        let cap = parse_json(text, &FieldMap::default()).unwrap();
        assert_eq!(cap.format, CaptureFormat::Json);
        assert_eq!(cap.samples[0], RawSample::new(0.0, 100.0, 250.0));
        assert!(cap.samples[1].input.is_nan());
        assert!(cap.samples[2].input.is_nan());
        assert_eq!(cap.samples[2].output, 270.0);
    }

    #[test]
    fn json_must_be_an_array() {
        let err = parse_json(r#"{"time": 1}"#, &FieldMap::default()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn format_detection() {
        assert_eq!(detect_format(Path::new("a.json"), "t,u,y"), CaptureFormat::Json);
        assert_eq!(detect_format(Path::new("a.txt"), "  [ {} ]"), CaptureFormat::Json);
        assert_eq!(detect_format(Path::new("a.csv"), "t,u,y\n"), CaptureFormat::Csv);
    }
}
