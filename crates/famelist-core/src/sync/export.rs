use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::models::Person;

use super::ExportError;

/// Serialization formats understood by `export_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

pub fn export(people: &[Person], format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Json => {
            serde_json::to_string_pretty(people).map_err(|e| ExportError::Serialize(e.to_string()))
        }
        ExportFormat::Csv => to_csv(people),
    }
}

/// Header from the first record's fields, every cell quoted, one row per record.
fn to_csv(people: &[Person]) -> Result<String, ExportError> {
    let rows = people
        .iter()
        .map(|p| serde_json::to_value(p).map_err(|e| ExportError::Serialize(e.to_string())))
        .collect::<Result<Vec<Value>, _>>()?;

    let Some(Value::Object(first)) = rows.first() else {
        return Ok(String::new());
    };
    let headers: Vec<&String> = first.keys().collect();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| h.as_str())
            .collect::<Vec<_>>()
            .join(","),
    );
    for row in &rows {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| quote_cell(row.get(h.as_str())))
            .collect();
        lines.push(cells.join(","));
    }

    Ok(lines.join("\n"))
}

fn quote_cell(value: Option<&Value>) -> String {
    let text = match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    format!("\"{}\"", text.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn people() -> Vec<Person> {
        let mut first = Person::new(1, "Alice", Category::Media);
        first.info = "Says \"hi\"".to_string();
        first.img = Some("a.png".to_string());
        vec![
            first,
            Person::new(2, "Bob", Category::Fame),
            Person::new(3, "Carol", Category::Coder),
        ]
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("json".parse::<ExportFormat>(), Ok(ExportFormat::Json));
        assert_eq!("csv".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert_eq!(
            "xml".parse::<ExportFormat>(),
            Err(ExportError::UnsupportedFormat("xml".to_string()))
        );
    }

    #[test]
    fn test_csv_has_header_plus_one_line_per_record() {
        let csv = export(&people(), ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "id,name,category,info,img");
        assert_eq!(lines[1], r#""1","Alice","media","Says ""hi""","a.png""#);
        // Fields absent from later records render empty
        assert_eq!(lines[2], r#""2","Bob","fame","","""#);
    }

    #[test]
    fn test_csv_of_empty_dataset_is_empty() {
        assert_eq!(export(&[], ExportFormat::Csv).unwrap(), "");
    }

    #[test]
    fn test_json_is_pretty_and_round_trips() {
        let json = export(&people(), ExportFormat::Json).unwrap();
        assert!(json.contains("\n  {"));
        let back: Vec<Person> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, people());
    }
}
