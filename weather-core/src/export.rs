//! Renderings of the record collection for download.
//!
//! All three formats walk the records in the order given, which is the
//! store's most-recent-first order.

use chrono::SecondsFormat;

use crate::Record;

pub mod pdf;

pub const CSV_HEADER: [&str; 10] = [
    "ID",
    "LocationInput",
    "City",
    "Country",
    "Lat",
    "Lon",
    "CurrentTemp",
    "Humidity",
    "Date",
    "CreatedAt",
];

/// Supported download formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    /// Suggested download file name.
    pub fn file_name(&self) -> String {
        format!("weather_records.{}", self.extension())
    }
}

/// Render `records` in the requested format.
pub fn render(format: ExportFormat, records: &[Record]) -> serde_json::Result<Vec<u8>> {
    Ok(match format {
        ExportFormat::Json => to_json(records)?.into_bytes(),
        ExportFormat::Csv => to_csv(records).into_bytes(),
        ExportFormat::Pdf => to_pdf(records),
    })
}

/// The records exactly as persisted, pretty-printed.
pub fn to_json(records: &[Record]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}

/// One row per record with a fixed column set; see [`CSV_HEADER`].
pub fn to_csv(records: &[Record]) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');

    for r in records {
        let (temp, humidity) = match &r.current_weather {
            Some(w) => (w.temp.to_string(), w.humidity.to_string()),
            None => (String::new(), String::new()),
        };
        let row = [
            csv_escape(&r.id),
            csv_escape(&r.location_input),
            csv_escape(&r.resolved_city),
            csv_escape(&r.country),
            r.lat.to_string(),
            r.lon.to_string(),
            temp,
            humidity,
            format!("{} to {}", r.date_range.start, r.date_range.end),
            r.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }

    out
}

/// Escape a string for CSV output.
/// Wraps the value in quotes if it contains commas, quotes, or newlines.
/// Double quotes are escaped by doubling them.
pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// A line of the printable summary document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentLine {
    Title(String),
    /// `"<n>. <city> (<input>) - <start> to <end>"`
    Entry(String),
    /// One-line weather summary under an entry.
    Detail(String),
}

/// The printable summary: a title, then each record with an optional
/// weather line.
pub fn document(records: &[Record]) -> Vec<DocumentLine> {
    let mut lines = vec![DocumentLine::Title("Weather Records".to_string())];

    for (i, r) in records.iter().enumerate() {
        lines.push(DocumentLine::Entry(format!(
            "{}. {} ({}) - {} to {}",
            i + 1,
            r.resolved_city,
            r.location_input,
            r.date_range.start,
            r.date_range.end
        )));

        if let Some(w) = &r.current_weather {
            lines.push(DocumentLine::Detail(format!(
                "   Temp: {}°C, Feels: {}°C, Humidity: {}%",
                w.temp, w.feels_like, w.humidity
            )));
        }
    }

    lines
}

/// The summary document as a PDF file.
pub fn to_pdf(records: &[Record]) -> Vec<u8> {
    pdf::render(&document(records))
}
