use axum::http::HeaderMap;

use super::ImportError;

/// Expected header, in order.
pub const COLUMNS: [&str; 5] = ["Name", "Email", "Manager", "Salary", "Hire Date"];

/// One raw employee row. Missing trailing cells are empty strings.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub name: String,
    pub email: String,
    pub manager: String,
    pub salary: String,
    pub hire_date: String,
}

/// Parse an upload into rows, checking the header and dropping blank lines.
pub fn parse_csv(text: &str) -> Result<Vec<Row>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ImportError::Csv(format!("Failed to read CSV headers: {e}")))?
        .clone();

    let matches = headers.len() >= COLUMNS.len()
        && headers
            .iter()
            .zip(COLUMNS)
            .all(|(found, expected)| found.trim().eq_ignore_ascii_case(expected));
    if !matches {
        return Err(ImportError::Csv(format!(
            "Expected header \"{}\", found \"{}\"",
            COLUMNS.join(","),
            headers.iter().collect::<Vec<_>>().join(",")
        )));
    }

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| ImportError::Csv(format!("Failed to read CSV row {}: {e}", line + 2)))?;

        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let cell = |idx: usize| record.get(idx).unwrap_or("").to_string();
        rows.push(Row {
            name: cell(0),
            email: cell(1),
            manager: cell(2),
            salary: cell(3),
            hire_date: cell(4),
        });
    }

    Ok(rows)
}

/// Read the CSV text out of a multipart upload: the `file` field, or the first
/// field when no field has that name.
pub async fn read_multipart(headers: &HeaderMap, body: bytes::Bytes) -> Result<String, ImportError> {
    let boundary = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or_else(|| ImportError::Csv("Missing multipart boundary".to_string()))?;

    let stream = futures_util::stream::once(async { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut first = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ImportError::Csv(format!("Multipart error: {e}")))?
    {
        let is_file = field.name() == Some("file");
        let text = field
            .text()
            .await
            .map_err(|e| ImportError::Csv(format!("Field read error: {e}")))?;
        if is_file {
            return Ok(text);
        }
        if first.is_none() {
            first = Some(text);
        }
    }

    first.ok_or_else(|| ImportError::Csv("Multipart upload has no fields".to_string()))
}
