use crate::types::{RecordSet, RecordsError, Result};
use card_template::Record;
use std::path::Path;

const BYTE_ORDER_MARK: char = '\u{feff}';

pub async fn load_from_csv(path: impl AsRef<Path>) -> Result<RecordSet> {
    let path = path.as_ref().to_owned();

    let contents = tokio::fs::read_to_string(&path).await?;

    let set = tokio::task::spawn_blocking(move || parse_csv(&contents)).await??;
    log::info!("Loaded {} records from {}", set.len(), path.display());

    Ok(set)
}

/// Parse CSV text: header row first, one record per non-empty row.
///
/// Fails with [`RecordsError::MalformedImport`] when there are no columns or
/// no data rows.
pub fn parse_csv(contents: &str) -> Result<RecordSet> {
    let contents = contents.strip_prefix(BYTE_ORDER_MARK).unwrap_or(contents);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(contents.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(RecordsError::MalformedImport(
            "CSV has no header columns".to_string(),
        ));
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let record: Record = headers
            .iter()
            .zip(row.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, cell)| (header.as_str(), cell))
            .collect();
        records.push(record);
    }

    if records.is_empty() {
        return Err(RecordsError::MalformedImport(
            "CSV has no data rows".to_string(),
        ));
    }

    Ok(RecordSet { headers, records })
}
