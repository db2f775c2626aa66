//! CSV ingestion for the knowledge base.

use super::{KnowledgeEntry, KnowledgeSnapshot, SnapshotOrigin};
use crate::error::{HarkError, Result};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Header names accepted for the question column, in priority order.
const QUESTION_ALIASES: &[&str] = &["Question", "question", "Q"];

/// Header names accepted for the answer column, in priority order.
const ANSWER_ALIASES: &[&str] = &["Answer", "answer", "A"];

/// Load a snapshot from a CSV file.
///
/// Falls back to the built-in samples when the file is missing, unreadable,
/// or has no usable rows.
#[instrument(fields(source = %source.display()))]
pub fn load(source: &Path) -> KnowledgeSnapshot {
    if !source.exists() {
        warn!("Knowledge base not found at {}, using sample data", source.display());
        return KnowledgeSnapshot::samples();
    }

    let bytes = match std::fs::read(source) {
        Ok(b) => b,
        Err(e) => {
            warn!("Failed to read knowledge base: {}, using sample data", e);
            return KnowledgeSnapshot::samples();
        }
    };

    match parse_csv(&bytes) {
        Ok(entries) if entries.is_empty() => {
            warn!("Knowledge base has no usable rows, using sample data");
            KnowledgeSnapshot::samples()
        }
        Ok(entries) => {
            info!("Loaded {} Q&A pairs from CSV", entries.len());
            KnowledgeSnapshot::new(entries, SnapshotOrigin::File(source.to_path_buf()))
        }
        Err(e) => {
            warn!("Error loading CSV: {}, using sample data", e);
            KnowledgeSnapshot::samples()
        }
    }
}

/// Parse question/answer rows from raw CSV bytes.
///
/// Invalid UTF-8 is replaced rather than rejected. Rows missing either field
/// are skipped.
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<KnowledgeEntry>> {
    let content = String::from_utf8_lossy(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let question_cols = alias_columns(&headers, QUESTION_ALIASES);
    let answer_cols = alias_columns(&headers, ANSWER_ALIASES);

    if question_cols.is_empty() || answer_cols.is_empty() {
        return Err(HarkError::Knowledge(format!(
            "missing question/answer columns in header: {:?}",
            headers.iter().collect::<Vec<_>>()
        )));
    }

    let mut entries = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                debug!("Skipping malformed row {}: {}", line + 2, e);
                continue;
            }
        };

        let question = first_value(&record, &question_cols);
        let answer = first_value(&record, &answer_cols);

        match (question, answer) {
            (Some(q), Some(a)) => entries.push(KnowledgeEntry::new(q, a)),
            _ => debug!("Skipping row {} with a missing field", line + 2),
        }
    }

    Ok(entries)
}

/// Column indices of the aliases present in the header, in alias order.
fn alias_columns(headers: &csv::StringRecord, aliases: &[&str]) -> Vec<usize> {
    aliases
        .iter()
        .filter_map(|alias| headers.iter().position(|h| h.trim() == *alias))
        .collect()
}

/// First non-blank value among the given columns, trimmed.
fn first_value(record: &csv::StringRecord, columns: &[usize]) -> Option<String> {
    columns
        .iter()
        .filter_map(|&idx| record.get(idx))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::sample_entries;

    #[test]
    fn test_parse_standard_headers() {
        let csv = "Question,Answer\n\"Hello, there\",  Hi!  \nWhat is Rust?,A language\n";
        let entries = parse_csv(csv.as_bytes()).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], KnowledgeEntry::new("Hello, there", "Hi!"));
        assert_eq!(entries[1].answer, "A language");
    }

    #[test]
    fn test_parse_alias_headers() {
        let entries = parse_csv(b"id,Q,A\n1,Ping?,Pong\n").unwrap();
        assert_eq!(entries, vec![KnowledgeEntry::new("Ping?", "Pong")]);

        let entries = parse_csv(b"question,answer\nping?,pong\n").unwrap();
        assert_eq!(entries, vec![KnowledgeEntry::new("ping?", "pong")]);
    }

    #[test]
    fn test_later_alias_fills_blank_preferred_column() {
        let entries = parse_csv(b"Question,Q,Answer\n,Fallback question?,Yes\n").unwrap();
        assert_eq!(entries, vec![KnowledgeEntry::new("Fallback question?", "Yes")]);
    }

    #[test]
    fn test_rows_missing_fields_are_skipped() {
        let csv = "Question,Answer\nNo answer here,\n,Orphan answer\nShort row\nKept?,Kept.\n";
        let entries = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(entries, vec![KnowledgeEntry::new("Kept?", "Kept.")]);
    }

    #[test]
    fn test_invalid_utf8_is_tolerated() {
        let mut bytes = b"Question,Answer\nCaf".to_vec();
        bytes.push(0xff);
        bytes.extend_from_slice(b"?,Open late\n");

        let entries = parse_csv(&bytes).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].question.starts_with("Caf"));
        assert_eq!(entries[0].answer, "Open late");
    }

    #[test]
    fn test_unknown_headers_error() {
        assert!(parse_csv(b"prompt,response\nhi,hello\n").is_err());
    }

    #[test]
    fn test_load_falls_back_on_empty_or_headerless_file() {
        let dir = tempfile::tempdir().unwrap();

        let empty = dir.path().join("empty.csv");
        std::fs::write(&empty, "Question,Answer\n").unwrap();
        assert_eq!(load(&empty).entries(), sample_entries().as_slice());

        let wrong = dir.path().join("wrong.csv");
        std::fs::write(&wrong, "foo,bar\n1,2\n").unwrap();
        assert_eq!(load(&wrong).origin(), &SnapshotOrigin::Samples);
    }

    #[test]
    fn test_load_file_origin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa.csv");
        std::fs::write(&path, "Q,A\nOpening hours?,Nine to five.\n").unwrap();

        let snapshot = load(&path);
        assert_eq!(snapshot.origin(), &SnapshotOrigin::File(path.clone()));
        assert_eq!(snapshot.len(), 1);
    }
}
