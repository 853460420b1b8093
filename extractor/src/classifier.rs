use crate::types::CorrelationId;

const DELIMITER: char = ',';

/// A decoded line split on its first delimiter.
#[derive(Debug, PartialEq, Eq)]
pub struct ParsedRecord<'a> {
    pub key: &'a str,
    pub payload: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Matched,
    Unmatched,
}

/// A line without a delimiter is all key and no payload.
pub fn parse(line: &str) -> ParsedRecord<'_> {
    match line.split_once(DELIMITER) {
        Some((key, payload)) => ParsedRecord { key, payload },
        None => ParsedRecord {
            key: line,
            payload: "",
        },
    }
}

/// Exact, case-sensitive comparison of the whole key field.
pub fn classify(line: &str, correlation_id: &CorrelationId) -> Classification {
    if parse(line).key == correlation_id.as_str() {
        Classification::Matched
    } else {
        Classification::Unmatched
    }
}
