use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Caller supplied token grouping the messages of one extraction request.
/// Never empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum CorrelationIdError {
    #[error("correlation id is missing or empty")]
    Empty,
}

impl CorrelationId {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, CorrelationIdError> {
        let value = value.into();
        if value.is_empty() {
            return Err(CorrelationIdError::Empty);
        }
        Ok(CorrelationId(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Claim on a received message. Deleting or deferring the message consumes
/// the handle, so a message can be acted on at most once per scan.
#[derive(Debug, PartialEq, Eq)]
pub struct LeaseHandle {
    id: String,
    lease_token: String,
}

impl LeaseHandle {
    pub fn new<I, T>(id: I, lease_token: T) -> Self
    where
        I: Into<String>,
        T: Into<String>,
    {
        LeaseHandle {
            id: id.into(),
            lease_token: lease_token.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn lease_token(&self) -> &str {
        &self.lease_token
    }
}

#[derive(Debug)]
pub struct QueueMessage {
    pub handle: LeaseHandle,
    pub raw_body: Bytes,
    pub approximate_age: Duration,
}

impl QueueMessage {
    pub fn id(&self) -> &str {
        self.handle.id()
    }
}

/// Decoded lines whose key matched the requested correlation id, in
/// retrieval order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatchedSet {
    lines: Vec<String>,
}

impl MatchedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: String) {
        self.lines.push(line);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Newline-joined archive body. No reordering, no deduplication.
    pub fn to_body(&self) -> String {
        self.lines.join("\n")
    }
}

impl<S: Into<String>> FromIterator<S> for MatchedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        MatchedSet {
            lines: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArchiveRecord {
    pub name: String,
    pub correlation_id: CorrelationId,
    pub created_at: DateTime<Utc>,
    pub body: Bytes,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NotificationEvent {
    pub recipient_message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_id() {
        assert_eq!(CorrelationId::new(""), Err(CorrelationIdError::Empty));

        // No trimming, whitespace is part of the token
        let id = CorrelationId::new(" X ").unwrap();
        assert_eq!(id.as_str(), " X ");
        assert_eq!(id.to_string(), " X ");
    }

    #[test]
    fn test_matched_set_body() {
        let set: MatchedSet = ["X,Alice,30", "X,Carol,40", "X,Alice,30"]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 3);
        assert_eq!(set.to_body(), "X,Alice,30\nX,Carol,40\nX,Alice,30");
        assert_eq!(MatchedSet::new().to_body(), "");
    }
}
