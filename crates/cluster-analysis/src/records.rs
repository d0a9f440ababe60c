//! Link/cluster log parsing
//!
//! Upstream logs are noisy, so a bad line never fails the whole file: it is
//! recorded as a [`SkippedLine`] and parsing continues.

use orbital_mechanics::SatelliteId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `a->b`: satellite `from` designates `to` as its cluster head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkRecord {
    pub from: SatelliteId,
    pub to: SatelliteId,
}

impl LinkRecord {
    pub fn new(from: u32, to: u32) -> Self {
        Self {
            from: SatelliteId(from),
            to: SatelliteId(to),
        }
    }

    pub fn is_self_designation(&self) -> bool {
        self.from == self.to
    }
}

/// `a-b`: an inter-satellite link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IslLink {
    pub a: SatelliteId,
    pub b: SatelliteId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    Designation(LinkRecord),
    Link(IslLink),
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordError {
    #[error("no '->' or '-' separator")]
    MissingSeparator,
    #[error("invalid satellite id {0:?}")]
    InvalidId(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedLine {
    /// 1-based line number
    pub line: usize,
    pub reason: RecordError,
}

/// Every record of one log, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLog {
    pub designations: Vec<LinkRecord>,
    pub links: Vec<IslLink>,
    pub skipped: Vec<SkippedLine>,
}

impl ParsedLog {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn push(&mut self, record: Record) {
        match record {
            Record::Designation(r) => self.designations.push(r),
            Record::Link(l) => self.links.push(l),
        }
    }
}

fn parse_id(raw: &str) -> Result<SatelliteId, RecordError> {
    let raw = raw.trim();
    match raw.parse::<u32>() {
        Ok(0) | Err(_) => Err(RecordError::InvalidId(raw.to_string())),
        Ok(id) => Ok(SatelliteId(id)),
    }
}

/// Parse one line. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Record>, RecordError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    if let Some((a, b)) = line.split_once("->") {
        let record = LinkRecord {
            from: parse_id(a)?,
            to: parse_id(b)?,
        };
        return Ok(Some(Record::Designation(record)));
    }

    if let Some((a, b)) = line.split_once('-') {
        let link = IslLink {
            a: parse_id(a)?,
            b: parse_id(b)?,
        };
        return Ok(Some(Record::Link(link)));
    }

    Err(RecordError::MissingSeparator)
}

/// Parse a whole log, collecting malformed lines instead of failing.
pub fn parse_log(text: &str) -> ParsedLog {
    let mut log = ParsedLog::default();

    for (idx, line) in text.lines().enumerate() {
        match parse_line(line) {
            Ok(Some(record)) => log.push(record),
            Ok(None) => {}
            Err(reason) => log.skipped.push(SkippedLine {
                line: idx + 1,
                reason,
            }),
        }
    }

    log
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_designation() {
        assert_eq!(
            parse_line("12->7").unwrap(),
            Some(Record::Designation(LinkRecord::new(12, 7)))
        );
        assert_eq!(
            parse_line("  3 -> 3 ").unwrap(),
            Some(Record::Designation(LinkRecord::new(3, 3)))
        );
    }

    #[test]
    fn test_parse_link() {
        assert_eq!(
            parse_line("4-5").unwrap(),
            Some(Record::Link(IslLink {
                a: SatelliteId(4),
                b: SatelliteId(5)
            }))
        );
    }

    #[test]
    fn test_comments_and_blanks() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# 1->2").unwrap(), None);
    }

    #[test]
    fn test_malformed_lines() {
        assert_eq!(parse_line("hello"), Err(RecordError::MissingSeparator));
        assert_eq!(
            parse_line("a->3"),
            Err(RecordError::InvalidId("a".to_string()))
        );
        assert_eq!(parse_line("1->"), Err(RecordError::InvalidId(String::new())));
        assert_eq!(parse_line("0->1"), Err(RecordError::InvalidId("0".to_string())));
        assert!(parse_line("1.5-2").is_err());
    }

    #[test]
    fn test_parse_log_counts_skipped() {
        let text = "# timestep 000\n1-2\n2-3\n\n\n1->1\n2->1\ngarbage\n3->x\n3->3\n";
        let log = parse_log(text);

        assert_eq!(log.links.len(), 2);
        assert_eq!(log.designations.len(), 3);
        assert_eq!(log.skipped_count(), 2);
        assert_eq!(log.skipped[0].line, 8);
        assert_eq!(log.skipped[1].line, 9);
    }

    #[test]
    fn test_parse_log_handles_crlf() {
        let log = parse_log("1->1\r\n2->1\r\n");
        assert_eq!(log.designations, vec![LinkRecord::new(1, 1), LinkRecord::new(2, 1)]);
        assert!(log.skipped.is_empty());
    }
}
