// src/processor/headers.rs

//! Optional header block at the top of a dropped file.
//!
//! ```text
//! Priority: 4
//! Correlation-Id: 8f2a
//!
//! <order>...</order>
//! ```
//!
//! Header lines are `Name: Value` with exactly one colon. The block ends at
//! the first empty line (dropped) or at the first line that is not a header
//! (kept as the first body line). A line holding only spaces is not empty:
//! it ends the block as a body line.

use anyhow::Context;
use regex::Regex;

use crate::errors::Result;
use crate::sink::Message;

#[derive(Debug, Clone)]
pub struct HeaderParser {
    line: Regex,
}

impl HeaderParser {
    pub fn new() -> Result<Self> {
        let line = Regex::new(r"^([^:]*):([^:]*)$").context("compiling header line pattern")?;
        Ok(Self { line })
    }

    /// Split a single line into a trimmed `(name, value)` pair, if it is a
    /// header line.
    pub fn header<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str)> {
        let caps = self.line.captures(line)?;
        let name = caps.get(1)?.as_str().trim();
        let value = caps.get(2)?.as_str().trim();
        if name.is_empty() || value.is_empty() {
            return None;
        }
        Some((name, value))
    }

    /// Split `content` into headers and body.
    ///
    /// A repeated header name keeps its last value. The body is the rest of
    /// the text, verbatim, starting at the first body line.
    pub fn parse(&self, content: &str) -> Message {
        let mut message = Message::default();
        let mut body_start = 0;

        for raw in content.split_inclusive('\n') {
            let line = raw.strip_suffix('\n').unwrap_or(raw);
            let line = line.strip_suffix('\r').unwrap_or(line);

            if line.is_empty() {
                body_start += raw.len();
                break;
            }

            match self.header(line) {
                Some((name, value)) => {
                    message.headers.insert(name.to_string(), value.to_string());
                    body_start += raw.len();
                }
                None => break,
            }
        }

        message.body = content[body_start..].to_string();
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> HeaderParser {
        HeaderParser::new().unwrap()
    }

    #[test]
    fn headers_then_blank_line_then_body() {
        let msg = parser().parse("X: 1\nY: 2\n\nbody line 1\nbody line2\n");
        assert_eq!(msg.headers.len(), 2);
        assert_eq!(msg.headers["X"], "1");
        assert_eq!(msg.headers["Y"], "2");
        assert_eq!(msg.body, "body line 1\nbody line2\n");
    }

    #[test]
    fn non_header_first_line_means_no_headers() {
        let input = "not a header\nbody";
        let msg = parser().parse(input);
        assert!(msg.headers.is_empty());
        assert_eq!(msg.body, input);
    }

    #[test]
    fn non_header_line_ends_block_without_blank_separator() {
        let msg = parser().parse("X: 1\n<order id=\"1\"/>\nmore\n");
        assert_eq!(msg.headers["X"], "1");
        assert_eq!(msg.body, "<order id=\"1\"/>\nmore\n");
    }

    #[test]
    fn duplicate_header_keeps_last_value() {
        let msg = parser().parse("X: 1\nX: 2\n\nbody\n");
        assert_eq!(msg.headers.len(), 1);
        assert_eq!(msg.headers["X"], "2");
    }

    #[test]
    fn lines_with_extra_colons_or_empty_parts_are_not_headers() {
        let p = parser();
        assert_eq!(p.header("url: http://x"), None);
        assert_eq!(p.header("Name:"), None);
        assert_eq!(p.header(": value"), None);
        assert_eq!(p.header("Name :  value  "), Some(("Name", "value")));
    }

    #[test]
    fn crlf_header_lines() {
        let msg = parser().parse("X: 1\r\n\r\nbody\r\n");
        assert_eq!(msg.headers["X"], "1");
        assert_eq!(msg.body, "body\r\n");
    }

    #[test]
    fn whitespace_only_line_starts_the_body() {
        let msg = parser().parse("X: 1\n  \nbody\n");
        assert_eq!(msg.headers["X"], "1");
        assert_eq!(msg.body, "  \nbody\n");
    }

    #[test]
    fn only_headers() {
        let msg = parser().parse("X: 1\nY: 2");
        assert_eq!(msg.headers.len(), 2);
        assert_eq!(msg.body, "");
    }
}
