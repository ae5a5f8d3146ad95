// src/sink/stomp/frame.rs

//! STOMP 1.2 frame encoding and decoding.
//!
//! ```text
//! COMMAND
//! header1:value1
//! header2:value2
//!
//! Body^@
//! ```

use anyhow::{anyhow, bail, Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Frame {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Value of the first header named `name`; later repeats are ignored.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Human readable reason carried by an `ERROR` frame.
    pub fn error_message(&self) -> String {
        let body = String::from_utf8_lossy(&self.body);
        let body = body.trim();
        match (self.get("message"), body.is_empty()) {
            (Some(msg), true) => msg.to_string(),
            (Some(msg), false) => format!("{msg}: {body}"),
            (None, false) => body.to_string(),
            (None, true) => "no reason given".to_string(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        // CONNECT/CONNECTED headers are never escaped.
        let escaped = !matches!(self.command.as_str(), "CONNECT" | "CONNECTED");

        let mut out = Vec::with_capacity(self.command.len() + self.body.len() + 64);
        out.extend_from_slice(self.command.as_bytes());
        out.push(b'\n');
        for (name, value) in &self.headers {
            if escaped {
                out.extend_from_slice(escape(name).as_bytes());
                out.push(b':');
                out.extend_from_slice(escape(value).as_bytes());
            } else {
                out.extend_from_slice(name.as_bytes());
                out.push(b':');
                out.extend_from_slice(value.as_bytes());
            }
            out.push(b'\n');
        }
        out.push(b'\n');
        out.extend_from_slice(&self.body);
        out.push(0);
        out
    }

    /// Decode one frame. `raw` excludes the terminating NUL; leading
    /// end-of-line bytes (heart-beats) are skipped.
    pub fn decode(raw: &[u8]) -> Result<Frame> {
        let start = raw
            .iter()
            .position(|b| *b != b'\n' && *b != b'\r')
            .ok_or_else(|| anyhow!("empty frame"))?;
        let raw = &raw[start..];

        let mut rest = raw;
        let command = next_line(&mut rest)?
            .ok_or_else(|| anyhow!("frame has no command line"))?;
        let unescape_headers = !matches!(command.as_str(), "CONNECT" | "CONNECTED");

        let mut frame = Frame::new(command);
        loop {
            let line = next_line(&mut rest)?
                .ok_or_else(|| anyhow!("frame headers are not terminated by a blank line"))?;
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| anyhow!("malformed header line {line:?}"))?;
            let (name, value) = if unescape_headers {
                (unescape(name)?, unescape(value)?)
            } else {
                (name.to_string(), value.to_string())
            };
            frame.headers.push((name, value));
        }

        frame.body = match frame.get("content-length") {
            Some(len) => {
                let len: usize = len
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid content-length {len:?}"))?;
                if len > rest.len() {
                    bail!("content-length {len} exceeds frame body of {} bytes", rest.len());
                }
                rest[..len].to_vec()
            }
            None => rest.to_vec(),
        };
        Ok(frame)
    }
}

/// Pop one line off `rest`, accepting `\n` or `\r\n`. `None` when exhausted.
fn next_line(rest: &mut &[u8]) -> Result<Option<String>> {
    if rest.is_empty() {
        return Ok(None);
    }
    let (line, remainder) = match rest.iter().position(|b| *b == b'\n') {
        Some(idx) => (&rest[..idx], &rest[idx + 1..]),
        None => (*rest, &[][..]),
    };
    *rest = remainder;
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let line = std::str::from_utf8(line).context("frame header is not valid UTF-8")?;
    Ok(Some(line.to_string()))
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

pub fn unescape(s: &str) -> Result<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            Some(other) => bail!("undefined escape sequence \\{other} in header {s:?}"),
            None => bail!("dangling escape at end of header {s:?}"),
        }
    }
    Ok(out)
}

/// Write one frame and flush.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(&frame.encode())
        .await
        .with_context(|| format!("writing {} frame", frame.command))?;
    writer.flush().await.context("flushing frame")?;
    Ok(())
}

/// Read the next frame, up to and including its NUL terminator.
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = reader
            .read_until(0, &mut buf)
            .await
            .context("reading frame")?;
        if n == 0 {
            bail!("connection closed by server");
        }
        if buf.last() != Some(&0) {
            bail!("connection closed in the middle of a frame");
        }
        buf.pop();
        // A lone run of EOLs is a heart-beat, not a frame.
        if buf.iter().all(|b| *b == b'\n' || *b == b'\r') {
            continue;
        }
        return Frame::decode(&buf);
    }
}
