// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! STOMP frame codec.
//!
//! A frame is a command line, header lines, an empty line, and a body
//! terminated by NUL. Bodies with a `content-length` header are read exactly;
//! others are read up to the NUL. Bare newlines between frames are
//! heartbeats and are skipped.

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Hard cap on declared body sizes; nothing in this system sends large
/// payloads, so anything bigger is a corrupt or hostile frame.
const MAX_BODY_LEN: usize = 4 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    #[error("frame is not valid UTF-8")]
    InvalidUtf8,

    #[error("missing NUL terminator after body")]
    MissingTerminator,

    #[error("declared content-length {0} exceeds limit")]
    BodyTooLarge(usize),
}

/// A single STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Frame {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// First occurrence wins, per the STOMP repeated-header rule.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Frame body as UTF-8 text.
    pub fn body_text(&self) -> Result<&str, FrameError> {
        std::str::from_utf8(&self.body).map_err(|_| FrameError::InvalidUtf8)
    }

    /// Serialize for the wire. A `content-length` header is always included
    /// so NUL bytes in bodies cannot truncate the frame.
    pub fn encode(&self) -> Vec<u8> {
        let escaped = !matches!(self.command.as_str(), "CONNECT" | "CONNECTED");
        let mut out = Vec::with_capacity(64 + self.body.len());
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
        out.extend_from_slice(format!("content-length:{}\n", self.body.len()).as_bytes());
        out.push(b'\n');
        out.extend_from_slice(&self.body);
        out.push(0);
        out
    }
}

/// STOMP 1.1+ header escaping.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(s: &str) -> Result<String, FrameError> {
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
            _ => return Err(FrameError::MalformedHeader(s.to_string())),
        }
    }
    Ok(out)
}

/// Read one frame, skipping heartbeat newlines. Returns `None` on clean EOF
/// at a frame boundary.
pub async fn read_frame<R: AsyncBufRead + Unpin>(
    reader: &mut R,
) -> Result<Option<Frame>, FrameError> {
    // Command line; bare newlines before it are heartbeats.
    let command = loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if !trimmed.is_empty() {
            break trimmed.to_string();
        }
    };
    let escaped = !matches!(command.as_str(), "CONNECT" | "CONNECTED");

    // Header lines until the blank separator.
    let mut headers = Vec::new();
    let mut content_length: Option<usize> = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Err(FrameError::MissingTerminator);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            break;
        }
        let (name, value) = trimmed
            .split_once(':')
            .ok_or_else(|| FrameError::MalformedHeader(trimmed.to_string()))?;
        let (name, value) = if escaped {
            (unescape(name)?, unescape(value)?)
        } else {
            (name.to_string(), value.to_string())
        };
        if name == "content-length" && content_length.is_none() {
            content_length = value.trim().parse().ok();
        }
        headers.push((name, value));
    }

    // Body: exact read with content-length, scan to NUL without.
    let body = match content_length {
        Some(len) => {
            if len > MAX_BODY_LEN {
                return Err(FrameError::BodyTooLarge(len));
            }
            let mut body = vec![0u8; len];
            reader.read_exact(&mut body).await?;
            let mut nul = [0u8; 1];
            reader.read_exact(&mut nul).await?;
            if nul[0] != 0 {
                return Err(FrameError::MissingTerminator);
            }
            body
        }
        None => {
            let mut body = Vec::new();
            reader.read_until(0, &mut body).await?;
            match body.pop() {
                Some(0) => body,
                _ => return Err(FrameError::MissingTerminator),
            }
        }
    };

    Ok(Some(Frame { command, headers, body }))
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "frame_property_tests.rs"]
mod property_tests;
