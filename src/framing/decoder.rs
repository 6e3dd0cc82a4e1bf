//! Frame decoder - reassembles complete JSON-RPC frames from a byte stream

use tracing::{debug, warn};

use super::FramingMode;

/// Maximum accepted Content-Length (10MB); larger declarations are treated
/// as malformed headers
pub const MAX_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Incremental decoder for the two stdio framing styles.
///
/// Bytes are accumulated in a pending buffer across `feed` calls; each call
/// extracts as many complete frames as the buffer holds. Header framing is
/// always tried first; when no header terminator is present the buffer is
/// scanned for complete top-level JSON objects instead, and the first such
/// object permanently downgrades the session to raw framing.
#[derive(Debug)]
pub struct FrameDecoder {
    pending: Vec<u8>,
    mode: FramingMode,
}

impl FrameDecoder {
    pub fn new(mode: FramingMode) -> Self {
        Self {
            pending: Vec::new(),
            mode,
        }
    }

    /// Framing mode observed so far
    pub fn mode(&self) -> FramingMode {
        self.mode
    }

    /// Bytes buffered but not yet part of a complete frame
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Consume a chunk of input and return every frame it completes
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut frames = Vec::new();

        loop {
            match find_header_end(&self.pending) {
                Some((header_end, delim_len)) => {
                    let header = String::from_utf8_lossy(&self.pending[..header_end]).into_owned();
                    match parse_content_length(&header) {
                        Some(len) if len <= MAX_FRAME_SIZE => {
                            let total = header_end + delim_len + len;
                            if self.pending.len() < total {
                                // Body not fully buffered yet
                                break;
                            }
                            let body = &self.pending[header_end + delim_len..total];
                            frames.push(String::from_utf8_lossy(body).into_owned());
                            self.pending.drain(..total);
                        }
                        Some(len) => {
                            warn!("dropping header with oversized Content-Length {}", len);
                            self.pending.drain(..header_end + delim_len);
                        }
                        None => {
                            // Malformed header block: drop it and keep scanning
                            debug!("dropping header block without Content-Length");
                            self.pending.drain(..header_end + delim_len);
                        }
                    }
                }
                None => {
                    let (objects, consumed) = extract_json_objects(&self.pending);
                    if objects.is_empty() {
                        break;
                    }
                    if self.mode != FramingMode::Raw {
                        debug!("header-less JSON received, switching session to raw framing");
                        self.mode = FramingMode::Raw;
                    }
                    self.pending.drain(..consumed);
                    frames.extend(objects);
                }
            }
        }

        frames
    }
}

/// Locate the header terminator, preferring `\r\n\r\n` over `\n\n`.
/// Returns (terminator offset, terminator length).
fn find_header_end(buf: &[u8]) -> Option<(usize, usize)> {
    if let Some(i) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
        return Some((i, 4));
    }
    if let Some(i) = buf.windows(2).position(|w| w == b"\n\n") {
        return Some((i, 2));
    }
    None
}

/// Case-insensitive Content-Length lookup across the lines of a header block
pub fn parse_content_length(header: &str) -> Option<usize> {
    for line in header.lines() {
        let (name, value) = match line.split_once(':') {
            Some(parts) => parts,
            None => continue,
        };
        if !name.trim().eq_ignore_ascii_case("content-length") {
            continue;
        }
        if let Ok(len) = value.trim().parse::<usize>() {
            return Some(len);
        }
    }
    None
}

/// Extract complete top-level `{...}` objects from a raw byte stream.
///
/// Tracks brace depth while skipping braces inside quoted strings and
/// escaped quotes. Returns the extracted objects and the number of leading
/// bytes consumed; an unterminated object (or trailing text after the last
/// complete one) is left unconsumed for the next call. Operating on bytes
/// keeps a multi-byte UTF-8 sequence split across reads intact, since the
/// scanner only reacts to ASCII delimiters.
pub fn extract_json_objects(buf: &[u8]) -> (Vec<String>, usize) {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;
    let mut start: Option<usize> = None;
    let mut consumed = 0usize;

    for (i, &b) in buf.iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
            } else if b == b'\\' {
                escape = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            b'}' => {
                if depth > 0 {
                    depth -= 1;
                }
                if depth == 0 {
                    if let Some(s) = start.take() {
                        out.push(String::from_utf8_lossy(&buf[s..=i]).into_owned());
                        consumed = i + 1;
                    }
                }
            }
            _ => {}
        }
    }

    // A partially received object is retained from its opening brace
    if depth > 0 {
        if let Some(s) = start {
            consumed = s;
        }
    }

    (out, consumed)
}
