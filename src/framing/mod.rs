//! Stdio framing module - decoding and encoding of JSON-RPC frames

pub mod decoder;
pub mod encoder;

pub use decoder::{extract_json_objects, parse_content_length, FrameDecoder, MAX_FRAME_SIZE};
pub use encoder::FrameEncoder;

/// Wire convention for delimiting messages on a byte stream.
///
/// `Header` is LSP-style `Content-Length` framing; `Raw` is concatenated or
/// newline-delimited JSON. The session starts in `Header` unless forced raw
/// and is downgraded to `Raw` by the decoder the first time header-less JSON
/// arrives. The downgrade is permanent for the process lifetime.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FramingMode {
    Header,
    Raw,
}
