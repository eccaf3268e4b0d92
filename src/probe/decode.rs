//! Best-effort body decoding
//!
//! Source sites are mostly Chinese and frequently misdeclare their charset.
//! Decoding tries a declared charset first, then a fixed cascade of common
//! encodings, and finally Latin-1, which accepts any byte sequence.

use encoding_rs::{DecoderResult, Encoding, BIG5, GBK, SHIFT_JIS, UTF_8};
use regex::bytes::Regex as BytesRegex;
use regex::Regex;
use std::sync::LazyLock;

/// Cascade tried after any declared charset. GB2312 labels resolve to GBK.
fn cascade() -> [&'static Encoding; 4] {
    [UTF_8, GBK, BIG5, SHIFT_JIS]
}

/// Bytes scanned for a `<meta charset>` declaration
const META_SCAN_BYTES: usize = 4096;

static HEADER_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)charset\s*=\s*["']?([a-z0-9_:.\-]+)"#).expect("Invalid regex pattern")
});

static META_CHARSET: LazyLock<BytesRegex> = LazyLock::new(|| {
    BytesRegex::new(r#"(?i)<meta[^>]*?charset\s*=\s*["']?\s*([a-z0-9_:.\-]+)"#)
        .expect("Invalid regex pattern")
});

/// Decoded body and the encoding that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBody {
    pub text: String,
    pub encoding: &'static str,
}

/// Decode a (possibly truncated) body
///
/// # Examples
///
/// ```
/// use sourcesift::probe::decode::decode_body;
///
/// let decoded = decode_body("<html>你好</html>".as_bytes(), "text/html");
/// assert_eq!(decoded.text, "<html>你好</html>");
/// assert_eq!(decoded.encoding, "UTF-8");
/// ```
pub fn decode_body(bytes: &[u8], content_type: &str) -> DecodedBody {
    let declared = [header_charset(content_type), meta_charset(bytes)];

    for encoding in declared.into_iter().flatten().chain(cascade()) {
        if let Some(text) = decode_strict(encoding, bytes) {
            return DecodedBody {
                text,
                encoding: encoding.name(),
            };
        }
    }

    DecodedBody {
        text: decode_latin1(bytes),
        encoding: "ISO-8859-1",
    }
}

/// Charset named in a `Content-Type` header value
pub fn header_charset(content_type: &str) -> Option<&'static Encoding> {
    let caps = HEADER_CHARSET.captures(content_type)?;
    lookup(caps.get(1)?.as_str().as_bytes())
}

/// Charset declared by a `<meta>` tag near the top of the document
pub fn meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(META_SCAN_BYTES)];
    let caps = META_CHARSET.captures(head)?;
    lookup(caps.get(1)?.as_bytes())
}

fn lookup(label: &[u8]) -> Option<&'static Encoding> {
    // UTF-16 and "replacement" labels decode HTML as UTF-8.
    Encoding::for_label(label).map(Encoding::output_encoding)
}

/// Decode without replacement characters; `None` on malformed input
///
/// An incomplete multi-byte sequence at the very end is tolerated, since the
/// body may have been cut at an arbitrary byte.
fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let capacity = decoder.max_utf8_buffer_length_without_replacement(bytes.len())?;
    let mut text = String::with_capacity(capacity);

    let (result, _read) = decoder.decode_to_string_without_replacement(bytes, &mut text, false);
    match result {
        DecoderResult::InputEmpty => Some(text),
        DecoderResult::OutputFull | DecoderResult::Malformed(..) => None,
    }
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
