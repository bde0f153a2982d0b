//! Content-type detection from leading bytes
//!
//! Fallback for blobs whose extension has no known MIME mapping and for
//! fetched bodies that arrive without a usable Content-Type header.
//! Covers the common web types; everything else degrades to
//! text/plain (printable data) or application/octet-stream.

/// Only the first 512 bytes participate in detection.
const SNIFF_LEN: usize = 512;

const OCTET_STREAM: &str = "application/octet-stream";

/// Exact-prefix signatures, checked in order.
const SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"BM", "image/bmp"),
    (b"\x00\x00\x01\x00", "image/x-icon"),
    (b"%PDF-", "application/pdf"),
    (b"%!PS-Adobe-", "application/postscript"),
    (b"OggS\x00", "application/ogg"),
    (b"ID3", "audio/mpeg"),
    (b"\x1a\x45\xdf\xa3", "video/webm"),
    (b"wOFF", "font/woff"),
    (b"wOF2", "font/woff2"),
    (b"\x1f\x8b\x08", "application/x-gzip"),
    (b"PK\x03\x04", "application/zip"),
    (b"Rar!\x1a\x07\x00", "application/x-rar-compressed"),
    (b"\x00asm", "application/wasm"),
];

/// HTML tags recognized after leading whitespace, case-insensitive,
/// each terminated by a space or `>`.
const HTML_TAGS: &[&str] = &[
    "<!DOCTYPE HTML",
    "<HTML",
    "<HEAD",
    "<SCRIPT",
    "<IFRAME",
    "<BODY",
    "<DIV",
    "<P",
    "<!--",
];

/// Detect a content type from the first bytes of `data`.
///
/// Never fails: unrecognized printable data is reported as
/// `text/plain; charset=utf-8`, anything else as
/// `application/octet-stream`.
pub fn detect_content_type(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];
    if data.is_empty() {
        return "text/plain; charset=utf-8";
    }

    for (sig, mime) in SIGNATURES {
        if data.starts_with(sig) {
            return mime;
        }
    }

    // RIFF containers share a prefix; the format tag sits at offset 8.
    if data.starts_with(b"RIFF") && data.len() >= 12 {
        match &data[8..12] {
            b"WEBP" => return "image/webp",
            b"WAVE" => return "audio/wave",
            b"AVI " => return "video/avi",
            _ => {}
        }
    }

    // MP4 family: "ftyp" at offset 4, box size before it.
    if data.len() >= 12 && &data[4..8] == b"ftyp" {
        return "video/mp4";
    }

    let trimmed = skip_whitespace(data);
    for tag in HTML_TAGS {
        if html_tag_matches(trimmed, tag.as_bytes()) {
            return "text/html; charset=utf-8";
        }
    }

    if is_text(trimmed) {
        return "text/plain; charset=utf-8";
    }

    OCTET_STREAM
}

fn skip_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | b' '))
        .unwrap_or(data.len());
    &data[start..]
}

fn html_tag_matches(data: &[u8], tag: &[u8]) -> bool {
    // Every tag, the comment opener included, needs a space or '>'
    // right after it.
    if data.len() < tag.len() + 1 {
        return false;
    }
    for (d, t) in data.iter().zip(tag.iter()) {
        if !d.eq_ignore_ascii_case(t) {
            return false;
        }
    }
    matches!(data[tag.len()], b' ' | b'>')
}

/// Control bytes outside the usual text repertoire mark data as binary.
fn is_text(data: &[u8]) -> bool {
    !data.iter().any(|&b| {
        b <= 0x08 || b == 0x0b || (0x0e..=0x1a).contains(&b) || (0x1c..=0x1f).contains(&b)
    })
}
