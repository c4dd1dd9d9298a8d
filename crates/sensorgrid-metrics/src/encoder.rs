//! OpenMetrics text exposition encoder.
//!
//! Stateless helpers that append directly into a caller-owned `Vec<u8>`.
//! Every document produced through [`MetricRegistry`](crate::MetricRegistry)
//! has the shape:
//!
//! ```text
//! # TYPE sensor_temp gauge
//! sensor_temp{host="h1"} 21.5 1700000000000
//! # EOF
//! ```
//!
//! Writing into a `Vec<u8>` cannot fail, so none of these functions return
//! a `Result`.

use std::io::Write;

use crate::tag::Tag;

/// Append `# TYPE <name> gauge\n`.
pub fn write_type_header(out: &mut Vec<u8>, name: &str) {
    out.extend_from_slice(b"# TYPE ");
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b" gauge\n");
}

/// Append one sample line: `<name>{k="v",...} <value> <timestamp>\n`.
///
/// Tags are written in the order given. The `{}` block is left out entirely
/// when `tags` is empty.
pub fn write_series_line(out: &mut Vec<u8>, timestamp_ms: i64, name: &str, value: f64, tags: &[Tag]) {
    out.extend_from_slice(name.as_bytes());

    if let Some((first, rest)) = tags.split_first() {
        out.push(b'{');
        out.extend_from_slice(first.encoded());
        for tag in rest {
            out.push(b',');
            out.extend_from_slice(tag.encoded());
        }
        out.push(b'}');
    }

    out.push(b' ');
    write_value(out, value);
    out.push(b' ');
    // Vec<u8> as io::Write is infallible.
    let _ = write!(out, "{timestamp_ms}");
    out.push(b'\n');
}

/// Append the `# EOF\n` document terminator.
pub fn write_document_end(out: &mut Vec<u8>) {
    out.extend_from_slice(b"# EOF\n");
}

/// Format a sample value.
///
/// Finite values use the shortest text that round-trips: the shorter of the
/// plain and exponent forms, preferring plain on a tie (`21.5`, `100`, `1e21`,
/// `5e-324`). The non-finite tokens are `+Inf`, `-Inf` and `Nan`; the registry
/// never emits them because it drops non-finite series before encoding.
pub fn write_value(out: &mut Vec<u8>, value: f64) {
    if value.is_nan() {
        out.extend_from_slice(b"Nan");
    } else if value == f64::INFINITY {
        out.extend_from_slice(b"+Inf");
    } else if value == f64::NEG_INFINITY {
        out.extend_from_slice(b"-Inf");
    } else {
        // Both forms go straight into `out`; the longer one is cut back out.
        let start = out.len();
        let _ = write!(out, "{value}");
        let plain_end = out.len();
        let _ = write!(out, "{value:e}");
        if out.len() - plain_end < plain_end - start {
            out.drain(start..plain_end);
        } else {
            out.truncate(plain_end);
        }
    }
}

/// Append `value` with `"`, `\` and line feeds escaped.
///
/// All three are ASCII, so scanning bytes never splits a multi-byte
/// character.
pub fn write_escaped(out: &mut Vec<u8>, value: &str) {
    let bytes = value.as_bytes();
    let mut start = 0;

    for (i, &b) in bytes.iter().enumerate() {
        let replacement: &[u8] = match b {
            b'"' => b"\\\"",
            b'\\' => b"\\\\",
            b'\n' => b"\\n",
            _ => continue,
        };
        out.extend_from_slice(&bytes[start..i]);
        out.extend_from_slice(replacement);
        start = i + 1;
    }

    out.extend_from_slice(&bytes[start..]);
}

/// Reverse [`write_escaped`]. Unknown escape sequences are kept verbatim.
pub fn unescape_label_value(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}
