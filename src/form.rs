//! Form body parsing: the one field this service reads.
//!
//! Clients send `html` either urlencoded or as a multipart part. Urlencoded
//! decoding comes from [`form_urlencoded`]; the multipart reader is
//! hand-rolled for exactly the `form-data` wire shape clients emit, because
//! one text field does not justify a full multipart stack.

use crate::error::Error;

/// Name of the one form field this service reads.
const FIELD: &str = "html";

/// Extracts the `html` field from a form body.
///
/// A `multipart/form-data` Content-Type selects the multipart reader;
/// everything else — `application/x-www-form-urlencoded`, or no Content-Type
/// at all — is parsed as urlencoded, which is what permissive CGI-style form
/// handling has always done.
pub(crate) fn html_field(content_type: Option<&str>, body: &[u8]) -> Result<String, Error> {
    match content_type {
        Some(ct) if is_multipart(ct) => {
            let boundary =
                header_param(ct, "boundary").ok_or(Error::BadMultipart("no boundary parameter"))?;
            let raw = multipart_field(body, boundary, FIELD)?.ok_or(Error::MissingHtmlField)?;
            let text = std::str::from_utf8(raw).map_err(Error::FieldNotUtf8)?;
            Ok(text.to_owned())
        }
        _ => urlencoded_field(body, FIELD).ok_or(Error::MissingHtmlField),
    }
}

// ── Urlencoded ────────────────────────────────────────────────────────────────

/// First value for `name` in an urlencoded body. Percent-decoding and `+`
/// handling come from `form_urlencoded`; invalid UTF-8 decodes lossily.
fn urlencoded_field(body: &[u8], name: &str) -> Option<String> {
    form_urlencoded::parse(body)
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

// ── Multipart ─────────────────────────────────────────────────────────────────

fn is_multipart(content_type: &str) -> bool {
    content_type
        .trim_start()
        .get(.."multipart/form-data".len())
        .is_some_and(|t| t.eq_ignore_ascii_case("multipart/form-data"))
}

/// Walks the `--boundary`-delimited parts and returns the body of the part
/// whose Content-Disposition names `field`, or `None` if no part does.
///
/// Handles the RFC 7578 shape form-data clients produce: CRLF line endings,
/// part headers terminated by a blank line, a closing `--boundary--` marker.
/// Later delimiters are matched as `\r\n--boundary`, so part data is free to
/// contain the boundary text itself.
fn multipart_field<'a>(
    body: &'a [u8],
    boundary: &str,
    field: &str,
) -> Result<Option<&'a [u8]>, Error> {
    let open = format!("--{boundary}");
    let close = format!("\r\n--{boundary}");

    let mut pos = find(body, open.as_bytes(), 0)
        .ok_or(Error::BadMultipart("boundary never appears in body"))?
        + open.len();

    loop {
        if body[pos..].starts_with(b"--") {
            // Closing delimiter: no more parts.
            return Ok(None);
        }
        if !body[pos..].starts_with(b"\r\n") {
            return Err(Error::BadMultipart("garbage after boundary"));
        }
        pos += 2;

        let headers_end =
            find(body, b"\r\n\r\n", pos).ok_or(Error::BadMultipart("part headers never end"))?;
        let data_start = headers_end + 4;
        let data_end = find(body, close.as_bytes(), data_start)
            .ok_or(Error::BadMultipart("part not terminated by a boundary"))?;

        if part_names_field(&body[pos..headers_end], field) {
            return Ok(Some(&body[data_start..data_end]));
        }
        pos = data_end + close.len();
    }
}

/// True if one of the part's header lines is a Content-Disposition naming
/// `field`.
fn part_names_field(headers: &[u8], field: &str) -> bool {
    let Ok(headers) = std::str::from_utf8(headers) else {
        return false;
    };
    headers.split("\r\n").any(|line| {
        let Some((name, value)) = line.split_once(':') else {
            return false;
        };
        name.trim().eq_ignore_ascii_case("content-disposition")
            && header_param(value, "name") == Some(field)
    })
}

/// `key=value` parameter lookup in a semicolon-separated header value such as
/// `multipart/form-data; boundary=X` or `form-data; name="html"`. Surrounding
/// quotes are stripped.
fn header_param<'a>(value: &'a str, key: &str) -> Option<&'a str> {
    value.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case(key) {
            return None;
        }
        let value = value.trim();
        Some(
            value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value),
        )
    })
}

/// Byte-level substring search starting at `from`.
fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|at| from + at)
}
