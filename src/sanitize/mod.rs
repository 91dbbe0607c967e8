// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Security sanitizer for rendered SVG.
//!
//! Every piece of SVG leaving a backend passes through here before it can
//! reach a cache or a presentation surface. The pipeline is a structural
//! XML event rewrite, not a regex pass: the document is parsed first and
//! unsafe constructs are dropped at the event level, so malformed or
//! obfuscated markup cannot slip through a pattern gap. On any parse
//! failure the sanitizer fails closed and returns an empty document.
//!
//! What gets removed:
//! * `<script>` elements, including everything nested inside them
//! * attributes whose name matches the `on*` event-handler pattern,
//!   case-insensitively, on every element
//! * `href`/`xlink:href` values using the `javascript:` scheme (any
//!   letter case) or resolving to absolute / protocol-relative external
//!   URLs
//!
//! Fragment references (`#id`) are never stripped: `<use href="#icon">`
//! against an internal `<symbol>` is a common, legitimate rendering
//! idiom. All other markup round-trips, including `CDATA`-wrapped style
//! blocks.

use std::io::Cursor;

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::observability::messages::sanitize::{SanitizationFailed, UnsafeMarkupStripped};
use crate::observability::messages::StructuredLog;

/// Sanitize rendered SVG text. Returns the cleaned document, or an empty
/// string when the input is empty or cannot be parsed as XML.
pub fn sanitize(svg: &str) -> String {
    if svg.trim().is_empty() {
        return String::new();
    }
    match sanitize_document(svg) {
        Ok((clean, stripped)) => {
            if !stripped.is_empty() {
                stripped.log();
            }
            clean
        }
        Err(reason) => {
            SanitizationFailed { reason: &reason }.log();
            String::new()
        }
    }
}

fn sanitize_document(svg: &str) -> Result<(String, UnsafeMarkupStripped), String> {
    let mut reader = Reader::from_str(svg);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut stripped = UnsafeMarkupStripped {
        scripts: 0,
        event_handlers: 0,
        unsafe_refs: 0,
    };

    // Depth of nested <script> elements currently being skipped. While
    // non-zero, every event is discarded.
    let mut script_depth = 0usize;
    let mut saw_element = false;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Eof => break,
            Event::Start(elem) => {
                saw_element = true;
                if is_script(&elem) {
                    script_depth += 1;
                    stripped.scripts += 1;
                    continue;
                }
                if script_depth > 0 {
                    continue;
                }
                let clean = scrub_element(&elem, &mut stripped)?;
                writer
                    .write_event(Event::Start(clean))
                    .map_err(|e| e.to_string())?;
            }
            Event::Empty(elem) => {
                saw_element = true;
                if is_script(&elem) {
                    stripped.scripts += 1;
                    continue;
                }
                if script_depth > 0 {
                    continue;
                }
                let clean = scrub_element(&elem, &mut stripped)?;
                writer
                    .write_event(Event::Empty(clean))
                    .map_err(|e| e.to_string())?;
            }
            Event::End(elem) => {
                if elem.name().local_name().as_ref().eq_ignore_ascii_case(b"script") {
                    script_depth = script_depth.saturating_sub(1);
                    continue;
                }
                if script_depth > 0 {
                    continue;
                }
                writer
                    .write_event(Event::End(elem))
                    .map_err(|e| e.to_string())?;
            }
            // Text, CData, comments, processing instructions, the XML
            // declaration: all pass through untouched unless they live
            // inside a skipped <script>.
            other => {
                if script_depth == 0 {
                    writer.write_event(other).map_err(|e| e.to_string())?;
                }
            }
        }
    }

    if !saw_element {
        return Err("input contains no XML elements".to_string());
    }

    let bytes = writer.into_inner().into_inner();
    let text = String::from_utf8(bytes).map_err(|e| e.to_string())?;
    Ok((text, stripped))
}

fn is_script(elem: &BytesStart) -> bool {
    elem.name().local_name().as_ref().eq_ignore_ascii_case(b"script")
}

/// Rebuild an element with unsafe attributes removed.
fn scrub_element(
    elem: &BytesStart,
    stripped: &mut UnsafeMarkupStripped,
) -> Result<BytesStart<'static>, String> {
    let name = String::from_utf8_lossy(elem.name().as_ref()).into_owned();
    let mut clean = BytesStart::new(name);

    for attr in elem.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let local = attr.key.local_name();

        if is_event_handler(local.as_ref()) {
            stripped.event_handlers += 1;
            continue;
        }

        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| e.to_string())?
            .into_owned();

        if local.as_ref().eq_ignore_ascii_case(b"href") && !is_safe_href(&value) {
            stripped.unsafe_refs += 1;
            continue;
        }

        clean.push_attribute((key.as_str(), value.as_str()));
    }

    Ok(clean)
}

/// `on*` attribute names carry inline event handlers.
fn is_event_handler(name: &[u8]) -> bool {
    name.len() >= 2 && name[..2].eq_ignore_ascii_case(b"on")
}

/// Decide whether an `href`-like value may stay.
///
/// Fragment references are always safe; `javascript:` (any case) and
/// external URLs (explicit scheme or protocol-relative) are not.
/// Everything else, relative paths in particular, is left alone.
fn is_safe_href(value: &str) -> bool {
    let v = value.trim_start_matches(|c: char| c.is_whitespace() || c.is_control());
    if v.starts_with('#') {
        return true;
    }
    if v.len() >= 11 && v[..11].eq_ignore_ascii_case("javascript:") {
        return false;
    }
    if v.starts_with("//") {
        return false;
    }
    if let Some(idx) = v.find("://") {
        let scheme = &v[..idx];
        if !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
        {
            return false;
        }
    }
    true
}
