//! SVG canonicalization.
//!
//! Every downstream stage assumes the logo lives on a 512x512 artboard. The
//! canonicalizer wraps whatever root `<svg>` an upload contains in a fixed
//! `viewBox="0 0 512 512"` element and lets the original scale itself to fit.
//!
//! Parsing is streaming (`quick-xml`); the original subtree is copied through
//! event by event, so markup the canonicalizer does not understand survives
//! byte for byte.

use std::borrow::Cow;

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use serde::Serialize;
use thiserror::Error;

/// Edge length of the canonical artboard.
pub const CANONICAL_SIZE: f32 = 512.0;

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Attributes on the original root that the canonical wrapper overrides.
const OVERRIDDEN_ATTRIBUTES: [&[u8]; 5] = [b"x", b"y", b"width", b"height", b"preserveAspectRatio"];

/// Intrinsic size of an SVG document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SvgDimensions {
    /// Width in user units.
    pub width: f32,
    /// Height in user units.
    pub height: f32,
}

impl SvgDimensions {
    /// Construct from width and height.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for SvgDimensions {
    fn default() -> Self {
        Self::new(CANONICAL_SIZE, CANONICAL_SIZE)
    }
}

#[derive(Debug, Error)]
enum SvgError {
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error(transparent)]
    Attribute(#[from] AttrError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("unbalanced element nesting")]
    Unbalanced,
    #[error("output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Wrap the first `<svg>` element of `svg_content` in the canonical
/// 512x512 artboard.
///
/// The original element keeps all of its attributes except `x`, `y`,
/// `width`, `height` and `preserveAspectRatio`, which are replaced so that it
/// fills the artboard while keeping its aspect ratio. Anything outside that
/// element (XML declaration, doctype, comments) is dropped.
///
/// Markup without an `<svg>` element, or markup that does not parse, is
/// returned unchanged.
#[must_use]
pub fn normalize_svg(svg_content: &str) -> String {
    match canonicalize(svg_content.trim()) {
        Ok(Some(canonical)) => canonical,
        Ok(None) => {
            tracing::debug!("No <svg> element found; leaving markup unchanged");
            svg_content.to_string()
        }
        Err(err) => {
            tracing::warn!(error = %err, "Failed to normalize SVG");
            svg_content.to_string()
        }
    }
}

/// Resolve the intrinsic dimensions of an SVG document.
///
/// A `viewBox` with exactly four tokens wins; only its width and height are
/// used (the origin offset is ignored). Otherwise the `width`/`height`
/// attributes are used, with missing, non-numeric or percentage values
/// defaulting to 512. Unparsable markup yields 512x512.
#[must_use]
pub fn get_svg_dimensions(svg_content: &str) -> SvgDimensions {
    match root_attributes(svg_content) {
        Ok(Some(attrs)) => {
            let lookup = |name: &str| {
                attrs
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| value.as_str())
            };
            dimensions_from(lookup("viewBox"), lookup("width"), lookup("height"))
        }
        Ok(None) => SvgDimensions::default(),
        Err(err) => {
            tracing::debug!(error = %err, "Unparsable SVG; using default dimensions");
            SvgDimensions::default()
        }
    }
}

fn dimensions_from(
    view_box: Option<&str>,
    width: Option<&str>,
    height: Option<&str>,
) -> SvgDimensions {
    if let Some(view_box) = view_box {
        let parts: Vec<&str> = view_box
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|part| !part.is_empty())
            .collect();
        if parts.len() == 4 {
            if let (Some(w), Some(h)) = (parse_leading_float(parts[2]), parse_leading_float(parts[3]))
            {
                return SvgDimensions::new(w, h);
            }
        }
    }

    let length = |value: Option<&str>| match value {
        Some(v) if !v.contains('%') => parse_leading_float(v).unwrap_or(CANONICAL_SIZE),
        _ => CANONICAL_SIZE,
    };
    SvgDimensions::new(length(width), length(height))
}

/// Parse the longest numeric prefix of `value` (`"24px"` -> 24).
fn parse_leading_float(value: &str) -> Option<f32> {
    let value = value.trim_start();
    let candidate_len = value
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')))
        .map_or(value.len(), |(idx, _)| idx);

    (1..=candidate_len)
        .rev()
        .find_map(|end| value[..end].parse::<f32>().ok())
        .filter(|v| v.is_finite())
}

fn is_svg(start: &BytesStart<'_>) -> bool {
    start.local_name().as_ref() == b"svg"
}

fn attribute_value(raw: &[u8]) -> String {
    let raw = String::from_utf8_lossy(raw);
    match quick_xml::escape::unescape(&raw) {
        Ok(unescaped) => unescaped.into_owned(),
        Err(_) => raw.into_owned(),
    }
}

/// Attributes of the first `<svg>` element, after checking the whole
/// document is well formed.
fn root_attributes(svg_content: &str) -> Result<Option<Vec<(String, String)>>, SvgError> {
    let mut reader = Reader::from_str(svg_content);
    let mut open = 0usize;
    let mut found = None;

    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Eof => break,
            Event::Start(start) | Event::Empty(start) => {
                if matches!(event, Event::Start(_)) {
                    open += 1;
                }
                if found.is_none() && is_svg(start) {
                    let mut attrs = Vec::new();
                    for attr in start.attributes() {
                        let attr = attr?;
                        attrs.push((
                            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                            attribute_value(&attr.value),
                        ));
                    }
                    found = Some(attrs);
                }
            }
            Event::End(_) => open = open.checked_sub(1).ok_or(SvgError::Unbalanced)?,
            _ => {}
        }
    }

    if open != 0 {
        return Err(SvgError::Unbalanced);
    }
    Ok(found)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CopyState {
    Searching,
    Copying { root_depth: usize },
    Done,
}

fn canonicalize(svg_content: &str) -> Result<Option<String>, SvgError> {
    let mut reader = Reader::from_str(svg_content);
    let mut writer = Writer::new(Vec::with_capacity(svg_content.len() + 160));
    writer.write_event(Event::Start(artboard_start()))?;

    let mut state = CopyState::Searching;
    let mut open = 0usize;

    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Eof => break,
            Event::Start(_) => open += 1,
            Event::End(_) => open = open.checked_sub(1).ok_or(SvgError::Unbalanced)?,
            _ => {}
        }

        match state {
            CopyState::Done => {}
            CopyState::Searching => match &event {
                Event::Start(start) if is_svg(start) => {
                    writer.write_event(Event::Start(fit_to_artboard(start)?))?;
                    state = CopyState::Copying { root_depth: open };
                }
                Event::Empty(start) if is_svg(start) => {
                    writer.write_event(Event::Empty(fit_to_artboard(start)?))?;
                    state = CopyState::Done;
                }
                _ => {}
            },
            CopyState::Copying { root_depth } => {
                let closes_root = matches!(event, Event::End(_)) && open + 1 == root_depth;
                writer.write_event(event)?;
                if closes_root {
                    state = CopyState::Done;
                }
            }
        }
    }

    if open != 0 {
        return Err(SvgError::Unbalanced);
    }
    if state == CopyState::Searching {
        return Ok(None);
    }

    writer.write_event(Event::End(BytesEnd::new("svg")))?;
    Ok(Some(String::from_utf8(writer.into_inner())?))
}

fn artboard_start() -> BytesStart<'static> {
    let mut start = BytesStart::new("svg");
    start.push_attribute(("xmlns", SVG_NAMESPACE));
    start.push_attribute(("viewBox", "0 0 512 512"));
    start.push_attribute(("width", "512"));
    start.push_attribute(("height", "512"));
    start
}

fn fit_to_artboard(original: &BytesStart<'_>) -> Result<BytesStart<'static>, SvgError> {
    let qname = original.name();
    let name: Cow<'_, str> = String::from_utf8_lossy(qname.as_ref());
    let mut root = BytesStart::new(name.into_owned());

    for attr in original.attributes() {
        let attr = attr?;
        if OVERRIDDEN_ATTRIBUTES.contains(&attr.key.as_ref()) {
            continue;
        }
        root.push_attribute((attr.key.as_ref(), attr.value.as_ref()));
    }
    root.push_attribute(("width", "100%"));
    root.push_attribute(("height", "100%"));
    root.push_attribute(("preserveAspectRatio", "xMidYMid meet"));
    Ok(root)
}
