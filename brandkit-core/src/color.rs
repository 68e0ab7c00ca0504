//! Palette extraction, literal recoloring, and luminance-based contrast.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Paint values that never show up in the editable palette.
const IGNORED_PAINTS: [&str; 2] = ["none", "transparent"];

/// Paint attributes inspected on every element.
const PAINT_ATTRIBUTES: [&[u8]; 2] = [b"fill", b"stroke"];

/// Ordered substitutions from original color tokens to replacements.
///
/// Insertion order is kept; setting an existing key replaces its value in
/// place. Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorMap {
    entries: Vec<(String, String)>,
}

impl ColorMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `original` to `replacement`.
    pub fn set(&mut self, original: impl Into<String>, replacement: impl Into<String>) {
        let original = original.into();
        let replacement = replacement.into();
        match self.entries.iter_mut().find(|(key, _)| *key == original) {
            Some(entry) => entry.1 = replacement,
            None => self.entries.push((original, replacement)),
        }
    }

    /// Replacement for `original`, if any.
    #[must_use]
    pub fn get(&self, original: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == original)
            .map(|(_, value)| value.as_str())
    }

    /// Iterate pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of substitutions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no substitutions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ColorMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.set(k, v);
        }
        map
    }
}

impl Serialize for ColorMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for ColorMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ColorMapVisitor;

        impl<'de> serde::de::Visitor<'de> for ColorMapVisitor {
            type Value = ColorMap;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of color tokens")
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(
                self,
                mut access: A,
            ) -> Result<Self::Value, A::Error> {
                let mut map = ColorMap::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    map.set(k, v);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(ColorMapVisitor)
    }
}

/// Collect the distinct `fill`/`stroke` values of every element, in the
/// order they first appear.
///
/// Empty values, `none` and `transparent` are skipped. Markup that fails to parse yields an
/// empty palette.
#[must_use]
pub fn extract_colors(svg_content: &str) -> Vec<String> {
    let mut reader = Reader::from_str(svg_content);
    let mut colors: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Start(element) | Event::Empty(element)) => {
                for attr in element.attributes().flatten() {
                    if !PAINT_ATTRIBUTES.contains(&attr.key.as_ref()) {
                        continue;
                    }
                    let raw = String::from_utf8_lossy(&attr.value);
                    let value = quick_xml::escape::unescape(&raw)
                        .map_or_else(|_| raw.to_string(), |v| v.into_owned());
                    if value.trim().is_empty()
                        || IGNORED_PAINTS.contains(&value.as_str())
                        || colors.contains(&value)
                    {
                        continue;
                    }
                    colors.push(value);
                }
            }
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(error = %err, "Unparsable SVG; no palette extracted");
                return Vec::new();
            }
        }
    }

    colors
}

/// Apply `colors` to the serialized SVG as literal text substitutions.
///
/// For every pair, all occurrences of `"original"` and `'original'` are
/// replaced with the equally quoted replacement. This is deliberately a text
/// pass rather than a tree edit: a token that also appears as a complete
/// quoted value elsewhere (for example inside another attribute) is replaced
/// there too.
#[must_use]
pub fn recolor(svg_content: &str, colors: &ColorMap) -> String {
    let mut content = svg_content.to_string();
    for (original, replacement) in colors.iter() {
        content = content.replace(&format!("\"{original}\""), &format!("\"{replacement}\""));
        content = content.replace(&format!("'{original}'"), &format!("'{replacement}'"));
    }
    content
}

/// An 8-bit RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
}

impl Rgb {
    /// Relative luminance on the 0-255 scale (`0.299R + 0.587G + 0.114B`).
    #[must_use]
    pub fn luminance(self) -> f32 {
        0.299 * f32::from(self.r) + 0.587 * f32::from(self.g) + 0.114 * f32::from(self.b)
    }
}

/// Parse `#rgb` or `#rrggbb` (the `#` is optional).
///
/// Three-digit colors are expanded by doubling each digit.
#[must_use]
pub fn parse_hex_color(hex: &str) -> Option<Rgb> {
    let hex = hex.trim().trim_start_matches('#');
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
    Some(Rgb {
        r: channel(0)?,
        g: channel(2)?,
        b: channel(4)?,
    })
}

/// Text color that stays readable on a given background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextColor {
    /// `#000000`.
    Black,
    /// `#ffffff`.
    White,
}

impl TextColor {
    /// Hex form for use in markup.
    #[must_use]
    pub fn as_hex(self) -> &'static str {
        match self {
            Self::Black => "#000000",
            Self::White => "#ffffff",
        }
    }
}

/// Pick black text for light backgrounds (luminance >= 128) and white text
/// for dark ones. Backgrounds that are not 3- or 6-digit hex get black text.
#[must_use]
pub fn contrast_color(background: &str) -> TextColor {
    match parse_hex_color(background) {
        Some(rgb) if rgb.luminance() < 128.0 => TextColor::White,
        _ => TextColor::Black,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LOGO: &str = r##"<svg viewBox="0 0 10 10">
        <rect fill="#FF0000" stroke="none"/>
        <circle fill='#00ff00' stroke="#FF0000"/>
        <path fill="transparent" stroke="url(#grad)"/>
        <g fill="#ff0000"><path d="M0 0"/></g>
    </svg>"##;

    #[test]
    fn test_extract_colors_ordered_and_deduplicated() {
        let colors = extract_colors(LOGO);
        assert_eq!(colors, vec!["#FF0000", "#00ff00", "url(#grad)", "#ff0000"]);
    }

    #[test]
    fn test_extract_colors_case_sensitive() {
        let colors = extract_colors(LOGO);
        assert!(colors.contains(&"#FF0000".to_string()));
        assert!(colors.contains(&"#ff0000".to_string()));
    }

    #[test]
    fn test_extract_colors_skips_empty_values() {
        let svg = r##"<svg><rect fill="" stroke="#000"/><path fill="  " stroke=""/></svg>"##;
        assert_eq!(extract_colors(svg), vec!["#000"]);
    }

    #[test]
    fn test_extract_colors_malformed() {
        assert!(extract_colors("<svg><g fill=\"red\"></svg>").is_empty());
        assert!(extract_colors("").is_empty());
    }

    #[test]
    fn test_recolor_replaces_both_quote_styles() {
        let mut map = ColorMap::new();
        map.set("#00ff00", "#0000ff");
        let out = recolor(LOGO, &map);
        assert!(out.contains("fill='#0000ff'"));
        assert!(!out.contains("#00ff00"));
    }

    #[test]
    fn test_recolor_is_case_sensitive() {
        let mut map = ColorMap::new();
        map.set("#FF0000", "#111111");
        let out = recolor(LOGO, &map);
        assert!(out.contains(r##"<rect fill="#111111""##));
        assert!(out.contains(r##"stroke="#111111""##));
        assert!(out.contains(r##"<g fill="#ff0000">"##));
    }

    #[test]
    fn test_recolor_ignores_unquoted_substrings() {
        let svg = r##"<svg><rect fill="#abc" style="fill:#abc"/></svg>"##;
        let map: ColorMap = [("#abc", "#def")].into_iter().collect();
        let out = recolor(svg, &map);
        assert_eq!(out, r##"<svg><rect fill="#def" style="fill:#abc"/></svg>"##);
    }

    #[test]
    fn test_recolor_collides_with_equal_quoted_values() {
        // Known limitation: any attribute whose whole value equals the token
        // is rewritten, not just paint attributes.
        let svg = r#"<svg><rect fill="red" class="red"/></svg>"#;
        let map: ColorMap = [("red", "blue")].into_iter().collect();
        assert_eq!(recolor(svg, &map), r#"<svg><rect fill="blue" class="blue"/></svg>"#);
    }

    #[test]
    fn test_color_map_keeps_order_and_overwrites() {
        let mut map = ColorMap::new();
        map.set("a", "1");
        map.set("b", "2");
        map.set("a", "3");
        let pairs: Vec<_> = map.iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
        assert_eq!(map.get("a"), Some("3"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_color_map_json() {
        let map: ColorMap = serde_json::from_str(r##"{"#fff":"#000","#abc":"#def"}"##).expect("json");
        assert_eq!(map.get("#abc"), Some("#def"));
        let json = serde_json::to_string(&map).expect("json");
        assert_eq!(json, r##"{"#fff":"#000","#abc":"#def"}"##);
    }

    #[test]
    fn test_contrast_color() {
        assert_eq!(contrast_color("#ffffff"), TextColor::Black);
        assert_eq!(contrast_color("#000000"), TextColor::White);
        assert_eq!(contrast_color("#000"), contrast_color("#000000"));
        assert_eq!(contrast_color("#fff"), TextColor::Black);
    }

    #[test]
    fn test_contrast_color_indigo_is_dark() {
        let rgb = parse_hex_color("#4F46E5").expect("hex");
        assert!((rgb.luminance() - 91.0).abs() < 1.0);
        assert_eq!(contrast_color("#4F46E5"), TextColor::White);
    }

    #[test]
    fn test_contrast_color_unparsable_defaults_black() {
        assert_eq!(contrast_color("red"), TextColor::Black);
        assert_eq!(contrast_color("#12345"), TextColor::Black);
        assert_eq!(contrast_color(""), TextColor::Black);
        assert_eq!(contrast_color("#ggg"), TextColor::Black);
    }

    #[test]
    fn test_contrast_threshold() {
        assert_eq!(contrast_color("#818181"), TextColor::Black);
        assert_eq!(contrast_color("#7e7e7e"), TextColor::White);
    }

    #[test]
    fn test_parse_hex_color_expands_short_form() {
        assert_eq!(parse_hex_color("#abc"), parse_hex_color("#aabbcc"));
        assert_eq!(parse_hex_color("abc"), Some(Rgb { r: 0xaa, g: 0xbb, b: 0xcc }));
    }

    proptest! {
        #[test]
        fn prop_empty_map_is_identity(s in ".*") {
            prop_assert_eq!(recolor(&s, &ColorMap::new()), s);
        }
    }
}
