//! Path record decoder
//!
//! Turns a `RawPathRecord` into a `CanonicalKey`. The key is the structured
//! triple itself, so equality and hashing are exact and two different
//! records can never collide. Text only appears when a key is written to the
//! vocabulary artifact:
//!
//! ```text
//! IdentifierDeclStatement:Identifier-[FLOWS_TO:REACHES]->CallExpression
//! ```
//!
//! Labels containing `\ : - [ ] >` are backslash-escaped, line breaks are
//! written as `\n` and `\r`, and an empty label is written as `\0`. The text
//! form is injective, parseable, and always fits on one line.

use crate::errors::{FeatureError, Result};
use crate::shared::RawPathRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

const ELEMENT_SEPARATOR: char = ':';
const FLOW_OPEN: &str = "-[";
const FLOW_CLOSE: &str = "]->";
const ESCAPE: char = '\\';
const EMPTY_MARKER: char = '0';
const NEWLINE_MARKER: char = 'n';
const RETURN_MARKER: char = 'r';

/// Vocabulary key for one flow pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalKey {
    source: Vec<String>,
    flow: Vec<String>,
    sink: Vec<String>,
}

/// Canonicalize a raw record
pub fn canonicalize(record: &RawPathRecord) -> CanonicalKey {
    CanonicalKey {
        source: record.source_shape.clone(),
        flow: record.flow_edges.clone(),
        sink: record.sink_shape.clone(),
    }
}

impl From<RawPathRecord> for CanonicalKey {
    fn from(record: RawPathRecord) -> Self {
        Self {
            source: record.source_shape,
            flow: record.flow_edges,
            sink: record.sink_shape,
        }
    }
}

impl CanonicalKey {
    pub fn source(&self) -> &[String] {
        &self.source
    }

    pub fn flow(&self) -> &[String] {
        &self.flow
    }

    pub fn sink(&self) -> &[String] {
        &self.sink
    }

    /// Text form used in the vocabulary artifact
    pub fn render(&self) -> String {
        let mut out = String::new();
        push_sequence(&mut out, &self.source);
        out.push_str(FLOW_OPEN);
        push_sequence(&mut out, &self.flow);
        out.push_str(FLOW_CLOSE);
        push_sequence(&mut out, &self.sink);
        out
    }

    /// Inverse of `render`
    pub fn parse(text: &str) -> Result<Self> {
        let chars: Vec<char> = text.chars().collect();
        let mut sections: Vec<Vec<String>> = Vec::with_capacity(3);
        let mut elements: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut explicit_empty = false;
        let mut i = 0;

        let finish_element = |elements: &mut Vec<String>, current: &mut String, explicit: &mut bool| -> Result<()> {
            if current.is_empty() && !*explicit {
                return Err(FeatureError::parse(format!("empty element in key '{}'", text)));
            }
            elements.push(std::mem::take(current));
            *explicit = false;
            Ok(())
        };

        while i < chars.len() {
            let c = chars[i];
            if c == ESCAPE {
                let Some(&next) = chars.get(i + 1) else {
                    return Err(FeatureError::parse(format!("dangling escape in key '{}'", text)));
                };
                if next == EMPTY_MARKER {
                    if !current.is_empty() || explicit_empty {
                        return Err(FeatureError::parse(format!("misplaced empty marker in key '{}'", text)));
                    }
                    explicit_empty = true;
                } else {
                    if explicit_empty {
                        return Err(FeatureError::parse(format!("misplaced empty marker in key '{}'", text)));
                    }
                    current.push(match next {
                        NEWLINE_MARKER => '\n',
                        RETURN_MARKER => '\r',
                        other => other,
                    });
                }
                i += 2;
                continue;
            }

            let rest: String = chars[i..].iter().take(3).collect();
            let at_section_end = match sections.len() {
                0 => rest.starts_with(FLOW_OPEN),
                1 => rest.starts_with(FLOW_CLOSE),
                _ => false,
            };

            if at_section_end {
                if !current.is_empty() || explicit_empty || !elements.is_empty() {
                    finish_element(&mut elements, &mut current, &mut explicit_empty)?;
                }
                sections.push(std::mem::take(&mut elements));
                i += if sections.len() == 1 { FLOW_OPEN.len() } else { FLOW_CLOSE.len() };
                continue;
            }

            match c {
                ELEMENT_SEPARATOR => finish_element(&mut elements, &mut current, &mut explicit_empty)?,
                '-' | '[' | ']' | '>' => {
                    return Err(FeatureError::parse(format!(
                        "unescaped '{}' in key '{}'",
                        c, text
                    )))
                }
                _ => {
                    if explicit_empty {
                        return Err(FeatureError::parse(format!("misplaced empty marker in key '{}'", text)));
                    }
                    current.push(c);
                }
            }
            i += 1;
        }

        if sections.len() != 2 {
            return Err(FeatureError::parse(format!(
                "key '{}' is not of the form <source>-[<flow>]-><sink>",
                text
            )));
        }
        if !current.is_empty() || explicit_empty || !elements.is_empty() {
            finish_element(&mut elements, &mut current, &mut explicit_empty)?;
        }
        let sink = elements;
        let flow = sections.pop().unwrap_or_default();
        let source = sections.pop().unwrap_or_default();

        Ok(Self { source, flow, sink })
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn push_sequence(out: &mut String, items: &[String]) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(ELEMENT_SEPARATOR);
        }
        if item.is_empty() {
            out.push(ESCAPE);
            out.push(EMPTY_MARKER);
            continue;
        }
        for c in item.chars() {
            match c {
                '\n' => {
                    out.push(ESCAPE);
                    out.push(NEWLINE_MARKER);
                }
                '\r' => {
                    out.push(ESCAPE);
                    out.push(RETURN_MARKER);
                }
                '\\' | ':' | '-' | '[' | ']' | '>' => {
                    out.push(ESCAPE);
                    out.push(c);
                }
                _ => out.push(c),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(source: &[&str], flow: &[&str], sink: &[&str]) -> CanonicalKey {
        canonicalize(&RawPathRecord::new(
            source.iter().copied(),
            flow.iter().copied(),
            sink.iter().copied(),
        ))
    }

    #[test]
    fn test_reference_rendering() {
        let k = key(
            &["IdentifierDeclStatement", "Identifier"],
            &["FLOWS_TO", "REACHES"],
            &["CallExpression"],
        );
        assert_eq!(
            k.render(),
            "IdentifierDeclStatement:Identifier-[FLOWS_TO:REACHES]->CallExpression"
        );
    }

    #[test]
    fn test_equal_records_equal_keys() {
        let a = key(&["A", "B"], &["FLOWS_TO"], &["C"]);
        let b = key(&["A", "B"], &["FLOWS_TO"], &["C"]);
        assert_eq!(a, b);
        assert_eq!(a.render(), b.render());
    }

    #[test]
    fn test_separator_like_labels_do_not_collide() {
        // Plain string joining would render all of these as "A:B-[FLOWS_TO]->C"
        let adversarial = [
            key(&["A", "B"], &["FLOWS_TO"], &["C"]),
            key(&["A:B"], &["FLOWS_TO"], &["C"]),
            key(&["A"], &["B-[FLOWS_TO"], &["C"]),
            key(&["A:B-[FLOWS_TO]->C"], &[], &[]),
            key(&["A", "B"], &["FLOWS_TO]->C"], &[]),
        ];
        for (i, a) in adversarial.iter().enumerate() {
            for (j, b) in adversarial.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b);
                    assert_ne!(a.render(), b.render(), "{} vs {}", i, j);
                }
            }
        }
    }

    #[test]
    fn test_empty_element_vs_empty_sequence() {
        let empty_seq = key(&[], &["FLOWS_TO"], &["C"]);
        let empty_elem = key(&[""], &["FLOWS_TO"], &["C"]);
        assert_ne!(empty_seq.render(), empty_elem.render());
        assert_eq!(empty_elem.render(), "\\0-[FLOWS_TO]->C");
    }

    #[test]
    fn test_parse_inverts_render() {
        let keys = [
            key(&["A", "B"], &["FLOWS_TO", "CONTROLS"], &["C"]),
            key(&["a\\b", "x>y"], &["R-1"], &["[]"]),
            key(&[""], &["FLOWS_TO"], &["", ""]),
            key(&[], &[], &[]),
        ];
        for k in keys {
            assert_eq!(CanonicalKey::parse(&k.render()).unwrap(), k);
        }
    }

    #[test]
    fn test_line_breaks_stay_on_one_line() {
        let k = key(&["S\nX", "Y\r"], &["FLOWS_TO"], &["\r\nT"]);
        let text = k.render();
        assert!(!text.contains('\n') && !text.contains('\r'));
        assert_eq!(text, "S\\nX:Y\\r-[FLOWS_TO]->\\r\\nT");
        assert_eq!(CanonicalKey::parse(&text).unwrap(), k);
        // a literal 'n' is never escaped, so it cannot alias a line break
        assert_ne!(key(&["n"], &["F"], &["T"]).render(), key(&["\n"], &["F"], &["T"]).render());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(CanonicalKey::parse("no markers").is_err());
        assert!(CanonicalKey::parse("A-[B]->C-[D]->E").is_err());
        assert!(CanonicalKey::parse("A::B-[F]->C").is_err());
        assert!(CanonicalKey::parse("A-[F]->C\\").is_err());
    }

    #[test]
    fn test_from_record_moves_fields() {
        let record = RawPathRecord::new(["S"], ["REACHES"], ["T"]);
        let k = CanonicalKey::from(record.clone());
        assert_eq!(k, canonicalize(&record));
        assert_eq!(k.flow(), &["REACHES".to_string()]);
    }
}
