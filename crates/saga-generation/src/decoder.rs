//! Result decoder
//!
//! Turns raw completion text into a typed record. Backends routinely wrap
//! JSON in prose or markdown fences, so decoding walks a fixed ladder:
//! 1. the whole text
//! 2. the first fenced block tagged `json`
//! 3. every fenced block, in order
//! 4. the span from the first `{` to the last `}`
//!
//! This is a recovery layer, not a parser. Malformed input only ever yields a
//! [`DecodeError`].

use crate::error::DecodeError;
use pulldown_cmark::{CodeBlockKind, Event, Parser as MdParser, Tag, TagEnd};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A typed response shape expected from one generation call
///
/// `validate` runs after structural decoding and turns semantically missing
/// fields into a decode failure instead of a later surprise.
pub trait ResponseSchema: DeserializeOwned + JsonSchema {
    /// Check required semantic fields
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

impl ResponseSchema for serde_json::Value {}

/// Which rung of the ladder produced the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeStrategy {
    /// Whole text decoded as-is
    Direct,
    /// Fenced block tagged `json`
    TaggedFence,
    /// Any fenced block
    AnyFence,
    /// First `{` through last `}`
    BraceSpan,
}

/// Decoded record plus the strategy that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    /// The record
    pub value: T,
    /// Strategy that succeeded
    pub strategy: DecodeStrategy,
}

/// Fenced block found in a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fence {
    /// First word of the info string, if any
    pub language: Option<String>,
    /// Interior text
    pub body: String,
}

/// Stateless decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultDecoder;

impl ResultDecoder {
    /// Create new decoder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Decode `raw` into `T`, trying each strategy in order
    ///
    /// # Errors
    /// Returns the last underlying failure, with a preview of `raw`, when no
    /// strategy yields a valid `T`.
    pub fn decode<T: ResponseSchema>(&self, raw: &str) -> Result<Decoded<T>, DecodeError> {
        let mut last_reason = String::from("empty response");

        for (strategy, candidate) in Self::candidates(raw) {
            match serde_json::from_str::<T>(candidate) {
                Ok(value) => match value.validate() {
                    Ok(()) => {
                        tracing::trace!("decoded response via {:?}", strategy);
                        return Ok(Decoded { value, strategy });
                    }
                    Err(reason) => last_reason = format!("invalid record: {reason}"),
                },
                Err(e) => last_reason = e.to_string(),
            }
        }

        Err(DecodeError::new(last_reason, raw))
    }

    /// Decode a prose response: trimmed, unfenced, non-empty
    ///
    /// # Errors
    /// Returns a [`DecodeError`] when nothing but whitespace remains.
    pub fn decode_text(&self, raw: &str) -> Result<String, DecodeError> {
        let fences = extract_fences(raw);
        let text = match fences.as_slice() {
            [only] if raw.trim_start().starts_with("```") => only.body.trim(),
            _ => raw.trim(),
        };
        let text = text.trim_matches('"').trim();

        if text.is_empty() {
            Err(DecodeError::new("empty text", raw))
        } else {
            Ok(text.to_string())
        }
    }

    fn candidates(raw: &str) -> Vec<(DecodeStrategy, &str)> {
        let mut out = vec![(DecodeStrategy::Direct, raw)];
        let fences = fence_spans(raw);

        if let Some((_, body)) = fences
            .iter()
            .find(|(lang, _)| lang.is_some_and(|l| l.eq_ignore_ascii_case("json")))
        {
            out.push((DecodeStrategy::TaggedFence, body));
        }
        for (_, body) in &fences {
            out.push((DecodeStrategy::AnyFence, body));
        }
        if let Some(span) = brace_span(raw) {
            out.push((DecodeStrategy::BraceSpan, span));
        }
        out
    }
}

/// Fenced code blocks in `raw`, in document order
#[must_use]
pub fn extract_fences(raw: &str) -> Vec<Fence> {
    fence_spans(raw)
        .into_iter()
        .map(|(language, body)| Fence {
            language: language.map(str::to_string),
            body: body.to_string(),
        })
        .collect()
}

/// Fenced block interiors as slices of `raw`
fn fence_spans(raw: &str) -> Vec<(Option<&str>, &str)> {
    let mut spans = Vec::new();
    let mut open: Option<(Option<&str>, Option<usize>)> = None;

    for (event, range) in MdParser::new(raw).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(_))) => {
                let line_end = raw[range.start..]
                    .find('\n')
                    .map_or(range.end, |i| range.start + i);
                let info = raw[range.start..line_end]
                    .trim_start()
                    .trim_start_matches(['`', '~'])
                    .split_whitespace()
                    .next();
                open = Some((info, None));
            }
            Event::Text(_) => {
                if let Some((_, body_start @ None)) = open.as_mut() {
                    *body_start = Some(range.start);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((info, body_start)) = open.take() {
                    let body = match body_start {
                        Some(start) => raw[start..range.end]
                            .trim_end()
                            .trim_end_matches(['`', '~'])
                            .trim_end(),
                        None => "",
                    };
                    spans.push((info, body));
                }
            }
            _ => {}
        }
    }
    spans
}

/// Slice from the first `{` to the last `}` inclusive
fn brace_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Named {
        name: String,
    }

    impl ResponseSchema for Named {
        fn validate(&self) -> Result<(), String> {
            if self.name.trim().is_empty() {
                Err("name is empty".into())
            } else {
                Ok(())
            }
        }
    }

    fn decode(raw: &str) -> Result<Decoded<Value>, DecodeError> {
        ResultDecoder::new().decode::<Value>(raw)
    }

    #[test]
    fn direct_json() {
        let d = decode(r#"{"a": 1}"#).unwrap();
        assert_eq!(d.value, json!({"a": 1}));
        assert_eq!(d.strategy, DecodeStrategy::Direct);
    }

    #[test]
    fn tagged_fence() {
        let raw = "Sure, here it is:\n\n```json\n{\"a\": [1, 2]}\n```\nAnything else?";
        let d = decode(raw).unwrap();
        assert_eq!(d.value, json!({"a": [1, 2]}));
        assert_eq!(d.strategy, DecodeStrategy::TaggedFence);
    }

    #[test]
    fn untagged_fence() {
        let raw = "Result:\n```\n{\"ok\": true}\n```";
        let d = decode(raw).unwrap();
        assert_eq!(d.value, json!({"ok": true}));
        assert_eq!(d.strategy, DecodeStrategy::AnyFence);
    }

    #[test]
    fn brace_span_in_prose() {
        let d = decode("here is json: {\"a\":1} thanks").unwrap();
        assert_eq!(d.value, json!({"a": 1}));
        assert_eq!(d.strategy, DecodeStrategy::BraceSpan);
    }

    #[test]
    fn garbage_is_a_typed_error() {
        let err = decode("no structure here at all").unwrap_err();
        assert_eq!(err.preview, "no structure here at all");

        let err = decode("} reversed {").unwrap_err();
        assert!(!err.reason.is_empty());

        assert!(decode("").is_err());
    }

    #[test]
    fn validation_failure_is_a_decode_error() {
        let err = ResultDecoder::new()
            .decode::<Named>(r#"{"name": "  "}"#)
            .unwrap_err();
        assert!(err.reason.contains("name is empty"));

        let ok = ResultDecoder::new()
            .decode::<Named>(r#"{"name": "Mira"}"#)
            .unwrap();
        assert_eq!(ok.value.name, "Mira");
    }

    #[test]
    fn missing_required_field_is_a_decode_error() {
        let err = ResultDecoder::new().decode::<Named>(r#"{"title": "x"}"#).unwrap_err();
        assert!(err.reason.contains("name"));
    }

    #[test]
    fn fences_are_listed_in_order() {
        let raw = "```yaml\na: 1\n```\ntext\n```json\n{}\n```";
        let fences = extract_fences(raw);
        assert_eq!(fences.len(), 2);
        assert_eq!(fences[0].language.as_deref(), Some("yaml"));
        assert_eq!(fences[1].body, "{}");
    }

    #[test]
    fn decode_text_trims_and_unfences() {
        let decoder = ResultDecoder::new();
        assert_eq!(decoder.decode_text("  a quiet dawn \n").unwrap(), "a quiet dawn");
        assert_eq!(decoder.decode_text("```\nthe storm\n```").unwrap(), "the storm");
        assert!(decoder.decode_text("   ").is_err());
    }

    proptest! {
        #[test]
        fn fence_wrapping_is_idempotent(
            key in "[a-z]{1,8}",
            n in any::<i64>(),
            s in "[a-zA-Z0-9 ]{0,24}",
        ) {
            let text = json!({ key.clone(): n, "s": s }).to_string();
            let plain = decode(&text).unwrap().value;
            let fenced = decode(&format!("```json\n{text}\n```")).unwrap().value;
            prop_assert_eq!(plain, fenced);
        }

        #[test]
        fn never_panics(raw in ".{0,200}") {
            let _ = decode(&raw);
            let _ = ResultDecoder::new().decode_text(&raw);
        }
    }
}
