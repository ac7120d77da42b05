use corpusql_lib_core::ExecutionError;
use smol_str::SmolStr;

use crate::context::TextResolver;

/// Anchors a snippet expansion to a specific matched span, per
/// ``sentence_id` and `doc_id` must be non-negative.
#[derive(Debug, Clone)]
pub struct ContextAnchor {
    pub doc_id: u32,
    pub sentence_id: i32,
    pub begin_char: u32,
    pub end_char: u32,
    pub variable_name: Option<SmolStr>,
}

/// One sentence in an expanded window.
#[derive(Debug, Clone, PartialEq)]
pub struct SnippetSentence {
    pub sentence_id: i32,
    pub text: String,
    pub is_match: bool,
}

/// Highlight affix pair, e.g. `("**", "**")`.
#[derive(Debug, Clone)]
pub struct HighlightStyle {
    pub prefix: String,
    pub suffix: String,
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self {
            prefix: "**".to_string(),
            suffix: "**".to_string(),
        }
    }
}

/// Expands a match into a window of surrounding sentences, per
/// `Takes a `TextResolver` by reference — callers
/// pass a `RawTextCache` to get LRU-cached raw-text fetches, or the
/// bare relational collaborator in tests.
pub struct SnippetExpander<'a> {
    text: &'a dyn TextResolver,
    style: HighlightStyle,
}

impl<'a> SnippetExpander<'a> {
    pub fn new(text: &'a dyn TextResolver, style: HighlightStyle) -> Self {
        Self { text, style }
    }

    /// `window` sentences on each side of the anchor, truncating at the
    /// document's boundaries when fewer are available.
    pub fn expand(
        &self,
        anchor: &ContextAnchor,
        window: u8,
    ) -> Result<Vec<SnippetSentence>, ExecutionError> {
        let full_text = self.text.fetch_text(anchor.doc_id)?;
        let max_sentence = self
            .text
            .max_sentence_id(anchor.doc_id)?
            .unwrap_or(anchor.sentence_id);

        let lo = (anchor.sentence_id - window as i32).max(0);
        let hi = (anchor.sentence_id + window as i32).min(max_sentence);

        let mut sentences = Vec::new();
        for sid in lo..=hi {
            let (begin, end) = self.text.fetch_sentence_bounds(anchor.doc_id, sid)?;
            let raw = full_text
                .get(begin as usize..end as usize)
                .ok_or_else(|| ExecutionError::ReadError {
                    key: format!("doc:{}:sentence:{sid}", anchor.doc_id),
                    reason: "sentence bounds out of range".to_string(),
                })?;

            let text = if sid == anchor.sentence_id {
                Highlighter::highlight(
                    raw,
                    anchor.begin_char.saturating_sub(begin),
                    anchor.end_char.saturating_sub(begin),
                    &self.style,
                )?
            } else {
                raw.to_string()
            };

            sentences.push(SnippetSentence {
                sentence_id: sid,
                text,
                is_match: sid == anchor.sentence_id,
            });
        }
        Ok(sentences)
    }
}

/// Inserts highlight affixes around `[begin, end)`.
pub struct Highlighter;

impl Highlighter {
    pub fn highlight(
        text: &str,
        begin: u32,
        end: u32,
        style: &HighlightStyle,
    ) -> Result<String, ExecutionError> {
        let (begin, end) = (begin as usize, end as usize);
        if begin > end || end > text.len() {
            return Err(ExecutionError::InternalError(format!(
                "highlight span {begin}..{end} out of range for text of length {}",
                text.len()
            )));
        }
        let mut out = String::with_capacity(text.len() + style.prefix.len() + style.suffix.len());
        out.push_str(&text[..begin]);
        out.push_str(&style.prefix);
        out.push_str(&text[begin..end]);
        out.push_str(&style.suffix);
        out.push_str(&text[end..]);
        Ok(out)
    }
}

/// Joins a window's sentences as `prev|match|next`. `separator` is
/// optional (pass `""` to just concatenate).
pub fn assemble(sentences: &[SnippetSentence], separator: &str) -> String {
    sentences
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DocMetadata;
    use std::sync::Arc;

    const DOC: &str = "First sentence. Second sentence with a match. Third sentence.";

    struct FixedDoc;
    impl TextResolver for FixedDoc {
        fn fetch_text(&self, _: u32) -> Result<Arc<str>, ExecutionError> {
            Ok(Arc::from(DOC))
        }
        fn fetch_sentence_bounds(&self, _: u32, sentence_id: i32) -> Result<(u32, u32), ExecutionError> {
            Ok(match sentence_id {
                0 => (0, 15),
                1 => (16, 45),
                2 => (46, 61),
                _ => (0, 0),
            })
        }
        fn fetch_metadata(&self, _: u32) -> Result<DocMetadata, ExecutionError> {
            Ok(DocMetadata {
                title: String::new(),
                timestamp: String::new(),
            })
        }
        fn max_sentence_id(&self, _: u32) -> Result<Option<i32>, ExecutionError> {
            Ok(Some(2))
        }
    }

    #[test]
    fn window_one_includes_all_three_sentences() {
        let doc = FixedDoc;
        let expander = SnippetExpander::new(&doc, HighlightStyle::default());
        let anchor = ContextAnchor {
            doc_id: 1,
            sentence_id: 1,
            begin_char: 39,
            end_char: 44,
            variable_name: None,
        };
        let sentences = expander.expand(&anchor, 1).unwrap();
        assert_eq!(sentences.len(), 3);
        let joined = assemble(&sentences, " ");
        assert!(joined.contains("**match**"));
    }

    #[test]
    fn highlight_roundtrips_the_span() {
        let highlighted = Highlighter::highlight("the match here", 4, 9, &HighlightStyle::default()).unwrap();
        assert_eq!(highlighted, "the **match** here");
    }

    #[test]
    fn highlight_rejects_out_of_range_span() {
        assert!(Highlighter::highlight("short", 0, 100, &HighlightStyle::default()).is_err());
    }
}
