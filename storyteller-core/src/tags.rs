//! Directive tag extraction.
//!
//! Generated narrative text arrives with embedded directives of the
//! form `[tag-name]content[/tag-name]`. The extractor walks the text
//! once, pulling each well-formed directive out in source order and
//! leaving everything else alone: unknown tags, unclosed tags, and
//! plain prose stay in the narrative verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of directive tags the engine recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagKind {
    UpdateStatus,
    AddItem,
    CreateNpc,
    UpdateLore,
    ImgPrompt,
    CharImgPrompt,
}

impl TagKind {
    pub const ALL: [TagKind; 6] = [
        TagKind::UpdateStatus,
        TagKind::AddItem,
        TagKind::CreateNpc,
        TagKind::UpdateLore,
        TagKind::ImgPrompt,
        TagKind::CharImgPrompt,
    ];

    /// The literal tag name as it appears in generated text.
    pub fn as_str(&self) -> &'static str {
        match self {
            TagKind::UpdateStatus => "update-status",
            TagKind::AddItem => "add-item",
            TagKind::CreateNpc => "create-npc",
            TagKind::UpdateLore => "update-lore",
            TagKind::ImgPrompt => "img-prompt",
            TagKind::CharImgPrompt => "char-img-prompt",
        }
    }

    /// Parse a tag name. Unknown names are not directives.
    pub fn parse(name: &str) -> Option<TagKind> {
        TagKind::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Whether this directive requires a secondary generation call.
    pub fn is_async(&self) -> bool {
        matches!(self, TagKind::ImgPrompt | TagKind::CharImgPrompt)
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directive pulled out of generated text.
///
/// Ephemeral: produced by extraction, consumed immediately by
/// application, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub kind: TagKind,
    pub content: String,
}

/// Result of scanning one raw generation blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Directives in the order they appeared in the source text.
    pub directives: Vec<Directive>,

    /// The text with every matched tag span removed and the ends
    /// trimmed.
    pub narrative: String,
}

/// Scan raw text for directive tags.
///
/// Matching is non-greedy: a directive's content runs to the first
/// close marker for the same tag name, so tags may hold multi-line
/// content but never swallow a sibling's close marker. Each physical
/// tag occurrence maps to exactly one [`Directive`]; the scanner never
/// revisits a consumed span.
pub fn extract_directives(raw: &str) -> Extraction {
    let mut directives = Vec::new();
    let mut narrative = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(open) = rest.find('[') {
        let (before, at_bracket) = rest.split_at(open);
        narrative.push_str(before);

        match scan_tag(at_bracket) {
            Some((kind, content, consumed)) => {
                directives.push(Directive {
                    kind,
                    content: content.to_string(),
                });
                rest = &at_bracket[consumed..];
            }
            None => {
                // Not a directive here: keep the bracket and move on.
                narrative.push('[');
                rest = &at_bracket[1..];
            }
        }
    }
    narrative.push_str(rest);

    Extraction {
        directives,
        narrative: narrative.trim().to_string(),
    }
}

/// Try to match a full `[name]content[/name]` span at the start of
/// `text` (which begins with `[`). Returns the tag kind, its content,
/// and the number of bytes consumed.
fn scan_tag(text: &str) -> Option<(TagKind, &str, usize)> {
    // Byte index of the ']' closing the tag name.
    let name_end = text[1..].find(']')? + 1;
    let kind = TagKind::parse(&text[1..name_end])?;

    let content_start = name_end + 1;
    let close_marker = format!("[/{}]", kind.as_str());
    let close = text[content_start..].find(&close_marker)?;

    let content = &text[content_start..content_start + close];
    Some((kind, content, content_start + close + close_marker.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_tag() {
        let extraction =
            extract_directives("You find a shard. [update-status]Alert[/update-status]");

        assert_eq!(extraction.narrative, "You find a shard.");
        assert_eq!(
            extraction.directives,
            vec![Directive {
                kind: TagKind::UpdateStatus,
                content: "Alert".to_string(),
            }]
        );
    }

    #[test]
    fn test_extraction_preserves_order() {
        let raw = "[add-item]Sword|A blade[/add-item] text \
                   [update-lore]Economy|Corp-controlled[/update-lore] more \
                   [img-prompt]A glowing shard.[/img-prompt]";
        let extraction = extract_directives(raw);

        let kinds: Vec<_> = extraction.directives.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![TagKind::AddItem, TagKind::UpdateLore, TagKind::ImgPrompt]
        );
        assert_eq!(extraction.narrative, "text  more");
    }

    #[test]
    fn test_no_recognized_markers_remain() {
        let raw = "A [update-status]x[/update-status] B \
                   [char-img-prompt]portrait[/char-img-prompt] C";
        let extraction = extract_directives(raw);

        for kind in TagKind::ALL {
            assert!(!extraction.narrative.contains(&format!("[{kind}]")));
            assert!(!extraction.narrative.contains(&format!("[/{kind}]")));
        }
        assert_eq!(extraction.directives.len(), 2);
    }

    #[test]
    fn test_multiline_content() {
        let raw = "[create-npc]{\n  \"id\": \"npc1\",\n  \"name\": \"Finn\"\n}[/create-npc]";
        let extraction = extract_directives(raw);

        assert_eq!(extraction.directives.len(), 1);
        assert!(extraction.directives[0].content.contains("\"id\": \"npc1\""));
        assert!(extraction.narrative.is_empty());
    }

    #[test]
    fn test_unknown_tag_left_untouched() {
        let raw = "Strange [mystery-tag]what[/mystery-tag] markup.";
        let extraction = extract_directives(raw);

        assert!(extraction.directives.is_empty());
        assert_eq!(extraction.narrative, raw);
    }

    #[test]
    fn test_unclosed_tag_left_untouched() {
        let raw = "The story trails off [img-prompt]a half-described scene";
        let extraction = extract_directives(raw);

        assert!(extraction.directives.is_empty());
        assert_eq!(extraction.narrative, raw);
    }

    #[test]
    fn test_mismatched_close_left_untouched() {
        let raw = "[update-status]Alert[/add-item]";
        let extraction = extract_directives(raw);

        assert!(extraction.directives.is_empty());
        assert_eq!(extraction.narrative, raw);
    }

    #[test]
    fn test_adjacent_tags() {
        let raw = "[update-status]Alert[/update-status][img-prompt]A shard.[/img-prompt]";
        let extraction = extract_directives(raw);

        assert_eq!(extraction.directives.len(), 2);
        assert!(extraction.narrative.is_empty());
    }

    #[test]
    fn test_duplicate_tags_each_extracted_once() {
        let raw = "[img-prompt]first[/img-prompt][img-prompt]second[/img-prompt]";
        let extraction = extract_directives(raw);

        assert_eq!(extraction.directives.len(), 2);
        assert_eq!(extraction.directives[0].content, "first");
        assert_eq!(extraction.directives[1].content, "second");
    }

    #[test]
    fn test_nongreedy_close() {
        // Content stops at the FIRST matching close marker.
        let raw = "[update-status]a[/update-status] b [update-status]c[/update-status]";
        let extraction = extract_directives(raw);

        assert_eq!(extraction.directives[0].content, "a");
        assert_eq!(extraction.directives[1].content, "c");
        assert_eq!(extraction.narrative, "b");
    }

    #[test]
    fn test_stray_brackets_kept() {
        let raw = "An array[3] and [not closed and [update-status]Tense[/update-status]";
        let extraction = extract_directives(raw);

        assert_eq!(extraction.directives.len(), 1);
        assert_eq!(extraction.narrative, "An array[3] and [not closed and");
    }

    #[test]
    fn test_tag_name_roundtrip() {
        for kind in TagKind::ALL {
            assert_eq!(TagKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(TagKind::parse("not-a-tag"), None);
    }

    #[test]
    fn test_async_kinds() {
        assert!(TagKind::ImgPrompt.is_async());
        assert!(TagKind::CharImgPrompt.is_async());
        assert!(!TagKind::UpdateStatus.is_async());
        assert!(!TagKind::CreateNpc.is_async());
    }
}
