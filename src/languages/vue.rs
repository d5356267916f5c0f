//! Vue single-file components.
//!
//! Only `<script>` blocks are analysed. Everything else is blanked to spaces
//! before parsing so tree positions line up with the editor's document.

use crate::languages::{compile_query, LanguageSupport, IMPORT_QUERY_SOURCE};
use std::borrow::Cow;
use std::ops::Range;
use std::sync::OnceLock;
use tree_sitter::{Language, Query};

pub struct Vue;

static IMPORT_QUERY: OnceLock<Query> = OnceLock::new();

impl LanguageSupport for Vue {
    fn id(&self) -> &'static str {
        "vue"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["vue"]
    }

    fn language_ids(&self) -> &'static [&'static str] {
        &["vue"]
    }

    // TypeScript also accepts plain JavaScript script blocks.
    fn grammar(&self) -> Language {
        tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
    }

    fn import_query(&self) -> &Query {
        IMPORT_QUERY.get_or_init(|| {
            compile_query(&self.grammar(), IMPORT_QUERY_SOURCE, self.id(), "imports")
        })
    }

    fn script_source<'a>(&self, content: &'a str) -> Cow<'a, str> {
        Cow::Owned(mask_outside_scripts(content))
    }
}

/// Byte ranges of the bodies of all `<script …>` blocks.
fn script_blocks(content: &str) -> Vec<Range<usize>> {
    let mut blocks = Vec::new();
    let mut from = 0;
    while let Some(open) = content[from..].find("<script") {
        let open = from + open;
        let Some(tag_len) = content[open..].find('>') else {
            break;
        };
        let start = open + tag_len + 1;
        let end = content[start..]
            .find("</script>")
            .map_or(content.len(), |i| start + i);
        blocks.push(start..end);
        from = end;
    }
    blocks
}

/// `content` with every byte outside script blocks replaced by a space.
/// Line breaks are kept.
pub fn mask_outside_scripts(content: &str) -> String {
    let blocks = script_blocks(content);
    let mut masked = String::with_capacity(content.len());
    for (i, c) in content.char_indices() {
        if matches!(c, '\n' | '\r') || blocks.iter().any(|b| b.contains(&i)) {
            masked.push(c);
        } else {
            masked.extend(std::iter::repeat(' ').take(c.len_utf8()));
        }
    }
    masked
}

#[cfg(test)]
mod tests {
    use super::*;

    const SFC: &str = "<template>\n  <my-button />\n</template>\n<script setup lang=\"ts\">\nimport MyButton from '@/components/MyButton.vue';\n</script>\n";

    #[test]
    fn test_vue_ids() {
        assert_eq!(Vue.id(), "vue");
        assert_eq!(Vue.extensions(), &["vue"]);
        assert!(Vue.import_query().capture_index_for_name("source").is_some());
    }

    #[test]
    fn test_mask_keeps_offsets_and_script() {
        let masked = mask_outside_scripts(SFC);
        assert_eq!(masked.len(), SFC.len());
        assert_eq!(masked.lines().count(), SFC.lines().count());
        assert!(!masked.contains("template"));
        assert!(masked.contains("import MyButton from '@/components/MyButton.vue';"));
        assert_eq!(
            masked.find("import"),
            SFC.find("import"),
        );
    }

    #[test]
    fn test_mask_handles_multibyte_template_text() {
        let content = "<p>héllo</p><script>const a = 1;</script>";
        let masked = mask_outside_scripts(content);
        assert_eq!(masked.len(), content.len());
        assert!(masked.contains("const a = 1;"));
    }

    #[test]
    fn test_several_script_blocks() {
        let content = "<script>export const a = 1;</script>\n<div/>\n<script setup>const b = 2;</script>";
        let blocks = script_blocks(content);
        assert_eq!(blocks.len(), 2);
        assert_eq!(&content[blocks[0].clone()], "export const a = 1;");
        assert_eq!(&content[blocks[1].clone()], "const b = 2;");
    }

    #[test]
    fn test_no_script_masks_everything() {
        let masked = mask_outside_scripts("<template><a/></template>");
        assert!(masked.trim().is_empty());
    }
}
