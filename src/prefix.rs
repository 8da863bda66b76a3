// ABOUTME: Case-insensitive table prefix rewriting for dump and import text
// ABOUTME: Supports anchored (leading-only) and unanchored (every occurrence) modes

use anyhow::{Context, Result};
use regex::{bytes, NoExpand, Regex};
use std::borrow::Cow;

/// Where a prefix match is allowed to occur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteMode {
    /// Only a match at the very start of the text is replaced
    Anchored,
    /// Every occurrence anywhere in the text is replaced
    Unanchored,
}

#[derive(Debug, Clone)]
struct Patterns {
    anchored: Regex,
    unanchored: Regex,
    anchored_bytes: bytes::Regex,
    unanchored_bytes: bytes::Regex,
}

/// Rewrites an old table prefix into a new one
///
/// The old prefix is matched literally and without regard to ASCII case, so
/// `WP_`, `wp_` and `Wp_` all match an old prefix of `wp_`. Non-ASCII
/// characters only match themselves. The new prefix is
/// inserted verbatim. An empty old prefix turns the rewriter into a no-op.
///
/// # Examples
///
/// ```
/// # use seren_mysqldump::prefix::{PrefixRewriter, RewriteMode};
/// let rewriter = PrefixRewriter::new("wp_", "wp2_").unwrap();
/// assert_eq!(rewriter.rewrite("WP_posts", RewriteMode::Anchored), "wp2_posts");
/// assert_eq!(
///     rewriter.rewrite("REFERENCES `wp_users`", RewriteMode::Unanchored),
///     "REFERENCES `wp2_users`"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct PrefixRewriter {
    new_prefix: String,
    patterns: Option<Patterns>,
}

impl PrefixRewriter {
    pub fn new(old_prefix: &str, new_prefix: &str) -> Result<Self> {
        let patterns = if old_prefix.is_empty() {
            None
        } else {
            let literal = ascii_case_pattern(old_prefix);
            let anchored = format!("^{}", literal);
            Some(Patterns {
                anchored: build(&anchored)?,
                unanchored: build(&literal)?,
                anchored_bytes: build_bytes(&anchored)?,
                unanchored_bytes: build_bytes(&literal)?,
            })
        };

        Ok(Self {
            new_prefix: new_prefix.to_string(),
            patterns,
        })
    }

    /// A rewriter that never changes its input
    pub fn noop() -> Self {
        Self {
            new_prefix: String::new(),
            patterns: None,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.patterns.is_none()
    }

    pub fn rewrite<'t>(&self, text: &'t str, mode: RewriteMode) -> Cow<'t, str> {
        let Some(patterns) = &self.patterns else {
            return Cow::Borrowed(text);
        };
        let replacement = NoExpand(&self.new_prefix);
        match mode {
            RewriteMode::Anchored => patterns.anchored.replace(text, replacement),
            RewriteMode::Unanchored => patterns.unanchored.replace_all(text, replacement),
        }
    }

    /// Byte-level variant used for raw column values
    pub fn rewrite_bytes<'t>(&self, value: &'t [u8], mode: RewriteMode) -> Cow<'t, [u8]> {
        let Some(patterns) = &self.patterns else {
            return Cow::Borrowed(value);
        };
        let replacement = bytes::NoExpand(self.new_prefix.as_bytes());
        match mode {
            RewriteMode::Anchored => patterns.anchored_bytes.replace(value, replacement),
            RewriteMode::Unanchored => patterns.unanchored_bytes.replace_all(value, replacement),
        }
    }
}

/// Escaped pattern for `prefix` where only ASCII letters match either case
fn ascii_case_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() * 4);
    for c in prefix.chars() {
        if c.is_ascii_alphabetic() {
            pattern.push('[');
            pattern.push(c.to_ascii_lowercase());
            pattern.push(c.to_ascii_uppercase());
            pattern.push(']');
        } else {
            let mut buf = [0u8; 4];
            pattern.push_str(&regex::escape(c.encode_utf8(&mut buf)));
        }
    }
    pattern
}

fn build(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).with_context(|| format!("Failed to compile prefix pattern '{}'", pattern))
}

fn build_bytes(pattern: &str) -> Result<bytes::Regex> {
    bytes::Regex::new(pattern)
        .with_context(|| format!("Failed to compile prefix pattern '{}'", pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchored_is_case_insensitive() {
        let rewriter = PrefixRewriter::new("oldprefix_", "new_").unwrap();

        for name in ["OldPrefix_orders", "oldprefix_orders", "OLDPREFIX_orders"] {
            assert_eq!(
                rewriter.rewrite(name, RewriteMode::Anchored),
                "new_orders",
                "{} should be rewritten",
                name
            );
        }
    }

    #[test]
    fn test_anchored_ignores_inner_occurrences() {
        let rewriter = PrefixRewriter::new("wp_", "wp2_").unwrap();
        assert_eq!(
            rewriter.rewrite("my_wp_posts", RewriteMode::Anchored),
            "my_wp_posts"
        );
        assert_eq!(
            rewriter.rewrite("wp_wp_posts", RewriteMode::Anchored),
            "wp2_wp_posts"
        );
    }

    #[test]
    fn test_unanchored_replaces_every_occurrence() {
        let rewriter = PrefixRewriter::new("wp_", "wp2_").unwrap();
        let definition = "CREATE TABLE `wp_posts` (\n  CONSTRAINT `fk` FOREIGN KEY (`a`) REFERENCES `WP_users` (`id`)\n)";
        assert_eq!(
            rewriter.rewrite(definition, RewriteMode::Unanchored),
            "CREATE TABLE `wp2_posts` (\n  CONSTRAINT `fk` FOREIGN KEY (`a`) REFERENCES `wp2_users` (`id`)\n)"
        );
    }

    #[test]
    fn test_text_without_prefix_is_unchanged() {
        let rewriter = PrefixRewriter::new("wp_", "wp2_").unwrap();
        let text = "INSERT INTO `users` VALUES (1,'x');\n";

        let once = rewriter.rewrite(text, RewriteMode::Unanchored);
        assert!(matches!(once, Cow::Borrowed(_)));
        assert_eq!(rewriter.rewrite(&once, RewriteMode::Unanchored), text);
    }

    #[test]
    fn test_prefix_is_matched_literally() {
        let rewriter = PrefixRewriter::new("a.b", "c_").unwrap();
        assert_eq!(rewriter.rewrite("axb_t", RewriteMode::Anchored), "axb_t");
        assert_eq!(rewriter.rewrite("a.b_t", RewriteMode::Anchored), "c__t");
    }

    #[test]
    fn test_new_prefix_is_inserted_verbatim() {
        let rewriter = PrefixRewriter::new("wp_", "$1_").unwrap();
        assert_eq!(rewriter.rewrite("wp_posts", RewriteMode::Anchored), "$1_posts");
    }

    #[test]
    fn test_empty_old_prefix_is_noop() {
        let rewriter = PrefixRewriter::new("", "x_").unwrap();
        assert!(rewriter.is_noop());
        assert_eq!(rewriter.rewrite("posts", RewriteMode::Unanchored), "posts");
        assert_eq!(
            rewriter.rewrite_bytes(b"posts", RewriteMode::Anchored).as_ref(),
            b"posts"
        );
    }

    #[test]
    fn test_rewrite_bytes_handles_non_utf8() {
        let rewriter = PrefixRewriter::new("wp_", "wp2_").unwrap();
        let value = [b'w', b'p', b'_', 0xff, b'x'];
        assert_eq!(
            rewriter
                .rewrite_bytes(&value, RewriteMode::Unanchored)
                .as_ref(),
            &[b'w', b'p', b'2', b'_', 0xff, b'x']
        );
    }

    #[test]
    fn test_case_folding_is_ascii_only() {
        let rewriter = PrefixRewriter::new("sk_", "x_").unwrap();
        let lookalike = "\u{17F}\u{212A}_data";

        assert_eq!(rewriter.rewrite(lookalike, RewriteMode::Unanchored), lookalike);
        assert_eq!(rewriter.rewrite(lookalike, RewriteMode::Anchored), lookalike);
        assert_eq!(
            rewriter
                .rewrite_bytes(lookalike.as_bytes(), RewriteMode::Unanchored)
                .as_ref(),
            lookalike.as_bytes()
        );
        assert_eq!(rewriter.rewrite("SK_data", RewriteMode::Anchored), "x_data");
    }

    #[test]
    fn test_non_ascii_prefix_matches_itself_only() {
        let rewriter = PrefixRewriter::new("café_", "bar_").unwrap();
        assert_eq!(
            rewriter.rewrite("CAFé_menu", RewriteMode::Anchored),
            "bar_menu"
        );
        assert_eq!(
            rewriter.rewrite("CAFÉ_menu", RewriteMode::Anchored),
            "CAFÉ_menu"
        );
    }
}
