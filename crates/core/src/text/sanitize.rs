//! Markup stripping for streamed answer text.

use regex::Regex;
use std::sync::OnceLock;

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

fn rule(pattern: &str, replacement: &'static str) -> Rule {
    Rule {
        pattern: Regex::new(pattern).expect("valid sanitize regex"),
        replacement,
    }
}

/// Rules in application order. Block-level markers go first so a leading
/// `* ` bullet is not mistaken for emphasis.
fn rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            // embedded tags
            rule(r"<[^<>]+>", ""),
            // fence lines, language tag included
            rule(r"(?m)^[ \t]*(?:```|~~~)[^\n`]*$\n?", ""),
            rule(r"`([^`\n]*)`", "$1"),
            // images keep their alt text; targets may hold one level of
            // parentheses so trailing closers go with the link
            rule(r"!?\[([^\]\n]*)\]\([^)\s]*\)+", "$1"),
            rule(r"(?m)^[ \t]*#{1,6}[ \t]+", ""),
            rule(r"(?m)^[ \t]*(?:>[ \t]?)+", ""),
            rule(r"(?m)^[ \t]*[-*+][ \t]+", ""),
            rule(r"(?m)^[ \t]*\d+[.)][ \t]+", ""),
            rule(r"\*\*([^*\n]+)\*\*", "$1"),
            rule(r"\b__([^_\n]+)__\b", "$1"),
            rule(r"\*([^*\n]+)\*", "$1"),
            rule(r"\b_([^_\n]+)_\b", "$1"),
            rule(r"\n(?:[ \t]*\n){2,}", "\n\n"),
        ]
    })
}

/// Upper bound on rule-table passes; each pass peels one level of nesting.
const MAX_PASSES: usize = 8;

/// Strip lightweight markup from answer text.
///
/// Applied to the whole accumulated answer on every update, never to a
/// single fragment, so markup split across chunks is removed once it is
/// complete. The rule table is re-run until the text stops changing, so
/// nested markup like `**bold *it***` or `1. - item` comes out clean.
pub fn sanitize(raw: &str) -> String {
    let mut text = raw.trim().to_string();
    for _ in 0..MAX_PASSES {
        let next = apply_rules(&text);
        if next == text {
            break;
        }
        text = next;
    }
    text
}

fn apply_rules(input: &str) -> String {
    let mut text = input.to_string();
    for rule in rules() {
        if let std::borrow::Cow::Owned(replaced) =
            rule.pattern.replace_all(&text, rule.replacement)
        {
            text = replaced;
        }
    }
    text.trim().to_string()
}
