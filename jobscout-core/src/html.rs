//! Rich-text job descriptions to plain text.
//!
//! Boards embed descriptions as HTML, sometimes HTML-escaped a second time
//! (Greenhouse `content` arrives as `&lt;p&gt;...`). Each pass decodes one
//! layer of entities and drops one layer of tags, so passes repeat until the
//! text stops changing. That fixpoint is what makes [`strip_html`] idempotent.

use regex::Regex;
use scraper::Html;
use std::sync::OnceLock;

/// Decodes entities, removes tags, collapses whitespace and trims. Never panics.
pub fn strip_html(markup: &str) -> String {
    let mut current = collapse_whitespace(markup);
    // Each changing pass shortens the text, so a fixpoint comes within this bound.
    for _ in 0..=current.len() {
        let next = strip_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_once(markup: &str) -> String {
    let text = std::panic::catch_unwind(|| parse_text(markup))
        .ok()
        .or_else(|| regex_strip(markup))
        .unwrap_or_else(|| markup.to_string());
    collapse_whitespace(&text)
}

fn parse_text(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    let mut parts = Vec::new();

    for node in fragment.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| {
                parent
                    .value()
                    .as_element()
                    .map(|el| matches!(el.name(), "script" | "style" | "noscript"))
            })
            .unwrap_or(false);
        if !hidden {
            parts.push(&**text);
        }
    }

    parts.join(" ")
}

fn regex_strip(markup: &str) -> Option<String> {
    static TAG: OnceLock<Option<Regex>> = OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]+>").ok()).as_ref()?;
    Some(tag.replace_all(markup, " ").into_owned())
}
