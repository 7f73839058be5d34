use lazy_static::lazy_static;
use regex::{Captures, Regex};
use crate::models::chat_message::{ChatMessage, Role};

// Anchors are parked behind NUL-delimited tokens so later link rules cannot wrap them again.
const PLACEHOLDER: char = '\u{0}';

const LOADING_HTML: &str =
    r#"<span class="loading"></span> <span class="loading"></span> <span class="loading"></span>"#;

lazy_static! {
    // URLs are matched in escaped text: `&amp;` continues one, any other entity ends it.
    static ref MARKDOWN_LINK: Regex =
        Regex::new(r"\[([^\]\n]+)\]\((https?://(?:[^\s\x00&)]|&amp;)+)\)").unwrap();
    static ref LABEL_LINK: Regex =
        Regex::new(r"(?m)^((?:- |#{1,3} )?)([^\n\x00]+?) - (https?://(?:[^\s\x00&]|&amp;)+)").unwrap();
    static ref BARE_URL: Regex = Regex::new(r"https?://(?:[^\s\x00&]|&amp;)+").unwrap();
    static ref PLACEHOLDER_TOKEN: Regex = Regex::new(r"\x00(\d+)\x00").unwrap();
    static ref HEADING_3: Regex = Regex::new(r"(?m)^### (.*)$").unwrap();
    static ref HEADING_2: Regex = Regex::new(r"(?m)^## (.*)$").unwrap();
    static ref HEADING_1: Regex = Regex::new(r"(?m)^# (.*)$").unwrap();
    static ref LIST_ITEM: Regex = Regex::new(r"(?m)^- (.*)$").unwrap();
    static ref BOLD: Regex = Regex::new(r"\*\*(.+?)\*\*").unwrap();
    static ref ITALIC: Regex = Regex::new(r"\*(.+?)\*").unwrap();
    static ref CODE: Regex = Regex::new(r"`([^`\n]+)`").unwrap();
    static ref BREAKS_BETWEEN_ITEMS: Regex = Regex::new(r"</li>(?:<br>)+<li>").unwrap();
    static ref BREAKS_AFTER_FINAL_ITEM: Regex = Regex::new(r"</li>(?:<br>)+$").unwrap();
    static ref LIST_RUN: Regex = Regex::new(r"(?:<li>.*?</li>)+").unwrap();
}

/// Turns the small markdown-like subset the assistant emits into transcript markup.
///
/// Text is escaped before any substitution, so backend output can never inject tags.
/// Link rules apply in a fixed precedence: `[label](url)`, then `Label - URL` lines
/// (when enabled), then bare URLs.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    label_links: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Renderer { label_links: true }
    }
}

impl Renderer {
    pub fn new(label_links: bool) -> Self {
        Renderer { label_links }
    }

    pub fn render(&self, text: &str, role: Role) -> ChatMessage {
        ChatMessage::new(role, text, self.to_html(text))
    }

    /// Placeholder shown while a reply is outstanding; removed by its id.
    pub fn loading_placeholder(&self) -> ChatMessage {
        ChatMessage::new(Role::Assistant, "", LOADING_HTML)
    }

    pub fn to_html(&self, text: &str) -> String {
        let normalized = text.replace("\r\n", "\n").replace(PLACEHOLDER, "");
        let mut anchors: Vec<String> = Vec::new();

        let escaped = escape_html(&normalized);

        let linked = MARKDOWN_LINK
            .replace_all(&escaped, |caps: &Captures| {
                park(&mut anchors, anchor(&caps[2], &format_inline(&caps[1])))
            })
            .into_owned();

        let linked = if self.label_links {
            LABEL_LINK
                .replace_all(&linked, |caps: &Captures| {
                    let label = format_inline(caps[2].trim());
                    let (url, trailing) = split_trailing_punctuation(&caps[3]);
                    format!("{}{}{}", &caps[1], park(&mut anchors, anchor(url, &label)), trailing)
                })
                .into_owned()
        } else {
            linked
        };

        let linked = BARE_URL
            .replace_all(&linked, |caps: &Captures| {
                let (url, trailing) = split_trailing_punctuation(&caps[0]);
                format!("{}{}", park(&mut anchors, anchor(url, url)), trailing)
            })
            .into_owned();

        let html = HEADING_3.replace_all(&linked, "<h3>${1}</h3>");
        let html = HEADING_2.replace_all(&html, "<h2>${1}</h2>");
        let html = HEADING_1.replace_all(&html, "<h1>${1}</h1>");
        let html = LIST_ITEM.replace_all(&html, "<li>${1}</li>");
        let html = format_inline(&html);
        let html = html.replace('\n', "<br>");

        let html = BREAKS_BETWEEN_ITEMS.replace_all(&html, "</li><li>");
        let html = BREAKS_AFTER_FINAL_ITEM.replace_all(&html, "</li>");
        let html = LIST_RUN.replace_all(&html, "<ul>${0}</ul>");

        PLACEHOLDER_TOKEN
            .replace_all(&html, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| anchors.get(index))
                    .cloned()
                    .unwrap_or_default()
            })
            .into_owned()
    }
}

/// Emphasis and inline code.
fn format_inline(text: &str) -> String {
    let text = BOLD.replace_all(text, "<strong>${1}</strong>");
    let text = ITALIC.replace_all(&text, "<em>${1}</em>");
    CODE.replace_all(&text, "<code>${1}</code>").into_owned()
}

/// Sentence punctuation after a URL belongs to the text, not the link.
fn split_trailing_punctuation(matched: &str) -> (&str, &str) {
    let url = matched.trim_end_matches(|c: char| matches!(c, '.' | ',' | ':' | '!' | '?' | ')'));
    matched.split_at(url.len())
}

fn anchor(href: &str, label: &str) -> String {
    format!(
        r#"<a href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
        href, label
    )
}

fn park(anchors: &mut Vec<String>, html: String) -> String {
    anchors.push(html);
    format!("{}{}{}", PLACEHOLDER, anchors.len() - 1, PLACEHOLDER)
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
