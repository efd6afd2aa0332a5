//! HTML to plain-text conversion for message bodies that have no text/plain
//! alternative.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static SCRIPT_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|head)\b[^>]*>.*?</(script|style|head)\s*>")
        .expect("SCRIPT_STYLE should compile - this is a bug")
});
static COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("COMMENT should compile - this is a bug"));
static LINE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("LINE_BREAK should compile - this is a bug"));
static BLOCK_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)</(p|div|h[1-6]|tr|table|ul|ol|blockquote|section|article|header|footer|pre)\s*>",
    )
    .expect("BLOCK_END should compile - this is a bug")
});
static LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<li\b[^>]*>").expect("LIST_ITEM should compile - this is a bug"));
static TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("TAG should compile - this is a bug"));
static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);")
        .expect("ENTITY should compile - this is a bug")
});
static INLINE_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\u{a0}]+").expect("INLINE_SPACE should compile - this is a bug"));
static BLANK_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("BLANK_RUN should compile - this is a bug"));

/// Render an HTML document as readable plain text.
///
/// Scripts, styles and comments are dropped, block boundaries become line
/// breaks and entities are decoded once (so `&amp;lt;` stays `&lt;`).
pub fn html_to_plain_text(html: &str) -> String {
    let text = SCRIPT_STYLE.replace_all(html, "");
    let text = COMMENT.replace_all(&text, "");
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = LIST_ITEM.replace_all(&text, "\n- ");
    let text = BLOCK_END.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, "");
    let text = decode_entities(&text);

    let lines: Vec<String> = text
        .replace("\r\n", "\n")
        .split('\n')
        .map(|line| INLINE_SPACE.replace_all(line, " ").trim().to_string())
        .collect();

    BLANK_RUN.replace_all(&lines.join("\n"), "\n\n").trim().to_string()
}

/// Decode named and numeric character references in a single pass.
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures<'_>| {
            let raw = &caps[1];
            let decoded = if let Some(hex) = raw.strip_prefix("#x").or_else(|| raw.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = raw.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(raw)
            };
            decoded.map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "nbsp" => ' ',
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "ndash" => '-',
        "mdash" => '-',
        "hellip" => '…',
        "copy" => '©',
        "reg" => '®',
        "rsquo" | "lsquo" => '\'',
        "rdquo" | "ldquo" => '"',
        _ => return None,
    };
    Some(c)
}
