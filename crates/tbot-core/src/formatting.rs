//! Helpers for Telegram's HTML parse mode.
//!
//! Telegram HTML supports only a small subset: `<b>`, `<i>`, `<code>`, `<pre>`, `<a href="...">`.

/// Escape text so it can be embedded in an HTML-mode message.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn bold(text: &str) -> String {
    format!("<b>{}</b>", escape_html(text))
}

pub fn italic(text: &str) -> String {
    format!("<i>{}</i>", escape_html(text))
}

pub fn code(text: &str) -> String {
    format!("<code>{}</code>", escape_html(text))
}

pub fn pre(text: &str) -> String {
    format!("<pre>{}</pre>", escape_html(text))
}

pub fn link(url: &str, text: &str) -> String {
    format!("<a href=\"{}\">{}</a>", escape_html(url), escape_html(text))
}

/// Inline mention of a user by id (works without a username).
pub fn mention(user_id: i64, name: &str) -> String {
    link(&format!("tg://user?id={user_id}"), name)
}
