//! Slack's control-character escaping.
//!
//! Slack message text escapes `&`, `<` and `>` as HTML entities; the rest of
//! its markup is passed through untouched.

/// Escape text before posting it to Slack.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Decode the entities Slack puts into received text.
pub fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_rendered_message() {
        assert_eq!(escape("<bob> a & b"), "&lt;bob&gt; a &amp; b");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("x &lt; y &amp;&amp; y &gt; z"), "x < y && y > z");
    }

    #[test]
    fn test_unescape_does_not_double_decode() {
        assert_eq!(unescape("&amp;lt;"), "&lt;");
    }
}
