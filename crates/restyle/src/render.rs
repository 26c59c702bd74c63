//! Renders rewritten plain text back to HTML.
//!
//! The remote model answers in a small literal-markup dialect: blank-line
//! paragraphs, `**bold**`, `*italic*`, backtick inline code and fenced code
//! blocks. Everything is HTML-escaped before any markup substitution, so
//! adversarial model output cannot smuggle live markup into the page.

use regex::Regex;

use crate::dom::escape_text;

/// Convert rewritten plain text into the HTML shown in the swapped view.
pub fn render_html(text: &str) -> String {
    let escaped = escape_text(text);

    let fence = Regex::new(r"(?s)```(.*?)```").unwrap();
    let with_fences = fence.replace_all(&escaped, |caps: &regex::Captures<'_>| {
        format!(
            "<pre class=\"restyle-code-block\"><code>{}</code></pre>",
            caps[1].trim()
        )
    });

    let blank_lines = Regex::new(r"\n\n+").unwrap();
    let body: String = blank_lines
        .split(&with_fences)
        .map(render_paragraph)
        .collect();

    format!("<div class=\"restyle-body\">{body}</div>")
}

fn render_paragraph(paragraph: &str) -> String {
    if paragraph.trim().is_empty() || paragraph.contains("<pre") {
        return paragraph.to_string();
    }
    let bold = Regex::new(r"\*\*(.*?)\*\*").unwrap();
    let italic = Regex::new(r"\*(.*?)\*").unwrap();
    let inline_code = Regex::new(r"`([^`]+)`").unwrap();

    let mut html = paragraph.replace('\n', "<br>");
    html = bold.replace_all(&html, "<strong>$1</strong>").into_owned();
    html = italic.replace_all(&html, "<em>$1</em>").into_owned();
    html = inline_code
        .replace_all(&html, "<code class=\"restyle-inline-code\">$1</code>")
        .into_owned();
    format!("<p>{html}</p>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_substitution() {
        let html = render_html("**bold** and `code`");
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<code class=\"restyle-inline-code\">code</code>"));
    }

    #[test]
    fn test_adversarial_input_is_escaped() {
        let html = render_html("try <script>alert(1)</script> now");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn test_paragraphs_and_line_breaks() {
        let html = render_html("first line\nsecond line\n\nnext paragraph");
        assert!(html.contains("<p>first line<br>second line</p>"));
        assert!(html.contains("<p>next paragraph</p>"));
    }

    #[test]
    fn test_italic_does_not_eat_bold() {
        let html = render_html("**strong** then *soft*");
        assert!(html.contains("<strong>strong</strong>"));
        assert!(html.contains("<em>soft</em>"));
    }

    #[test]
    fn test_fenced_code_becomes_pre_block() {
        let html = render_html("intro\n\n```\nlet x = 1;\n```\n\noutro");
        assert!(html.contains("<pre class=\"restyle-code-block\"><code>let x = 1;</code></pre>"));
        assert!(html.contains("<p>intro</p>"));
        assert!(html.contains("<p>outro</p>"));
    }

    #[test]
    fn test_code_fence_content_not_reinterpreted() {
        let html = render_html("```\n**not bold** *not italic*\n```");
        assert!(html.contains("**not bold** *not italic*"));
        assert!(!html.contains("<strong>"));
    }
}
