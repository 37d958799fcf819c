//! HTML to plain text for terminal display.

use scraper::{Html, Node};

/// Strip markup from a page's HTML and return readable text. Script, style,
/// and noscript contents are dropped; each remaining text node becomes one
/// trimmed line. Exact whitespace is whatever the parser yields and is not
/// part of any contract.
pub fn html_to_text(html: &str) -> String {
    let doc = Html::parse_document(html);

    let mut lines: Vec<String> = Vec::new();
    for node in doc.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let skipped = node.ancestors().any(|a| match a.value() {
            Node::Element(el) => matches!(el.name(), "script" | "style" | "noscript"),
            _ => false,
        });
        if skipped {
            continue;
        }
        let t = text.replace('\u{a0}', " ");
        let t = t.trim();
        if !t.is_empty() {
            lines.push(t.to_string());
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags() {
        let text = html_to_text("<html><body><h1>Header</h1><p>Note text</p></body></html>");
        assert_eq!(text, "Header\nNote text");
    }

    #[test]
    fn skips_script_and_style() {
        let text = html_to_text(
            "<html><head><style>p { color: red }</style></head>\
             <body><script>var x = 1;</script><p>visible</p></body></html>",
        );
        assert_eq!(text, "visible");
    }

    #[test]
    fn collapses_blank_runs() {
        let text = html_to_text("<div>  <p> alpha </p>\n\n  <p>beta</p> </div>");
        assert_eq!(text, "alpha\nbeta");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(html_to_text("just text"), "just text");
    }
}
