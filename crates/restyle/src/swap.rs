//! Swaps rewritten content into the page and keeps the original at hand.
//!
//! The swapped view is a composite: a header with a toggle control, the
//! rendered rewrite (visible) and the captured original HTML (hidden).
//! Toggling flips visibility classes only; the stored original is never
//! touched, and the flip is local, synchronous and reversible. Loading and
//! error annotations are inserted as siblings of the text element; errors
//! dismiss themselves after a fixed delay.

use std::time::Duration;

use tracing::debug;

use crate::dom::{escape_text, Document, NodeId, SharedDocument};
use crate::render::render_html;

pub const MODIFIED_CONTENT_CLASS: &str = "restyle-modified-content";
pub const PROCESSED_CLASS: &str = "restyle-processed";
pub const LOADING_CLASS: &str = "restyle-loading";
pub const ERROR_CLASS: &str = "restyle-error";
pub const REWRITTEN_PANE_CLASS: &str = "restyle-rewritten";
pub const ORIGINAL_PANE_CLASS: &str = "restyle-original";
pub const TOGGLE_CLASS: &str = "restyle-toggle";
pub const HIDDEN_CLASS: &str = "restyle-hidden";
pub const VISIBLE_CLASS: &str = "restyle-visible";

const SHOW_ORIGINAL_LABEL: &str = "Show Original";
const SHOW_REWRITTEN_LABEL: &str = "Show Rewritten";

/// How long an inline error annotation stays before removing itself.
pub const ERROR_DISMISS_AFTER: Duration = Duration::from_secs(5);

/// True when `element` already carries a swapped view, which makes it
/// ineligible for another pass.
pub fn is_rewritten(doc: &Document, element: NodeId) -> bool {
    doc.has_class(element, PROCESSED_CLASS)
        || doc
            .descendants(element)
            .into_iter()
            .any(|id| doc.has_class(id, MODIFIED_CONTENT_CLASS))
}

pub fn add_loading_indicator(doc: &mut Document, element: NodeId) {
    remove_loading_indicator(doc, element);
    if doc.parent(element).is_none() {
        debug!("no parent to attach loading indicator to");
        return;
    }
    doc.insert_html_after(
        element,
        &format!("<div class=\"{LOADING_CLASS}\">Rewriting response with Gemini…</div>"),
    );
}

pub fn remove_loading_indicator(doc: &mut Document, element: NodeId) {
    let Some(parent) = doc.parent(element) else {
        return;
    };
    let indicators: Vec<NodeId> = doc
        .descendants(parent)
        .into_iter()
        .filter(|id| doc.has_class(*id, LOADING_CLASS))
        .collect();
    for indicator in indicators {
        doc.remove(indicator);
    }
}

/// Annotate `element` with an inline failure message and schedule its
/// removal. The container keeps its original content.
pub fn add_error_indicator(document: &SharedDocument, element: NodeId, message: &str) {
    let added = {
        let mut doc = document.lock().unwrap();
        if doc.parent(element).is_none() {
            return;
        }
        doc.insert_html_after(
            element,
            &format!(
                "<div class=\"{ERROR_CLASS}\">Failed to rewrite: {}</div>",
                escape_text(message)
            ),
        )
    };
    let document = document.clone();
    tokio::spawn(async move {
        tokio::time::sleep(ERROR_DISMISS_AFTER).await;
        let mut doc = document.lock().unwrap();
        for id in added {
            doc.remove(id);
        }
    });
}

/// Replace `element`'s content with the composite rewritten/original view.
/// `original_html` must have been captured before any mutation.
pub fn swap_content(doc: &mut Document, element: NodeId, modified_text: &str, original_html: &str) {
    remove_loading_indicator(doc, element);
    let rendered = render_html(modified_text);
    let view = format!(
        "<div class=\"{MODIFIED_CONTENT_CLASS}\">\
         <div class=\"restyle-header\">\
         <span class=\"restyle-title\">Response restyled</span>\
         <button class=\"{TOGGLE_CLASS}\">{SHOW_ORIGINAL_LABEL}</button>\
         </div>\
         <div class=\"restyle-panes\">\
         <div class=\"{REWRITTEN_PANE_CLASS} {VISIBLE_CLASS}\">{rendered}</div>\
         <div class=\"{ORIGINAL_PANE_CLASS} {HIDDEN_CLASS}\">\
         <div class=\"restyle-original-label\">Original Response</div>\
         <div class=\"restyle-original-html\">{original_html}</div>\
         </div>\
         </div>\
         </div>"
    );
    doc.add_class(element, PROCESSED_CLASS);
    doc.set_inner_html(element, &view);
}

/// Flip which version is visible. Returns the new state (`true` when the
/// original is showing) or `None` when `element` has no swapped view.
pub fn toggle_view(doc: &mut Document, element: NodeId) -> Option<bool> {
    let rewritten = doc
        .descendants(element)
        .into_iter()
        .find(|id| doc.has_class(*id, REWRITTEN_PANE_CLASS))?;
    let original = doc
        .descendants(element)
        .into_iter()
        .find(|id| doc.has_class(*id, ORIGINAL_PANE_CLASS))?;
    let toggle = doc
        .descendants(element)
        .into_iter()
        .find(|id| doc.has_class(*id, TOGGLE_CLASS))?;

    let showing_original = doc.has_class(original, VISIBLE_CLASS);
    if showing_original {
        set_visibility(doc, original, false);
        set_visibility(doc, rewritten, true);
        doc.set_text(toggle, SHOW_ORIGINAL_LABEL);
        Some(false)
    } else {
        set_visibility(doc, rewritten, false);
        set_visibility(doc, original, true);
        doc.set_text(toggle, SHOW_REWRITTEN_LABEL);
        Some(true)
    }
}

fn set_visibility(doc: &mut Document, id: NodeId, visible: bool) {
    if visible {
        doc.remove_class(id, HIDDEN_CLASS);
        doc.add_class(id, VISIBLE_CLASS);
    } else {
        doc.remove_class(id, VISIBLE_CLASS);
        doc.add_class(id, HIDDEN_CLASS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn fixture() -> (Document, NodeId) {
        let doc = Document::parse(
            "<html><body><article><div id=\"t\" class=\"markdown\"><p>old text</p></div></article></body></html>",
        );
        let element = doc
            .descendants(doc.root())
            .into_iter()
            .find(|id| doc.attr(*id, "id") == Some("t"))
            .unwrap();
        (doc, element)
    }

    #[test]
    fn test_swap_builds_composite_view() {
        let (mut doc, element) = fixture();
        let original = doc.inner_html(element);
        swap_content(&mut doc, element, "new **text**", &original);

        assert!(is_rewritten(&doc, element));
        let html = doc.inner_html(element);
        assert!(html.contains("restyle-modified-content"));
        assert!(html.contains("<strong>text</strong>"));
        assert!(html.contains("<p>old text</p>"));
        assert!(html.contains(SHOW_ORIGINAL_LABEL));
    }

    #[test]
    fn test_toggle_is_reversible_and_preserves_original() {
        let (mut doc, element) = fixture();
        let original = doc.inner_html(element);
        swap_content(&mut doc, element, "new text", &original);

        let original_pane = doc
            .descendants(element)
            .into_iter()
            .find(|id| doc.has_class(*id, ORIGINAL_PANE_CLASS))
            .unwrap();
        let stored = doc.inner_html(original_pane);

        for round in 0..10 {
            let showing_original = toggle_view(&mut doc, element).unwrap();
            assert_eq!(showing_original, round % 2 == 0);
            assert_eq!(doc.inner_html(original_pane), stored);
        }

        let rewritten_pane = doc
            .descendants(element)
            .into_iter()
            .find(|id| doc.has_class(*id, REWRITTEN_PANE_CLASS))
            .unwrap();
        assert!(doc.has_class(rewritten_pane, VISIBLE_CLASS));
        assert!(doc.has_class(original_pane, HIDDEN_CLASS));
    }

    #[test]
    fn test_toggle_without_view_is_none() {
        let (mut doc, element) = fixture();
        assert!(toggle_view(&mut doc, element).is_none());
    }

    #[test]
    fn test_loading_indicator_lifecycle() {
        let (mut doc, element) = fixture();
        add_loading_indicator(&mut doc, element);
        add_loading_indicator(&mut doc, element);

        let parent = doc.parent(element).unwrap();
        let count = doc
            .descendants(parent)
            .into_iter()
            .filter(|id| doc.has_class(*id, LOADING_CLASS))
            .count();
        assert_eq!(count, 1);

        remove_loading_indicator(&mut doc, element);
        assert!(!doc
            .descendants(parent)
            .into_iter()
            .any(|id| doc.has_class(id, LOADING_CLASS)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_indicator_dismisses_itself() {
        let (doc, element) = fixture();
        let document = doc.into_shared();
        add_error_indicator(&document, element, "Gemini API error: quota");

        let body_has_error = |document: &SharedDocument| {
            let doc = document.lock().unwrap();
            doc.descendants(doc.root())
                .into_iter()
                .any(|id| doc.has_class(id, ERROR_CLASS))
        };
        assert!(body_has_error(&document));

        tokio::time::sleep(ERROR_DISMISS_AFTER + Duration::from_millis(100)).await;
        // Let the dismissal task run.
        tokio::task::yield_now().await;
        assert!(!body_has_error(&document));
    }

    #[test]
    fn test_error_message_is_escaped() {
        let (doc, element) = fixture();
        let document = doc.into_shared();
        // No tokio runtime needed for insertion itself in async tests; use one.
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            add_error_indicator(&document, element, "<script>bad</script>");
        });
        let doc = document.lock().unwrap();
        let html = doc.html();
        assert!(html.contains("&lt;script&gt;bad&lt;/script&gt;"));
    }
}
