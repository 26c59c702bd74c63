//! Structural signatures for assistant-message containers.
//!
//! Detection matches the host chat UI's markup best-effort: an explicit
//! author-role attribute where the page provides one, otherwise `article`
//! turns identified by secondary markers. The class names are the host
//! page's, not ours, and can rot when the page changes.

use crate::dom::{Document, NodeId};

pub const ASSISTANT_ROLE_ATTR: &str = "data-message-author-role";
pub const ASSISTANT_ROLE: &str = "assistant";
pub const AGENT_TURN_CLASS: &str = "agent-turn";
pub const AUTHOR_LABEL_CLASS: &str = "text-token-text-secondary";
pub const AUTHOR_LABEL_MARKER: &str = "ChatGPT";
pub const STREAMING_CLASS: &str = "result-streaming";
pub const STOP_BUTTON_ATTR: &str = "data-testid";
pub const STOP_BUTTON_VALUE: &str = "stop-button";

/// Minimum text length for the substantial-text fallback in
/// [`find_text_element`].
const FALLBACK_MIN_TEXT_LEN: usize = 50;

fn has_assistant_role(doc: &Document, id: NodeId) -> bool {
    doc.attr(id, ASSISTANT_ROLE_ATTR) == Some(ASSISTANT_ROLE)
}

fn is_assistant_article(doc: &Document, id: NodeId) -> bool {
    if doc.tag(id) != Some("article") {
        return false;
    }
    let labeled = doc.descendants(id).into_iter().any(|node| {
        doc.has_class(node, AUTHOR_LABEL_CLASS)
            && doc.text_content(node).contains(AUTHOR_LABEL_MARKER)
    });
    labeled
        || doc.has_class(id, AGENT_TURN_CLASS)
        || doc
            .descendants(id)
            .into_iter()
            .any(|node| has_assistant_role(doc, node))
}

/// Whether `id` itself looks like one assistant chat turn.
pub fn is_assistant_container(doc: &Document, id: NodeId) -> bool {
    doc.is_element(id) && (has_assistant_role(doc, id) || is_assistant_article(doc, id))
}

/// All assistant containers that `added` is or contains, in document order.
/// Non-element nodes yield nothing.
pub fn collect_candidates(doc: &Document, added: NodeId) -> Vec<NodeId> {
    if !doc.is_element(added) {
        return Vec::new();
    }
    let mut out = Vec::new();
    for id in std::iter::once(added).chain(doc.descendants(added)) {
        if is_assistant_container(doc, id) {
            out.push(id);
        }
    }
    out
}

/// Every assistant container currently in the document, for the sweep a
/// watcher performs when observation starts.
pub fn find_all_containers(doc: &Document) -> Vec<NodeId> {
    doc.descendants(doc.root())
        .into_iter()
        .filter(|id| is_assistant_container(doc, *id))
        .collect()
}

/// The element whose subtree carries the rendered response text. Tries the
/// known content markers in priority order, then falls back to any div
/// with substantial text that is not chrome and not already ours.
pub fn find_text_element(doc: &Document, container: NodeId) -> Option<NodeId> {
    for class in ["markdown", "whitespace-pre-wrap"] {
        if let Some(found) =
            first_nonblank_descendant(doc, container, |id| doc.has_class(id, class))
        {
            return Some(found);
        }
    }
    if let Some(found) = first_nonblank_descendant(doc, container, |id| {
        doc.attr(id, "data-message-content").is_some()
    }) {
        return Some(found);
    }
    if let Some(found) =
        first_nonblank_descendant(doc, container, |id| doc.has_class(id, "text-base"))
    {
        return Some(found);
    }
    // ".group .text-gray-800" in the host page's stylesheet terms.
    if let Some(found) = first_nonblank_descendant(doc, container, |id| {
        doc.has_class(id, "text-gray-800")
            && doc
                .ancestors(id)
                .into_iter()
                .any(|ancestor| doc.has_class(ancestor, "group"))
    }) {
        return Some(found);
    }
    if let Some(found) = first_nonblank_descendant(doc, container, |id| doc.has_class(id, "prose"))
    {
        return Some(found);
    }

    for id in doc.descendants(container) {
        if doc.tag(id) != Some("div") {
            continue;
        }
        let has_controls = doc
            .descendants(id)
            .into_iter()
            .any(|node| matches!(doc.tag(node), Some("button") | Some("svg")));
        if has_controls {
            continue;
        }
        if doc.has_class(id, crate::swap::PROCESSED_CLASS)
            || doc
                .descendants(id)
                .into_iter()
                .any(|node| doc.has_class(node, crate::swap::MODIFIED_CONTENT_CLASS))
        {
            continue;
        }
        if doc.has_class(id, crate::swap::LOADING_CLASS)
            || doc.has_class(id, crate::swap::ERROR_CLASS)
        {
            continue;
        }
        if doc.text_content(id).trim().len() > FALLBACK_MIN_TEXT_LEN {
            return Some(id);
        }
    }
    None
}

fn first_nonblank_descendant<F>(doc: &Document, container: NodeId, predicate: F) -> Option<NodeId>
where
    F: Fn(NodeId) -> bool,
{
    doc.descendants(container)
        .into_iter()
        .find(|id| predicate(*id) && !doc.text_content(*id).trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn find_by_id<'a>(doc: &'a Document, id_attr: &str) -> NodeId {
        doc.descendants(doc.root())
            .into_iter()
            .find(|id| doc.attr(*id, "id") == Some(id_attr))
            .unwrap()
    }

    #[test]
    fn test_role_attribute_signature() {
        let doc = Document::parse(
            "<html><body><div id=\"m\" data-message-author-role=\"assistant\">hi</div>\
             <div id=\"u\" data-message-author-role=\"user\">hi</div></body></html>",
        );
        assert!(is_assistant_container(&doc, find_by_id(&doc, "m")));
        assert!(!is_assistant_container(&doc, find_by_id(&doc, "u")));
    }

    #[test]
    fn test_article_signatures() {
        let doc = Document::parse(
            "<html><body>\
             <article id=\"labeled\"><span class=\"text-token-text-secondary\">ChatGPT said:</span><p>x</p></article>\
             <article id=\"turn\" class=\"agent-turn\"><p>x</p></article>\
             <article id=\"nested\"><div data-message-author-role=\"assistant\">x</div></article>\
             <article id=\"plain\"><p>x</p></article>\
             </body></html>",
        );
        assert!(is_assistant_container(&doc, find_by_id(&doc, "labeled")));
        assert!(is_assistant_container(&doc, find_by_id(&doc, "turn")));
        assert!(is_assistant_container(&doc, find_by_id(&doc, "nested")));
        assert!(!is_assistant_container(&doc, find_by_id(&doc, "plain")));
    }

    #[test]
    fn test_collect_candidates_finds_nested_containers() {
        let doc = Document::parse(
            "<html><body><div id=\"batch\">\
             <div id=\"a\" data-message-author-role=\"assistant\">one</div>\
             <article id=\"b\" class=\"agent-turn\">two</article>\
             </div></body></html>",
        );
        let batch = find_by_id(&doc, "batch");
        let candidates = collect_candidates(&doc, batch);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0], find_by_id(&doc, "a"));
        assert_eq!(candidates[1], find_by_id(&doc, "b"));
    }

    #[test]
    fn test_find_text_element_prefers_markdown() {
        let doc = Document::parse(
            "<html><body><article id=\"c\" class=\"agent-turn\">\
             <div class=\"text-base\">wrapper</div>\
             <div id=\"md\" class=\"markdown\">the answer</div>\
             </article></body></html>",
        );
        let found = find_text_element(&doc, find_by_id(&doc, "c")).unwrap();
        assert_eq!(found, find_by_id(&doc, "md"));
    }

    #[test]
    fn test_find_text_element_fallback_skips_controls() {
        let long = "x".repeat(60);
        let html = format!(
            "<html><body><article id=\"c\" class=\"agent-turn\">\
             <div id=\"chrome\"><button>copy</button>{long}</div>\
             <div id=\"body\">{long}</div>\
             </article></body></html>"
        );
        let doc = Document::parse(&html);
        let found = find_text_element(&doc, find_by_id(&doc, "c")).unwrap();
        assert_eq!(found, find_by_id(&doc, "body"));
    }

    #[test]
    fn test_find_text_element_none_for_empty_container() {
        let doc = Document::parse(
            "<html><body><article id=\"c\" class=\"agent-turn\"><div>short</div></article></body></html>",
        );
        assert!(find_text_element(&doc, find_by_id(&doc, "c")).is_none());
    }
}
