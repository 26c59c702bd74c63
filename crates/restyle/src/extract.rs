//! Plain-text extraction from a rendered response element.
//!
//! Control elements and any artifacts a previous rewrite injected are
//! skipped so the transcript never feeds our own output back to the model.
//! Fenced code regions are protected by placeholder substitution: each
//! `pre` subtree flattens to a unique token, and after whole-element
//! flattening the literal code text is restored in its place, wrapped in
//! fence delimiters.

use crate::dom::{Document, NodeData, NodeId};
use crate::swap::{ERROR_CLASS, LOADING_CLASS, MODIFIED_CONTENT_CLASS};

/// Host-page chrome stripped before reading text.
const COPY_BUTTON_CLASS: &str = "copy-code-button";

fn placeholder(index: usize) -> String {
    format!("[CODE_BLOCK_{index}]")
}

/// Flatten `element` to plain text, preserving fenced code verbatim.
/// Returns an empty string when nothing meaningful is present; callers
/// skip the container in that case.
pub fn extract_text(doc: &Document, element: NodeId) -> String {
    let mut text = String::new();
    let mut code_blocks = Vec::new();
    for child in doc.children(element) {
        collect(doc, *child, &mut text, &mut code_blocks);
    }

    let mut out = text.trim().to_string();
    for (index, code) in code_blocks.iter().enumerate() {
        out = out.replacen(&placeholder(index), &format!("\n```\n{code}\n```\n"), 1);
    }
    out
}

fn collect(doc: &Document, id: NodeId, text: &mut String, code_blocks: &mut Vec<String>) {
    match doc.data(id) {
        NodeData::Text(value) => text.push_str(value),
        NodeData::Element { tag, .. } => {
            if tag == "button" || tag == "svg" {
                return;
            }
            if doc.has_class(id, COPY_BUTTON_CLASS)
                || doc.has_class(id, LOADING_CLASS)
                || doc.has_class(id, MODIFIED_CONTENT_CLASS)
                || doc.has_class(id, ERROR_CLASS)
            {
                return;
            }
            if tag == "pre" {
                text.push_str(&placeholder(code_blocks.len()));
                code_blocks.push(doc.text_content(id));
                return;
            }
            for child in doc.children(id) {
                collect(doc, *child, text, code_blocks);
            }
        }
        NodeData::Root => {}
    }
}
