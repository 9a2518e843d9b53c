//! Shared document content and its propagation rules.
//!
//! Last writer wins: there is no version, author or merge metadata. A local
//! edit replaces the content and produces the full new text for the relay; a
//! remote update replaces the content unconditionally, including text the
//! local user is in the middle of typing.

use crate::protocol::RelayMessage;

/// Text → HTML conversion for the preview pane. Pure; the core never looks
/// inside the output.
pub trait MarkdownRenderer {
    fn render(&self, markdown: &str) -> String;
}

impl<F> MarkdownRenderer for F
where
    F: Fn(&str) -> String,
{
    fn render(&self, markdown: &str) -> String {
        self(markdown)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentSyncChannel {
    content: String,
}

impl DocumentSyncChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Apply a local edit and build the message announcing it.
    pub fn local_edit(&mut self, new_content: impl Into<String>) -> RelayMessage {
        self.content = new_content.into();
        RelayMessage::MarkdownChange(self.content.clone())
    }

    /// Replace the content with what the relay delivered.
    ///
    /// Returns `true` if the visible content changed.
    pub fn on_remote_update(&mut self, content: String) -> bool {
        let changed = self.content != content;
        self.content = content;
        changed
    }

    pub fn render(&self, renderer: &dyn MarkdownRenderer) -> String {
        renderer.render(&self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_edit_echoes_and_emits_full_content() {
        let mut doc = DocumentSyncChannel::new();
        let message = doc.local_edit("# Hello");
        assert_eq!(doc.content(), "# Hello");
        assert_eq!(message, RelayMessage::MarkdownChange("# Hello".into()));

        let message = doc.local_edit("# Hello world");
        assert_eq!(message, RelayMessage::MarkdownChange("# Hello world".into()));
    }

    #[test]
    fn test_remote_update_wins_over_local_edits() {
        let mut doc = DocumentSyncChannel::new();
        doc.local_edit("a");
        doc.local_edit("ab");
        doc.local_edit("abc");
        doc.on_remote_update("remote".into());
        assert_eq!(doc.content(), "remote");
    }

    #[test]
    fn test_remote_update_reports_change() {
        let mut doc = DocumentSyncChannel::new();
        assert!(doc.on_remote_update("x".into()));
        assert!(!doc.on_remote_update("x".into()));
        assert!(doc.on_remote_update(String::new()));
        assert_eq!(doc.content(), "");
    }

    #[test]
    fn test_render_delegates_to_renderer() {
        let mut doc = DocumentSyncChannel::new();
        doc.local_edit("*hi*");
        let html = doc.render(&|md: &str| format!("<p>{md}</p>"));
        assert_eq!(html, "<p>*hi*</p>");
    }
}
