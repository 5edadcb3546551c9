//! View collaborator
//!
//! The core never draws anything itself. Everything user-visible goes
//! through a [`ChatView`], which a front-end implements for its rendering
//! technology (terminal, test recorder, ...).

use crate::conversation::{ResultRecord, Role};
use crate::text::{DescriptionRules, ResultCard, sanitize};
use std::sync::Arc;

/// Rendering surface for one chat.
///
/// Calls for a single session arrive in order: `begin_assistant_message`,
/// then any mix of sites/results/answer updates, then at most one of
/// `show_no_results` or `show_error`.
pub trait ChatView: Send + Sync {
    /// Append a complete message block (user input, replayed history).
    fn append_message(&self, role: Role, content: &str);

    /// Open the assistant block for a new session with a loading indicator.
    fn begin_assistant_message(&self);

    /// The response started arriving.
    fn stop_loading(&self);

    /// Create the session's answer element. Called at most once per session.
    fn create_answer(&self);

    /// Replace the answer element's text with the full sanitized answer.
    fn update_answer(&self, text: &str);

    /// Note listing the sites being searched.
    fn show_sites(&self, sites: &[String]);

    /// Header preceding the result cards.
    fn show_results_header(&self, count: usize);

    fn append_result_card(&self, card: &ResultCard);

    /// Fallback shown when a session finished with neither text nor results.
    fn show_no_results(&self);

    /// Replace the in-progress assistant block with an error indicator.
    fn show_error(&self, message: &str);

    /// Drop everything shown for the current conversation.
    fn clear(&self);
}

/// A view that renders nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullView;

impl ChatView for NullView {
    fn append_message(&self, _role: Role, _content: &str) {}
    fn begin_assistant_message(&self) {}
    fn stop_loading(&self) {}
    fn create_answer(&self) {}
    fn update_answer(&self, _text: &str) {}
    fn show_sites(&self, _sites: &[String]) {}
    fn show_results_header(&self, _count: usize) {}
    fn append_result_card(&self, _card: &ResultCard) {}
    fn show_no_results(&self) {}
    fn show_error(&self, _message: &str) {}
    fn clear(&self) {}
}

/// Header text for a result list.
pub fn results_header(count: usize) -> String {
    format!(
        "Found {} relevant page{}:",
        count,
        if count == 1 { "" } else { "s" }
    )
}

pub const NO_RESULTS_TEXT: &str = "No results found for your query.";

/// Projects one session's accumulator onto a [`ChatView`].
///
/// Owns the per-session render state: whether the answer element exists
/// and whether the sites note was already shown.
pub struct SessionRenderer {
    view: Arc<dyn ChatView>,
    rules: DescriptionRules,
    sites_enabled: bool,
    sites_shown: bool,
    answer_created: bool,
}

impl SessionRenderer {
    pub fn new(view: Arc<dyn ChatView>, rules: DescriptionRules) -> Self {
        Self {
            view,
            rules,
            sites_enabled: true,
            sites_shown: false,
            answer_created: false,
        }
    }

    pub fn with_sites(mut self, enabled: bool) -> Self {
        self.sites_enabled = enabled;
        self
    }

    pub fn show_sites(&mut self, sites: &[String]) {
        if !self.sites_enabled || self.sites_shown || sites.is_empty() {
            return;
        }
        self.sites_shown = true;
        self.view.show_sites(sites);
    }

    pub fn show_results(&mut self, results: &[ResultRecord]) {
        self.view.show_results_header(results.len());
        for record in results {
            let card = ResultCard::from_record(record, &self.rules);
            self.view.append_result_card(&card);
        }
    }

    /// Re-render the full answer. Sanitizing the cumulative text rather than
    /// the new fragment keeps markup split across fragments from leaking.
    pub fn update_answer(&mut self, content: &str) {
        if !self.answer_created {
            self.answer_created = true;
            self.view.create_answer();
        }
        self.view.update_answer(&sanitize(content));
    }

    pub fn show_no_results(&mut self) {
        self.view.show_no_results();
    }
}
