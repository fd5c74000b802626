//! Display-side reconciliation of a logo stream.
//!
//! `Gallery` folds `StreamEvent`s into the state a logo grid shows: the real
//! results so far, how many placeholders to draw, the progress counter, a
//! status banner and a single selected item.

use crate::abort::AbortAck;
use crate::errors::StreamFailure;
use crate::model::LogoEvent;
use crate::stream::{AbortInitiator, StreamEvent, StreamObserver};

/// Number of logos the service generates per task unless told otherwise.
pub const DEFAULT_EXPECTED_TOTAL: usize = 6;

/// One real result in the grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GalleryItem {
    /// Service-assigned ordinal; the first logo is index 0.
    pub index: u32,
    pub image: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GalleryPhase {
    Streaming,
    /// Abort requested, acknowledgment pending.
    Cancelling,
    Completed,
    Cancelled,
    Failed { message: String },
}

#[derive(Clone, Debug)]
pub struct Gallery {
    items: Vec<GalleryItem>,
    expected_total: usize,
    phase: GalleryPhase,
    selected: Option<u32>,
    notification: Option<String>,
}

impl Gallery {
    /// Starts a gallery holding the synchronously returned first logo.
    pub fn new(first_image: impl Into<String>, expected_total: usize) -> Self {
        Self {
            items: vec![GalleryItem {
                index: 0,
                image: first_image.into(),
            }],
            expected_total,
            phase: GalleryPhase::Streaming,
            selected: None,
            notification: None,
        }
    }

    /// Items in arrival order.
    pub fn items(&self) -> &[GalleryItem] {
        &self.items
    }

    /// Items sorted by their service-assigned index.
    pub fn ordered_items(&self) -> Vec<&GalleryItem> {
        let mut items: Vec<&GalleryItem> = self.items.iter().collect();
        items.sort_by_key(|item| item.index);
        items
    }

    pub fn phase(&self) -> &GalleryPhase {
        &self.phase
    }

    pub fn expected_total(&self) -> usize {
        self.expected_total
    }

    /// Logos generated so far, first one included.
    pub fn progress(&self) -> usize {
        self.items.len()
    }

    /// Placeholders are only drawn while streaming.
    pub fn placeholder_count(&self) -> usize {
        match self.phase {
            GalleryPhase::Streaming => self.expected_total.saturating_sub(self.items.len()),
            _ => 0,
        }
    }

    pub fn is_frozen(&self) -> bool {
        !matches!(
            self.phase,
            GalleryPhase::Streaming | GalleryPhase::Cancelling
        )
    }

    /// Marks an abort as requested; the grid stays as is until acknowledged.
    pub fn mark_cancelling(&mut self) {
        if self.phase == GalleryPhase::Streaming {
            self.phase = GalleryPhase::Cancelling;
            self.notification = Some("Cancelling generation...".to_string());
        }
    }

    /// Returns to `Streaming` when the abort had no effect because the stream
    /// already reached its terminal event (`AbortOutcome::AlreadyFinished`).
    pub fn cancel_rejected(&mut self) {
        if self.phase == GalleryPhase::Cancelling {
            self.phase = GalleryPhase::Streaming;
        }
    }

    /// Applies one stream event.
    pub fn apply(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::Opened { .. } => {}
            StreamEvent::Logo { logo, .. } => self.push_logo(logo),
            StreamEvent::Completed { .. } => self.complete(),
            StreamEvent::Aborted { ack, .. } => self.cancelled(ack),
            StreamEvent::Error { error, .. } => self.failed(error),
        }
    }

    /// One-line status text for the current phase.
    pub fn status_line(&self) -> String {
        match &self.phase {
            GalleryPhase::Streaming => format!(
                "Generating logos: {} of {}",
                self.progress(),
                self.expected_total
            ),
            GalleryPhase::Cancelling => "Cancelling generation...".to_string(),
            GalleryPhase::Completed => {
                format!("All {} logos generated successfully", self.items.len())
            }
            GalleryPhase::Cancelled => {
                format!("Generation cancelled: {} logos created", self.items.len())
            }
            GalleryPhase::Failed { message } => format!("Error generating logos: {message}"),
        }
    }

    /// Returns and clears the pending transient notification.
    pub fn take_notification(&mut self) -> Option<String> {
        self.notification.take()
    }

    pub fn selected(&self) -> Option<u32> {
        self.selected
    }

    /// Toggles `index`; any other selection is cleared.
    pub fn click(&mut self, index: u32) {
        if !self.items.iter().any(|item| item.index == index) {
            return;
        }
        self.selected = match self.selected {
            Some(current) if current == index => None,
            _ => Some(index),
        };
    }

    /// Click on empty grid space.
    pub fn click_empty(&mut self) {
        self.selected = None;
    }

    // Logos reaching the gallery while cancelling were emitted before the
    // abort took effect; `LogoStream` drops the ones that came after.
    fn push_logo(&mut self, logo: &LogoEvent) {
        if self.is_frozen()
            || self.items.iter().any(|item| item.index == logo.index)
        {
            return;
        }
        self.items.push(GalleryItem {
            index: logo.index,
            image: logo.image.clone(),
        });
        self.notification = Some(format!("Logo {} generated successfully!", logo.index + 1));
    }

    fn complete(&mut self) {
        if self.is_frozen() {
            return;
        }
        self.phase = GalleryPhase::Completed;
        self.notification = Some("All logos have been generated!".to_string());
    }

    fn cancelled(&mut self, ack: &AbortAck) {
        if self.is_frozen() {
            return;
        }
        let reported = usize::try_from(ack.total_generated)
            .unwrap_or(usize::MAX)
            .saturating_add(1);
        self.expected_total = self.items.len().max(reported);
        self.phase = GalleryPhase::Cancelled;
        self.notification = Some("Logo generation was cancelled".to_string());
    }

    fn failed(&mut self, error: &StreamFailure) {
        if self.is_frozen() {
            return;
        }
        let message = error.to_string();
        self.notification = Some(format!("Error generating logos: {message}"));
        self.phase = GalleryPhase::Failed { message };
    }
}

impl StreamObserver for Gallery {
    fn on_logo(&mut self, logo: &LogoEvent) {
        self.push_logo(logo);
    }

    fn on_complete(&mut self, _generated: usize) {
        self.complete();
    }

    fn on_error(&mut self, error: &StreamFailure) {
        self.failed(error);
    }

    fn on_abort(&mut self, ack: &AbortAck, _initiator: AbortInitiator) {
        self.cancelled(ack);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LogoStatus, TaskId};

    fn logo_event(index: u32) -> StreamEvent {
        StreamEvent::Logo {
            task_id: TaskId::new("abc"),
            seq: u64::from(index),
            logo: LogoEvent {
                index,
                image: format!("/images/acme_{index}.png"),
                status: LogoStatus::Success,
            },
        }
    }

    fn aborted(total_generated: u32) -> StreamEvent {
        StreamEvent::Aborted {
            task_id: TaskId::new("abc"),
            initiator: AbortInitiator::User,
            ack: AbortAck {
                total_generated,
                confirmed: true,
                message: None,
            },
        }
    }

    #[test]
    fn full_run_shows_all_results_without_placeholders() {
        let mut gallery = Gallery::new("/images/acme_0.png", 4);
        assert_eq!(gallery.placeholder_count(), 3);
        for index in 1..=3 {
            gallery.apply(&logo_event(index));
        }
        assert_eq!(gallery.status_line(), "Generating logos: 4 of 4");
        gallery.apply(&StreamEvent::Completed {
            task_id: TaskId::new("abc"),
            generated: 3,
        });

        assert_eq!(gallery.items().len(), 4);
        assert_eq!(gallery.placeholder_count(), 0);
        assert_eq!(gallery.status_line(), "All 4 logos generated successfully");
    }

    #[test]
    fn cancel_after_two_logos_freezes_at_three() {
        let mut gallery = Gallery::new("/images/acme_0.png", DEFAULT_EXPECTED_TOTAL);
        gallery.apply(&logo_event(1));
        gallery.apply(&logo_event(2));
        gallery.mark_cancelling();
        assert_eq!(gallery.status_line(), "Cancelling generation...");
        assert_eq!(gallery.placeholder_count(), 0);

        gallery.apply(&aborted(2));
        gallery.apply(&logo_event(3));

        assert_eq!(gallery.items().len(), 3);
        assert_eq!(gallery.expected_total(), 3);
        assert_eq!(gallery.phase(), &GalleryPhase::Cancelled);
        assert_eq!(gallery.status_line(), "Generation cancelled: 3 logos created");
    }

    #[test]
    fn logos_finished_before_cancel_still_count() {
        let mut gallery = Gallery::new("/images/acme_0.png", 4);
        gallery.apply(&logo_event(1));
        gallery.mark_cancelling();
        gallery.apply(&logo_event(2));
        gallery.apply(&logo_event(3));
        gallery.apply(&StreamEvent::Completed {
            task_id: TaskId::new("abc"),
            generated: 3,
        });

        assert_eq!(gallery.items().len(), 4);
        assert_eq!(gallery.phase(), &GalleryPhase::Completed);
        assert_eq!(gallery.status_line(), "All 4 logos generated successfully");
    }

    #[test]
    fn rejected_cancel_resumes_streaming() {
        let mut gallery = Gallery::new("/images/acme_0.png", 4);
        gallery.mark_cancelling();
        gallery.cancel_rejected();
        assert_eq!(gallery.phase(), &GalleryPhase::Streaming);
        assert_eq!(gallery.placeholder_count(), 3);
        assert_eq!(gallery.status_line(), "Generating logos: 1 of 4");

        gallery.apply(&aborted(0));
        gallery.cancel_rejected();
        assert_eq!(gallery.phase(), &GalleryPhase::Cancelled);
    }

    #[test]
    fn abort_total_is_max_of_local_and_reported_plus_one() {
        let mut gallery = Gallery::new("/images/acme_0.png", DEFAULT_EXPECTED_TOTAL);
        gallery.apply(&logo_event(1));
        gallery.apply(&aborted(4));
        assert_eq!(gallery.expected_total(), 5);

        let mut gallery = Gallery::new("/images/acme_0.png", DEFAULT_EXPECTED_TOTAL);
        gallery.apply(&logo_event(1));
        gallery.apply(&logo_event(2));
        gallery.apply(&aborted(0));
        assert_eq!(gallery.expected_total(), 3);
    }

    #[test]
    fn error_freezes_and_keeps_partial_results() {
        let mut gallery = Gallery::new("/images/acme_0.png", DEFAULT_EXPECTED_TOTAL);
        gallery.apply(&logo_event(1));
        gallery.apply(&StreamEvent::Error {
            task_id: TaskId::new("abc"),
            error: StreamFailure::Transport {
                message: "connection reset".into(),
            },
        });
        gallery.apply(&logo_event(2));

        assert_eq!(gallery.items().len(), 2);
        assert_eq!(gallery.placeholder_count(), 0);
        assert_eq!(
            gallery.status_line(),
            "Error generating logos: stream connection failed: connection reset"
        );
    }

    #[test]
    fn out_of_order_logos_keep_arrival_order_and_sort_by_index() {
        let mut gallery = Gallery::new("/images/acme_0.png", DEFAULT_EXPECTED_TOTAL);
        gallery.apply(&logo_event(3));
        gallery.apply(&logo_event(1));
        gallery.apply(&logo_event(1));

        let arrival: Vec<u32> = gallery.items().iter().map(|i| i.index).collect();
        let ordered: Vec<u32> = gallery.ordered_items().iter().map(|i| i.index).collect();
        assert_eq!(arrival, vec![0, 3, 1]);
        assert_eq!(ordered, vec![0, 1, 3]);
    }

    #[test]
    fn notifications_are_transient() {
        let mut gallery = Gallery::new("/images/acme_0.png", DEFAULT_EXPECTED_TOTAL);
        gallery.apply(&logo_event(1));
        assert_eq!(
            gallery.take_notification().as_deref(),
            Some("Logo 2 generated successfully!")
        );
        assert_eq!(gallery.take_notification(), None);
    }

    #[test]
    fn selection_is_exclusive_and_toggles() {
        let mut gallery = Gallery::new("/images/acme_0.png", DEFAULT_EXPECTED_TOTAL);
        gallery.apply(&logo_event(1));

        gallery.click(0);
        assert_eq!(gallery.selected(), Some(0));
        gallery.click(1);
        assert_eq!(gallery.selected(), Some(1));
        gallery.click(1);
        assert_eq!(gallery.selected(), None);
        gallery.click(0);
        gallery.click_empty();
        assert_eq!(gallery.selected(), None);
        gallery.click(42);
        assert_eq!(gallery.selected(), None);
    }
}
