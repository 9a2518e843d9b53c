//! Scroll mirroring between the edit pane and the rendered preview.
//!
//! Positions are exchanged as ratios of each pane's scrollable range, so two
//! panes of different content height stay visually aligned.
//!
//! ## Feedback loop
//!
//! Writing a pane's scroll offset makes that pane report a scroll of its own.
//! Without a guard the two panes would mirror each other forever:
//!
//! ```text
//!  editor scroll ──► write preview ──► preview scroll ──► write editor ──► ...
//! ```
//!
//! Every programmatic write moves the synchronizer from `Idle` to
//! `Suppressed`; scroll reports are ignored until a fixed cooldown has passed,
//! after which it is `Idle` again on its own. One flag covers both directions.

use tokio::time::{Duration, Instant};

/// Scroll metrics and control for one rendering surface.
pub trait ScrollSurface {
    /// Current offset from the top
    fn scroll_offset(&self) -> f64;
    /// Total height of the content
    fn scrollable_extent(&self) -> f64;
    /// Height of the viewport
    fn visible_extent(&self) -> f64;
    fn set_scroll_offset(&mut self, offset: f64);
}

/// Distance the offset can travel, or `None` when the content fits the viewport.
pub fn scroll_range(surface: &dyn ScrollSurface) -> Option<f64> {
    let range = surface.scrollable_extent() - surface.visible_extent();
    (range > 0.0).then_some(range)
}

/// Offset as a fraction of the scroll range, in `[0, 1]`.
pub fn scroll_ratio(surface: &dyn ScrollSurface) -> Option<f64> {
    scroll_range(surface).map(|range| (surface.scroll_offset() / range).clamp(0.0, 1.0))
}

fn offset_for_ratio(surface: &dyn ScrollSurface, ratio: f64) -> f64 {
    scroll_range(surface).map_or(0.0, |range| ratio.clamp(0.0, 1.0) * range)
}

/// Both panes' positions as ratios.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollSnapshot {
    pub editor_ratio: f64,
    pub preview_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollSyncState {
    Idle,
    Suppressed,
}

/// Result of handling one scroll report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MirrorOutcome {
    /// Target moved to the source's ratio
    Mirrored { ratio: f64, target_offset: f64 },
    /// Report ignored: a programmatic write is still settling
    Suppressed,
    /// Source content fits its viewport, nothing to mirror
    ContentFits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
    Editor,
    Preview,
}

#[derive(Debug, Clone)]
pub struct ScrollSynchronizer {
    cooldown: Duration,
    suppressed_until: Option<Instant>,
    live: ScrollSnapshot,
}

impl ScrollSynchronizer {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            suppressed_until: None,
            live: ScrollSnapshot::default(),
        }
    }

    pub fn state(&self, now: Instant) -> ScrollSyncState {
        match self.suppressed_until {
            Some(until) if now < until => ScrollSyncState::Suppressed,
            _ => ScrollSyncState::Idle,
        }
    }

    /// Positions as of the last mirror, capture or restore.
    pub fn live_snapshot(&self) -> ScrollSnapshot {
        self.live
    }

    /// The user scrolled the editor: move the preview to match.
    pub fn editor_scrolled(
        &mut self,
        editor: &dyn ScrollSurface,
        preview: &mut dyn ScrollSurface,
        now: Instant,
    ) -> MirrorOutcome {
        self.mirror_from(Pane::Editor, editor, preview, now)
    }

    /// The user scrolled the preview: move the editor to match.
    pub fn preview_scrolled(
        &mut self,
        preview: &dyn ScrollSurface,
        editor: &mut dyn ScrollSurface,
        now: Instant,
    ) -> MirrorOutcome {
        self.mirror_from(Pane::Preview, preview, editor, now)
    }

    fn mirror_from(
        &mut self,
        from: Pane,
        source: &dyn ScrollSurface,
        target: &mut dyn ScrollSurface,
        now: Instant,
    ) -> MirrorOutcome {
        if self.state(now) == ScrollSyncState::Suppressed {
            return MirrorOutcome::Suppressed;
        }
        let Some(ratio) = scroll_ratio(source) else {
            return MirrorOutcome::ContentFits;
        };

        self.suppress(now);
        let target_offset = offset_for_ratio(target, ratio);
        target.set_scroll_offset(target_offset);

        // Both panes now sit at the source's ratio
        self.live = ScrollSnapshot {
            editor_ratio: ratio,
            preview_ratio: ratio,
        };
        log::trace!("Mirrored {from:?} scroll at ratio {ratio:.3}");

        MirrorOutcome::Mirrored {
            ratio,
            target_offset,
        }
    }

    /// Read both panes' current positions.
    ///
    /// A pane whose content fits its viewport keeps its last known ratio.
    pub fn capture(
        &mut self,
        editor: &dyn ScrollSurface,
        preview: &dyn ScrollSurface,
    ) -> ScrollSnapshot {
        self.live = ScrollSnapshot {
            editor_ratio: scroll_ratio(editor).unwrap_or(self.live.editor_ratio),
            preview_ratio: scroll_ratio(preview).unwrap_or(self.live.preview_ratio),
        };
        self.live
    }

    /// Put both panes back at the snapshot's ratios, measured against their
    /// current extents.
    pub fn restore(
        &mut self,
        snapshot: ScrollSnapshot,
        editor: &mut dyn ScrollSurface,
        preview: &mut dyn ScrollSurface,
        now: Instant,
    ) {
        self.suppress(now);
        let editor_offset = offset_for_ratio(editor, snapshot.editor_ratio);
        let preview_offset = offset_for_ratio(preview, snapshot.preview_ratio);
        editor.set_scroll_offset(editor_offset);
        preview.set_scroll_offset(preview_offset);
        self.live = snapshot;
    }

    fn suppress(&mut self, now: Instant) {
        self.suppressed_until = Some(now + self.cooldown);
    }
}

/// In-memory surface with fixed metrics, for headless use and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PaneMetrics {
    pub offset: f64,
    pub scrollable: f64,
    pub visible: f64,
}

impl PaneMetrics {
    pub fn new(scrollable: f64, visible: f64) -> Self {
        Self {
            offset: 0.0,
            scrollable,
            visible,
        }
    }
}

impl ScrollSurface for PaneMetrics {
    fn scroll_offset(&self) -> f64 {
        self.offset
    }

    fn scrollable_extent(&self) -> f64 {
        self.scrollable
    }

    fn visible_extent(&self) -> f64 {
        self.visible
    }

    fn set_scroll_offset(&mut self, offset: f64) {
        self.offset = offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: Duration = Duration::from_millis(10);

    /// Pane that counts programmatic writes.
    #[derive(Default)]
    struct RecordingPane {
        metrics: PaneMetrics,
        writes: usize,
    }

    impl RecordingPane {
        fn new(scrollable: f64, visible: f64) -> Self {
            Self {
                metrics: PaneMetrics::new(scrollable, visible),
                writes: 0,
            }
        }
    }

    impl ScrollSurface for RecordingPane {
        fn scroll_offset(&self) -> f64 {
            self.metrics.offset
        }
        fn scrollable_extent(&self) -> f64 {
            self.metrics.scrollable
        }
        fn visible_extent(&self) -> f64 {
            self.metrics.visible
        }
        fn set_scroll_offset(&mut self, offset: f64) {
            self.writes += 1;
            self.metrics.offset = offset;
        }
    }

    #[test]
    fn test_ratio_maps_between_different_heights() {
        let mut sync = ScrollSynchronizer::new(COOLDOWN);
        let now = Instant::now();
        // editor range 1000, preview range 3000
        let mut editor = PaneMetrics::new(1500.0, 500.0);
        let mut preview = PaneMetrics::new(3500.0, 500.0);
        editor.offset = 250.0;

        let outcome = sync.editor_scrolled(&editor, &mut preview, now);

        assert_eq!(
            outcome,
            MirrorOutcome::Mirrored {
                ratio: 0.25,
                target_offset: 750.0
            }
        );
        assert_eq!(preview.offset, 750.0);
        assert_eq!(sync.live_snapshot().editor_ratio, 0.25);
        assert_eq!(sync.live_snapshot().preview_ratio, 0.25);
    }

    #[test]
    fn test_content_fits_viewport_writes_nothing() {
        let mut sync = ScrollSynchronizer::new(COOLDOWN);
        let editor = RecordingPane::new(400.0, 500.0);
        let mut preview = RecordingPane::new(3000.0, 500.0);

        let outcome = sync.editor_scrolled(&editor, &mut preview, Instant::now());

        assert_eq!(outcome, MirrorOutcome::ContentFits);
        assert_eq!(preview.writes, 0);
        assert_eq!(sync.state(Instant::now()), ScrollSyncState::Idle);
    }

    #[test]
    fn test_short_target_is_pinned_to_top() {
        let mut sync = ScrollSynchronizer::new(COOLDOWN);
        let mut editor = PaneMetrics::new(2000.0, 500.0);
        editor.offset = 900.0;
        let mut preview = PaneMetrics::new(200.0, 500.0);

        sync.editor_scrolled(&editor, &mut preview, Instant::now());
        assert_eq!(preview.offset, 0.0);
    }

    #[test]
    fn test_repeated_ratio_does_not_drift() {
        let mut sync = ScrollSynchronizer::new(COOLDOWN);
        let start = Instant::now();
        let mut editor = PaneMetrics::new(1700.0, 600.0);
        let mut preview = PaneMetrics::new(4321.0, 600.0);
        editor.offset = 377.0;

        sync.editor_scrolled(&editor, &mut preview, start);
        let first = preview.offset;
        sync.editor_scrolled(&editor, &mut preview, start + COOLDOWN * 2);
        let second = preview.offset;

        assert_eq!(first, second);
    }

    #[test]
    fn test_echo_scroll_is_suppressed() {
        let mut sync = ScrollSynchronizer::new(COOLDOWN);
        let now = Instant::now();
        let mut editor = RecordingPane::new(2000.0, 500.0);
        let mut preview = RecordingPane::new(3000.0, 500.0);
        editor.metrics.offset = 300.0;

        // User scrolls editor; preview gets written
        assert!(matches!(
            sync.editor_scrolled(&editor, &mut preview, now),
            MirrorOutcome::Mirrored { .. }
        ));
        assert_eq!(preview.writes, 1);

        // The write makes the preview report a scroll within the cooldown
        let echo = sync.preview_scrolled(&preview, &mut editor, now + Duration::from_millis(3));

        assert_eq!(echo, MirrorOutcome::Suppressed);
        assert_eq!(editor.writes, 0, "no write back to the source");
        assert_eq!(editor.metrics.offset, 300.0);
    }

    #[test]
    fn test_suppression_clears_after_cooldown() {
        let mut sync = ScrollSynchronizer::new(COOLDOWN);
        let now = Instant::now();
        let mut editor = PaneMetrics::new(2000.0, 500.0);
        let mut preview = PaneMetrics::new(2000.0, 500.0);
        editor.offset = 100.0;

        sync.editor_scrolled(&editor, &mut preview, now);
        assert_eq!(sync.state(now), ScrollSyncState::Suppressed);
        assert_eq!(sync.state(now + COOLDOWN), ScrollSyncState::Idle);

        preview.offset = 750.0;
        let outcome = sync.preview_scrolled(&preview, &mut editor, now + COOLDOWN);
        assert!(matches!(outcome, MirrorOutcome::Mirrored { .. }));
        assert_eq!(editor.offset, 750.0);
    }

    #[test]
    fn test_suppression_blocks_same_direction_too() {
        let mut sync = ScrollSynchronizer::new(COOLDOWN);
        let now = Instant::now();
        let mut editor = RecordingPane::new(2000.0, 500.0);
        let mut preview = RecordingPane::new(2000.0, 500.0);

        sync.editor_scrolled(&editor, &mut preview, now);
        editor.metrics.offset = 800.0;
        let outcome = sync.editor_scrolled(&editor, &mut preview, now + Duration::from_millis(1));

        assert_eq!(outcome, MirrorOutcome::Suppressed);
        assert_eq!(preview.writes, 1);
    }

    #[test]
    fn test_capture_reads_both_panes_independently() {
        let mut sync = ScrollSynchronizer::new(COOLDOWN);
        let mut editor = PaneMetrics::new(1500.0, 500.0);
        let mut preview = PaneMetrics::new(2500.0, 500.0);
        editor.offset = 400.0;
        preview.offset = 1200.0;

        let snapshot = sync.capture(&editor, &preview);

        assert!((snapshot.editor_ratio - 0.4).abs() < 1e-9);
        assert!((snapshot.preview_ratio - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_capture_keeps_last_ratio_for_fitting_pane() {
        let mut sync = ScrollSynchronizer::new(COOLDOWN);
        let now = Instant::now();
        let mut editor = PaneMetrics::new(1500.0, 500.0);
        let mut preview = PaneMetrics::new(1500.0, 500.0);
        editor.offset = 500.0;
        sync.editor_scrolled(&editor, &mut preview, now);

        // Preview content collapses below its viewport
        preview.scrollable = 100.0;
        let snapshot = sync.capture(&editor, &preview);

        assert!((snapshot.preview_ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_restore_applies_ratios_to_new_extents() {
        let mut sync = ScrollSynchronizer::new(COOLDOWN);
        let now = Instant::now();
        let snapshot = ScrollSnapshot {
            editor_ratio: 0.4,
            preview_ratio: 0.6,
        };
        let mut editor = PaneMetrics::new(3000.0, 1000.0);
        let mut preview = PaneMetrics::new(6000.0, 1000.0);

        sync.restore(snapshot, &mut editor, &mut preview, now);

        assert!((editor.offset - 800.0).abs() < 1e-9);
        assert!((preview.offset - 3000.0).abs() < 1e-9);
        assert_eq!(sync.state(now), ScrollSyncState::Suppressed);
        assert_eq!(sync.live_snapshot(), snapshot);
    }
}
