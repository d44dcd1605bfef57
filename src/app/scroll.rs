// streamchat - A terminal chat client for streaming model endpoints
// Copyright (C) 2025  Simon Peter Rothgang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Decides whether a content mutation should pull the chat view to the
//! bottom, without fighting a user who is reading further up.

/// Rows from the bottom that still count as "at the bottom" when idle.
pub const IDLE_FOLLOW_ROWS: usize = 3;
/// Tighter bound while an answer streams in, so a user skimming upward
/// is not yanked back down.
pub const STREAMING_FOLLOW_ROWS: usize = 2;
/// A user scroll ending farther than this from the bottom detaches the view.
pub const DETACH_ROWS: usize = 6;

/// Geometry of the chat viewport, in wrapped rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollMetrics {
    pub content_height: usize,
    pub viewport_height: usize,
    pub offset: usize,
}

impl ScrollMetrics {
    #[must_use]
    pub fn max_offset(&self) -> usize {
        self.content_height.saturating_sub(self.viewport_height)
    }

    #[must_use]
    pub fn distance_from_bottom(&self) -> usize {
        self.max_offset().saturating_sub(self.offset)
    }

    #[must_use]
    pub fn is_within(&self, rows: usize) -> bool {
        self.distance_from_bottom() <= rows
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAction {
    ScrollToBottom,
    Stay,
}

/// Whether the user has moved away from the live end of the transcript.
///
/// Jumps to the bottom write the offset directly and never come back as
/// terminal events, so every scroll event seen here is user input.
#[derive(Debug, Default)]
pub struct ScrollTracker {
    user_scrolled_away: bool,
}

impl ScrollTracker {
    #[must_use]
    pub fn user_scrolled_away(&self) -> bool {
        self.user_scrolled_away
    }

    /// Called after every content mutation.
    #[must_use]
    pub fn on_mutation(&self, force: bool, streaming: bool, metrics: ScrollMetrics) -> ScrollAction {
        if force {
            return ScrollAction::ScrollToBottom;
        }
        let near = if streaming {
            !self.user_scrolled_away && metrics.is_within(STREAMING_FOLLOW_ROWS)
        } else {
            metrics.is_within(IDLE_FOLLOW_ROWS)
        };
        if near { ScrollAction::ScrollToBottom } else { ScrollAction::Stay }
    }

    /// Called for every user-driven scroll (wheel, keys) after it moved the view.
    pub fn on_scroll_event(&mut self, streaming: bool, metrics: ScrollMetrics) {
        if !streaming {
            return;
        }
        if metrics.is_within(DETACH_ROWS) {
            if self.user_scrolled_away {
                tracing::debug!("scroll intent: user returned to bottom");
            }
            self.user_scrolled_away = false;
            return;
        }
        if !self.user_scrolled_away {
            tracing::debug!(
                distance = metrics.distance_from_bottom(),
                "scroll intent: user scrolled away"
            );
            self.user_scrolled_away = true;
        }
    }

    pub fn reset_for_session(&mut self) {
        self.user_scrolled_away = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn at_distance(distance: usize) -> ScrollMetrics {
        ScrollMetrics { content_height: 100, viewport_height: 20, offset: 80 - distance }
    }

    #[test]
    fn forced_mutation_always_scrolls() {
        let mut tracker = ScrollTracker::default();
        tracker.user_scrolled_away = true;
        assert_eq!(tracker.on_mutation(true, true, at_distance(50)), ScrollAction::ScrollToBottom);
        assert_eq!(tracker.on_mutation(true, false, at_distance(50)), ScrollAction::ScrollToBottom);
    }

    #[test]
    fn idle_uses_loose_threshold() {
        let tracker = ScrollTracker::default();
        assert_eq!(tracker.on_mutation(false, false, at_distance(3)), ScrollAction::ScrollToBottom);
        assert_eq!(tracker.on_mutation(false, false, at_distance(4)), ScrollAction::Stay);
    }

    #[test]
    fn streaming_uses_tight_threshold() {
        let tracker = ScrollTracker::default();
        assert_eq!(tracker.on_mutation(false, true, at_distance(2)), ScrollAction::ScrollToBottom);
        assert_eq!(tracker.on_mutation(false, true, at_distance(3)), ScrollAction::Stay);
    }

    #[test]
    fn scrolled_away_never_scrolls_while_streaming() {
        let mut tracker = ScrollTracker::default();
        tracker.user_scrolled_away = true;
        for distance in [0, 1, 2, 10, 80] {
            assert_eq!(tracker.on_mutation(false, true, at_distance(distance)), ScrollAction::Stay);
        }
    }

    #[test]
    fn scroll_far_from_bottom_detaches_immediately() {
        let mut tracker = ScrollTracker::default();
        tracker.on_scroll_event(true, at_distance(20));
        assert!(tracker.user_scrolled_away());
    }

    #[test]
    fn detached_view_stays_put_on_the_next_chunk() {
        let mut tracker = ScrollTracker::default();
        tracker.on_scroll_event(true, at_distance(13));
        assert_eq!(tracker.on_mutation(false, true, at_distance(13)), ScrollAction::Stay);
    }

    #[test]
    fn returning_near_bottom_reattaches() {
        let mut tracker = ScrollTracker::default();
        tracker.on_scroll_event(true, at_distance(30));
        assert!(tracker.user_scrolled_away());
        tracker.on_scroll_event(true, at_distance(6));
        assert!(!tracker.user_scrolled_away());
    }

    #[test]
    fn idle_scroll_events_do_not_change_intent() {
        let mut tracker = ScrollTracker::default();
        tracker.on_scroll_event(false, at_distance(40));
        assert!(!tracker.user_scrolled_away());
    }

    #[test]
    fn new_session_resets_intent() {
        let mut tracker = ScrollTracker::default();
        tracker.on_scroll_event(true, at_distance(40));
        tracker.reset_for_session();
        assert!(!tracker.user_scrolled_away());
    }

    #[test]
    fn short_content_is_always_at_bottom() {
        let metrics = ScrollMetrics { content_height: 5, viewport_height: 20, offset: 0 };
        assert_eq!(metrics.distance_from_bottom(), 0);
        assert_eq!(metrics.max_offset(), 0);
    }
}
