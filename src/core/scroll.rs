/// Distance from the bottom, in pixels or rows, still treated as "at the bottom".
pub const NEAR_BOTTOM_THRESHOLD: u32 = 100;

/// What the view should do with its scroll position after new content lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAction {
    ScrollToBottom,
    /// Keep the current offset; `show_jump` surfaces the jump-to-bottom control.
    Preserve { show_jump: bool },
}

/// Tracks whether the viewport was near the bottom before the last update.
#[derive(Debug, Clone)]
pub struct ScrollTracker {
    threshold: u32,
    near_bottom: bool,
    searching: bool,
}

impl Default for ScrollTracker {
    fn default() -> Self {
        Self::new(NEAR_BOTTOM_THRESHOLD)
    }
}

impl ScrollTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            near_bottom: true,
            searching: false,
        }
    }

    /// Record the viewport geometry after the user scrolls or the view resizes.
    pub fn on_viewport(&mut self, scroll_top: u32, scroll_height: u32, client_height: u32) {
        let bottom = scroll_top.saturating_add(client_height);
        let distance = scroll_height.saturating_sub(bottom);
        self.near_bottom = distance < self.threshold;
    }

    pub fn set_searching(&mut self, searching: bool) {
        self.searching = searching;
    }

    pub fn is_near_bottom(&self) -> bool {
        self.near_bottom
    }

    /// Decide the scroll action for a content update.
    pub fn after_update(&self) -> ScrollAction {
        if self.searching {
            return ScrollAction::Preserve { show_jump: false };
        }
        if self.near_bottom {
            ScrollAction::ScrollToBottom
        } else {
            ScrollAction::Preserve { show_jump: true }
        }
    }

    /// The user asked to jump; the next update follows the bottom again.
    pub fn jump_to_bottom(&mut self) {
        self.near_bottom = true;
    }
}
