use std::time::{Duration, Instant};

use tracing::debug;

use crate::utils::clipboard::Clipboard;

/// How long the copy affordance shows its confirmation.
pub const COPY_FEEDBACK: Duration = Duration::from_millis(2000);

/// State of one copy button.
///
/// A failed copy leaves the button idle; the failure is only logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyState {
    copied_at: Option<Instant>,
}

impl CopyState {
    pub fn copy(&mut self, clipboard: &dyn Clipboard, text: &str, now: Instant) -> bool {
        match clipboard.copy(text) {
            Ok(()) => {
                self.copied_at = Some(now);
                true
            }
            Err(err) => {
                debug!(error = %err, "copy failed");
                false
            }
        }
    }

    pub fn is_copied(&self, now: Instant) -> bool {
        self.copied_at
            .is_some_and(|at| now.saturating_duration_since(at) < COPY_FEEDBACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeClipboard {
        fail: bool,
        copied: RefCell<Vec<String>>,
    }

    impl Clipboard for FakeClipboard {
        fn copy(&self, text: &str) -> Result<(), String> {
            if self.fail {
                return Err("denied".into());
            }
            self.copied.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn confirmation_expires_after_feedback_window() {
        let clipboard = FakeClipboard::default();
        let mut state = CopyState::default();
        let t0 = Instant::now();
        assert!(state.copy(&clipboard, "fn main() {}", t0));
        assert!(state.is_copied(t0 + Duration::from_millis(1999)));
        assert!(!state.is_copied(t0 + COPY_FEEDBACK));
        assert_eq!(clipboard.copied.borrow().as_slice(), ["fn main() {}"]);
    }

    #[test]
    fn failed_copy_stays_idle() {
        let clipboard = FakeClipboard {
            fail: true,
            ..Default::default()
        };
        let mut state = CopyState::default();
        let now = Instant::now();
        assert!(!state.copy(&clipboard, "x", now));
        assert!(!state.is_copied(now));
    }
}
