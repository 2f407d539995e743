//! Mailbox Implementation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Write statistics for a mailbox
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailboxStats {
    /// Frames written since creation
    pub written: u64,
    /// Frames replaced before anyone cleared them
    pub overwritten: u64,
}

/// Single-slot, overwrite-on-write frame holder
pub struct FrameMailbox<T> {
    /// Current content
    slot: Mutex<Option<Arc<T>>>,
    /// Total frames written (for statistics)
    written: AtomicU64,
    /// Frames dropped by a later write
    overwritten: AtomicU64,
}

impl<T> FrameMailbox<T> {
    /// Create an empty mailbox
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            written: AtomicU64::new(0),
            overwritten: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<T>>> {
        // The slot holds no invariant a panicking writer could break.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the current content unconditionally.
    ///
    /// Returns `true` when an unread frame was dropped by this write.
    pub fn put(&self, frame: T) -> bool {
        let previous = self.lock().replace(Arc::new(frame));
        self.written.fetch_add(1, Ordering::Relaxed);

        if previous.is_some() {
            self.overwritten.fetch_add(1, Ordering::Relaxed);
            trace!("Mailbox frame overwritten");
            true
        } else {
            false
        }
    }

    /// Get a handle to the current frame, if any
    pub fn peek(&self) -> Option<Arc<T>> {
        self.lock().clone()
    }

    /// Drop the current content
    pub fn clear(&self) {
        self.lock().take();
    }

    /// Check if the mailbox holds no frame
    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }

    /// Get write statistics
    pub fn stats(&self) -> MailboxStats {
        MailboxStats {
            written: self.written.load(Ordering::Relaxed),
            overwritten: self.overwritten.load(Ordering::Relaxed),
        }
    }
}

impl<T> Default for FrameMailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_empty_mailbox() {
        let mailbox: FrameMailbox<u32> = FrameMailbox::new();
        assert!(mailbox.is_empty());
        assert!(mailbox.peek().is_none());
        assert_eq!(mailbox.stats(), MailboxStats::default());
    }

    #[test]
    fn test_last_write_wins() {
        let mailbox = FrameMailbox::new();

        assert!(!mailbox.put(1));
        assert!(mailbox.put(2));
        assert!(mailbox.put(3));

        assert_eq!(mailbox.peek().as_deref(), Some(&3));
        assert_eq!(mailbox.stats().written, 3);
        assert_eq!(mailbox.stats().overwritten, 2);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mailbox = FrameMailbox::new();
        mailbox.put(String::from("frame"));

        assert_eq!(mailbox.peek().as_deref().map(String::as_str), Some("frame"));
        assert_eq!(mailbox.peek().as_deref().map(String::as_str), Some("frame"));
    }

    #[test]
    fn test_reader_handle_survives_overwrite() {
        let mailbox = FrameMailbox::new();
        mailbox.put(vec![1u8, 2, 3]);

        let held = mailbox.peek().unwrap();
        mailbox.put(vec![9u8]);

        assert_eq!(*held, vec![1, 2, 3]);
        assert_eq!(mailbox.peek().as_deref(), Some(&vec![9]));
    }

    #[test]
    fn test_clear() {
        let mailbox = FrameMailbox::new();
        mailbox.put(7);
        mailbox.clear();

        assert!(mailbox.is_empty());
        // Clearing is not an overwrite
        assert!(!mailbox.put(8));
    }

    #[test]
    fn test_concurrent_writers() {
        let mailbox = Arc::new(FrameMailbox::new());

        let handles: Vec<_> = (0..4)
            .map(|w| {
                let mailbox = mailbox.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        mailbox.put(w * 1000 + i);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(mailbox.stats().written, 400);
        assert_eq!(mailbox.stats().overwritten, 399);
        assert!(mailbox.peek().is_some());
    }
}
