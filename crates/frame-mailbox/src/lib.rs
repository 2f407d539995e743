//! Frame Mailbox
//!
//! Single-slot holder for the most recent video frame. Writers never block
//! and never queue: a new frame replaces whatever was there before. Readers
//! get a shared handle to an immutable frame, so a concurrent overwrite never
//! invalidates a frame that is already being analyzed or streamed.

mod mailbox;

pub use mailbox::{FrameMailbox, MailboxStats};
