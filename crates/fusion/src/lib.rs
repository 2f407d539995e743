//! Driver Status Fusion
//!
//! Folds the per-detector readings into one `AggregateSnapshot`:
//! - Drowsiness level hysteresis and the derived alert status
//! - Bounded emotion / heart-rate histories
//! - Latched phone detection time
//!
//! `AggregationStore` is the only way to mutate the snapshot; readers get
//! independent copies.

pub mod history;
pub mod snapshot;
pub mod store;

pub use history::{History, HISTORY_CAPACITY};
pub use snapshot::{
    AggregateSnapshot, AlertStatus, DrowsinessData, DrowsinessStatus, EmotionRecord,
    EmotionStatus, HeartRateRecord, HeartRateView, PhoneStatus, MAX_DROWSINESS_LEVEL,
};
pub use store::{AggregationStore, SnapshotObserver};
