//! Processing-mode decision engine.
//!
//! Decides from all classified inputs whether they can be joined by stream
//! copy (`Remux`) or must first be re-encoded to a common AAC target, and
//! computes that target.

mod batch;
mod decide;
mod types;

pub use batch::MergeBatch;
pub use decide::{clamp_bitrate, decide, snap_sample_rate, AAC_SAMPLE_RATES};
pub use types::{ProcessingMode, TargetCodec};
