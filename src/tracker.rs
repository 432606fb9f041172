mod core_tracker;
mod error;
mod frame;
mod handle;
mod hybrid_tracker;
pub mod imgproc;
mod motion;
mod recovery;
mod rect;
mod signature;
mod smoother;
mod track_state;

#[cfg(test)]
pub(crate) mod test_util;

pub use core_tracker::{CORE_SCALES, CoreTracker};
pub use error::TrackError;
pub use frame::{Frame, GrayImage};
pub use handle::{HandleUpdate, TrackerHandle};
pub use hybrid_tracker::{HybridTracker, TrackResult, TrackerConfig, TrackerKind, TrackerStats};
pub use motion::MotionPredictor;
pub use recovery::{Candidate, RecoverySearch};
pub use rect::{BoundingBox, MIN_BOX_SIDE, Window};
pub use signature::{ScaledTemplate, Signature};
pub use smoother::Smoother;
pub use track_state::{HandleState, Status};
