//! valuebox-animation-core (engine-agnostic)
//!
//! Time source, easing curves and the single-shot [`Timeline`] used to move
//! value labels. A host advances timelines with explicit timestamps once per
//! rendered frame; nothing here schedules itself.

pub mod clock;
pub mod easing;
pub mod error;
pub mod ids;
pub mod timeline;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use easing::Easing;
pub use error::TimelineError;
pub use ids::{IdAllocator, TimelineId};
pub use timeline::{lerp_vec3, Timeline, TimelineState};
