pub mod clock;
pub mod error;
pub mod merge;
pub mod player;
pub mod reset;
pub mod tag;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CoreError;
pub use merge::merge_snapshots;
pub use player::*;
pub use reset::{DailyReset, next_reset_instant};
pub use tag::PlayerTag;
