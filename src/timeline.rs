//! Timeline: the logical clock, its time sources and the driver that
//! advances both subsystems against it.

mod clock;
mod driver;
mod time;

pub use clock::{ManualClock, TimeSource, WallClock};
pub use driver::{AbortReason, DriverState, RunMode, TickOutcome, TimelineDriver};
pub use time::TimeIndex;
