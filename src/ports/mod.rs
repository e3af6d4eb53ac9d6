//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the simulator core and the
//! outside world (time, the upstream target). Implementations live in
//! `src/adapters/`.

pub mod clock;
pub mod upstream;

pub use clock::{Clock, SleepFuture};
pub use upstream::{Upstream, UpstreamFuture};
