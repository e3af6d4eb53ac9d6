//! Live adapters for real external interactions.

pub mod clock;
pub mod upstream;

pub use clock::LiveClock;
pub use upstream::LiveUpstream;
