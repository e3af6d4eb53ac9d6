//! Caller-driven adapters: a clock that only moves when told to and an
//! upstream that answers from a script.

pub mod clock;
pub mod upstream;

pub use clock::ManualClock;
pub use upstream::{ScriptedReply, ScriptedUpstream};
