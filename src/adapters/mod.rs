//! Port implementations.
//!
//! `live` talks to the real clock and network; `manual` is driven entirely
//! by the caller and is what the test-suite runs the engine against.

pub mod live;
pub mod manual;
