//! In-memory doubles for exercising the placement engine end to end.
//!
//! Nothing here talks to a network or a database. Scenario tests under
//! `tests/` drive a real `OrderPlacer` over `MemLedgerStore` with a scripted
//! venue, so concurrency and failure paths run exactly as in production.

mod clock;
mod exchange;
mod harness;
mod publisher;
mod resolver;

pub use clock::ManualClock;
pub use exchange::{FakeExchange, ScriptedReply};
pub use harness::Harness;
pub use publisher::RecordingPublisher;
pub use resolver::StaticSpecResolver;
