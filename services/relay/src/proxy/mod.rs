//! JA4-gated TCP relay pipeline.
//!
//! ## Architecture
//!
//! ```text
//! Client -> Accept Loop -> Dial Upstream -> Sniff first record -> JA4 Gate -> Forwarder -> Upstream
//!                              |                  |                   |
//!                        (dial fails: drop)  (not TLS: skip gate) (deny: drop)
//! ```
//!
//! Detection is non-destructive: the bytes examined stay buffered and are
//! replayed to the upstream when forwarding begins, so an admitted or
//! passed-through stream reaches the upstream byte-identical to what the
//! client sent.

mod forward;
mod gate;
mod listener;
mod lookahead;
mod sniff;

pub use gate::{evaluate, GateDecision};
pub use listener::{Relay, RelayStats};
pub use lookahead::Lookahead;
pub use sniff::{sniff_client_hello, SniffResult};
