pub mod config;
pub mod proxy;

pub use config::Config;
pub use proxy::{GateDecision, Lookahead, Relay, RelayStats, SniffResult};
