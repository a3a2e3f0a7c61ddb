//! Scenario tests for the client core.
//!
//! - `harness.rs`   - scripted transport, recording navigator and audit sink
//! - `retry.rs`     - bearer attachment and the 401 refresh-and-retry cycle
//! - `logout.rs`    - every logout trigger leaves storage empty
//! - `activity.rs`  - inactivity expiry on a paused clock
//! - `bootstrap.rs` - login, restore from partial storage, profile fallback
//! - `runtime.rs`   - wiring, status snapshot and the auth scope

mod activity;
mod logout;
