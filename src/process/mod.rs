//! Process tree core: nodes and their lifecycle.
//!
//! The only public types from this module are [`Process`], [`Signal`] and [`State`].
//!
//! Internal modules:
//! - [`id`]: process-wide unique id allocation;
//! - [`signal`]: one-shot broadcast signals (closing / done);
//! - [`state`]: the Running → Closing → Closed cell;
//! - [`node`]: the node itself, creation and the public API;
//! - [`idle`]: deferred close once a process is idle;
//! - [`teardown`]: breadth-first close propagation.

mod id;
mod idle;
mod node;
mod signal;
mod state;
mod teardown;

pub use node::Process;
pub use signal::Signal;
pub use state::State;
