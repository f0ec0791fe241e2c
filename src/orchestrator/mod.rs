//! Application-level orchestration.
//!
//! This module owns the start/stop state machine, the fleet facade, the panel's
//! command loop and post-action processing. UI/CLI layers call into this module to
//! keep responsibilities separated.

#[cfg_attr(not(feature = "tui"), allow(dead_code))]
mod controller;
mod facade;
mod post_process;
mod toggle;

#[cfg_attr(not(feature = "tui"), allow(unused_imports))]
pub(crate) use controller::{run_controller, PanelCommand};
pub use facade::Fleet;
pub(crate) use post_process::process_action_completion;
