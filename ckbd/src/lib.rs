//! Library crate for `ckbd`: the device-node filesystem layer, the
//! command-interpreter state machine, and the frame-loop orchestration all
//! live here so `tests/` integration tests and `src/main.rs` share one copy.

pub mod config;
pub mod daemon;
pub mod error;
pub mod events;
pub mod fifo;
pub mod hotplug;
pub mod input;
pub mod interpreter;
pub mod keymap;
pub mod node;
pub mod state;
pub mod usb;

#[cfg(feature = "fixtures")]
pub mod testutil;
