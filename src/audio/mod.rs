//! Audio sink management.
//!
//! This module contains the sink state machine and the `pactl` command
//! layer used to realize audio modes on the external audio server.

pub mod controller;
pub mod pactl;
