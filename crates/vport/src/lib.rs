//! # vport
//!
//! Provisions an Open vSwitch internal port through the switch's
//! control database and places it inside a container's network
//! namespace.

#![warn(missing_docs)]

pub mod cli;
pub mod strategy;

pub use strategy::Ovs;
