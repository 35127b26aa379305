//! Hydrant Gate - Sliding-Window Admission Control
//!
//! This crate decides whether a unit of work may be performed right now, based on
//! per-actor trailing-window counters. A single-actor policy gates one fixed actor;
//! a multi-actor policy admits through any actor that currently qualifies and
//! spreads the load across them at random.

pub mod config;
pub mod error;
pub mod gate;
pub mod store;
