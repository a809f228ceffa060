//! Converts TacO marker packs into the burrito json format.
//!
//! [`pack`] converts single marker documents. [`manager`] runs that over extracted packs, `.taco` archives and
//! the marker pack list.

pub mod config;
pub mod manager;
pub mod pack;
pub mod trace;
