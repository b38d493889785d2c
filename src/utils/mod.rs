// @file: src/utils/mod.rs
// @description: Configuration loading and snapshot persistence.
// @author: LAS.

pub mod config;
pub mod snapshot;
