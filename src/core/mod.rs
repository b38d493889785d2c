// @file: src/core/mod.rs
// @description: Exports domain types, error taxonomy and session seams.
// @author: LAS.

pub mod errors;
pub mod interfaces;
pub mod models;
