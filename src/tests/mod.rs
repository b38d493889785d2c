// @file: src/tests/mod.rs
// @description: Offline test suites driven by a scripted provider.
// @author: LAS.

mod orchestration;
