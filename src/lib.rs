#![allow(unused_assignments)] // thiserror/miette proc macros trigger false positives

pub mod cli;
pub mod clone;
pub mod config;
pub mod control;
pub mod error;
pub mod lease;
pub mod locator;
pub mod network;
pub mod outcome;
pub mod paths;
pub mod process;
pub mod status;
pub mod vmx;
