// src/display/mod.rs
//! Output for the human operator. The engine itself never prints.

pub mod terminal;

pub use terminal::TerminalReporter;
