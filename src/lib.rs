//! Translates the event stream of a multi-agent orchestration backend into
//! an ordered protocol stream a UI rendering layer can consume incrementally.

pub mod cli;
pub mod core;
pub mod parser;
pub mod translate;
pub mod upstream;
