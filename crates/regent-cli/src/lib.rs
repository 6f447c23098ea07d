#![forbid(unsafe_code)]

//! `regentctl`: inspect fragments and drive render calls, trees and tables
//! against a live server from the command line.

pub mod cli;
pub mod error;
pub mod hash;
pub mod layout;
pub mod poll;
pub mod session;
pub mod table;
pub mod tree;

pub use cli::run_from_env;
pub use error::{CliError, Result};
