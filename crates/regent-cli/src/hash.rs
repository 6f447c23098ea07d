//! Offline fragment inspection.

use std::io::Write;

use clap::{Args, Subcommand};
use regent::core::hash_state::keys;
use regent::{HashState, NodePath};
use serde_json::{Map, Value};

use crate::error::Result;

#[derive(Debug, Clone, Args)]
pub struct HashArgs {
    #[command(subcommand)]
    pub command: HashCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum HashCommand {
    /// Print the key/value pairs of a fragment.
    Parse {
        fragment: String,
        #[arg(long)]
        json: bool,
    },

    /// Set a key (delete it when no value is given) and print the result.
    Set {
        fragment: String,
        key: String,
        value: Option<String>,
    },

    /// Decode the open tree node stored under `t`.
    Path { fragment: String },
}

pub fn run_hash(args: HashArgs, out: &mut dyn Write) -> Result<()> {
    match args.command {
        HashCommand::Parse { fragment, json } => {
            let state = HashState::parse(&fragment);
            if json {
                let map: Map<String, Value> = state
                    .iter()
                    .map(|(k, v)| (k.to_owned(), Value::String(v.to_owned())))
                    .collect();
                writeln!(out, "{}", Value::Object(map))?;
            } else {
                for (key, value) in state.iter() {
                    writeln!(out, "{key}\t{value}")?;
                }
            }
        }
        HashCommand::Set {
            fragment,
            key,
            value,
        } => {
            let mut state = HashState::parse(&fragment);
            state.apply(&key, value.as_deref());
            writeln!(out, "{state}")?;
        }
        HashCommand::Path { fragment } => {
            let state = HashState::parse(&fragment);
            let path = match state.get(keys::TREE) {
                Some(token) => NodePath::from_token(token)?,
                None => NodePath::root(),
            };
            writeln!(out, "{path}")?;
        }
    }
    Ok(())
}
