//! Connection flags shared by every command that talks to a server.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use regent::runtime::Method;
use regent::{Clock, ConfigError, Context, HttpTransport, RuntimeConfig, Transport};

use crate::error::{CliError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodArg {
    Post,
    Get,
}

impl From<MethodArg> for Method {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Post => Method::Post,
            MethodArg::Get => Method::Get,
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct ConnectArgs {
    /// TOML or JSON configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long = "base-url")]
    pub base_url: Option<String>,

    #[arg(long, value_enum)]
    pub method: Option<MethodArg>,

    #[arg(long = "csrf-token")]
    pub csrf_token: Option<String>,

    #[arg(long = "timeout-ms")]
    pub timeout_ms: Option<u64>,

    /// Global state sent with every call; repeatable.
    #[arg(long = "state", value_name = "KEY=VALUE")]
    pub state: Vec<String>,

    /// Fragment to start from, e.g. `t=6673&reason=audit`.
    #[arg(long)]
    pub fragment: Option<String>,
}

impl ConnectArgs {
    /// File values (or defaults), then flags, then validation.
    pub fn resolve_config(&self) -> Result<RuntimeConfig> {
        let mut config = match &self.config {
            Some(path) => RuntimeConfig::load(path)?,
            None => RuntimeConfig::default(),
        };
        if let Some(base_url) = &self.base_url {
            config.transport.base_url = if base_url.ends_with('/') {
                base_url.clone()
            } else {
                format!("{base_url}/")
            };
        }
        if let Some(method) = self.method {
            config.transport.method = method.into();
        }
        if let Some(token) = &self.csrf_token {
            config.transport.csrf_token = Some(token.clone());
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.transport.timeout_ms = timeout_ms;
        }
        let problems = config.validate();
        if !problems.is_empty() {
            return Err(ConfigError::Validation(problems).into());
        }
        Ok(config)
    }

    pub fn state_pairs(&self) -> Result<Vec<(String, String)>> {
        self.state.iter().map(|pair| parse_pair(pair)).collect()
    }

    /// A realtime session over HTTP.
    pub fn connect(&self) -> Result<Context> {
        let config = self.resolve_config()?;
        let transport = HttpTransport::new(&config.transport)?;
        tracing::info!(base_url = %config.transport.base_url, "connecting");
        self.build(config, transport, Clock::Realtime)
    }

    pub fn build(
        &self,
        config: RuntimeConfig,
        transport: impl Transport + 'static,
        clock: Clock,
    ) -> Result<Context> {
        let mut builder = Context::builder()
            .config(config)
            .transport(transport)
            .clock(clock);
        if let Some(fragment) = &self.fragment {
            builder = builder.fragment(fragment);
        }
        let ctx = builder.build()?;
        for (key, value) in self.state_pairs()? {
            ctx.set_state(&key, &value);
        }
        Ok(ctx)
    }
}

/// Split `key=value`; the key must not be empty.
pub fn parse_pair(pair: &str) -> Result<(String, String)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(CliError::invalid(format!("expected KEY=VALUE, got {pair:?}"))),
    }
}
