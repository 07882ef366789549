// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Implements the server configuration file.

use std::fmt;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::Level::Debug;
use log::{debug, log_enabled};
use paste::paste;
use serde::{de, Deserialize};

use dnsferry::resolver::{ForwardingStrategy, Resolver, StaticRecordProvider, UdpTransport};

use crate::args::{RunArgs, UpstreamAddr};

////////////////////////////////////////////////////////////////////////
// CONFIGURATION LOADING                                              //
////////////////////////////////////////////////////////////////////////

/// Loads the server configuration from the file given by `path`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let raw_config =
        fs::read_to_string(path.as_ref()).context("failed to read the configuration file")?;
    let config = parse(&raw_config)?;
    log_config_summary(&config);
    Ok(config)
}

/// Loads the server configuration from the parsed command line
/// arguments given by `args`.
pub fn load_from_args(args: RunArgs) -> Config {
    let bind = args.bind.unwrap_or_else(|| {
        let ip = args.ip.unwrap_or(DEFAULT_BIND_IP);
        let port = args.port.unwrap_or(DEFAULT_BIND_PORT);
        SocketAddr::new(ip, port)
    });

    let upstream = if args.local {
        None
    } else {
        Some(UpstreamConfig {
            address: args
                .resolver
                .map_or_else(default_upstream_address, ConfigUpstreamAddr),
            timeout: args.timeout.unwrap_or(DEFAULT_UPSTREAM_TIMEOUT),
            strategy: args.strategy.map_or_else(default_strategy, ConfigStrategy),
        })
    };

    let config = Config {
        bind,
        upstream,
        local: LocalConfig {
            address: args.answer_address.unwrap_or(default_answer_address()),
            ttl: default_answer_ttl(),
        },
    };
    log_config_summary(&config);
    config
}

/// Parses the text of a configuration file.
fn parse(text: &str) -> Result<Config> {
    toml::from_str(text).context("failed to parse the configuration file")
}

/// Summarizes the configuration in the log, if the debug log level is
/// enabled.
fn log_config_summary(config: &Config) {
    if !log_enabled!(Debug) {
        // Don't compute the message if it will never be printed.
        return;
    }

    let upstream = match config.upstream {
        Some(ref upstream) => format!(
            "{} ({} ms timeout, {})",
            upstream.address.0 .0, upstream.timeout, upstream.strategy.0,
        ),
        None => String::from("none (answering locally)"),
    };
    debug!(
        "Configuration loaded:\n\
         Bind address:  {}\n\
         Upstream:      {}\n\
         Local answers: {} (TTL {})",
        config.bind, upstream, config.local.address, config.local.ttl,
    );
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION FILE STRUCTURE                                       //
////////////////////////////////////////////////////////////////////////

/// The complete configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    pub upstream: Option<UpstreamConfig>,
    #[serde(default)]
    pub local: LocalConfig,
}

impl Config {
    /// Builds the [`Resolver`] this configuration describes.
    pub fn resolver(&self) -> Result<Resolver> {
        match self.upstream {
            Some(ref upstream) => {
                let timeout = Duration::from_millis(upstream.timeout);
                let transport = UdpTransport::new(upstream.address.0 .0, timeout)
                    .ok_or_else(|| anyhow!("the upstream timeout must be non-zero"))?;
                Ok(Resolver::upstream(transport, upstream.strategy.0))
            }
            None => Ok(Resolver::local(StaticRecordProvider::new(
                self.local.address,
                self.local.ttl.into(),
            ))),
        }
    }
}

const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
const DEFAULT_BIND_PORT: u16 = 2053;

fn default_bind() -> SocketAddr {
    SocketAddr::new(DEFAULT_BIND_IP, DEFAULT_BIND_PORT)
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION SECTION: UPSTREAM                                    //
////////////////////////////////////////////////////////////////////////

/// The configuration of the upstream resolver. If this is absent,
/// queries are answered locally.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_address")]
    pub address: ConfigUpstreamAddr,
    #[serde(default = "default_upstream_timeout")]
    pub timeout: u64,
    #[serde(default = "default_strategy")]
    pub strategy: ConfigStrategy,
}

const DEFAULT_UPSTREAM_TIMEOUT: u64 = 2000;

fn default_upstream_address() -> ConfigUpstreamAddr {
    ConfigUpstreamAddr(UpstreamAddr(SocketAddr::new(
        IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
        53,
    )))
}

fn default_upstream_timeout() -> u64 {
    DEFAULT_UPSTREAM_TIMEOUT
}

fn default_strategy() -> ConfigStrategy {
    ConfigStrategy(ForwardingStrategy::default())
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION SECTION: LOCAL ANSWERS                               //
////////////////////////////////////////////////////////////////////////

/// The configuration of the placeholder answers given when not
/// forwarding.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalConfig {
    #[serde(default = "default_answer_address")]
    pub address: Ipv4Addr,
    #[serde(default = "default_answer_ttl")]
    pub ttl: u32,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            address: default_answer_address(),
            ttl: default_answer_ttl(),
        }
    }
}

fn default_answer_address() -> Ipv4Addr {
    StaticRecordProvider::DEFAULT_ADDRESS
}

fn default_answer_ttl() -> u32 {
    StaticRecordProvider::DEFAULT_TTL
}

////////////////////////////////////////////////////////////////////////
// WRAPPERS OVER DNSFERRY TYPES FOR SERDE                             //
////////////////////////////////////////////////////////////////////////

/// Generates a deserializable `ConfigX` structure wrapping an `X` type,
/// using its [`FromStr`](std::str::FromStr) implementation.
macro_rules! make_serde_wrapper {
    ($wrapper:ident, $over:ty, $description:literal) => {
        /// A macro-generated deserializable wrapper.
        #[derive(Clone, Debug)]
        pub struct $wrapper(pub $over);

        impl<'de> Deserialize<'de> for $wrapper {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: de::Deserializer<'de>,
            {
                deserializer.deserialize_str(paste! { [<$wrapper Visitor>] })
            }
        }

        paste! {
            /// A macro-generated [`Visitor`](de::Visitor).
            #[derive(Debug)]
            struct [<$wrapper Visitor>];
        }

        impl<'de> de::Visitor<'de> for paste! { [<$wrapper Visitor>] } {
            type Value = $wrapper;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str($description)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                value
                    .parse()
                    .map($wrapper)
                    .map_err(|e| E::custom(format!("invalid {}: {}", $description, e)))
            }
        }
    };
}

make_serde_wrapper!(ConfigUpstreamAddr, UpstreamAddr, "upstream address");
make_serde_wrapper!(ConfigStrategy, ForwardingStrategy, "forwarding strategy");
