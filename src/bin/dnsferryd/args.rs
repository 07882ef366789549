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

//! Implements command-line argument parsing.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};

use dnsferry::resolver::ForwardingStrategy;

/// Parses the command line arguments.
pub fn parse() -> Args {
    Args::parse()
}

/// The dnsferry forwarding DNS server
#[derive(Debug, Parser)]
#[command(author, version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the server
    Run(RunArgs),
}

#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Set the configuration file to use
    #[arg(
        long,
        conflicts_with_all = [
            "bind",
            "ip",
            "port",
            "resolver",
            "local",
            "timeout",
            "strategy",
            "answer_address",
        ],
        value_name = "FILE"
    )]
    pub config: Option<PathBuf>,

    /// Set the server bind IP address and port
    #[arg(long, value_name = "IP:PORT")]
    pub bind: Option<SocketAddr>,

    /// Set the server bind IP address
    #[arg(long, conflicts_with = "bind", value_name = "IP")]
    pub ip: Option<IpAddr>,

    /// Set the server port
    #[arg(long, conflicts_with = "bind", value_name = "PORT")]
    pub port: Option<u16>,

    /// Set the upstream resolver to forward queries to
    #[arg(long, conflicts_with = "local", value_name = "HOST:PORT")]
    pub resolver: Option<UpstreamAddr>,

    /// Answer every query locally instead of forwarding it
    #[arg(long)]
    pub local: bool,

    /// Set how long to wait for each upstream reply
    #[arg(
        long,
        conflicts_with = "local",
        value_name = "MILLISECONDS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: Option<u64>,

    /// Set how the questions of a query are forwarded
    #[arg(long, conflicts_with = "local", value_name = "sequential|parallel")]
    pub strategy: Option<ForwardingStrategy>,

    /// Set the address given in locally generated answers
    #[arg(long, value_name = "IPV4")]
    pub answer_address: Option<Ipv4Addr>,
}

/// The address of an upstream resolver, given as `HOST:PORT`. Host
/// names are resolved when this is parsed, and the first address found
/// is used.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UpstreamAddr(pub SocketAddr);

impl FromStr for UpstreamAddr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut addrs = s
            .to_socket_addrs()
            .map_err(|e| format!("failed to resolve {}: {}", s, e))?;
        addrs
            .next()
            .map(Self)
            .ok_or_else(|| format!("{} did not resolve to any address", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_run(args: &[&str]) -> Result<RunArgs, clap::Error> {
        let args = Args::try_parse_from(["dnsferryd", "run"].iter().chain(args))?;
        match args.command {
            Command::Run(run_args) => Ok(run_args),
        }
    }

    #[test]
    fn run_accepts_forwarding_options() {
        let args = parse_run(&[
            "--bind",
            "127.0.0.1:5353",
            "--resolver",
            "192.0.2.1:53",
            "--timeout",
            "500",
            "--strategy",
            "parallel",
        ])
        .unwrap();
        assert_eq!(args.bind, Some("127.0.0.1:5353".parse().unwrap()));
        assert_eq!(
            args.resolver,
            Some(UpstreamAddr("192.0.2.1:53".parse().unwrap()))
        );
        assert_eq!(args.timeout, Some(500));
        assert_eq!(args.strategy, Some(ForwardingStrategy::Parallel));
        assert!(!args.local);
    }

    #[test]
    fn run_rejects_conflicting_options() {
        for args in [
            &["--config", "dnsferry.toml", "--port", "53"][..],
            &["--bind", "127.0.0.1:53", "--ip", "::1"],
            &["--local", "--resolver", "192.0.2.1:53"],
            &["--timeout", "0"],
            &["--strategy", "random"],
        ] {
            assert!(parse_run(args).is_err(), "accepted {:?}", args);
        }
    }

    #[test]
    fn run_accepts_local_mode() {
        let args = parse_run(&["--local", "--answer-address", "192.0.2.7"]).unwrap();
        assert!(args.local);
        assert_eq!(args.answer_address, Some(Ipv4Addr::new(192, 0, 2, 7)));
    }

    #[test]
    fn upstream_addr_requires_a_port() {
        assert!("192.0.2.1".parse::<UpstreamAddr>().is_err());
        assert_eq!(
            "[2001:db8::1]:53".parse::<UpstreamAddr>(),
            Ok(UpstreamAddr("[2001:db8::1]:53".parse().unwrap())),
        );
    }
}
