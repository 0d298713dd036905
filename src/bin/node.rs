//! Runnable replica process: parses cluster membership from the command
//! line, binds a UDP transport, and starts the Raft core. Argument parsing,
//! socket setup, and stdout logging are the concerns the consensus core
//! deliberately leaves to its caller; this binary is their reference
//! implementation.

use clap::Parser;
use raftkv::transport::udp::UdpTransport;
use raftkv::{ClusterConfig, Replica};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::process;

/// A single replica in a static Raft key-value cluster.
#[derive(Parser, Debug)]
#[command(name = "node", about = "Run one replica of a Raft key-value cluster")]
struct Args {
    /// This replica's id, as it will appear in `src`/`dst`/`leader` fields.
    #[arg(long)]
    id: String,

    /// Local address to bind the UDP socket to, e.g. 127.0.0.1:9001.
    #[arg(long)]
    addr: SocketAddr,

    /// A peer in the cluster, given as `id=host:port`. Repeat once per peer.
    #[arg(long = "peer", value_parser = parse_peer)]
    peers: Vec<(String, SocketAddr)>,

    /// Tracing log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_peer(raw: &str) -> Result<(String, SocketAddr), String> {
    let (id, addr) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected `id=host:port`, got `{}`", raw))?;
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| format!("invalid peer address `{}`: {}", addr, e))?;
    Ok((id.to_string(), addr))
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let peer_ids: Vec<String> = args.peers.iter().map(|(id, _)| id.clone()).collect();
    let peer_addrs: HashMap<String, SocketAddr> = args.peers.into_iter().collect();

    let transport = match UdpTransport::bind(args.addr, peer_addrs) {
        Ok(t) => t,
        Err(err) => {
            tracing::error!(error = %err, "failed to bind transport");
            process::exit(1);
        }
    };

    let config = ClusterConfig { id: args.id, peer_ids };
    let mut replica = Replica::new(config, transport);
    replica.start();
}
