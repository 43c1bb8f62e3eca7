use std::time::Duration;
use clap::{Args, ValueEnum};
use tokio::net::UdpSocket;
use anyhow::{bail, Context, Result};
use shared::protocol::{type_name, TYPE_A, TYPE_AAAA, TYPE_SRV};
use shared::transport;
use shared::wire::{build_query, parse_message};
use crate::net;
use crate::output::ResponsePrinter;

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Hostname or service instance FQDN to resolve
    pub name: String,

    /// What to look up
    #[arg(short = 't', long = "type", value_enum, default_value_t = QueryKind::Hostname)]
    pub kind: QueryKind,

    /// IPv4 only (A records), hostname queries only
    #[arg(short = '4', long, conflicts_with = "ipv6")]
    pub ipv4: bool,

    /// IPv6 only (AAAA records), hostname queries only
    #[arg(short = '6', long)]
    pub ipv6: bool,

    /// Network interface to query on
    #[arg(short, long)]
    pub interface: Option<String>,

    /// Seconds to wait for responses
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub wait: u64,

    /// Print records as JSON lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueryKind {
    Hostname,
    Service,
    Ipv4,
    Ipv6,
}

/// Record types to ask for. `-4`/`-6` only narrow a hostname query.
fn query_types(kind: QueryKind, ipv4_only: bool, ipv6_only: bool) -> Result<Vec<u16>> {
    if kind != QueryKind::Hostname && (ipv4_only || ipv6_only) {
        bail!("-4/-6 only apply to --type hostname");
    }

    Ok(match kind {
        QueryKind::Service => vec![TYPE_SRV],
        QueryKind::Ipv4 => vec![TYPE_A],
        QueryKind::Ipv6 => vec![TYPE_AAAA],
        QueryKind::Hostname if ipv4_only => vec![TYPE_A],
        QueryKind::Hostname if ipv6_only => vec![TYPE_AAAA],
        QueryKind::Hostname => vec![TYPE_A, TYPE_AAAA],
    })
}

/// Bare hostnames live in `.local`; service names are sent as given.
fn query_name(kind: QueryKind, name: &str) -> String {
    if kind != QueryKind::Service && !name.contains('.') {
        format!("{}.local", name)
    } else {
        name.to_string()
    }
}

/// Send the query and print every response. Returns whether any arrived.
pub async fn run(args: QueryArgs) -> Result<bool> {
    let qtypes = query_types(args.kind, args.ipv4, args.ipv6)?;
    let name = query_name(args.kind, &args.name);
    let ifindex = net::interface_index(args.interface.as_deref())?;

    let socket = transport::open_query_socket(ifindex).context("Failed to open query socket")?;
    let socket = UdpSocket::from_std(socket).context("Failed to register query socket")?;
    let dest = transport::multicast_destination(ifindex);

    for qtype in qtypes {
        let packet = build_query(&name, qtype, true)
            .with_context(|| format!("Invalid query name: {}", name))?;
        socket
            .send_to(&packet, dest)
            .await
            .with_context(|| format!("Failed to send {} query", type_name(qtype)))?;
        tracing::debug!("Sent {} query for {}", type_name(qtype), name);
    }

    let mut responses = 0usize;
    net::receive_until(&socket, Duration::from_secs(args.wait), |packet, src| {
        let message = match parse_message(packet) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("Ignoring malformed packet from {}: {}", src, e);
                return;
            }
        };
        if !message.header.is_response() {
            return;
        }

        responses += 1;
        let mut printer = ResponsePrinter::new(src, args.json);
        for record in message.records() {
            printer.print(record);
        }
    })
    .await;

    if responses == 0 && !args.json {
        println!("No responses for {} within {} second(s)", name, args.wait);
    }
    Ok(responses > 0)
}
