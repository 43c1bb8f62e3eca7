use std::time::Duration;
use clap::Args;
use tokio::net::UdpSocket;
use anyhow::{bail, Context, Result};
use shared::protocol::{MDNS_PORT, TYPE_A, TYPE_AAAA, TYPE_PTR, TYPE_SRV, TYPE_TXT};
use shared::transport;
use shared::wire::{build_query, parse_message, ResourceRecord};
use crate::net;
use crate::output::ResponsePrinter;

#[derive(Args, Debug)]
pub struct BrowseArgs {
    /// Service type to browse, e.g. _http._tcp
    pub service_type: String,

    /// Seconds to wait for responses
    #[arg(short, long, default_value_t = 2, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub wait: u64,

    /// Network interface to browse on
    #[arg(short, long)]
    pub interface: Option<String>,

    /// Print records as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// `_http._tcp` becomes `_http._tcp.local`; an existing `.local` suffix is kept.
fn browse_name(service_type: &str) -> Result<String> {
    let service_type = service_type.trim_end_matches('.');
    if service_type.is_empty() {
        bail!("Service type is empty");
    }

    let has_local = service_type.len() >= 6
        && service_type
            .get(service_type.len() - 6..)
            .is_some_and(|suffix| suffix.eq_ignore_ascii_case(".local"));

    if has_local {
        Ok(service_type.to_string())
    } else {
        Ok(format!("{}.local", service_type))
    }
}

/// PTR records only count when they belong to the browsed type; other
/// address and service records are always shown.
fn is_browse_record(record: &ResourceRecord, browsed: &str) -> bool {
    match record.rtype {
        TYPE_PTR => record.name.eq_ignore_ascii_case(browsed),
        TYPE_SRV | TYPE_TXT | TYPE_A | TYPE_AAAA => true,
        _ => false,
    }
}

/// Send one PTR query to the group and print what comes back. Returns
/// whether anything was printed.
pub async fn run(args: BrowseArgs) -> Result<bool> {
    let name = browse_name(&args.service_type)?;
    let ifindex = net::interface_index(args.interface.as_deref())?;

    let socket = transport::open_multicast_socket(ifindex, MDNS_PORT)
        .context("Failed to open mDNS socket")?;
    let socket = UdpSocket::from_std(socket).context("Failed to register mDNS socket")?;

    let packet = build_query(&name, TYPE_PTR, false)
        .with_context(|| format!("Invalid service type: {}", args.service_type))?;
    socket
        .send_to(&packet, transport::multicast_destination(ifindex))
        .await
        .context("Failed to send PTR query")?;

    tracing::debug!("Browsing {} for {} second(s) on interface index {}", name, args.wait, ifindex);
    if !args.json {
        println!("Query sent: PTR {}", name);
    }

    let mut total = 0usize;
    net::receive_until(&socket, Duration::from_secs(args.wait), |packet, src| {
        let message = match parse_message(packet) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("Ignoring malformed packet from {}: {}", src, e);
                return;
            }
        };
        // Our own query loops back on the group.
        if !message.header.is_response() {
            return;
        }

        let mut printer = ResponsePrinter::new(src, args.json);
        for record in message.records().filter(|r| is_browse_record(r, &name)) {
            printer.print(record);
        }
        total += printer.printed();
    })
    .await;

    if total == 0 {
        println!("No responses for {} within {} second(s)", name, args.wait);
    }
    Ok(total > 0)
}
