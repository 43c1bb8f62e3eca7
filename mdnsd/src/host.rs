use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use anyhow::{bail, Context, Result};
use shared::HostRecord;

/// Build the host record the responder answers A/AAAA queries from.
///
/// The hostname comes from `hostname_override` or the system; the addresses
/// are the first IPv4 and first IPv6 address of `interface`.
pub fn discover(hostname_override: Option<&str>, interface: &str, ttl: u32) -> Result<HostRecord> {
    let hostname = match hostname_override {
        Some(name) => name.to_string(),
        None => hostname::get()
            .context("Failed to get system hostname")?
            .to_string_lossy()
            .to_string(),
    };

    let hostname = hostname.trim();
    if hostname.is_empty() || hostname == "." {
        bail!("Hostname is empty");
    }

    let interfaces = if_addrs::get_if_addrs().context("Failed to enumerate network interfaces")?;
    let (ipv4, ipv6) = first_addresses(
        interfaces
            .iter()
            .filter(|iface| iface.name == interface)
            .map(|iface| iface.ip()),
    );

    if ipv4.is_none() && ipv6.is_none() {
        tracing::warn!("Interface {} has no addresses; host queries will go unanswered", interface);
    }

    let record = HostRecord::new(hostname, ipv4, ipv6, ttl);
    tracing::debug!(
        "Host record {} ipv4={:?} ipv6={:?}",
        record.hostname(),
        record.ipv4,
        record.ipv6
    );
    Ok(record)
}

/// First address of each family, in the order given.
fn first_addresses(addrs: impl IntoIterator<Item = IpAddr>) -> (Option<Ipv4Addr>, Option<Ipv6Addr>) {
    let mut ipv4 = None;
    let mut ipv6 = None;

    for addr in addrs {
        match addr {
            IpAddr::V4(v4) if ipv4.is_none() => ipv4 = Some(v4),
            IpAddr::V6(v6) if ipv6.is_none() => ipv6 = Some(v6),
            _ => {}
        }
    }

    (ipv4, ipv6)
}
