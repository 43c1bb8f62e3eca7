//! UDP multicast sockets for the responder and the client.
//!
//! All sockets are IPv6-only and speak to the link-local group `ff02::fb`.
//! An interface index of 0 lets the kernel pick the interface.

use std::ffi::CString;
use std::io;
use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6, UdpSocket};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use crate::protocol::{MDNS_GROUP_V6, MDNS_PORT};

const MULTICAST_HOPS: u32 = 255;

/// Resolve an interface name such as `eth0` to its index.
pub fn interface_index(name: &str) -> io::Result<u32> {
    let c_name = CString::new(name)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "interface name contains NUL"))?;

    let index = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
    if index == 0 {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no such interface: {}", name),
        ));
    }
    Ok(index)
}

/// Where queries and multicast answers go.
pub fn multicast_destination(ifindex: u32) -> SocketAddr {
    SocketAddr::V6(SocketAddrV6::new(MDNS_GROUP_V6, MDNS_PORT, 0, ifindex))
}

/// Socket bound to `[::]:port` and joined to the mDNS group, for listeners.
///
/// The returned socket is non-blocking so it can be handed to tokio.
pub fn open_multicast_socket(ifindex: u32, port: u16) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_only_v6(true)?;

    let bind_addr = SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, port, 0, 0));
    socket.bind(&SockAddr::from(bind_addr))?;

    socket.join_multicast_v6(&MDNS_GROUP_V6, ifindex)?;
    configure_multicast_send(&socket, ifindex)?;
    socket.set_nonblocking(true)?;

    tracing::debug!("Joined {} on interface index {} port {}", MDNS_GROUP_V6, ifindex, port);
    Ok(socket.into())
}

/// Socket on an ephemeral port that can send to the group, for one-shot queries.
pub fn open_query_socket(ifindex: u32) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_only_v6(true)?;

    let bind_addr = SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, 0, 0, 0));
    socket.bind(&SockAddr::from(bind_addr))?;

    configure_multicast_send(&socket, ifindex)?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}

fn configure_multicast_send(socket: &Socket, ifindex: u32) -> io::Result<()> {
    socket.set_multicast_hops_v6(MULTICAST_HOPS)?;
    if ifindex != 0 {
        socket.set_multicast_if_v6(ifindex)?;
    }
    Ok(())
}
