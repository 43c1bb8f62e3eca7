use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::Instant;
use anyhow::{Context, Result};
use shared::protocol::MAX_PACKET;
use shared::transport;

/// Interface index for `-i`, or 0 to let the kernel choose.
pub fn interface_index(interface: Option<&str>) -> Result<u32> {
    match interface {
        Some(name) => transport::interface_index(name)
            .with_context(|| format!("Failed to resolve interface {}", name)),
        None => Ok(0),
    }
}

/// Hand every datagram that arrives within `wait` to `on_packet`.
pub async fn receive_until<F>(socket: &UdpSocket, wait: Duration, mut on_packet: F)
where
    F: FnMut(&[u8], SocketAddr),
{
    let deadline = Instant::now() + wait;
    let mut buf = [0u8; MAX_PACKET];

    loop {
        match tokio::time::timeout_at(deadline, socket.recv_from(&mut buf)).await {
            Err(_) => break,
            Ok(Ok((len, src))) => on_packet(&buf[..len], src),
            Ok(Err(e)) => tracing::warn!("recv_from failed: {}", e),
        }
    }
}
