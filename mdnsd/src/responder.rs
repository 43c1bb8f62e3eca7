use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use anyhow::Result;
use shared::protocol::{type_name, MAX_PACKET};
use shared::transport::multicast_destination;
use shared::wire::{
    build_host_response, build_service_response, parse_query, BuildOutcome, Header,
    ResponseOptions,
};
use shared::{resolve, DnsQuestion, HostRecord, Resolution, ServiceRegistry};
use crate::config::ReplyMode;

/// A response ready to go out.
#[derive(Debug)]
pub struct Answer {
    /// Bytes written to the output buffer
    pub len: usize,
    pub answers: u16,
    pub question: DnsQuestion,
}

/// Owns everything needed to answer queries. Lives on a single task, so the
/// registry needs no locking.
pub struct Responder {
    host: HostRecord,
    registry: ServiceRegistry,
    options: ResponseOptions,
}

impl Responder {
    pub fn new(host: HostRecord, registry: ServiceRegistry, options: ResponseOptions) -> Self {
        Self { host, registry, options }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Turn one inbound datagram into a response in `out`.
    ///
    /// Returns `None` for responses from other responders, malformed packets,
    /// questions we do not serve and names we do not own.
    pub fn handle_packet(&self, packet: &[u8], out: &mut [u8]) -> Option<Answer> {
        let header = match Header::parse(packet) {
            Ok(header) => header,
            Err(e) => {
                tracing::debug!("Dropping malformed packet: {}", e);
                return None;
            }
        };

        if header.is_response() {
            return None;
        }

        let question = match parse_query(packet) {
            Ok(Some(question)) => question,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!("Dropping malformed query: {}", e);
                return None;
            }
        };

        tracing::debug!("Query {} {}", question.name, type_name(question.qtype));

        let built = match resolve(&question, &self.host, &self.registry) {
            Resolution::Host(host) => build_host_response(out, &question, host, self.options),
            Resolution::Services(services) => {
                build_service_response(out, &question, &services, self.options)
            }
            Resolution::NoMatch => {
                tracing::debug!("No records for {}", question.name);
                return None;
            }
            Resolution::Unsupported(qtype) => {
                tracing::debug!("Ignoring unsupported query type {}", qtype);
                return None;
            }
        };

        match built {
            Ok(BuildOutcome::Complete { len, answers }) => Some(Answer { len, answers, question }),
            Ok(BuildOutcome::Truncated { len, answers }) => {
                tracing::warn!(
                    "Response for {} truncated to {} answers",
                    question.name,
                    answers
                );
                Some(Answer { len, answers, question })
            }
            Ok(BuildOutcome::NoAnswers) => {
                tracing::debug!("Nothing to answer for {} {}", question.name, type_name(question.qtype));
                None
            }
            Err(e) => {
                tracing::warn!("Failed to build response for {}: {}", question.name, e);
                None
            }
        }
    }

    /// Drop all registered services.
    pub fn shutdown(&mut self) {
        let count = self.registry.len();
        self.registry.clear();
        tracing::info!("Cleared {} registered service(s)", count);
    }
}

/// Receive and answer queries until `cancel` fires. Each datagram is fully
/// handled before the next is read.
pub async fn run(
    mut responder: Responder,
    socket: UdpSocket,
    reply: ReplyMode,
    ifindex: u32,
    cancel: CancellationToken,
) -> Result<()> {
    let mut in_buf = [0u8; MAX_PACKET];
    let mut out_buf = [0u8; MAX_PACKET];
    let group = multicast_destination(ifindex);

    tracing::info!(
        "Responder running with {} service(s), replying to {:?}",
        responder.registry().len(),
        reply
    );

    loop {
        tokio::select! {
            received = socket.recv_from(&mut in_buf) => {
                let (len, src) = match received {
                    Ok(received) => received,
                    Err(e) => {
                        tracing::warn!("recv_from failed: {}", e);
                        continue;
                    }
                };

                let Some(answer) = responder.handle_packet(&in_buf[..len], &mut out_buf) else {
                    continue;
                };

                let dest = reply_destination(reply, src, group);
                match socket.send_to(&out_buf[..answer.len], dest).await {
                    Ok(_) => tracing::info!(
                        "Answered {} {} with {} record(s) to {}",
                        answer.question.name,
                        type_name(answer.question.qtype),
                        answer.answers,
                        dest
                    ),
                    Err(e) => tracing::warn!("send_to {} failed: {}", dest, e),
                }
            }
            _ = cancel.cancelled() => {
                tracing::info!("Responder shutting down");
                break;
            }
        }
    }

    responder.shutdown();
    Ok(())
}

fn reply_destination(reply: ReplyMode, src: SocketAddr, group: SocketAddr) -> SocketAddr {
    match reply {
        ReplyMode::Source => src,
        ReplyMode::Multicast => group,
    }
}
