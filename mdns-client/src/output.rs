use std::net::SocketAddr;
use serde::Serialize;
use shared::protocol::type_name;
use shared::wire::{RData, ResourceRecord};

/// One record as printed with `--json`.
#[derive(Debug, Serialize)]
struct JsonRecord<'a> {
    from: SocketAddr,
    name: &'a str,
    #[serde(rename = "type")]
    rtype: &'static str,
    ttl: u32,
    cache_flush: bool,
    data: &'a RData,
}

/// Prints the records of one response, with a `Response from` header in
/// text mode before the first record.
pub struct ResponsePrinter {
    from: SocketAddr,
    json: bool,
    printed: usize,
}

impl ResponsePrinter {
    pub fn new(from: SocketAddr, json: bool) -> Self {
        Self { from, json, printed: 0 }
    }

    pub fn print(&mut self, record: &ResourceRecord) {
        if self.json {
            match serde_json::to_string(&JsonRecord {
                from: self.from,
                name: &record.name,
                rtype: type_name(record.rtype),
                ttl: record.ttl,
                cache_flush: record.cache_flush,
                data: &record.data,
            }) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!("Failed to serialize record {}: {}", record.name, e),
            }
        } else {
            if self.printed == 0 {
                println!("Response from {}", self.from);
            }
            println!("{}", format_record(record));
        }
        self.printed += 1;
    }

    pub fn printed(&self) -> usize {
        self.printed
    }
}

pub fn format_record(record: &ResourceRecord) -> String {
    format!(
        "  {} {} {} (ttl={})",
        type_name(record.rtype),
        record.name,
        record.data,
        record.ttl
    )
}
