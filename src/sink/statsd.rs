//! StatsD client sink.
//!
//! Each measurement becomes one StatsD line:
//!
//! ```text
//! <prefix>.requests.2xx.count:1|c
//! <prefix>.requests.2xx.times:37|ms
//! ```
//!
//! Lines go onto a bounded queue and a background task ships them over UDP,
//! packing as many as fit into one datagram. Recording never waits on the
//! network: when the queue is full the line is dropped and the caller gets
//! [`Error::BufferFull`].

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info};

use super::MetricsSink;
use crate::config::StatsdConfig;
use crate::error::Error;

/// Largest datagram the sender builds. Fits a 1500-byte Ethernet MTU after
/// IP and UDP headers.
const MAX_PACKET_SIZE: usize = 1432;

/// A [`MetricsSink`] that forwards to a StatsD collector.
#[derive(Debug, Clone)]
pub struct StatsdSink {
    prefix: String,
    tx: mpsc::Sender<String>,
}

impl StatsdSink {
    /// Resolves the collector, binds a local UDP socket and starts the
    /// background sender on the current tokio runtime.
    ///
    /// The sender runs until every clone of the returned sink is dropped.
    pub async fn connect(config: &StatsdConfig) -> Result<Self, Error> {
        config.validate()?;

        let collector = tokio::net::lookup_host((config.host.as_str(), config.port))
            .await?
            .next()
            .ok_or_else(|| Error::Resolve(format!("{}:{}", config.host, config.port)))?;

        let local: SocketAddr = if collector.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(collector).await?;

        let (tx, rx) = mpsc::channel(config.buffer_size);
        tokio::spawn(send_loop(socket, rx));

        info!(%collector, prefix = %config.prefix, buffer = config.buffer_size, "statsd sink started");
        Ok(Self { prefix: config.prefix.trim_end_matches('.').to_owned(), tx })
    }

    fn metric(&self, label: &str, kind: &str) -> String {
        if self.prefix.is_empty() {
            format!("{label}.{kind}")
        } else {
            format!("{}.{label}.{kind}", self.prefix)
        }
    }

    fn send(&self, line: String) -> Result<(), Error> {
        self.tx.try_send(line).map_err(|e| match e {
            TrySendError::Full(line) => Error::BufferFull(line),
            TrySendError::Closed(_) => Error::Closed,
        })
    }
}

impl MetricsSink for StatsdSink {
    fn increment(&self, label: &str) -> Result<(), Error> {
        self.send(format!("{}:1|c", self.metric(label, "count")))
    }

    fn record_duration(&self, label: &str, elapsed: Duration) -> Result<(), Error> {
        self.send(format!("{}:{}|ms", self.metric(label, "times"), elapsed.as_millis()))
    }
}

// ── Background sender ─────────────────────────────────────────────────────────

/// Drains the queue into datagrams until every sender is gone.
async fn send_loop(socket: UdpSocket, mut rx: mpsc::Receiver<String>) {
    let mut packet = String::with_capacity(MAX_PACKET_SIZE);

    while let Some(line) = rx.recv().await {
        packet.push_str(&line);

        // Batch whatever else is already queued, without waiting for more.
        while let Ok(line) = rx.try_recv() {
            if packet.len() + 1 + line.len() > MAX_PACKET_SIZE {
                flush(&socket, &mut packet).await;
            }
            if !packet.is_empty() {
                packet.push('\n');
            }
            packet.push_str(&line);
        }

        flush(&socket, &mut packet).await;
    }

    debug!("statsd sender stopped");
}

async fn flush(socket: &UdpSocket, packet: &mut String) {
    if packet.is_empty() {
        return;
    }
    if let Err(e) = socket.send(packet.as_bytes()).await {
        debug!(bytes = packet.len(), "statsd send failed: {e}");
    }
    packet.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink(prefix: &str, capacity: usize) -> (StatsdSink, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (StatsdSink { prefix: prefix.to_owned(), tx }, rx)
    }

    #[test]
    fn test_line_format() {
        let (sink, mut rx) = sink("divolte", 8);
        sink.increment("requests.2xx").unwrap();
        sink.record_duration("requests.2xx", Duration::from_micros(37_900)).unwrap();

        assert_eq!(rx.try_recv().unwrap(), "divolte.requests.2xx.count:1|c");
        assert_eq!(rx.try_recv().unwrap(), "divolte.requests.2xx.times:37|ms");
    }

    #[test]
    fn test_empty_prefix_has_no_leading_dot() {
        let (sink, mut rx) = sink("", 8);
        sink.increment("requests.4xx").unwrap();
        assert_eq!(rx.try_recv().unwrap(), "requests.4xx.count:1|c");
    }

    #[test]
    fn test_full_buffer_drops_the_line() {
        let (sink, _rx) = sink("app", 1);
        sink.increment("requests.2xx").unwrap();

        match sink.increment("requests.3xx") {
            Err(Error::BufferFull(line)) => assert_eq!(line, "app.requests.3xx.count:1|c"),
            other => panic!("expected BufferFull, got {other:?}"),
        }
    }

    #[test]
    fn test_closed_sender_is_reported() {
        let (sink, rx) = sink("app", 1);
        drop(rx);
        assert!(matches!(sink.increment("requests.2xx"), Err(Error::Closed)));
    }

    #[tokio::test]
    async fn test_queued_lines_are_batched_into_one_datagram() {
        let collector = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        socket.connect(collector.local_addr().unwrap()).await.unwrap();

        let (tx, rx) = mpsc::channel(16);
        tx.send("a.count:1|c".to_owned()).await.unwrap();
        tx.send("a.times:5|ms".to_owned()).await.unwrap();
        drop(tx);

        send_loop(socket, rx).await;

        let mut buf = [0u8; MAX_PACKET_SIZE];
        let n = collector.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"a.count:1|c\na.times:5|ms");
    }

    #[tokio::test]
    async fn test_oversized_batches_are_split() {
        let collector = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        socket.connect(collector.local_addr().unwrap()).await.unwrap();

        let line = "x".repeat(MAX_PACKET_SIZE / 2);
        let (tx, rx) = mpsc::channel(16);
        for _ in 0..3 {
            tx.send(line.clone()).await.unwrap();
        }
        drop(tx);

        send_loop(socket, rx).await;

        let mut buf = [0u8; MAX_PACKET_SIZE];
        let mut received = 0;
        for _ in 0..3 {
            let n = collector.recv(&mut buf).await.unwrap();
            assert!(n <= MAX_PACKET_SIZE);
            received += 1;
        }
        assert_eq!(received, 3);
    }
}
