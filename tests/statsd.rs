use std::collections::HashSet;
use std::time::Duration;

use reqmeter::{ExchangeTimer, HttpExchange, StatsdConfig, sink_from_config};
use tokio::net::UdpSocket;
use tokio::time::timeout;

async fn collector() -> (UdpSocket, StatsdConfig) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let config = StatsdConfig {
        enabled: true,
        host: "127.0.0.1".to_owned(),
        port: socket.local_addr().unwrap().port(),
        prefix: "divolte".to_owned(),
        buffer_size: 16,
    };
    (socket, config)
}

/// Reads datagrams until `want` lines have arrived.
async fn receive_lines(socket: &UdpSocket, want: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut buf = [0u8; 2048];
    while lines.len() < want {
        let n = timeout(Duration::from_secs(5), socket.recv(&mut buf))
            .await
            .expect("no datagram from the statsd sink")
            .unwrap();
        let packet = std::str::from_utf8(&buf[..n]).unwrap();
        lines.extend(packet.lines().map(str::to_owned));
    }
    lines
}

#[tokio::test]
async fn completed_exchange_is_sent_to_the_collector() {
    let (socket, config) = collector().await;
    let sink = sink_from_config(&config).await.unwrap();
    let timer = ExchangeTimer::new(sink);

    let mut exchange = HttpExchange::new("/track");
    timer.instrument(&mut exchange);
    exchange.set_status_code(404);
    exchange.finish();

    let lines = receive_lines(&socket, 2).await;
    assert_eq!(lines.len(), 2);
    assert!(lines.contains(&"divolte.requests.4xx.count:1|c".to_owned()), "{lines:?}");
    assert!(
        lines.iter().any(|l| l.starts_with("divolte.requests.4xx.times:") && l.ends_with("|ms")),
        "{lines:?}"
    );
}

#[tokio::test]
async fn every_status_class_gets_its_own_series() {
    let (socket, config) = collector().await;
    let timer = ExchangeTimer::new(sink_from_config(&config).await.unwrap());

    for status in [200, 302, 404, 503] {
        let mut exchange = HttpExchange::new("/track");
        timer.instrument(&mut exchange);
        exchange.set_status_code(status);
        exchange.finish();
    }

    let counted: HashSet<String> = receive_lines(&socket, 8)
        .await
        .into_iter()
        .filter(|l| l.ends_with("|c"))
        .collect();
    let expected: HashSet<String> = ["2xx", "3xx", "4xx", "5xx"]
        .iter()
        .map(|class| format!("divolte.requests.{class}.count:1|c"))
        .collect();
    assert_eq!(counted, expected);
}

#[tokio::test]
async fn unresolvable_collector_fails_at_startup() {
    let config = StatsdConfig {
        enabled: true,
        host: "collector.invalid".to_owned(),
        ..Default::default()
    };
    assert!(sink_from_config(&config).await.is_err());
}
