//! End-to-end pipeline tests over loopback TCP

use bytes::Bytes;
use input_adapter::{
    AdapterError, InputConfig, InputMetrics, InputService, Lifecycle, ShutdownReport,
};
use message_sink::test_utils::{CollectorSink, GatedSink};
use message_sink::{DirectSink, Envelope, MessageSink};
use network::{encode_frame, FrameReader};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use types::EventRecord;

const WAIT: Duration = Duration::from_secs(5);

struct Running {
    addr: SocketAddr,
    lifecycle: Lifecycle,
    metrics: InputMetrics,
    handle: JoinHandle<input_adapter::Result<ShutdownReport>>,
}

impl Running {
    async fn stop(self) -> ShutdownReport {
        self.lifecycle.stop();
        tokio::time::timeout(WAIT, self.handle)
            .await
            .expect("service did not stop")
            .unwrap()
            .unwrap()
    }
}

fn test_config() -> InputConfig {
    InputConfig {
        port: 0,
        bind_host: "127.0.0.1".to_string(),
        stats_report_interval_seconds: 0,
        drain_timeout_ms: 2000,
        ..Default::default()
    }
}

async fn start(config: InputConfig, sink: Arc<dyn MessageSink>) -> Running {
    let lifecycle = Lifecycle::new();
    let bound = InputService::new(config, sink, lifecycle.clone())
        .unwrap()
        .bind()
        .await
        .unwrap();
    let addr = bound.local_addr().unwrap();
    let metrics = bound.metrics().clone();
    let handle = tokio::spawn(bound.run());
    Running {
        addr,
        lifecycle,
        metrics,
        handle,
    }
}

fn event(id: &str) -> Bytes {
    codec::encode_record(&EventRecord {
        id: id.to_string(),
        time: Some(SystemTime::now().into()),
        action: "dns_message".to_string(),
        device: "probe-7".to_string(),
        network: "office".to_string(),
        origin: "device".to_string(),
        risk: 0.25,
    })
}

async fn send_frame(stream: &mut TcpStream, payload: &[u8]) {
    stream
        .write_all(&encode_frame(payload).unwrap())
        .await
        .unwrap();
}

/// True once the server side has closed `stream`
async fn closed_by_peer(stream: &mut TcpStream) -> bool {
    let mut buf = [0u8; 16];
    match tokio::time::timeout(WAIT, stream.read(&mut buf)).await {
        Ok(Ok(0)) | Ok(Err(_)) => true,
        Ok(Ok(_)) | Err(_) => false,
    }
}

fn correlation_ids(sink: &CollectorSink) -> Vec<String> {
    sink.received_messages()
        .into_iter()
        .filter_map(|m| m.metadata.correlation_id)
        .collect()
}

#[tokio::test]
async fn frames_on_one_connection_published_in_order() {
    let sink = Arc::new(CollectorSink::new());
    let service = start(test_config(), sink.clone()).await;

    let frames: Vec<Bytes> = ["F1", "F2", "F3"].into_iter().map(event).collect();
    let mut stream = TcpStream::connect(service.addr).await.unwrap();
    for frame in &frames {
        send_frame(&mut stream, frame).await;
    }

    assert!(sink.wait_for(3, WAIT).await);
    assert_eq!(correlation_ids(&sink), vec!["F1", "F2", "F3"]);

    let messages = sink.received_messages();
    let payloads: Vec<Bytes> = messages.iter().map(|m| m.payload.clone()).collect();
    assert_eq!(payloads, frames);
    assert_eq!(messages[0].metadata.target.as_deref(), Some("cyberprobe"));
    assert_eq!(messages[0].metadata.properties.device(), Some("probe-7"));
    assert_eq!(messages[0].metadata.properties.network(), Some("office"));

    drop(stream);
    let report = service.stop().await;
    assert!(report.drained);
    assert_eq!(report.stats.unwrap().delivered, 3);
}

#[tokio::test]
async fn malformed_connection_does_not_affect_others() {
    let sink = Arc::new(CollectorSink::new());
    let service = start(test_config(), sink.clone()).await;

    let mut bad = TcpStream::connect(service.addr).await.unwrap();
    let mut good = TcpStream::connect(service.addr).await.unwrap();

    bad.write_all(&[0, 0, 0, 0]).await.unwrap();
    for n in 0..20 {
        send_frame(&mut good, &event(&format!("good-{}", n))).await;
    }

    assert!(closed_by_peer(&mut bad).await);
    assert!(sink.wait_for(20, WAIT).await);
    assert_eq!(sink.message_count(), 20);
    assert_eq!(service.metrics.received.get(), 20);

    drop(good);
    service.stop().await;
}

#[tokio::test]
async fn oversized_header_closes_connection() {
    let sink = Arc::new(CollectorSink::new());
    let service = start(test_config(), sink.clone()).await;

    let mut stream = TcpStream::connect(service.addr).await.unwrap();
    let declared = (types::MAX_FRAME_LEN as u32) + 1;
    stream.write_all(&declared.to_be_bytes()).await.unwrap();
    stream.write_all(&[0u8; 64]).await.unwrap();

    assert!(closed_by_peer(&mut stream).await);
    assert_eq!(sink.message_count(), 0);
    assert_eq!(service.metrics.received.get(), 0);

    service.stop().await;
}

#[tokio::test]
async fn truncated_payload_produces_nothing() {
    let sink = Arc::new(CollectorSink::new());
    let service = start(test_config(), sink.clone()).await;

    let mut stream = TcpStream::connect(service.addr).await.unwrap();
    stream.write_all(&100u32.to_be_bytes()).await.unwrap();
    stream.write_all(&[1u8; 10]).await.unwrap();
    stream.shutdown().await.unwrap();

    assert!(closed_by_peer(&mut stream).await);
    let report = service.stop().await;
    assert!(report.drained);
    assert_eq!(report.stats.unwrap().frames, 0);
    assert_eq!(sink.message_count(), 0);
}

#[tokio::test]
async fn undecodable_payload_dropped_connection_stays_open() {
    let sink = Arc::new(CollectorSink::new());
    let service = start(test_config(), sink.clone()).await;

    let mut stream = TcpStream::connect(service.addr).await.unwrap();
    send_frame(&mut stream, &event("before")).await;
    send_frame(&mut stream, b"\x0a\x05abc").await;
    send_frame(&mut stream, &event("after")).await;

    assert!(sink.wait_for(2, WAIT).await);
    send_frame(&mut stream, &event("still-open")).await;
    assert!(sink.wait_for(3, WAIT).await);

    assert_eq!(correlation_ids(&sink), vec!["before", "after", "still-open"]);
    assert_eq!(service.metrics.decode_errors.get(), 1);
    assert_eq!(service.metrics.received.get(), 4);

    drop(stream);
    service.stop().await;
}

#[tokio::test]
async fn stalled_sink_applies_backpressure_without_loss() {
    let sink = Arc::new(GatedSink::closed());
    let config = InputConfig {
        queue_capacity: 2,
        ..test_config()
    };
    let service = start(config, sink.clone()).await;

    let total = 10;
    let mut streams = Vec::new();
    for c in 0..2 {
        let mut stream = TcpStream::connect(service.addr).await.unwrap();
        for n in 0..total / 2 {
            send_frame(&mut stream, &event(&format!("c{}-{}", c, n))).await;
        }
        streams.push(stream);
    }

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(sink.blocked_sends(), 1);
    // one in flight at the sink, two queued, one waiting per reader
    assert!(service.metrics.received.get() <= 5);
    assert_eq!(sink.collector().message_count(), 0);

    sink.open();
    assert!(sink.collector().wait_for(total, WAIT).await);

    let ids = correlation_ids(sink.collector());
    assert_eq!(ids.len(), total);
    for c in 0..2 {
        let prefix = format!("c{}-", c);
        let own: Vec<_> = ids
            .iter()
            .filter(|id| id.starts_with(&prefix))
            .cloned()
            .collect();
        let expected: Vec<_> = (0..total / 2).map(|n| format!("c{}-{}", c, n)).collect();
        assert_eq!(own, expected);
    }

    drop(streams);
    service.stop().await;
}

#[tokio::test]
async fn stop_closes_listener_but_open_connections_deliver() {
    let sink = Arc::new(CollectorSink::new());
    let service = start(test_config(), sink.clone()).await;

    let mut stream = TcpStream::connect(service.addr).await.unwrap();
    send_frame(&mut stream, &event("pre-stop")).await;
    assert!(sink.wait_for(1, WAIT).await);

    service.lifecycle.stop();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(TcpStream::connect(service.addr).await.is_err());

    send_frame(&mut stream, &event("post-stop")).await;
    assert!(sink.wait_for(2, WAIT).await);
    assert_eq!(correlation_ids(&sink), vec!["pre-stop", "post-stop"]);

    drop(stream);
    let report = tokio::time::timeout(WAIT, service.handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(report.drained);
}

#[tokio::test]
async fn drain_gives_up_on_lingering_connections() {
    let sink = Arc::new(CollectorSink::new());
    let config = InputConfig {
        drain_timeout_ms: 200,
        ..test_config()
    };
    let service = start(config, sink.clone()).await;

    let mut lingering = TcpStream::connect(service.addr).await.unwrap();
    send_frame(&mut lingering, &event("only")).await;
    assert!(sink.wait_for(1, WAIT).await);

    let report = service.stop().await;
    assert!(!report.drained);
    assert!(report.stats.is_none());
    drop(lingering);
}

#[tokio::test]
async fn connections_beyond_limit_are_closed() {
    let sink = Arc::new(CollectorSink::new());
    let config = InputConfig {
        max_connections: 1,
        ..test_config()
    };
    let service = start(config, sink.clone()).await;

    let mut first = TcpStream::connect(service.addr).await.unwrap();
    send_frame(&mut first, &event("first")).await;
    assert!(sink.wait_for(1, WAIT).await);

    let mut second = TcpStream::connect(service.addr).await.unwrap();
    assert!(closed_by_peer(&mut second).await);
    assert_eq!(service.metrics.connections_rejected.get(), 1);
    assert_eq!(service.metrics.connections.get(), 1);

    send_frame(&mut first, &event("first-again")).await;
    assert!(sink.wait_for(2, WAIT).await);

    drop(first);
    let mut third = None;
    for _ in 0..50 {
        if service.metrics.connections.get() == 0 {
            third = Some(TcpStream::connect(service.addr).await.unwrap());
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let mut third = third.expect("slot was not released");
    send_frame(&mut third, &event("third")).await;
    assert!(sink.wait_for(3, WAIT).await);

    drop(third);
    service.stop().await;
}

#[tokio::test]
async fn bind_conflict_is_fatal() {
    let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = InputConfig {
        port: occupied.local_addr().unwrap().port(),
        ..test_config()
    };

    let result = InputService::new(config, Arc::new(CollectorSink::new()), Lifecycle::new())
        .unwrap()
        .run()
        .await;
    match result {
        Err(AdapterError::Bind { address, .. }) => {
            assert!(address.ends_with(&format!(":{}", occupied.local_addr().unwrap().port())))
        }
        other => panic!("expected bind error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn direct_sink_delivers_envelopes_downstream() {
    let downstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let downstream_addr = downstream.local_addr().unwrap();
    let collector = tokio::spawn(async move {
        let (socket, _) = downstream.accept().await.unwrap();
        let mut reader = FrameReader::new(socket);
        let mut envelopes = Vec::new();
        while envelopes.len() < 2 {
            let frame = reader.read_frame().await.unwrap().unwrap();
            envelopes.push(Envelope::decode_bytes(frame).unwrap());
        }
        envelopes
    });

    let sink = Arc::new(DirectSink::tcp(&downstream_addr.to_string()));
    let service = start(test_config(), sink).await;

    let mut stream = TcpStream::connect(service.addr).await.unwrap();
    let payload = event("wire-1");
    send_frame(&mut stream, &payload).await;
    send_frame(&mut stream, &event("wire-2")).await;

    let envelopes = tokio::time::timeout(WAIT, collector).await.unwrap().unwrap();
    assert_eq!(envelopes[0].target, "cyberprobe");
    assert_eq!(envelopes[0].correlation_id, "wire-1");
    assert_eq!(envelopes[0].payload, payload);
    assert_eq!(
        envelopes[0].properties.get("device").map(String::as_str),
        Some("probe-7")
    );
    assert_eq!(envelopes[1].correlation_id, "wire-2");

    drop(stream);
    service.stop().await;
}
