//! End-to-end relay tests over a real WebSocket connection.

use crate::common::{eventually, start_test_server, uno_rig};
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};

type ClientRead = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

const WAIT: Duration = Duration::from_secs(3);

/// Read binary frames until `len` bytes of device data have arrived.
async fn collect_uplink(read: &mut ClientRead, len: usize) -> Vec<u8> {
    let mut received = Vec::new();
    while received.len() < len {
        let frame = tokio::time::timeout(WAIT, read.next())
            .await
            .expect("Timeout waiting for uplink data")
            .expect("Stream ended")
            .expect("WebSocket error");
        match frame {
            Message::Binary(bytes) => received.extend_from_slice(&bytes),
            other => panic!("Unexpected frame: {:?}", other),
        }
    }
    received
}

#[tokio::test]
async fn test_text_command_reaches_device() {
    let rig = uno_rig(false);
    let url = start_test_server(rig.bridge.clone()).await;

    let (ws, _) = connect_async(url.as_str()).await.expect("Failed to connect");
    let (mut write, _read) = ws.split();

    write
        .send(Message::Text("PING\n".into()))
        .await
        .expect("Failed to send");

    assert!(eventually(WAIT, || rig.device.written_bytes() == b"PING\n").await);
    assert_eq!(rig.device.get_write_log(), vec![b"PING\n".to_vec()]);
}

#[tokio::test]
async fn test_binary_command_is_written_verbatim() {
    let rig = uno_rig(false);
    let url = start_test_server(rig.bridge.clone()).await;

    let (ws, _) = connect_async(url.as_str()).await.expect("Failed to connect");
    let (mut write, _read) = ws.split();

    let frame = vec![0x0c, 0x00, 0xff, b'\n'];
    write.send(Message::Binary(frame.clone())).await.unwrap();

    assert!(eventually(WAIT, || rig.device.written_bytes() == frame).await);
}

#[tokio::test]
async fn test_device_bytes_reach_client() {
    let rig = uno_rig(false);
    let url = start_test_server(rig.bridge.clone()).await;

    let (ws, _) = connect_async(url.as_str()).await.expect("Failed to connect");
    let (_write, mut read) = ws.split();

    let telemetry = b"\x0ctemp=21\n\x00\xfe";
    rig.device.enqueue_read(telemetry);

    let received = collect_uplink(&mut read, telemetry.len()).await;
    assert_eq!(received, telemetry.to_vec());
}

#[tokio::test]
async fn test_any_path_upgrades() {
    let rig = uno_rig(false);
    let url = start_test_server(rig.bridge.clone()).await;

    let (ws, _) = connect_async(format!("{}some/nested/path", url))
        .await
        .expect("Failed to connect on a nested path");
    let (mut write, _read) = ws.split();
    write.send(Message::Text("hi\n".into())).await.unwrap();

    assert!(eventually(WAIT, || rig.device.written_bytes() == b"hi\n").await);
}

#[tokio::test]
async fn test_client_disconnect_stops_polling() {
    let rig = uno_rig(false);
    let url = start_test_server(rig.bridge.clone()).await;

    let (ws, _) = connect_async(url.as_str()).await.expect("Failed to connect");
    let (mut write, mut read) = ws.split();

    // The uplink is running once frames start arriving
    let _ = tokio::time::timeout(WAIT, read.next()).await;

    write.send(Message::Close(None)).await.unwrap();
    drop(write);
    drop(read);

    // Allow an in-flight read to finish, then the count must stay put
    tokio::time::sleep(Duration::from_millis(200)).await;
    let settled = rig.device.read_calls();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(rig.device.read_calls(), settled);

    // The serial handle survives the session for the next client
    assert!(rig.conn().is_connected());
}

#[tokio::test]
async fn test_quiet_bridge_mirrors_nothing() {
    let rig = uno_rig(false);
    let url = start_test_server(rig.bridge.clone()).await;

    let (ws, _) = connect_async(url.as_str()).await.unwrap();
    let (mut write, mut read) = ws.split();

    write.send(Message::Binary(vec![b'a'; 1000])).await.unwrap();
    rig.device.enqueue_read(&[b'z'; 1000]);
    collect_uplink(&mut read, 1000).await;

    assert!(eventually(WAIT, || rig.device.written_bytes().len() == 1000).await);
    assert!(rig.mirror.contents().is_empty());
}

#[tokio::test]
async fn test_verbose_bridge_mirrors_each_transfer() {
    let rig = uno_rig(true);
    let url = start_test_server(rig.bridge.clone()).await;

    let (ws, _) = connect_async(url.as_str()).await.unwrap();
    let (mut write, mut read) = ws.split();

    write.send(Message::Binary(vec![b'a'; 1000])).await.unwrap();
    assert!(eventually(WAIT, || rig.device.written_bytes().len() == 1000).await);

    // Queued at once, so every uplink read returns a full chunk
    rig.device.enqueue_read(&[b'z'; 1000]);
    collect_uplink(&mut read, 1000).await;

    let lines = rig.mirror.lines();
    let down: Vec<_> = lines.iter().filter(|l| l.starts_with("▼ ")).collect();
    let up: Vec<_> = lines.iter().filter(|l| l.starts_with("▲ ")).collect();

    assert_eq!(down.len(), 1);
    assert_eq!(*down[0], format!("▼ b\"{}\"", "a".repeat(1000)));
    assert_eq!(up.len(), 10);
    assert!(up.iter().all(|l| **l == format!("▲ b\"{}\"", "z".repeat(100))));
    assert_eq!(lines.len(), 11);
}

#[tokio::test]
async fn test_write_failure_reconnects_once() {
    let rig = uno_rig(false);
    let url = start_test_server(rig.bridge.clone()).await;

    let (ws, _) = connect_async(url.as_str()).await.unwrap();
    let (mut write, _read) = ws.split();

    assert!(eventually(WAIT, || rig.opener.attempts() == 1).await);
    rig.device.fail_next_write();

    write.send(Message::Text("lost\n".into())).await.unwrap();
    write.send(Message::Text("kept\n".into())).await.unwrap();

    assert!(eventually(WAIT, || rig.device.written_bytes() == b"kept\n").await);
    assert_eq!(rig.opener.attempts(), 2);
    assert_eq!(rig.conn().opens(), 2);
}

#[tokio::test]
async fn test_unplugged_device_recovers() {
    let rig = uno_rig(false);
    let url = start_test_server(rig.bridge.clone()).await;

    let (ws, _) = connect_async(url.as_str()).await.unwrap();
    let (mut write, mut read) = ws.split();
    assert!(eventually(WAIT, || rig.conn().is_connected()).await);

    // Unplug: the next read fails and reopening is refused
    rig.opener.set_refuse(true);
    rig.device.fail_next_read();
    assert!(eventually(WAIT, || !rig.conn().is_connected()).await);

    write.send(Message::Text("dropped\n".into())).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rig.device.get_write_log().is_empty());

    // Plug back in: the session carries on without the client reconnecting
    rig.opener.set_refuse(false);
    assert!(eventually(WAIT, || rig.conn().is_connected()).await);

    write.send(Message::Text("back\n".into())).await.unwrap();
    assert!(eventually(WAIT, || rig.device.written_bytes() == b"back\n").await);

    rig.device.enqueue_read(b"ok");
    assert_eq!(collect_uplink(&mut read, 2).await, b"ok".to_vec());
}

#[tokio::test]
async fn test_clients_share_one_handle() {
    let rig = uno_rig(false);
    let url = start_test_server(rig.bridge.clone()).await;

    let (first, _) = connect_async(url.as_str()).await.unwrap();
    let (second, _) = connect_async(url.as_str()).await.unwrap();
    let (mut first_write, _first_read) = first.split();
    let (mut second_write, _second_read) = second.split();

    first_write.send(Message::Text("one\n".into())).await.unwrap();
    assert!(eventually(WAIT, || rig.device.get_write_log().len() == 1).await);
    second_write.send(Message::Text("two\n".into())).await.unwrap();
    assert!(eventually(WAIT, || rig.device.get_write_log().len() == 2).await);

    assert_eq!(
        rig.device.get_write_log(),
        vec![b"one\n".to_vec(), b"two\n".to_vec()]
    );
    assert_eq!(rig.opener.attempts(), 1);
}
