//! Integration tests for wristwire.
//!
//! A simulated device sits on the far end of an in-memory duplex pipe,
//! records every frame the client writes, and answers from a script.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

use wristwire::protocol::{build_frames, endpoints, FrameBuffer, RawFrame};
use wristwire::response::{LogMessage, Response, ResponseKind};
use wristwire::transfer::{checksum, TransferStage, CHUNK_SIZE};
use wristwire::transport::StreamTransport;
use wristwire::{Client, PhoneVersionConfig, PutBytes, TransferType, WireError};

const TOKEN: [u8; 2] = [0xAA, 0xBB];

/// Frames the simulated device writes back, in one burst.
type Replies = Vec<(u16, Vec<u8>)>;

/// Runs the device side until the client hangs up, answering each frame
/// with `respond` and returning everything the client sent.
fn spawn_device<F>(mut stream: DuplexStream, mut respond: F) -> JoinHandle<Vec<RawFrame>>
where
    F: FnMut(&RawFrame) -> Replies + Send + 'static,
{
    tokio::spawn(async move {
        let mut frames = FrameBuffer::new();
        let mut seen = Vec::new();
        let mut buf = vec![0u8; 8192];
        loop {
            let n = match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            for frame in frames.feed(&buf[..n]) {
                let replies = respond(&frame);
                if !replies.is_empty() {
                    let burst = build_frames(replies.iter().map(|(e, p)| (*e, &p[..]))).unwrap();
                    let _ = stream.write_all(&burst).await;
                }
                seen.push(frame);
            }
        }
        seen
    })
}

/// Acks every PutBytes step; begin gets `[ACK][0xAA 0xBB]`.
fn put_bytes_device(frame: &RawFrame) -> Replies {
    if frame.endpoint != endpoints::PUT_BYTES {
        return Vec::new();
    }
    match frame.payload[0] {
        0x01 => vec![(endpoints::PUT_BYTES, vec![0x01, TOKEN[0], TOKEN[1]])],
        _ => vec![(endpoints::PUT_BYTES, vec![0x01])],
    }
}

async fn connect(stream: DuplexStream) -> Client {
    Client::builder()
        .request_timeout(Duration::from_secs(2))
        .transfer_timeout(Duration::from_secs(2))
        .abort_timeout(Duration::from_millis(200))
        .connect(StreamTransport::new(stream))
        .await
        .unwrap()
}

fn tags(frames: &[RawFrame]) -> Vec<u8> {
    frames.iter().map(|f| f.payload[0]).collect()
}

#[tokio::test]
async fn test_transfer_end_to_end() {
    let (client_side, device_side) = duplex(64 * 1024);
    let device = spawn_device(device_side, put_bytes_device);
    let client = connect(client_side).await;

    let data: Vec<u8> = (0u8..10).collect();
    let mut milestones = Vec::new();
    PutBytes::new(&client)
        .send(&data, TransferType::Binary, 3, |p| milestones.push(p.percent))
        .await
        .unwrap();

    client.disconnect();
    let frames = device.await.unwrap();

    assert_eq!(frames.len(), 4);
    assert!(frames.iter().all(|f| f.endpoint == endpoints::PUT_BYTES));
    assert_eq!(tags(&frames), vec![1, 2, 3, 5]);

    assert_eq!(&frames[0].payload[..], &[0x01, 0, 0, 0, 10, 5, 3]);

    let mut chunk = vec![0x02, 0xAA, 0xBB, 0, 0, 0, 10];
    chunk.extend_from_slice(&data);
    assert_eq!(&frames[1].payload[..], &chunk[..]);

    let mut commit = vec![0x03, 0xAA, 0xBB];
    commit.extend_from_slice(&checksum(&data).to_be_bytes());
    assert_eq!(&frames[2].payload[..], &commit[..]);

    assert_eq!(&frames[3].payload[..], &[0x05, 0xAA, 0xBB]);
    assert_eq!(milestones, vec![0, 5, 90, 95, 100]);
}

#[tokio::test]
async fn test_second_chunk_failure_aborts_once() {
    let (client_side, device_side) = duplex(64 * 1024);
    let mut chunks = 0;
    let device = spawn_device(device_side, move |frame| {
        if frame.payload[0] == 0x02 {
            chunks += 1;
            if chunks == 2 {
                return vec![(endpoints::PUT_BYTES, vec![0x02])];
            }
        }
        put_bytes_device(frame)
    });
    let client = connect(client_side).await;

    let data = vec![0x5Au8; CHUNK_SIZE + 500];
    let err = PutBytes::new(&client)
        .send(&data, TransferType::Resources, 0, |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, WireError::TransferChunkFailed(_)));
    assert!(err.is_transfer_failure());
    assert!(client.is_connected());

    client.disconnect();
    let frames = device.await.unwrap();
    assert_eq!(tags(&frames), vec![1, 2, 2, 4]);
    assert_eq!(&frames[3].payload[..], &[0x04, 0xAA, 0xBB]);
}

#[tokio::test]
async fn test_commit_failure_with_unanswered_abort() {
    let (client_side, device_side) = duplex(64 * 1024);
    let device = spawn_device(device_side, |frame| match frame.payload[0] {
        0x03 => vec![(endpoints::PUT_BYTES, vec![0x02])],
        // The device never answers the abort.
        0x04 => Vec::new(),
        _ => put_bytes_device(frame),
    });
    let client = connect(client_side).await;

    let err = PutBytes::new(&client)
        .send(b"resource pack", TransferType::Resources, 1, |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, WireError::TransferCommitFailed(_)));
    assert!(client.is_connected());
    assert!(!client.registry().is_open(ResponseKind::PutBytesAck));

    client.disconnect();
    let frames = device.await.unwrap();
    assert_eq!(tags(&frames), vec![1, 2, 3, 4]);
    assert_eq!(&frames[3].payload[..], &[0x04, 0xAA, 0xBB]);
}

#[tokio::test]
async fn test_finalize_failure_aborts() {
    let (client_side, device_side) = duplex(64 * 1024);
    let device = spawn_device(device_side, |frame| match frame.payload[0] {
        0x05 => vec![(endpoints::PUT_BYTES, vec![0x02])],
        _ => put_bytes_device(frame),
    });
    let client = connect(client_side).await;

    let mut milestones = Vec::new();
    let err = PutBytes::new(&client)
        .send(b"app binary", TransferType::Binary, 2, |p| milestones.push(p.percent))
        .await
        .unwrap_err();

    assert!(matches!(err, WireError::TransferFinalizeFailed(_)));
    assert!(err.is_transfer_failure());
    assert_eq!(milestones, vec![0, 5, 90, 95]);

    client.disconnect();
    assert_eq!(tags(&device.await.unwrap()), vec![1, 2, 3, 5, 4]);
}

#[tokio::test]
async fn test_fire_and_forget_survives_disconnect() {
    let (client_side, device_side) = duplex(64 * 1024);
    let device = spawn_device(device_side, |_| Vec::new());
    let client = connect(client_side).await;

    client.set_time(1_700_000_000).await.unwrap();
    client.disconnect();

    let frames = device.await.unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].endpoint, endpoints::TIME);
    assert_eq!(frames[0].payload[0], 0x02);
}

#[tokio::test]
async fn test_rejected_begin_sends_nothing_else() {
    let (client_side, device_side) = duplex(64 * 1024);
    let device = spawn_device(device_side, |_| vec![(endpoints::PUT_BYTES, vec![0x02])]);
    let client = connect(client_side).await;

    let err = PutBytes::new(&client)
        .send(b"payload", TransferType::Binary, 0, |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, WireError::TransferRejected(_)));

    client.disconnect();
    assert_eq!(tags(&device.await.unwrap()), vec![1]);
}

#[tokio::test]
async fn test_commit_crc_covers_whole_binary() {
    let (client_side, device_side) = duplex(64 * 1024);
    let device = spawn_device(device_side, put_bytes_device);
    let client = connect(client_side).await;

    let data: Vec<u8> = (0..CHUNK_SIZE + 123).map(|i| (i % 251) as u8).collect();
    let mut stages = Vec::new();
    PutBytes::new(&client)
        .send(&data, TransferType::Firmware, 0, |p| stages.push(p.stage))
        .await
        .unwrap();

    client.disconnect();
    let frames = device.await.unwrap();
    assert_eq!(tags(&frames), vec![1, 2, 2, 3, 5]);

    let commit = &frames[3].payload;
    let crc = u32::from_be_bytes([commit[3], commit[4], commit[5], commit[6]]);
    assert_eq!(crc, crc32fast::hash(&data));
    assert_ne!(crc, crc32fast::hash(&data[..CHUNK_SIZE]));

    assert!(stages.contains(&TransferStage::Chunk { sent: 2, total: 2 }));
}

#[tokio::test]
async fn test_install_firmware_sequence() {
    let (client_side, device_side) = duplex(64 * 1024);
    let device = spawn_device(device_side, put_bytes_device);
    let client = connect(client_side).await;

    client
        .install_firmware(b"firmware", Some(&b"resources"[..]), |_| {})
        .await
        .unwrap();

    client.disconnect();
    let frames = device.await.unwrap();
    let script: Vec<(u16, u8)> = frames
        .iter()
        .map(|f| (f.endpoint, *f.payload.last().unwrap()))
        .collect();

    assert_eq!(frames[0].endpoint, endpoints::SYSTEM_MESSAGE);
    assert_eq!(&frames[0].payload[..], &[0x00, 0x01]);
    // Resources begin, then firmware begin.
    assert_eq!(&frames[1].payload[5..], &[3, 0]);
    assert_eq!(&frames[5].payload[5..], &[1, 0]);
    assert_eq!(frames.len(), 10);
    assert_eq!(script[9], (endpoints::SYSTEM_MESSAGE, 0x02));
}

#[tokio::test]
async fn test_ping_round_trip() {
    let (client_side, device_side) = duplex(64 * 1024);
    let device = spawn_device(device_side, |frame| {
        if frame.endpoint != endpoints::PING {
            return Vec::new();
        }
        let mut reply = frame.payload.to_vec();
        reply[0] = 0x01;
        vec![(endpoints::PING, reply)]
    });
    let client = connect(client_side).await;

    assert_eq!(client.ping(0xCAFE).await.unwrap(), 0xCAFE);
    assert_eq!(client.ping(0xBEEF).await.unwrap(), 0xBEEF);

    client.disconnect();
    assert_eq!(device.await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_request_timeout_disconnects() {
    let (client_side, device_side) = duplex(64 * 1024);
    let device = spawn_device(device_side, |_| Vec::new());
    let client = Client::builder()
        .request_timeout(Duration::from_millis(50))
        .connect(StreamTransport::new(client_side))
        .await
        .unwrap();

    let err = client.get_time().await.unwrap_err();
    assert!(matches!(err, WireError::TimedOut(ResponseKind::Time)));
    assert!(!client.is_connected());

    // Device sees the pipe close.
    let frames = device.await.unwrap();
    assert_eq!(frames.len(), 1);
}

#[tokio::test]
async fn test_decode_failure_keeps_link() {
    let (client_side, device_side) = duplex(64 * 1024);
    let device = spawn_device(device_side, |frame| {
        if frame.endpoint != endpoints::TIME {
            return Vec::new();
        }
        // Too short to decode, then the real answer.
        vec![
            (endpoints::TIME, vec![0x01, 0x00]),
            (endpoints::TIME, vec![0x01, 0, 0, 0, 42]),
        ]
    });
    let client = connect(client_side).await;

    assert_eq!(client.get_time().await.unwrap(), 42);
    assert!(client.is_connected());

    client.disconnect();
    device.await.unwrap();
}

#[tokio::test]
async fn test_push_fan_out_and_phone_version() {
    let (client_side, mut device) = duplex(64 * 1024);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let first = seen.clone();
    let client = Client::builder()
        .on_push(ResponseKind::Logs, move |msg| {
            first.lock().unwrap().push(("builder", msg.clone()))
        })
        .connect(StreamTransport::new(client_side))
        .await
        .unwrap();
    let second = seen.clone();
    client.subscribe(ResponseKind::Logs, move |msg| {
        second.lock().unwrap().push(("runtime", msg.clone()))
    });

    // Both frames in one burst.
    let burst = build_frames([
        (endpoints::LOGS, &b"hello"[..]),
        (endpoints::PHONE_VERSION, &[0x00][..]),
    ])
    .unwrap();
    device.write_all(&burst).await.unwrap();

    let mut header = [0u8; 4];
    device.read_exact(&mut header).await.unwrap();
    let len = u16::from_be_bytes([header[0], header[1]]) as usize;
    let endpoint = u16::from_be_bytes([header[2], header[3]]);
    let mut payload = vec![0u8; len];
    device.read_exact(&mut payload).await.unwrap();

    assert_eq!(endpoint, endpoints::PHONE_VERSION);
    assert_eq!(payload, PhoneVersionConfig::default().encode_reply().to_vec());

    // The log frame was routed before the phone version query.
    let seen = seen.lock().unwrap();
    let expected = Response::Logs(LogMessage {
        raw: bytes::Bytes::from_static(b"hello"),
    });
    assert_eq!(
        *seen,
        vec![("builder", expected.clone()), ("runtime", expected)]
    );
}
