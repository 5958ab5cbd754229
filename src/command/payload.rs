//! Request payload builders.
//!
//! Each builder returns the payload only; the endpoint is chosen by the
//! caller. Multi-byte fields are Big Endian unless noted otherwise. App
//! message tuples and blob database fields are Little Endian.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, WireError};
use crate::response::{AppMessageCommand, SystemCommand, Tuple};

/// Longest string a length-prefixed field can carry.
pub const MAX_PSTRING_LEN: usize = u8::MAX as usize;

/// Legacy notification flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Email,
    Sms,
}

impl NotificationKind {
    fn to_byte(self) -> u8 {
        match self {
            NotificationKind::Email => 0x00,
            NotificationKind::Sms => 0x01,
        }
    }
}

/// Blob database identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobDatabase {
    Test,
    Pin,
    App,
    Reminder,
    Notification,
}

impl BlobDatabase {
    pub fn to_byte(self) -> u8 {
        match self {
            BlobDatabase::Test => 0x00,
            BlobDatabase::Pin => 0x01,
            BlobDatabase::App => 0x02,
            BlobDatabase::Reminder => 0x03,
            BlobDatabase::Notification => 0x04,
        }
    }
}

/// Append `[len u8][bytes]`, cutting at a character boundary if needed.
fn put_pstring(buf: &mut BytesMut, s: &str) {
    let mut end = s.len().min(MAX_PSTRING_LEN);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    buf.put_u8(end as u8);
    buf.put_slice(&s.as_bytes()[..end]);
}

pub fn ping(cookie: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(5);
    buf.put_u8(0x00);
    buf.put_u32(cookie);
    buf.freeze()
}

pub fn get_time() -> Bytes {
    Bytes::from_static(&[0x00])
}

pub fn set_time(unix_time: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(5);
    buf.put_u8(0x02);
    buf.put_u32(unix_time);
    buf.freeze()
}

pub fn firmware_version() -> Bytes {
    Bytes::from_static(&[0x00])
}

pub fn reset() -> Bytes {
    Bytes::from_static(&[0x00])
}

pub fn app_bank_list() -> Bytes {
    Bytes::from_static(&[0x01])
}

pub fn remove_app(id: u32, index: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(9);
    buf.put_u8(0x02);
    buf.put_u32(id);
    buf.put_u32(index);
    buf.freeze()
}

/// `[kind][sender][body][timestamp][subject]`, subject for email only.
///
/// `timestamp_ms` travels as decimal text.
pub fn notification(
    kind: NotificationKind,
    sender: &str,
    body: &str,
    timestamp_ms: u64,
    subject: Option<&str>,
) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u8(kind.to_byte());
    put_pstring(&mut buf, sender);
    put_pstring(&mut buf, body);
    put_pstring(&mut buf, &timestamp_ms.to_string());
    if let (NotificationKind::Email, Some(subject)) = (kind, subject) {
        put_pstring(&mut buf, subject);
    }
    buf.freeze()
}

pub fn now_playing(artist: &str, album: &str, track: &str) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u8(0x10);
    put_pstring(&mut buf, artist);
    put_pstring(&mut buf, album);
    put_pstring(&mut buf, track);
    buf.freeze()
}

pub fn system_message(command: SystemCommand) -> Bytes {
    Bytes::from(vec![0x00, command.to_byte()])
}

/// `[0x01][txid][uuid][count][tuples...]`.
pub fn app_message_push(transaction_id: u8, uuid: &[u8; 16], tuples: &[Tuple]) -> Result<Bytes> {
    if tuples.len() > u8::MAX as usize {
        return Err(WireError::Protocol(format!(
            "{} tuples in one app message, at most 255 allowed",
            tuples.len()
        )));
    }
    let mut buf = BytesMut::new();
    buf.put_u8(AppMessageCommand::Push.to_byte());
    buf.put_u8(transaction_id);
    buf.put_slice(uuid);
    buf.put_u8(tuples.len() as u8);
    for tuple in tuples {
        tuple.encode_into(&mut buf);
    }
    Ok(buf.freeze())
}

fn checked_key(key: &[u8]) -> Result<u8> {
    u8::try_from(key.len()).map_err(|_| WireError::PayloadTooLarge {
        size: key.len(),
        max: u8::MAX as usize,
    })
}

/// `[0x01][token LE][db][key_len][key][value_len LE][value]`.
pub fn blobdb_insert(token: u16, db: BlobDatabase, key: &[u8], value: &[u8]) -> Result<Bytes> {
    let key_len = checked_key(key)?;
    let value_len = u16::try_from(value.len()).map_err(|_| WireError::PayloadTooLarge {
        size: value.len(),
        max: u16::MAX as usize,
    })?;
    let mut buf = BytesMut::with_capacity(7 + key.len() + value.len());
    buf.put_u8(0x01);
    buf.put_u16_le(token);
    buf.put_u8(db.to_byte());
    buf.put_u8(key_len);
    buf.put_slice(key);
    buf.put_u16_le(value_len);
    buf.put_slice(value);
    Ok(buf.freeze())
}

/// `[0x04][token LE][db][key_len][key]`.
pub fn blobdb_delete(token: u16, db: BlobDatabase, key: &[u8]) -> Result<Bytes> {
    let key_len = checked_key(key)?;
    let mut buf = BytesMut::with_capacity(5 + key.len());
    buf.put_u8(0x04);
    buf.put_u16_le(token);
    buf.put_u8(db.to_byte());
    buf.put_u8(key_len);
    buf.put_slice(key);
    Ok(buf.freeze())
}

/// `[0x05][token LE][db]`.
pub fn blobdb_clear(token: u16, db: BlobDatabase) -> Bytes {
    let mut buf = BytesMut::with_capacity(4);
    buf.put_u8(0x05);
    buf.put_u16_le(token);
    buf.put_u8(db.to_byte());
    buf.freeze()
}
