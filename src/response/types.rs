//! Concrete payload shapes for each response kind.
//!
//! Framing and most endpoints are Big Endian. App message dictionaries and
//! blob database acks are Little Endian.

use bytes::{Buf, BufMut, Bytes};

use super::ResponseKind;
use crate::error::{Result, WireError};

fn decode_error(kind: ResponseKind, reason: impl Into<String>) -> WireError {
    WireError::Decode {
        kind,
        reason: reason.into(),
    }
}

fn need(buf: &[u8], len: usize, kind: ResponseKind) -> Result<()> {
    if buf.remaining() < len {
        return Err(decode_error(
            kind,
            format!("need {} bytes, have {}", len, buf.remaining()),
        ));
    }
    Ok(())
}

fn expect_tag(buf: &mut &[u8], tag: u8, kind: ResponseKind) -> Result<()> {
    need(buf, 1, kind)?;
    let got = buf.get_u8();
    if got != tag {
        return Err(decode_error(kind, format!("unexpected tag {:#04x}", got)));
    }
    Ok(())
}

/// Fixed-width, NUL-padded string field.
fn fixed_string(buf: &mut &[u8], len: usize) -> String {
    let raw = &buf[..len];
    let end = raw.iter().position(|&b| b == 0).unwrap_or(len);
    let s = String::from_utf8_lossy(&raw[..end]).into_owned();
    buf.advance(len);
    s
}

/// Ping echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingResponse {
    pub cookie: u32,
}

impl PingResponse {
    pub(crate) fn decode(mut buf: &[u8]) -> Result<Self> {
        let kind = ResponseKind::Ping;
        expect_tag(&mut buf, 0x01, kind)?;
        need(buf, 4, kind)?;
        Ok(Self {
            cookie: buf.get_u32(),
        })
    }
}

/// Device clock reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeResponse {
    /// Seconds since the Unix epoch, device local time.
    pub unix_time: u32,
}

impl TimeResponse {
    pub(crate) fn decode(mut buf: &[u8]) -> Result<Self> {
        let kind = ResponseKind::Time;
        expect_tag(&mut buf, 0x01, kind)?;
        need(buf, 4, kind)?;
        Ok(Self {
            unix_time: buf.get_u32(),
        })
    }
}

/// Metadata block describing one firmware image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareMetadata {
    pub timestamp: u32,
    pub version: String,
    pub commit: String,
    pub is_recovery: bool,
    pub hardware_platform: u8,
    pub metadata_version: u8,
}

impl FirmwareMetadata {
    /// Encoded size of one block.
    pub const SIZE: usize = 4 + 32 + 8 + 3;

    fn decode(buf: &mut &[u8]) -> Self {
        let timestamp = buf.get_u32();
        let version = fixed_string(buf, 32);
        let commit = fixed_string(buf, 8);
        Self {
            timestamp,
            version,
            commit,
            is_recovery: buf.get_u8() != 0,
            hardware_platform: buf.get_u8(),
            metadata_version: buf.get_u8(),
        }
    }
}

/// Running and recovery firmware versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareVersionResponse {
    pub running: FirmwareMetadata,
    pub recovery: Option<FirmwareMetadata>,
}

impl FirmwareVersionResponse {
    pub(crate) fn decode(mut buf: &[u8]) -> Result<Self> {
        let kind = ResponseKind::FirmwareVersion;
        expect_tag(&mut buf, 0x01, kind)?;
        need(buf, FirmwareMetadata::SIZE, kind)?;
        let running = FirmwareMetadata::decode(&mut buf);
        let recovery = if buf.remaining() >= FirmwareMetadata::SIZE {
            Some(FirmwareMetadata::decode(&mut buf))
        } else {
            None
        };
        Ok(Self { running, recovery })
    }
}

/// The device asking which phone software it is talking to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhoneVersionQuery {
    pub command: u8,
}

impl PhoneVersionQuery {
    pub(crate) fn decode(mut buf: &[u8]) -> Result<Self> {
        need(buf, 1, ResponseKind::PhoneVersion)?;
        Ok(Self {
            command: buf.get_u8(),
        })
    }
}

/// Firmware update lifecycle commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemCommand {
    FirmwareAvailable,
    FirmwareStart,
    FirmwareComplete,
    FirmwareFail,
    FirmwareUpToDate,
    FirmwareOutOfDate,
    Other(u8),
}

impl SystemCommand {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => SystemCommand::FirmwareAvailable,
            0x01 => SystemCommand::FirmwareStart,
            0x02 => SystemCommand::FirmwareComplete,
            0x03 => SystemCommand::FirmwareFail,
            0x04 => SystemCommand::FirmwareUpToDate,
            0x05 => SystemCommand::FirmwareOutOfDate,
            other => SystemCommand::Other(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            SystemCommand::FirmwareAvailable => 0x00,
            SystemCommand::FirmwareStart => 0x01,
            SystemCommand::FirmwareComplete => 0x02,
            SystemCommand::FirmwareFail => 0x03,
            SystemCommand::FirmwareUpToDate => 0x04,
            SystemCommand::FirmwareOutOfDate => 0x05,
            SystemCommand::Other(byte) => byte,
        }
    }
}

/// System message `[0x00][command]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemMessage {
    pub command: SystemCommand,
}

impl SystemMessage {
    pub(crate) fn decode(mut buf: &[u8]) -> Result<Self> {
        let kind = ResponseKind::SystemMessage;
        expect_tag(&mut buf, 0x00, kind)?;
        need(buf, 1, kind)?;
        Ok(Self {
            command: SystemCommand::from_byte(buf.get_u8()),
        })
    }
}

/// Media button pressed on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicCommand {
    PlayPause,
    Pause,
    Play,
    Next,
    Previous,
    VolumeUp,
    VolumeDown,
    GetNowPlaying,
    Other(u8),
}

impl MusicCommand {
    pub(crate) fn decode(mut buf: &[u8]) -> Result<Self> {
        need(buf, 1, ResponseKind::MusicControl)?;
        Ok(match buf.get_u8() {
            0x01 => MusicCommand::PlayPause,
            0x02 => MusicCommand::Pause,
            0x03 => MusicCommand::Play,
            0x04 => MusicCommand::Next,
            0x05 => MusicCommand::Previous,
            0x06 => MusicCommand::VolumeUp,
            0x07 => MusicCommand::VolumeDown,
            0x08 => MusicCommand::GetNowPlaying,
            other => MusicCommand::Other(other),
        })
    }
}

/// App message command byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMessageCommand {
    Push,
    Request,
    Ack,
    Nack,
}

impl AppMessageCommand {
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0x01 => AppMessageCommand::Push,
            0x02 => AppMessageCommand::Request,
            0xFF => AppMessageCommand::Ack,
            0x7F => AppMessageCommand::Nack,
            _ => return None,
        })
    }

    pub fn to_byte(self) -> u8 {
        match self {
            AppMessageCommand::Push => 0x01,
            AppMessageCommand::Request => 0x02,
            AppMessageCommand::Ack => 0xFF,
            AppMessageCommand::Nack => 0x7F,
        }
    }
}

/// Value carried by one dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TupleValue {
    Bytes(Vec<u8>),
    CString(String),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Int8(i8),
    Int16(i16),
    Int32(i32),
}

impl TupleValue {
    fn type_byte(&self) -> u8 {
        match self {
            TupleValue::Bytes(_) => 0,
            TupleValue::CString(_) => 1,
            TupleValue::Uint8(_) | TupleValue::Uint16(_) | TupleValue::Uint32(_) => 2,
            TupleValue::Int8(_) | TupleValue::Int16(_) | TupleValue::Int32(_) => 3,
        }
    }

    fn encoded_len(&self) -> usize {
        match self {
            TupleValue::Bytes(b) => b.len(),
            // NUL terminator included.
            TupleValue::CString(s) => s.len() + 1,
            TupleValue::Uint8(_) | TupleValue::Int8(_) => 1,
            TupleValue::Uint16(_) | TupleValue::Int16(_) => 2,
            TupleValue::Uint32(_) | TupleValue::Int32(_) => 4,
        }
    }
}

/// One app message dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    pub key: u32,
    pub value: TupleValue,
}

impl Tuple {
    pub fn new(key: u32, value: TupleValue) -> Self {
        Self { key, value }
    }

    /// Append the Little Endian encoding of this entry to `out`.
    pub fn encode_into<B: BufMut>(&self, out: &mut B) {
        out.put_u32_le(self.key);
        out.put_u8(self.value.type_byte());
        out.put_u16_le(self.value.encoded_len() as u16);
        match &self.value {
            TupleValue::Bytes(b) => out.put_slice(b),
            TupleValue::CString(s) => {
                out.put_slice(s.as_bytes());
                out.put_u8(0);
            }
            TupleValue::Uint8(v) => out.put_u8(*v),
            TupleValue::Uint16(v) => out.put_u16_le(*v),
            TupleValue::Uint32(v) => out.put_u32_le(*v),
            TupleValue::Int8(v) => out.put_i8(*v),
            TupleValue::Int16(v) => out.put_i16_le(*v),
            TupleValue::Int32(v) => out.put_i32_le(*v),
        }
    }

    fn decode(buf: &mut &[u8]) -> Result<Self> {
        let kind = ResponseKind::AppMessage;
        need(buf, 7, kind)?;
        let key = buf.get_u32_le();
        let type_byte = buf.get_u8();
        let len = buf.get_u16_le() as usize;
        need(buf, len, kind)?;
        let data = &buf[..len];
        let value = match (type_byte, len) {
            (0, _) => TupleValue::Bytes(data.to_vec()),
            (1, _) => {
                let end = data.iter().position(|&b| b == 0).unwrap_or(len);
                TupleValue::CString(String::from_utf8_lossy(&data[..end]).into_owned())
            }
            (2, 1) => TupleValue::Uint8(data[0]),
            (2, 2) => TupleValue::Uint16(u16::from_le_bytes([data[0], data[1]])),
            (2, 4) => TupleValue::Uint32(u32::from_le_bytes([data[0], data[1], data[2], data[3]])),
            (3, 1) => TupleValue::Int8(data[0] as i8),
            (3, 2) => TupleValue::Int16(i16::from_le_bytes([data[0], data[1]])),
            (3, 4) => TupleValue::Int32(i32::from_le_bytes([data[0], data[1], data[2], data[3]])),
            (t, l) => {
                return Err(decode_error(
                    kind,
                    format!("tuple type {} with width {}", t, l),
                ))
            }
        };
        buf.advance(len);
        Ok(Self { key, value })
    }
}

/// Application message exchanged with a watch app.
///
/// Acks and nacks carry only the command and transaction id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppMessage {
    pub command: AppMessageCommand,
    pub transaction_id: u8,
    pub uuid: Option<[u8; 16]>,
    pub tuples: Vec<Tuple>,
}

impl AppMessage {
    pub(crate) fn decode(mut buf: &[u8]) -> Result<Self> {
        let kind = ResponseKind::AppMessage;
        need(buf, 2, kind)?;
        let command_byte = buf.get_u8();
        let command = AppMessageCommand::from_byte(command_byte)
            .ok_or_else(|| decode_error(kind, format!("unknown command {:#04x}", command_byte)))?;
        let transaction_id = buf.get_u8();

        if matches!(command, AppMessageCommand::Ack | AppMessageCommand::Nack) {
            return Ok(Self {
                command,
                transaction_id,
                uuid: None,
                tuples: Vec::new(),
            });
        }

        need(buf, 17, kind)?;
        let mut uuid = [0u8; 16];
        buf.copy_to_slice(&mut uuid);
        let count = buf.get_u8() as usize;
        let mut tuples = Vec::with_capacity(count);
        for _ in 0..count {
            tuples.push(Tuple::decode(&mut buf)?);
        }
        Ok(Self {
            command,
            transaction_id,
            uuid: Some(uuid),
            tuples,
        })
    }

    /// True when the device expects this message to be acknowledged.
    pub fn needs_ack(&self) -> bool {
        matches!(
            self.command,
            AppMessageCommand::Push | AppMessageCommand::Request
        )
    }
}

/// Device log line, kept opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub raw: Bytes,
}

impl LogMessage {
    /// Best-effort text rendering.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }
}

/// Notification endpoint reply, kept opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationAck {
    pub raw: Bytes,
}

/// One installed application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppBankEntry {
    pub id: u32,
    pub index: u32,
    pub name: String,
    pub company: String,
    pub flags: u32,
    pub version: u16,
}

impl AppBankEntry {
    /// Encoded size of one entry.
    pub const SIZE: usize = 4 + 4 + 32 + 32 + 4 + 2;

    fn decode(buf: &mut &[u8]) -> Self {
        let id = buf.get_u32();
        let index = buf.get_u32();
        let name = fixed_string(buf, 32);
        let company = fixed_string(buf, 32);
        Self {
            id,
            index,
            name,
            company,
            flags: buf.get_u32(),
            version: buf.get_u16(),
        }
    }
}

/// App bank listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppBankContents {
    pub bank_count: u32,
    pub apps: Vec<AppBankEntry>,
}

/// App manager reply: either the bank listing or a status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppBankResponse {
    Contents(AppBankContents),
    Status(u32),
}

impl AppBankResponse {
    /// Status reported for a successful removal.
    pub const STATUS_SUCCESS: u32 = 1;

    pub(crate) fn decode(mut buf: &[u8]) -> Result<Self> {
        let kind = ResponseKind::AppBank;
        need(buf, 1, kind)?;
        match buf.get_u8() {
            0x01 => {
                need(buf, 8, kind)?;
                let bank_count = buf.get_u32();
                let app_count = buf.get_u32() as usize;
                need(buf, app_count * AppBankEntry::SIZE, kind)?;
                let apps = (0..app_count)
                    .map(|_| AppBankEntry::decode(&mut buf))
                    .collect();
                Ok(AppBankResponse::Contents(AppBankContents { bank_count, apps }))
            }
            0x02 => {
                need(buf, 4, kind)?;
                Ok(AppBankResponse::Status(buf.get_u32()))
            }
            other => Err(decode_error(kind, format!("unexpected tag {:#04x}", other))),
        }
    }
}

/// Blob database result codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobDbStatus {
    Success,
    GeneralFailure,
    InvalidOperation,
    InvalidDatabaseId,
    InvalidData,
    KeyDoesNotExist,
    DatabaseFull,
    DataStale,
    Other(u8),
}

impl BlobDbStatus {
    fn from_byte(byte: u8) -> Self {
        match byte {
            0x01 => BlobDbStatus::Success,
            0x02 => BlobDbStatus::GeneralFailure,
            0x03 => BlobDbStatus::InvalidOperation,
            0x04 => BlobDbStatus::InvalidDatabaseId,
            0x05 => BlobDbStatus::InvalidData,
            0x06 => BlobDbStatus::KeyDoesNotExist,
            0x07 => BlobDbStatus::DatabaseFull,
            0x08 => BlobDbStatus::DataStale,
            other => BlobDbStatus::Other(other),
        }
    }
}

/// Blob database acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobDbAck {
    pub token: u16,
    pub status: BlobDbStatus,
}

impl BlobDbAck {
    pub(crate) fn decode(mut buf: &[u8]) -> Result<Self> {
        need(buf, 3, ResponseKind::BlobDbAck)?;
        Ok(Self {
            token: buf.get_u16_le(),
            status: BlobDbStatus::from_byte(buf.get_u8()),
        })
    }
}

/// Bulk transfer acknowledgement: `[status][token...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutBytesAck {
    pub status: u8,
    /// Bytes following the status marker. Only meaningful for the reply to
    /// a begin request.
    pub token: Bytes,
}

impl PutBytesAck {
    pub const ACK: u8 = 0x01;
    pub const NACK: u8 = 0x02;

    pub(crate) fn decode(payload: &Bytes) -> Result<Self> {
        need(payload, 1, ResponseKind::PutBytesAck)?;
        Ok(Self {
            status: payload[0],
            token: payload.slice(1..),
        })
    }

    pub fn is_ack(&self) -> bool {
        self.status == Self::ACK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded(s: &str, len: usize) -> Vec<u8> {
        let mut v = s.as_bytes().to_vec();
        v.resize(len, 0);
        v
    }

    #[test]
    fn test_ping_decode() {
        let ping = PingResponse::decode(&[0x01, 0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        assert_eq!(ping.cookie, 0xDEADBEEF);
    }

    #[test]
    fn test_ping_wrong_tag() {
        let err = PingResponse::decode(&[0x00, 0, 0, 0, 1]).unwrap_err();
        assert!(matches!(
            err,
            WireError::Decode {
                kind: ResponseKind::Ping,
                ..
            }
        ));
    }

    #[test]
    fn test_time_truncated() {
        assert!(TimeResponse::decode(&[0x01, 0x00]).is_err());
    }

    #[test]
    fn test_app_bank_contents() {
        let mut payload = vec![0x01, 0, 0, 0, 8, 0, 0, 0, 1];
        payload.extend_from_slice(&7u32.to_be_bytes());
        payload.extend_from_slice(&2u32.to_be_bytes());
        payload.extend(padded("Weather", 32));
        payload.extend(padded("Acme", 32));
        payload.extend_from_slice(&0x10u32.to_be_bytes());
        payload.extend_from_slice(&3u16.to_be_bytes());

        match AppBankResponse::decode(&payload).unwrap() {
            AppBankResponse::Contents(contents) => {
                assert_eq!(contents.bank_count, 8);
                assert_eq!(contents.apps.len(), 1);
                let app = &contents.apps[0];
                assert_eq!(app.id, 7);
                assert_eq!(app.index, 2);
                assert_eq!(app.name, "Weather");
                assert_eq!(app.company, "Acme");
                assert_eq!(app.version, 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_app_bank_count_exceeds_payload() {
        let payload = [0x01, 0, 0, 0, 8, 0, 0, 0, 2];
        assert!(AppBankResponse::decode(&payload).is_err());
    }

    #[test]
    fn test_app_message_push_decode() {
        let mut payload = vec![0x01, 0x2A];
        payload.extend_from_slice(&[0x11; 16]);
        payload.push(2);
        Tuple::new(1, TupleValue::CString("hi".into())).encode_into(&mut payload);
        Tuple::new(2, TupleValue::Int16(-5)).encode_into(&mut payload);

        let msg = AppMessage::decode(&payload).unwrap();
        assert_eq!(msg.command, AppMessageCommand::Push);
        assert_eq!(msg.transaction_id, 0x2A);
        assert_eq!(msg.uuid, Some([0x11; 16]));
        assert!(msg.needs_ack());
        assert_eq!(
            msg.tuples,
            vec![
                Tuple::new(1, TupleValue::CString("hi".into())),
                Tuple::new(2, TupleValue::Int16(-5)),
            ]
        );
    }

    #[test]
    fn test_app_message_ack_decode() {
        let msg = AppMessage::decode(&[0xFF, 0x07]).unwrap();
        assert_eq!(msg.command, AppMessageCommand::Ack);
        assert_eq!(msg.transaction_id, 7);
        assert!(!msg.needs_ack());
    }

    #[test]
    fn test_tuple_bad_width() {
        let mut payload = vec![0x01, 0x01];
        payload.extend_from_slice(&[0; 16]);
        payload.push(1);
        payload.extend_from_slice(&[1, 0, 0, 0, 2, 3, 0, 1, 2, 3]);
        assert!(AppMessage::decode(&payload).is_err());
    }

    #[test]
    fn test_blobdb_ack_little_endian() {
        let ack = BlobDbAck::decode(&[0x34, 0x12, 0x01]).unwrap();
        assert_eq!(ack.token, 0x1234);
        assert_eq!(ack.status, BlobDbStatus::Success);
    }

    #[test]
    fn test_put_bytes_token_past_status() {
        let ack = PutBytesAck::decode(&Bytes::from_static(&[0x01, 0xAA, 0xBB])).unwrap();
        assert!(ack.is_ack());
        assert_eq!(&ack.token[..], &[0xAA, 0xBB]);
        assert!(PutBytesAck::decode(&Bytes::new()).is_err());
    }

    #[test]
    fn test_firmware_version_running_only() {
        let mut payload = vec![0x01];
        payload.extend_from_slice(&1_400_000_000u32.to_be_bytes());
        payload.extend(padded("v4.4", 32));
        payload.extend(padded("abc1234", 8));
        payload.extend_from_slice(&[0, 9, 1]);

        let fw = FirmwareVersionResponse::decode(&payload).unwrap();
        assert_eq!(fw.running.version, "v4.4");
        assert_eq!(fw.running.commit, "abc1234");
        assert!(!fw.running.is_recovery);
        assert_eq!(fw.running.hardware_platform, 9);
        assert!(fw.recovery.is_none());
    }

    #[test]
    fn test_system_message_commands() {
        let msg = SystemMessage::decode(&[0x00, 0x02]).unwrap();
        assert_eq!(msg.command, SystemCommand::FirmwareComplete);
        assert_eq!(SystemCommand::from_byte(0x42).to_byte(), 0x42);
    }
}
