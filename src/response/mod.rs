//! Response module - kinds, the endpoint table, and decoders.
//!
//! Provides:
//! - [`ResponseKind`] - closed set of inbound message types
//! - [`Response`] - tagged union of decoded payloads
//! - per-kind payload structs in [`types`]

mod kind;
pub mod types;

use bytes::Bytes;

pub use kind::ResponseKind;
pub use types::{
    AppBankContents, AppBankEntry, AppBankResponse, AppMessage, AppMessageCommand, BlobDbAck,
    BlobDbStatus, FirmwareMetadata, FirmwareVersionResponse, LogMessage, MusicCommand,
    NotificationAck, PhoneVersionQuery, PingResponse, PutBytesAck, SystemCommand, SystemMessage,
    TimeResponse, Tuple, TupleValue,
};

use crate::error::Result;

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ping(PingResponse),
    Time(TimeResponse),
    FirmwareVersion(FirmwareVersionResponse),
    PhoneVersion(PhoneVersionQuery),
    SystemMessage(SystemMessage),
    MusicControl(MusicCommand),
    AppMessage(AppMessage),
    Logs(LogMessage),
    Notification(NotificationAck),
    AppBank(AppBankResponse),
    BlobDbAck(BlobDbAck),
    PutBytesAck(PutBytesAck),
}

impl Response {
    /// Decode `payload` as a message of `kind`.
    pub fn decode(kind: ResponseKind, payload: &Bytes) -> Result<Self> {
        Ok(match kind {
            ResponseKind::Ping => Response::Ping(PingResponse::decode(payload)?),
            ResponseKind::Time => Response::Time(TimeResponse::decode(payload)?),
            ResponseKind::FirmwareVersion => {
                Response::FirmwareVersion(FirmwareVersionResponse::decode(payload)?)
            }
            ResponseKind::PhoneVersion => {
                Response::PhoneVersion(PhoneVersionQuery::decode(payload)?)
            }
            ResponseKind::SystemMessage => Response::SystemMessage(SystemMessage::decode(payload)?),
            ResponseKind::MusicControl => Response::MusicControl(MusicCommand::decode(payload)?),
            ResponseKind::AppMessage => Response::AppMessage(AppMessage::decode(payload)?),
            ResponseKind::Logs => Response::Logs(LogMessage {
                raw: payload.clone(),
            }),
            ResponseKind::Notification => Response::Notification(NotificationAck {
                raw: payload.clone(),
            }),
            ResponseKind::AppBank => Response::AppBank(AppBankResponse::decode(payload)?),
            ResponseKind::BlobDbAck => Response::BlobDbAck(BlobDbAck::decode(payload)?),
            ResponseKind::PutBytesAck => Response::PutBytesAck(PutBytesAck::decode(payload)?),
        })
    }

    /// The kind this response belongs to.
    pub fn kind(&self) -> ResponseKind {
        match self {
            Response::Ping(_) => ResponseKind::Ping,
            Response::Time(_) => ResponseKind::Time,
            Response::FirmwareVersion(_) => ResponseKind::FirmwareVersion,
            Response::PhoneVersion(_) => ResponseKind::PhoneVersion,
            Response::SystemMessage(_) => ResponseKind::SystemMessage,
            Response::MusicControl(_) => ResponseKind::MusicControl,
            Response::AppMessage(_) => ResponseKind::AppMessage,
            Response::Logs(_) => ResponseKind::Logs,
            Response::Notification(_) => ResponseKind::Notification,
            Response::AppBank(_) => ResponseKind::AppBank,
            Response::BlobDbAck(_) => ResponseKind::BlobDbAck,
            Response::PutBytesAck(_) => ResponseKind::PutBytesAck,
        }
    }
}
