//! Closed set of response kinds and the static endpoint table.

use serde::{Deserialize, Serialize};

use crate::protocol::endpoints;

/// Logical type of a decoded inbound message.
///
/// Every inbound endpoint maps to at most one kind. Endpoints outside the
/// table are unhandled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResponseKind {
    Ping,
    Time,
    FirmwareVersion,
    PhoneVersion,
    SystemMessage,
    MusicControl,
    AppMessage,
    Logs,
    Notification,
    AppBank,
    BlobDbAck,
    PutBytesAck,
}

impl ResponseKind {
    /// Every kind, in declaration order.
    pub const ALL: [ResponseKind; 12] = [
        ResponseKind::Ping,
        ResponseKind::Time,
        ResponseKind::FirmwareVersion,
        ResponseKind::PhoneVersion,
        ResponseKind::SystemMessage,
        ResponseKind::MusicControl,
        ResponseKind::AppMessage,
        ResponseKind::Logs,
        ResponseKind::Notification,
        ResponseKind::AppBank,
        ResponseKind::BlobDbAck,
        ResponseKind::PutBytesAck,
    ];

    /// Look up the kind for an inbound endpoint.
    pub fn from_endpoint(endpoint: u16) -> Option<Self> {
        let kind = match endpoint {
            endpoints::PING => ResponseKind::Ping,
            endpoints::TIME => ResponseKind::Time,
            endpoints::FIRMWARE_VERSION => ResponseKind::FirmwareVersion,
            endpoints::PHONE_VERSION => ResponseKind::PhoneVersion,
            endpoints::SYSTEM_MESSAGE => ResponseKind::SystemMessage,
            endpoints::MUSIC_CONTROL => ResponseKind::MusicControl,
            endpoints::APP_MESSAGE => ResponseKind::AppMessage,
            endpoints::LOGS => ResponseKind::Logs,
            endpoints::NOTIFICATION => ResponseKind::Notification,
            endpoints::APP_MANAGER => ResponseKind::AppBank,
            endpoints::BLOB_DB => ResponseKind::BlobDbAck,
            endpoints::PUT_BYTES => ResponseKind::PutBytesAck,
            _ => return None,
        };
        Some(kind)
    }

    /// The endpoint this kind arrives on.
    pub fn endpoint(self) -> u16 {
        match self {
            ResponseKind::Ping => endpoints::PING,
            ResponseKind::Time => endpoints::TIME,
            ResponseKind::FirmwareVersion => endpoints::FIRMWARE_VERSION,
            ResponseKind::PhoneVersion => endpoints::PHONE_VERSION,
            ResponseKind::SystemMessage => endpoints::SYSTEM_MESSAGE,
            ResponseKind::MusicControl => endpoints::MUSIC_CONTROL,
            ResponseKind::AppMessage => endpoints::APP_MESSAGE,
            ResponseKind::Logs => endpoints::LOGS,
            ResponseKind::Notification => endpoints::NOTIFICATION,
            ResponseKind::AppBank => endpoints::APP_MANAGER,
            ResponseKind::BlobDbAck => endpoints::BLOB_DB,
            ResponseKind::PutBytesAck => endpoints::PUT_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_bijective() {
        for kind in ResponseKind::ALL {
            assert_eq!(ResponseKind::from_endpoint(kind.endpoint()), Some(kind));
        }
    }

    #[test]
    fn test_unmapped_endpoints() {
        assert_eq!(ResponseKind::from_endpoint(endpoints::RESET), None);
        assert_eq!(ResponseKind::from_endpoint(0), None);
        assert_eq!(ResponseKind::from_endpoint(0xFFFF), None);
    }
}
