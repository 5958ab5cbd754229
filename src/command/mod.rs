//! Command façade - one method per device operation.
//!
//! Request/response commands go through [`Client::request`]: one
//! transaction, one frame, one wait, and a timeout disconnects. Commands
//! with no reply on the wire are sent with [`Client::send`].

pub mod payload;

use std::time::{SystemTime, UNIX_EPOCH};

use crate::client::Client;
use crate::error::{Result, WireError};
use crate::protocol::endpoints;
use crate::response::{
    AppBankContents, AppBankResponse, AppMessageCommand, BlobDbStatus, FirmwareVersionResponse,
    NotificationAck, Response, ResponseKind, SystemCommand, Tuple,
};

pub use payload::{BlobDatabase, NotificationKind};

fn unexpected(expected: ResponseKind, got: &Response) -> WireError {
    WireError::Protocol(format!("expected {:?} reply, got {:?}", expected, got))
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl Client {
    /// Ping the device and return the echoed cookie.
    pub async fn ping(&self, cookie: u32) -> Result<u32> {
        let kind = ResponseKind::Ping;
        match self.request(kind, endpoints::PING, payload::ping(cookie)).await? {
            Response::Ping(pong) if pong.cookie == cookie => Ok(pong.cookie),
            Response::Ping(pong) => Err(WireError::Protocol(format!(
                "ping cookie {:#x} echoed as {:#x}",
                cookie, pong.cookie
            ))),
            other => Err(unexpected(kind, &other)),
        }
    }

    /// Read the device clock, seconds since the Unix epoch.
    pub async fn get_time(&self) -> Result<u32> {
        let kind = ResponseKind::Time;
        match self.request(kind, endpoints::TIME, payload::get_time()).await? {
            Response::Time(time) => Ok(time.unix_time),
            other => Err(unexpected(kind, &other)),
        }
    }

    /// Set the device clock. The device does not answer.
    pub async fn set_time(&self, unix_time: u32) -> Result<()> {
        self.send(endpoints::TIME, payload::set_time(unix_time)).await
    }

    /// Running and recovery firmware metadata.
    pub async fn firmware_version(&self) -> Result<FirmwareVersionResponse> {
        let kind = ResponseKind::FirmwareVersion;
        match self
            .request(kind, endpoints::FIRMWARE_VERSION, payload::firmware_version())
            .await?
        {
            Response::FirmwareVersion(version) => Ok(version),
            other => Err(unexpected(kind, &other)),
        }
    }

    /// Reboot the device. The link usually drops right after.
    pub async fn reset(&self) -> Result<()> {
        self.send(endpoints::RESET, payload::reset()).await
    }

    /// List installed applications.
    pub async fn app_bank_contents(&self) -> Result<AppBankContents> {
        let kind = ResponseKind::AppBank;
        match self
            .request(kind, endpoints::APP_MANAGER, payload::app_bank_list())
            .await?
        {
            Response::AppBank(AppBankResponse::Contents(contents)) => Ok(contents),
            other => Err(unexpected(kind, &other)),
        }
    }

    /// Remove the application `id` installed in bank slot `index`.
    pub async fn remove_app(&self, id: u32, index: u32) -> Result<()> {
        let kind = ResponseKind::AppBank;
        match self
            .request(kind, endpoints::APP_MANAGER, payload::remove_app(id, index))
            .await?
        {
            Response::AppBank(AppBankResponse::Status(AppBankResponse::STATUS_SUCCESS)) => Ok(()),
            Response::AppBank(AppBankResponse::Status(status)) => Err(WireError::Protocol(
                format!("removing app {} failed with status {}", id, status),
            )),
            other => Err(unexpected(kind, &other)),
        }
    }

    /// Show an SMS notification.
    pub async fn send_sms(&self, sender: &str, body: &str) -> Result<NotificationAck> {
        self.send_notification(NotificationKind::Sms, sender, body, None)
            .await
    }

    /// Show an email notification.
    pub async fn send_email(
        &self,
        sender: &str,
        subject: &str,
        body: &str,
    ) -> Result<NotificationAck> {
        self.send_notification(NotificationKind::Email, sender, body, Some(subject))
            .await
    }

    async fn send_notification(
        &self,
        notification: NotificationKind,
        sender: &str,
        body: &str,
        subject: Option<&str>,
    ) -> Result<NotificationAck> {
        let kind = ResponseKind::Notification;
        let body = payload::notification(notification, sender, body, now_millis(), subject);
        match self.request(kind, endpoints::NOTIFICATION, body).await? {
            Response::Notification(ack) => Ok(ack),
            other => Err(unexpected(kind, &other)),
        }
    }

    /// Update the music app's now playing fields. The device does not answer.
    pub async fn set_now_playing(&self, artist: &str, album: &str, track: &str) -> Result<()> {
        self.send(
            endpoints::MUSIC_CONTROL,
            payload::now_playing(artist, album, track),
        )
        .await
    }

    /// Push a dictionary to the watch app `uuid` and wait for its ack.
    ///
    /// A NACK, or an ack for another transaction, is a protocol error.
    pub async fn send_app_message(&self, uuid: [u8; 16], tuples: &[Tuple]) -> Result<()> {
        let kind = ResponseKind::AppMessage;
        let txid = self.next_app_message_id();
        let body = payload::app_message_push(txid, &uuid, tuples)?;

        match self.request(kind, endpoints::APP_MESSAGE, body).await? {
            Response::AppMessage(reply) if reply.transaction_id != txid => {
                Err(WireError::Protocol(format!(
                    "app message {} answered for transaction {}",
                    txid, reply.transaction_id
                )))
            }
            Response::AppMessage(reply) => match reply.command {
                AppMessageCommand::Ack => Ok(()),
                AppMessageCommand::Nack => Err(WireError::Protocol(format!(
                    "app message {} rejected",
                    txid
                ))),
                command => Err(WireError::Protocol(format!(
                    "app message {} answered with {:?}",
                    txid, command
                ))),
            },
            other => Err(unexpected(kind, &other)),
        }
    }

    /// Store `value` under `key`.
    pub async fn blobdb_insert(
        &self,
        db: BlobDatabase,
        key: &[u8],
        value: &[u8],
    ) -> Result<BlobDbStatus> {
        let token = self.next_blobdb_token();
        let body = payload::blobdb_insert(token, db, key, value)?;
        self.blobdb_request(token, body).await
    }

    /// Delete `key`.
    pub async fn blobdb_delete(&self, db: BlobDatabase, key: &[u8]) -> Result<BlobDbStatus> {
        let token = self.next_blobdb_token();
        let body = payload::blobdb_delete(token, db, key)?;
        self.blobdb_request(token, body).await
    }

    /// Drop every entry of `db`.
    pub async fn blobdb_clear(&self, db: BlobDatabase) -> Result<BlobDbStatus> {
        let token = self.next_blobdb_token();
        self.blobdb_request(token, payload::blobdb_clear(token, db))
            .await
    }

    async fn blobdb_request(&self, token: u16, body: bytes::Bytes) -> Result<BlobDbStatus> {
        let kind = ResponseKind::BlobDbAck;
        match self.request(kind, endpoints::BLOB_DB, body).await? {
            Response::BlobDbAck(ack) if ack.token == token => Ok(ack.status),
            Response::BlobDbAck(ack) => Err(WireError::Protocol(format!(
                "blob db token {} acknowledged as {}",
                token, ack.token
            ))),
            other => Err(unexpected(kind, &other)),
        }
    }

    /// Tell the device a firmware update is starting, finished or failed.
    pub async fn system_message(&self, command: SystemCommand) -> Result<()> {
        self.send(endpoints::SYSTEM_MESSAGE, payload::system_message(command))
            .await
    }
}
