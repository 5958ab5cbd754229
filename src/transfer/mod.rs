//! Transfer module - bulk uploads over the PutBytes endpoint.
//!
//! Provides:
//! - [`PutBytes`] - begin / chunk / commit / finalize state machine
//! - [`checksum`] - CRC32 over a whole binary
//! - [`TransferProgress`] - coarse progress milestones
//! - [`Client::install_firmware`](crate::Client::install_firmware) - the
//!   firmware update sequence around two uploads

mod firmware;
mod put_bytes;

pub use put_bytes::PutBytes;

/// Bytes of content per chunk request.
pub const CHUNK_SIZE: usize = 2000;

/// What the uploaded binary is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    Firmware,
    Recovery,
    SysResources,
    Resources,
    Binary,
}

impl TransferType {
    pub fn to_byte(self) -> u8 {
        match self {
            TransferType::Firmware => 1,
            TransferType::Recovery => 2,
            TransferType::SysResources => 3,
            TransferType::Resources => 4,
            TransferType::Binary => 5,
        }
    }
}

/// Where a transfer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    Started,
    TokenAcquired,
    Chunk { sent: usize, total: usize },
    Committed,
    Complete,
}

/// One progress milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub stage: TransferStage,
    /// 0 to 100.
    pub percent: u8,
}

impl TransferProgress {
    fn at(stage: TransferStage) -> Self {
        let percent = match stage {
            TransferStage::Started => 0,
            TransferStage::TokenAcquired => 5,
            TransferStage::Chunk { sent, total } if total > 0 => (5 + 85 * sent / total) as u8,
            TransferStage::Chunk { .. } => 5,
            TransferStage::Committed => 95,
            TransferStage::Complete => 100,
        };
        Self { stage, percent }
    }
}

/// CRC32 of `data`.
pub fn checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}
