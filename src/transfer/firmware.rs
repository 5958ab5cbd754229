//! Firmware update sequence.

use super::{PutBytes, TransferProgress, TransferType};
use crate::client::Client;
use crate::error::Result;
use crate::response::SystemCommand;

impl Client {
    /// Install a firmware image, with optional system resources.
    ///
    /// Announces the update, uploads resources then firmware, and reports
    /// completion. If an upload fails the device is told the update failed
    /// and the upload error is returned.
    pub async fn install_firmware<P>(
        &self,
        firmware: &[u8],
        resources: Option<&[u8]>,
        mut progress: P,
    ) -> Result<()>
    where
        P: FnMut(TransferProgress),
    {
        self.system_message(SystemCommand::FirmwareStart).await?;

        let engine = PutBytes::new(self);
        let uploaded = async {
            if let Some(resources) = resources {
                engine
                    .send(resources, TransferType::SysResources, 0, &mut progress)
                    .await?;
            }
            engine
                .send(firmware, TransferType::Firmware, 0, &mut progress)
                .await
        }
        .await;

        match uploaded {
            Ok(()) => {
                self.system_message(SystemCommand::FirmwareComplete).await?;
                tracing::info!("Firmware installed ({} bytes)", firmware.len());
                Ok(())
            }
            Err(e) => {
                if let Err(notify) = self.system_message(SystemCommand::FirmwareFail).await {
                    tracing::warn!("Could not report firmware failure: {}", notify);
                }
                Err(e)
            }
        }
    }
}
