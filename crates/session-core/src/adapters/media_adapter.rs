use async_trait::async_trait;

use crate::errors::Result;
use crate::types::{MediaConstraints, MediaStream};

/// Local capture devices (camera and microphone)
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Returns `SessionError::MediaAcquisition` on denial or missing hardware
    async fn acquire(&self, constraints: MediaConstraints) -> Result<MediaStream>;

    /// Stop every track of a stream returned by `acquire`
    fn release(&self, stream: &MediaStream);
}
