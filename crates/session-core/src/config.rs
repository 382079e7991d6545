//! Call session configuration

use crate::errors::{Result, SessionError};
use crate::types::MediaConstraints;
use medcall_infra_common::config::{load_config, ConfigSource};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Behaviour knobs for a [`CallSessionManager`](crate::api::CallSessionManager)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    /// Local capture constraints
    pub media: MediaConstraints,
    /// Send `call-ended` to the remote party on hangup, decline and error
    pub notify_remote_on_end: bool,
    /// Answer an offer that arrives mid-call with `call-ended(busy)`
    pub reply_busy: bool,
    /// Give up on local media after this many milliseconds
    pub media_timeout_ms: Option<u64>,
    /// Capacity of the UI event broadcast channel
    pub event_channel_capacity: usize,
    /// Transition records kept per session
    pub history_limit: usize,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            media: MediaConstraints::default(),
            notify_remote_on_end: false,
            reply_busy: true,
            media_timeout_ms: None,
            event_channel_capacity: 256,
            history_limit: 64,
        }
    }
}

/// Settings files keep call options under a `[call]` table
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CallSection {
    call: CallConfig,
}

impl CallConfig {
    /// Load the `[call]` table of an optional TOML file, layered under
    /// `MEDCALL_CALL__*` variables
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut source = ConfigSource::new();
        if let Some(path) = file {
            source = source.with_file(path);
        }
        let section: CallSection = load_config(&source)?;
        section.call.validate()?;
        Ok(section.call)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.media.audio && !self.media.video {
            return Err(SessionError::Config(
                "at least one of media.audio or media.video must be enabled".to_string(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(SessionError::Config("event_channel_capacity must be positive".to_string()));
        }
        if self.history_limit == 0 {
            return Err(SessionError::Config("history_limit must be positive".to_string()));
        }
        if self.media_timeout_ms == Some(0) {
            return Err(SessionError::Config("media_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    pub fn media_timeout(&self) -> Option<Duration> {
        self.media_timeout_ms.map(Duration::from_millis)
    }

    pub fn with_notify_remote_on_end(mut self, notify: bool) -> Self {
        self.notify_remote_on_end = notify;
        self
    }

    pub fn with_reply_busy(mut self, reply: bool) -> Self {
        self.reply_busy = reply;
        self
    }

    pub fn with_media_timeout(mut self, timeout: Duration) -> Self {
        self.media_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_media(mut self, media: MediaConstraints) -> Self {
        self.media = media;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = CallConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.notify_remote_on_end);
        assert!(config.reply_busy);
        assert!(config.media.audio && config.media.video);
    }

    #[test]
    fn test_rejects_no_media() {
        let config = CallConfig::default().with_media(MediaConstraints { audio: false, video: false });
        assert!(matches!(config.validate(), Err(SessionError::Config(_))));
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let config = CallConfig {
            event_channel_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[call]\nnotify_remote_on_end = true\nmedia_timeout_ms = 1500\n[call.media]\nvideo = false"
        )
        .unwrap();

        let config = CallConfig::load(Some(file.path())).unwrap();
        assert!(config.notify_remote_on_end);
        assert_eq!(config.media_timeout(), Some(Duration::from_millis(1500)));
        assert!(config.media.audio);
        assert!(!config.media.video);
    }

    #[test]
    fn test_load_sample_settings_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/medcall.toml");
        let config = CallConfig::load(Some(&path)).unwrap();
        assert!(config.notify_remote_on_end);
        assert!(config.reply_busy);
        assert_eq!(config.media_timeout(), Some(Duration::from_millis(5000)));
    }

    #[test]
    fn test_huge_media_timeout_saturates() {
        let config = CallConfig::default().with_media_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(config.media_timeout_ms, Some(u64::MAX));
    }
}
