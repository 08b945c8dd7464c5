use std::time::Duration;

use ecnwire_frame::FrameConfig;

/// Timeouts bounding one exchange.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bound on establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Bound on each blocking read (header, payload).
    pub read_timeout: Duration,
    /// Bound on each blocking write.
    pub write_timeout: Duration,
}

impl ClientConfig {
    /// Same timeout for every stage.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            connect_timeout: timeout,
            read_timeout: timeout,
            write_timeout: timeout,
        }
    }

    pub(crate) fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            read_timeout: Some(self.read_timeout),
            write_timeout: Some(self.write_timeout),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::with_timeout(Duration::from_secs(5))
    }
}
