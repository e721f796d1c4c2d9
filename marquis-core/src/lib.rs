//! Platform-independent half of the marquis launcher: single-instance lock
//! guard, launch-argument forwarding protocol and its wire format.

pub mod config;
pub mod error;
pub mod forwarder;
pub mod launch;
pub mod lock;
pub mod message;
pub mod uri;

pub use config::RunnerConfig;
pub use error::{ConfigError, DeliveryError, LockError, PayloadError};
pub use forwarder::{ForwardOutcome, Forwarder, WindowMessenger};
pub use lock::{InstanceGuard, LockBackend, Ownership};
pub use message::{classify_copy_data, decode_uri, CopyDataPayload, Received, APP_LINK_MESSAGE};
pub use uri::to_file_uri;
