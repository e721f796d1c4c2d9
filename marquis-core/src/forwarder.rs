//! Second-launch handoff: find the running window, send it the launch
//! argument as a `file:///` URI, then pull it to the foreground.
//!
//! Every step is best-effort. [`Forwarder::forward`] never fails; what
//! happened is reported through [`ForwardOutcome`] for logging and tests, and
//! the caller exits successfully in all cases.

use std::fmt;
use std::time::Duration;

use crate::config::RunnerConfig;
use crate::error::DeliveryError;
use crate::message::CopyDataPayload;
use crate::uri::to_file_uri;

/// Cross-process window operations the forwarder needs.
///
/// `Window` is a plain, non-owning handle value. Implementations must not
/// assume it stays valid past a single call.
pub trait WindowMessenger {
    type Window: Copy + fmt::Debug;

    fn find_window(&self, class_name: &str) -> Option<Self::Window>;

    /// Synchronous data-copy send; blocks at most `timeout`.
    fn send_copy_data(
        &self,
        window: Self::Window,
        payload: &CopyDataPayload,
        timeout: Duration,
    ) -> Result<(), DeliveryError>;

    fn is_minimized(&self, window: Self::Window) -> bool;

    fn restore(&self, window: Self::Window);

    /// Returns whether the OS accepted the request.
    fn set_foreground(&self, window: Self::Window) -> bool;
}

#[derive(Debug)]
pub enum ForwardOutcome {
    /// No window registered under the class: the first instance is gone or
    /// still starting up.
    WindowNotFound,
    /// No launch argument; the window was only activated.
    NothingToForward { activated: bool },
    Delivered { uri: String, activated: bool },
    DeliveryFailed {
        uri: String,
        error: DeliveryError,
        activated: bool,
    },
}

pub struct Forwarder<'a, M: WindowMessenger> {
    messenger: M,
    config: &'a RunnerConfig,
}

impl<'a, M: WindowMessenger> Forwarder<'a, M> {
    pub fn new(messenger: M, config: &'a RunnerConfig) -> Self {
        Self { messenger, config }
    }

    pub fn forward(&self, launch_arg: Option<&str>) -> ForwardOutcome {
        let Some(window) = self.messenger.find_window(&self.config.window_class) else {
            log::info!(
                "no window of class `{}`; nothing to forward to",
                self.config.window_class
            );
            return ForwardOutcome::WindowNotFound;
        };
        log::debug!("found running instance window {window:?}");

        let outcome = match launch_arg {
            None => ForwardOutcome::NothingToForward {
                activated: self.activate(window),
            },
            Some(path) => {
                let uri = to_file_uri(path);
                let payload = CopyDataPayload::from_uri(self.config.message_tag, &uri);
                let sent =
                    self.messenger
                        .send_copy_data(window, &payload, self.config.send_timeout);
                // 无论发送成败都尝试激活窗口
                let activated = self.activate(window);
                match sent {
                    Ok(()) => ForwardOutcome::Delivered { uri, activated },
                    Err(error) => ForwardOutcome::DeliveryFailed {
                        uri,
                        error,
                        activated,
                    },
                }
            }
        };
        match &outcome {
            ForwardOutcome::Delivered { uri, .. } => log::info!("forwarded {uri}"),
            ForwardOutcome::DeliveryFailed { uri, error, .. } => {
                log::warn!("could not forward {uri}: {error}")
            }
            _ => {}
        }
        outcome
    }

    fn activate(&self, window: M::Window) -> bool {
        if self.messenger.is_minimized(window) {
            self.messenger.restore(window);
        }
        let ok = self.messenger.set_foreground(window);
        if !ok {
            // 可能被系统的前台锁定策略拒绝，不重试
            log::debug!("foreground request for {window:?} was denied");
        }
        ok
    }
}
