//! Launch-time role decision.
//!
//! `Start -> First -> (host window) -> exit` or
//! `Start -> Second -> forward -> exit`. The instance lock is held for the
//! whole run and released before returning on every path.

use anyhow::Result;
use log::info;
use marquis_core::launch::current_launch_argument;
use marquis_core::{
    Forwarder, InstanceGuard, LockBackend, Ownership, RunnerConfig, WindowMessenger,
};

use crate::host_window;
use crate::single_instance::PlatformLock;

#[cfg(target_os = "windows")]
type PlatformMessenger = crate::windows_util::Win32Messenger;
#[cfg(not(target_os = "windows"))]
type PlatformMessenger = NoWindowMessenger;

/// Messenger for platforms without cross-process window lookup: nothing is
/// ever found, so forwarding is a no-op.
#[cfg(not(target_os = "windows"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWindowMessenger;

#[cfg(not(target_os = "windows"))]
impl WindowMessenger for NoWindowMessenger {
    type Window = ();

    fn find_window(&self, _class_name: &str) -> Option<()> {
        None
    }

    fn send_copy_data(
        &self,
        _window: (),
        _payload: &marquis_core::CopyDataPayload,
        _timeout: std::time::Duration,
    ) -> Result<(), marquis_core::DeliveryError> {
        Ok(())
    }

    fn is_minimized(&self, _window: ()) -> bool {
        false
    }

    fn restore(&self, _window: ()) {}

    fn set_foreground(&self, _window: ()) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchRole {
    First,
    Second,
}

impl From<Ownership> for LaunchRole {
    fn from(ownership: Ownership) -> Self {
        match ownership {
            Ownership::AlreadyHeld => LaunchRole::Second,
            // 锁不可用时按首个实例运行
            Ownership::Owner | Ownership::Unavailable => LaunchRole::First,
        }
    }
}

/// Runs one launch with explicit collaborators.
///
/// `host` runs only for the first instance. A second instance always
/// returns `Ok`, whatever happened while forwarding.
pub fn launch<B, M, H>(
    backend: B,
    messenger: M,
    config: &RunnerConfig,
    launch_arg: Option<String>,
    host: H,
) -> Result<LaunchRole>
where
    B: LockBackend,
    M: WindowMessenger,
    H: FnOnce(&RunnerConfig, Option<String>) -> Result<()>,
{
    let mut lock = InstanceGuard::acquire(backend, &config.instance_name);
    let role = LaunchRole::from(lock.ownership());
    info!("launch role: {role:?} (lock `{}`)", lock.name());

    match role {
        LaunchRole::Second => {
            let outcome = Forwarder::new(messenger, config).forward(launch_arg.as_deref());
            log::debug!("forwarding finished: {outcome:?}");
        }
        LaunchRole::First => host(config, launch_arg)?,
    }

    lock.release();
    Ok(role)
}

/// Entry point used by `main`: platform lock, platform messenger, real host
/// window, configuration from the environment.
pub fn run() -> Result<LaunchRole> {
    let config = RunnerConfig::from_env();
    launch(
        PlatformLock::default(),
        PlatformMessenger::default(),
        &config,
        current_launch_argument(),
        host_window::run_host,
    )
}
