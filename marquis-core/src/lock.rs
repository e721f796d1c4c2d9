//! Named instance lock with scoped release.
//!
//! The OS side lives behind [`LockBackend`]; [`InstanceGuard`] owns whatever
//! handle the backend hands out and closes it exactly once, either through
//! [`InstanceGuard::release`] or on drop.

#[cfg(any(test, feature = "test-util"))]
use std::collections::HashMap;
use std::fmt;
#[cfg(any(test, feature = "test-util"))]
use std::sync::{Mutex, OnceLock};

use crate::error::LockError;

/// Creates and closes named lock primitives.
pub trait LockBackend {
    type Handle;

    /// Creates or opens the primitive called `name`.
    ///
    /// The flag is `true` when the primitive already existed, i.e. another
    /// launch holds it.
    fn open(&self, name: &str) -> Result<(Self::Handle, bool), LockError>;

    fn close(&self, handle: Self::Handle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// This process created the lock: it is the first instance.
    Owner,
    /// Another live process holds the lock.
    AlreadyHeld,
    /// The primitive could not be created. Treated as first instance, without
    /// any exclusivity guarantee.
    Unavailable,
}

pub struct InstanceGuard<B: LockBackend> {
    backend: B,
    handle: Option<B::Handle>,
    ownership: Ownership,
    name: String,
}

impl<B: LockBackend> InstanceGuard<B> {
    /// Tries to take the lock. Never fails: infrastructure errors degrade to
    /// [`Ownership::Unavailable`].
    pub fn acquire(backend: B, name: &str) -> Self {
        let (handle, ownership) = match backend.open(name) {
            Ok((handle, false)) => (Some(handle), Ownership::Owner),
            Ok((handle, true)) => (Some(handle), Ownership::AlreadyHeld),
            Err(e) => {
                log::warn!("single-instance lock unavailable, running unguarded: {e}");
                (None, Ownership::Unavailable)
            }
        };
        log::debug!("instance lock `{name}`: {ownership:?}");
        Self {
            backend,
            handle,
            ownership,
            name: name.to_owned(),
        }
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn already_exists(&self) -> bool {
        self.ownership == Ownership::AlreadyHeld
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_none()
    }

    /// Closes the handle. Later calls, and the eventual drop, do nothing.
    pub fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.backend.close(handle);
            log::debug!("instance lock `{}` released", self.name);
        }
    }
}

impl<B: LockBackend> Drop for InstanceGuard<B> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<B: LockBackend> fmt::Debug for InstanceGuard<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceGuard")
            .field("name", &self.name)
            .field("ownership", &self.ownership)
            .field("released", &self.is_released())
            .finish()
    }
}

/// Backend for platforms without a named mutex: always reports
/// [`LockError::Unsupported`], so every launch runs as an unguarded first
/// instance.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedLock;

impl LockBackend for UnsupportedLock {
    type Handle = ();

    fn open(&self, _name: &str) -> Result<((), bool), LockError> {
        Err(LockError::Unsupported)
    }

    fn close(&self, _handle: ()) {}
}

#[cfg(any(test, feature = "test-util"))]
fn registry() -> &'static Mutex<HashMap<String, usize>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, usize>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// In-process named lock with the same open/close counting as a kernel
/// mutex object: the name exists while at least one handle is open.
///
/// Test-only: scope is the current process, so it gives no single-instance
/// guarantee. Enabled by the `test-util` feature.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryLock;

/// Handle returned by [`MemoryLock`]; carries the name it was opened with.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug)]
pub struct MemoryHandle(String);

#[cfg(any(test, feature = "test-util"))]
impl MemoryLock {
    /// Number of open handles for `name`.
    pub fn open_count(name: &str) -> usize {
        registry()
            .lock()
            .map(|r| r.get(name).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[cfg(any(test, feature = "test-util"))]
impl LockBackend for MemoryLock {
    type Handle = MemoryHandle;

    fn open(&self, name: &str) -> Result<(MemoryHandle, bool), LockError> {
        let mut reg = registry().lock().map_err(|e| LockError::CreateFailed {
            name: name.to_owned(),
            reason: e.to_string(),
        })?;
        let count = reg.entry(name.to_owned()).or_insert(0);
        let existed = *count > 0;
        *count += 1;
        Ok((MemoryHandle(name.to_owned()), existed))
    }

    fn close(&self, handle: MemoryHandle) {
        if let Ok(mut reg) = registry().lock() {
            if let Some(count) = reg.get_mut(&handle.0) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    reg.remove(&handle.0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_first_acquire_owns() {
        let name = "test.lock.first";
        let g = InstanceGuard::acquire(MemoryLock, name);
        assert_eq!(g.ownership(), Ownership::Owner);
        assert!(!g.already_exists());
    }

    #[test]
    fn test_second_acquire_sees_holder() {
        let name = "test.lock.second";
        let first = InstanceGuard::acquire(MemoryLock, name);
        let second = InstanceGuard::acquire(MemoryLock, name);
        assert_eq!(first.ownership(), Ownership::Owner);
        assert_eq!(second.ownership(), Ownership::AlreadyHeld);
        drop(second);
        drop(first);
        // 全部释放后名字可再次获得所有权
        let third = InstanceGuard::acquire(MemoryLock, name);
        assert_eq!(third.ownership(), Ownership::Owner);
    }

    #[test]
    fn test_concurrent_acquire_has_one_owner() {
        let name = "test.lock.race";
        let n = 16;
        let barrier = Arc::new(Barrier::new(n));
        let handles: Vec<_> = (0..n)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let g = InstanceGuard::acquire(MemoryLock, name);
                    let owner = !g.already_exists();
                    // 保持句柄直到所有线程都完成获取
                    barrier.wait();
                    owner
                })
            })
            .collect();
        let owners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&o| o)
            .count();
        assert_eq!(owners, 1);
    }

    #[test]
    fn test_double_release_closes_once() {
        let name = "test.lock.double";
        let mut g = InstanceGuard::acquire(MemoryLock, name);
        let _other = InstanceGuard::acquire(MemoryLock, name);
        assert_eq!(MemoryLock::open_count(name), 2);
        g.release();
        assert!(g.is_released());
        assert_eq!(MemoryLock::open_count(name), 1);
        g.release();
        drop(g);
        assert_eq!(MemoryLock::open_count(name), 1);
    }

    #[test]
    fn test_early_return_releases() {
        let name = "test.lock.early";
        fn run(name: &str, bail: bool) -> Result<(), &'static str> {
            let _guard = InstanceGuard::acquire(MemoryLock, name);
            if bail {
                return Err("bail");
            }
            Ok(())
        }
        assert!(run(name, true).is_err());
        assert_eq!(MemoryLock::open_count(name), 0);
        assert!(run(name, false).is_ok());
        assert_eq!(MemoryLock::open_count(name), 0);
    }

    #[test]
    fn test_unavailable_degrades_to_first_instance() {
        let mut g = InstanceGuard::acquire(UnsupportedLock, "test.lock.unsupported");
        assert_eq!(g.ownership(), Ownership::Unavailable);
        assert!(!g.already_exists());
        assert!(g.is_released());
        g.release();
    }
}
