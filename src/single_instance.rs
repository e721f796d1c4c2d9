//! Single instance lock.
//! Windows: a named kernel mutex, scoped to the current session unless the
//! configured name carries a `Global\` prefix.
//! Other platforms: no named primitive; every launch runs as an unguarded
//! first instance.

#[cfg(target_os = "windows")]
use marquis_core::{LockBackend, LockError};
#[cfg(target_os = "windows")]
use windows::core::PCWSTR;
#[cfg(target_os = "windows")]
use windows::Win32::{
    Foundation::{CloseHandle, GetLastError, ERROR_ALREADY_EXISTS, HANDLE},
    System::Threading::CreateMutexW,
};

#[cfg(target_os = "windows")]
#[derive(Debug, Default, Clone, Copy)]
pub struct NamedMutex;

#[cfg(target_os = "windows")]
impl LockBackend for NamedMutex {
    type Handle = HANDLE;

    fn open(&self, name: &str) -> Result<(HANDLE, bool), LockError> {
        let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
        // 不请求初始所有权：互斥体只用于存在性检测
        let handle = unsafe { CreateMutexW(None, false, PCWSTR(wide.as_ptr())) }.map_err(|e| {
            LockError::CreateFailed {
                name: name.to_owned(),
                reason: e.to_string(),
            }
        })?;
        let existed = unsafe { GetLastError() } == ERROR_ALREADY_EXISTS;
        Ok((handle, existed))
    }

    fn close(&self, handle: HANDLE) {
        unsafe {
            if let Err(e) = CloseHandle(handle) {
                log::debug!("CloseHandle on instance mutex failed: {e}");
            }
        }
    }
}

#[cfg(target_os = "windows")]
pub type PlatformLock = NamedMutex;
#[cfg(not(target_os = "windows"))]
pub type PlatformLock = marquis_core::lock::UnsupportedLock;
