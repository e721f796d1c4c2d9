pub mod host_window;
pub mod launcher;
pub mod single_instance;
#[cfg(target_os = "windows")]
pub mod windows_util;
