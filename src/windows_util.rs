// Win32 side of the instance handoff: the sender (`Win32Messenger`, used by a
// second launch) and the receiver (a subclass on the host window that turns
// WM_COPYDATA into `HostEvent::OpenUri`).

use std::ffi::c_void;
use std::time::Duration;

use anyhow::{anyhow, Result};
use marquis_core::{classify_copy_data, CopyDataPayload, DeliveryError, Received, WindowMessenger};
use windows::core::{HSTRING, PCWSTR};
use windows::Win32::Foundation::{
    GetLastError, ERROR_TIMEOUT, HWND, LPARAM, LRESULT, WIN32_ERROR, WPARAM,
};
use windows::Win32::System::DataExchange::COPYDATASTRUCT;
use windows::Win32::UI::Shell::{DefSubclassProc, RemoveWindowSubclass, SetWindowSubclass};
use windows::Win32::UI::WindowsAndMessaging::{
    FindWindowW, IsIconic, SendMessageTimeoutW, SetForegroundWindow, ShowWindow, SMTO_ABORTIFHUNG,
    SMTO_BLOCK, SW_RESTORE, WM_COPYDATA, WM_NCDESTROY,
};
use winit::event_loop::EventLoopProxy;
use winit::raw_window_handle::{HasWindowHandle, RawWindowHandle};
use winit::window::Window;

use crate::host_window::{post_open_uri, HostEvent};

#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Messenger;

impl WindowMessenger for Win32Messenger {
    type Window = HWND;

    fn find_window(&self, class_name: &str) -> Option<HWND> {
        let class = HSTRING::from(class_name);
        match unsafe { FindWindowW(&class, PCWSTR::null()) } {
            Ok(hwnd) if !hwnd.is_invalid() => Some(hwnd),
            _ => None,
        }
    }

    fn send_copy_data(
        &self,
        window: HWND,
        payload: &CopyDataPayload,
        timeout: Duration,
    ) -> Result<(), DeliveryError> {
        let cds = COPYDATASTRUCT {
            dwData: payload.tag(),
            cbData: payload.byte_len()?,
            lpData: payload.as_wide().as_ptr() as *mut c_void,
        };
        let timeout_ms = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        let mut reply: usize = 0;
        // SMTO_ABORTIFHUNG：接收方挂起时立即返回，不等满超时
        let ret = unsafe {
            SendMessageTimeoutW(
                window,
                WM_COPYDATA,
                WPARAM(0),
                LPARAM(&cds as *const COPYDATASTRUCT as isize),
                SMTO_BLOCK | SMTO_ABORTIFHUNG,
                timeout_ms,
                Some(&mut reply as *mut usize),
            )
        };
        if ret.0 != 0 {
            log::debug!("WM_COPYDATA delivered to {window:?}, reply={reply}");
            return Ok(());
        }
        Err(delivery_error(unsafe { GetLastError() }, timeout))
    }

    fn is_minimized(&self, window: HWND) -> bool {
        unsafe { IsIconic(window) }.as_bool()
    }

    fn restore(&self, window: HWND) {
        let _ = unsafe { ShowWindow(window, SW_RESTORE) };
    }

    fn set_foreground(&self, window: HWND) -> bool {
        unsafe { SetForegroundWindow(window) }.as_bool()
    }
}

/// Maps the last error of a failed `SendMessageTimeoutW`. A zero error code
/// also means the wait ran out.
fn delivery_error(err: WIN32_ERROR, timeout: Duration) -> DeliveryError {
    if err == ERROR_TIMEOUT || err.0 == 0 {
        DeliveryError::Timeout(timeout)
    } else {
        DeliveryError::SendFailed(windows::core::Error::from(err.to_hresult()).to_string())
    }
}

pub fn hwnd_of(window: &Window) -> Option<HWND> {
    let handle = window.window_handle().ok()?;
    match handle.as_raw() {
        RawWindowHandle::Win32(win) => Some(HWND(win.hwnd.get() as *mut _)),
        _ => None,
    }
}

const URI_RECEIVER_ID: usize = 0x4d52;

struct ReceiverContext {
    tag: usize,
    proxy: EventLoopProxy<HostEvent>,
}

/// Hooks WM_COPYDATA on `window`. Payloads tagged `tag` are decoded and
/// posted to the event loop; everything else goes to the default procedure.
pub fn install_uri_receiver(
    window: &Window,
    tag: usize,
    proxy: EventLoopProxy<HostEvent>,
) -> Result<()> {
    let hwnd = hwnd_of(window).ok_or_else(|| anyhow!("window has no Win32 handle"))?;
    let ctx = Box::into_raw(Box::new(ReceiverContext { tag, proxy }));
    let ok = unsafe { SetWindowSubclass(hwnd, Some(uri_receiver_proc), URI_RECEIVER_ID, ctx as usize) };
    if !ok.as_bool() {
        unsafe { drop(Box::from_raw(ctx)) };
        return Err(anyhow!("SetWindowSubclass failed for {hwnd:?}"));
    }
    log::debug!("uri receiver installed on {hwnd:?}");
    Ok(())
}

unsafe extern "system" fn uri_receiver_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
    id: usize,
    ref_data: usize,
) -> LRESULT {
    match msg {
        WM_COPYDATA if lparam.0 != 0 => {
            let ctx = &*(ref_data as *const ReceiverContext);
            let cds = &*(lparam.0 as *const COPYDATASTRUCT);
            // 非本应用的 dwData 不读取 lpData
            let bytes: &[u8] = if cds.dwData != ctx.tag || cds.lpData.is_null() || cds.cbData == 0 {
                &[]
            } else {
                std::slice::from_raw_parts(cds.lpData as *const u8, cds.cbData as usize)
            };
            // 只排队事件，立即返回；并发发送方由消息队列串行化
            match classify_copy_data(ctx.tag, cds.dwData, bytes) {
                Received::Foreign => {}
                Received::Uri(uri) => {
                    post_open_uri(&ctx.proxy, uri);
                    return LRESULT(1);
                }
                Received::Malformed(e) => {
                    log::warn!("rejected WM_COPYDATA payload: {e}");
                    return LRESULT(0);
                }
            }
        }
        WM_NCDESTROY => {
            let _ = RemoveWindowSubclass(hwnd, Some(uri_receiver_proc), id);
            drop(Box::from_raw(ref_data as *mut ReceiverContext));
        }
        _ => {}
    }
    DefSubclassProc(hwnd, msg, wparam, lparam)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquis_core::{to_file_uri, Forwarder, ForwardOutcome, RunnerConfig, APP_LINK_MESSAGE};
    use std::sync::mpsc;
    use windows::Win32::Foundation::ERROR_INVALID_WINDOW_HANDLE;
    use windows::Win32::UI::WindowsAndMessaging::{PostMessageW, WM_CLOSE};
    use winit::event::{Event, WindowEvent};
    use winit::event_loop::EventLoop;
    use winit::platform::windows::{EventLoopBuilderExtWindows, WindowAttributesExtWindows};
    use winit::window::WindowAttributes;

    #[test]
    fn test_find_unknown_class_returns_none() {
        let class = format!("MARQUIS_TEST_NO_SUCH_CLASS_{}", std::process::id());
        assert!(Win32Messenger.find_window(&class).is_none());
    }

    #[test]
    fn test_forward_without_running_window_is_noop() {
        let cfg = RunnerConfig {
            window_class: format!("MARQUIS_TEST_ABSENT_{}", std::process::id()),
            ..Default::default()
        };
        let outcome = Forwarder::new(Win32Messenger, &cfg).forward(Some(r"C:\a b.md"));
        assert!(matches!(outcome, ForwardOutcome::WindowNotFound));
    }

    #[test]
    fn test_delivery_error_mapping() {
        let t = Duration::from_millis(250);
        assert!(matches!(
            delivery_error(ERROR_TIMEOUT, t),
            DeliveryError::Timeout(d) if d == t
        ));
        assert!(matches!(
            delivery_error(WIN32_ERROR(0), t),
            DeliveryError::Timeout(_)
        ));
        assert!(matches!(
            delivery_error(ERROR_INVALID_WINDOW_HANDLE, t),
            DeliveryError::SendFailed(_)
        ));
    }

    // winit 每个进程只允许一个事件循环，接收端的真实往返都放在这一个测试里
    #[test]
    #[allow(deprecated)]
    fn test_copy_data_round_trip_through_receiver() {
        let class = format!("MARQUIS_TEST_RECEIVER_{}", std::process::id());
        let (ready_tx, ready_rx) = mpsc::channel::<EventLoopProxy<HostEvent>>();
        let (uri_tx, uri_rx) = mpsc::channel::<String>();
        let loop_class = class.clone();
        let host = std::thread::spawn(move || {
            let event_loop = EventLoop::<HostEvent>::with_user_event()
                .with_any_thread(true)
                .build()
                .unwrap();
            let proxy = event_loop.create_proxy();
            let mut window = None;
            event_loop
                .run(|event, elwt| match event {
                    Event::Resumed if window.is_none() => {
                        let attrs = WindowAttributes::default()
                            .with_visible(false)
                            .with_class_name(loop_class.clone());
                        let w = elwt.create_window(attrs).unwrap();
                        install_uri_receiver(&w, APP_LINK_MESSAGE, proxy.clone()).unwrap();
                        window = Some(w);
                        ready_tx.send(proxy.clone()).unwrap();
                    }
                    Event::UserEvent(HostEvent::OpenUri(uri)) => {
                        let _ = uri_tx.send(uri);
                    }
                    Event::WindowEvent {
                        event: WindowEvent::CloseRequested,
                        ..
                    } => elwt.exit(),
                    _ => {}
                })
                .unwrap();
        });
        let proxy = ready_rx.recv_timeout(Duration::from_secs(10)).unwrap();

        let hwnd = Win32Messenger.find_window(&class).unwrap();
        let timeout = Duration::from_secs(2);

        // 其他 dwData 交给默认窗口过程，不产生事件
        let foreign = CopyDataPayload::from_uri(0x1234, "file:///ignored");
        Win32Messenger.send_copy_data(hwnd, &foreign, timeout).unwrap();

        let ours = CopyDataPayload::from_uri(APP_LINK_MESSAGE, &to_file_uri(r"C:\a b"));
        Win32Messenger.send_copy_data(hwnd, &ours, timeout).unwrap();

        // 发送是同步的：若外来消息产生了事件，它会排在前面
        assert_eq!(
            uri_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            "file:///C:/a%20b"
        );
        assert!(uri_rx.try_recv().is_err());

        unsafe { PostMessageW(Some(hwnd), WM_CLOSE, WPARAM(0), LPARAM(0)).unwrap() };
        host.join().unwrap();

        let err = Win32Messenger.send_copy_data(hwnd, &ours, timeout).unwrap_err();
        assert!(matches!(err, DeliveryError::SendFailed(_)), "{err:?}");
        assert!(!post_open_uri(&proxy, "file:///late".to_owned()));
    }
}
