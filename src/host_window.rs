// 首个实例的主窗口：以约定的类名注册，接收转发来的 URI

use anyhow::Result;
use log::info;
use marquis_core::{to_file_uri, RunnerConfig};
use winit::{
    dpi::{LogicalPosition, LogicalSize},
    event::{Event, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::{Window, WindowAttributes},
};

pub const APP_TITLE: &str = "marquis";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A `file:///` URI to open, from this launch or a forwarded one.
    OpenUri(String),
}

/// Queues an `OpenUri` event. Returns `false` (and logs) once the loop has
/// shut down.
pub(crate) fn post_open_uri(proxy: &EventLoopProxy<HostEvent>, uri: String) -> bool {
    match proxy.send_event(HostEvent::OpenUri(uri)) {
        Ok(()) => true,
        Err(e) => {
            log::debug!("event loop closed, dropping {:?}", e.0);
            false
        }
    }
}

pub fn title_for(uri: Option<&str>) -> String {
    match uri {
        Some(uri) => format!("{APP_TITLE} - {uri}"),
        None => APP_TITLE.to_owned(),
    }
}

fn create_main_window(
    elwt: &ActiveEventLoop,
    config: &RunnerConfig,
    proxy: EventLoopProxy<HostEvent>,
    title: &str,
) -> Result<Window> {
    let attrs = WindowAttributes::default()
        .with_title(title)
        .with_position(LogicalPosition::new(10.0, 10.0))
        .with_inner_size(LogicalSize::new(1280.0, 720.0));
    #[cfg(target_os = "windows")]
    let attrs = {
        use winit::platform::windows::WindowAttributesExtWindows;
        attrs.with_class_name(config.window_class.clone())
    };
    let window = elwt.create_window(attrs)?;
    #[cfg(target_os = "windows")]
    crate::windows_util::install_uri_receiver(&window, config.message_tag, proxy)?;
    #[cfg(not(target_os = "windows"))]
    let _ = (config, proxy);
    Ok(window)
}

/// Runs the first instance's window until it is closed.
///
/// The launch argument, if any, is fed through the same URI path as
/// forwarded ones. Only window or event loop creation failures are errors.
#[allow(deprecated)]
pub fn run_host(config: &RunnerConfig, launch_arg: Option<String>) -> Result<()> {
    let event_loop = EventLoop::<HostEvent>::with_user_event().build()?;
    let proxy = event_loop.create_proxy();
    if let Some(arg) = launch_arg {
        post_open_uri(&proxy, to_file_uri(&arg));
    }

    let mut window: Option<Window> = None;
    let mut last_uri: Option<String> = None;
    let mut failure: Option<anyhow::Error> = None;
    event_loop.run(|event, elwt| match event {
        Event::Resumed => {
            if window.is_none() {
                let title = title_for(last_uri.as_deref());
                match create_main_window(elwt, config, proxy.clone(), &title) {
                    Ok(w) => {
                        info!("main window created ({})", config.window_class);
                        window = Some(w);
                    }
                    Err(e) => {
                        failure = Some(e.context("failed to create main window"));
                        elwt.exit();
                    }
                }
            }
        }
        Event::UserEvent(HostEvent::OpenUri(uri)) => {
            info!("open request: {uri}");
            if let Some(w) = &window {
                w.set_title(&title_for(Some(&uri)));
                w.focus_window();
            }
            last_uri = Some(uri);
        }
        Event::WindowEvent {
            event: WindowEvent::CloseRequested,
            ..
        } => {
            elwt.exit();
        }
        _ => {}
    })?;

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
