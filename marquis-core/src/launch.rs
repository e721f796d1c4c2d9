use std::ffi::OsString;

/// Picks the launch argument (`argv[1]`) out of a full argument list.
///
/// Only the first positional token is considered; anything after it is
/// ignored. An empty token counts as absent.
pub fn launch_argument<I>(args: I) -> Option<String>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    let raw: OsString = args.into_iter().nth(1)?.into();
    if raw.is_empty() {
        return None;
    }
    let arg = match raw.into_string() {
        Ok(s) => s,
        Err(raw) => {
            // 含未配对代理项的路径：按有损方式转换
            log::warn!("launch argument is not valid Unicode, converting lossily: {raw:?}");
            raw.to_string_lossy().into_owned()
        }
    };
    Some(arg)
}

/// Launch argument of the current process.
pub fn current_launch_argument() -> Option<String> {
    launch_argument(std::env::args_os())
}
