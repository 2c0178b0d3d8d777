/// Calls a Win32 function returning `BOOL` and bails out with the thread's last error on `FALSE`.
///
/// expands approximately to:
/// ```text
/// if unsafe_call() == FALSE {
///     { optional cleanup block }
///     return Err(WinError::last().into());
/// }
/// ```
///
/// The error is captured before the cleanup block runs, so cleanup calls cannot overwrite it.
#[macro_export]
macro_rules! winapi_bool_call {
    ($expr:expr, $cleanup:block) => {{
        let result = $expr;
        if result == windows_sys::Win32::Foundation::FALSE {
            let err = $crate::error::WinError::last();
            $cleanup
            return core::result::Result::Err(err.into());
        }
    }};
    ($expr:expr) => {{
        let result = $expr;
        if result == windows_sys::Win32::Foundation::FALSE {
            return core::result::Result::Err($crate::error::WinError::last().into());
        }
    }};
}

/// Calls a Win32 function returning a `WIN32_ERROR` code and bails out on anything but `ERROR_SUCCESS`.
///
/// expands approximately to:
/// ```text
/// let code = unsafe_call();
/// if code != ERROR_SUCCESS {
///     { optional cleanup block }
///     return Err(WinError::from(code).into());
/// }
/// ```
///
#[macro_export]
macro_rules! winapi_call {
    ($expr:expr, $cleanup:block) => {{
        let code = $expr;
        if code != windows_sys::Win32::Foundation::ERROR_SUCCESS {
            $cleanup
            return core::result::Result::Err($crate::error::WinError::from(code).into());
        }
    }};
    ($expr:expr) => {{
        let code = $expr;
        if code != windows_sys::Win32::Foundation::ERROR_SUCCESS {
            return core::result::Result::Err($crate::error::WinError::from(code).into());
        }
    }};
}

/// Releases memory obtained from `LocalAlloc` (or handed out by an API documented to need
/// `LocalFree`), asserting the release succeeded in debug builds. Null pointers are skipped.
#[macro_export]
macro_rules! assert_free {
    ($ptr:expr, $loc:expr) => {{
        let ptr = $ptr;
        if !ptr.is_null() {
            let freed = windows_sys::Win32::Foundation::LocalFree(ptr as _);
            debug_assert!(freed.is_null(), concat!("LocalFree failed in ", $loc, "!"));
        }
    }};
}
