use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;

/// Null-terminated UTF-16 string for passing names to `W` functions.
pub struct WideCString {
    inner: Vec<u16>,
}

impl WideCString {
    pub fn new<S>(s: S) -> Self
    where
        S: AsRef<OsStr>,
    {
        let inner = s.as_ref().encode_wide().chain(Some(0)).collect();
        Self { inner }
    }

    /// Copies a null-terminated string owned by the OS; a null pointer yields an empty string.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to a readable, null-terminated UTF-16 string.
    pub unsafe fn from_wide_null_ptr(ptr: *const u16) -> Self {
        if ptr.is_null() {
            return Self { inner: vec![0] };
        }
        let mut len = 0;
        unsafe {
            while *ptr.add(len) != 0 {
                len += 1;
            }
            let mut inner = std::slice::from_raw_parts(ptr, len).to_vec();
            inner.push(0);
            Self { inner }
        }
    }

    pub fn as_ptr(&self) -> *const u16 {
        self.inner.as_ptr()
    }

    pub fn as_string(&self) -> String {
        String::from_utf16_lossy(&self.inner[..self.inner.len() - 1])
    }
}

impl std::fmt::Debug for WideCString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_string())
    }
}
