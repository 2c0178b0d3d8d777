//! Owned security identifiers
//!
//! The decoder hands out SIDs as borrowed bytes and never looks inside them. [`Sid`] is the
//! Windows-side counterpart: an owned copy validated by the OS, usable as a trustee or for
//! string conversion.

use crate::ace::Ace;
use crate::error::WinError;
use crate::utils::WideCString;
use std::fmt::{Debug, Formatter};
use std::ptr::null_mut;
use std::str::FromStr;
use windows_sys::Win32::Foundation::{ERROR_INVALID_SID, ERROR_OUTOFMEMORY, FALSE, LocalFree};
use windows_sys::Win32::Security::Authorization::{ConvertSidToStringSidW, ConvertStringSidToSidW};
use windows_sys::Win32::Security::{CopySid, EqualSid, GetLengthSid, IsValidSid, PSID, SID};
use windows_sys::Win32::System::Memory::{LMEM_FIXED, LocalAlloc};

/// Smallest well-formed SID: revision, sub-authority count and a 6-byte authority.
const MIN_SID_LEN: usize = 8;

/// Owned SID structure, opaque
pub struct Sid {
    psid: PSID,
    len: usize,
}

impl Drop for Sid {
    fn drop(&mut self) {
        unsafe {
            if !self.psid.is_null() {
                let freed = LocalFree(self.psid as _);
                debug_assert!(freed.is_null(), "LocalFree failed in Drop!");
            }
        }
    }
}

impl Sid {
    /// Copies the SID at the start of `bytes`.
    ///
    /// The SID's self-declared length must fit in `bytes`; trailing bytes are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WinError> {
        // the sub-authority count lives in the second byte
        let declared = match bytes {
            [_, count, ..] if bytes.len() >= MIN_SID_LEN => MIN_SID_LEN + 4 * *count as usize,
            _ => return Err(ERROR_INVALID_SID.into()),
        };
        if declared > bytes.len() {
            return Err(ERROR_INVALID_SID.into());
        }
        unsafe { Self::from_ptr_clone(bytes.as_ptr() as PSID) }.ok_or_else(|| ERROR_INVALID_SID.into())
    }

    /// Copies the trustee SID of a decoded ACE.
    pub fn from_ace(ace: &Ace<'_>) -> Result<Self, WinError> {
        let bytes = ace.sid().ok_or_else(|| WinError::from("ACE type carries no SID"))?;
        Self::from_bytes(bytes)
    }

    /// # Safety
    ///
    /// `psid` must be null or point to readable memory holding a SID of `GetLengthSid` bytes.
    pub unsafe fn from_ptr_clone(psid: PSID) -> Option<Self> {
        if psid.is_null() {
            return None;
        }
        unsafe {
            if IsValidSid(psid) == FALSE {
                return None;
            }
            let len = GetLengthSid(psid) as usize;
            let dst = LocalAlloc(LMEM_FIXED, len) as PSID;
            if dst.is_null() {
                return None;
            }
            if CopySid(len as u32, dst, psid) == FALSE {
                LocalFree(dst as _);
                return None;
            }
            Some(Self { psid: dst, len })
        }
    }

    pub fn from_string(s: &str) -> Result<Self, WinError> {
        let wide = WideCString::new(s);
        let mut sid_ptr: PSID = null_mut();
        let ok = unsafe { ConvertStringSidToSidW(wide.as_ptr(), &mut sid_ptr) };
        if ok == FALSE || sid_ptr.is_null() {
            return Err(WinError::last());
        }
        let len = unsafe { GetLengthSid(sid_ptr) as usize };
        Ok(Sid { psid: sid_ptr, len })
    }

    pub fn is_valid(&self) -> bool {
        unsafe { IsValidSid(self.psid) != FALSE }
    }

    #[allow(clippy::inherent_to_string_shadow_display)]
    pub fn to_string(&self) -> Result<String, WinError> {
        let mut str_ptr: *mut u16 = null_mut();
        let ok = unsafe { ConvertSidToStringSidW(self.psid, &mut str_ptr) };
        if ok == FALSE {
            return Err(WinError::last());
        }
        let s = unsafe { WideCString::from_wide_null_ptr(str_ptr) }.as_string();
        unsafe { LocalFree(str_ptr as _) };
        Ok(s)
    }

    pub fn as_ptr(&self) -> *const SID {
        self.psid as *const _
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copies the SID into a fresh OS allocation.
    pub fn try_clone(&self) -> Result<Self, WinError> {
        let len = self.len;
        let dst = unsafe { LocalAlloc(LMEM_FIXED, len) as PSID };
        if dst.is_null() {
            return Err(ERROR_OUTOFMEMORY.into());
        }
        unsafe { std::ptr::copy_nonoverlapping(self.psid as *const u8, dst as *mut u8, len) };
        Ok(Sid { psid: dst, len })
    }

    pub fn to_vec(&self) -> Vec<u8> {
        unsafe { std::slice::from_raw_parts(self.psid as *const u8, self.len) }.to_vec()
    }
}

impl PartialEq for Sid {
    fn eq(&self, other: &Self) -> bool {
        unsafe { EqualSid(self.psid, other.psid) != FALSE }
    }
}

impl Eq for Sid {}

impl FromStr for Sid {
    type Err = WinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sid::from_string(s)
    }
}

impl Debug for Sid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.to_string() {
            Ok(s) => write!(f, "Sid({s})"),
            Err(_) => write!(f, "Sid(<INVALID SID>)"),
        }
    }
}
