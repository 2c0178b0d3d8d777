//! Trustees for explicit access grants

use crate::sid::Sid;
use crate::utils::WideCString;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::ptr::null_mut;
pub use windows_sys::Win32::Security::Authorization::{
    TRUSTEE_IS_ALIAS, TRUSTEE_IS_COMPUTER, TRUSTEE_IS_DELETED, TRUSTEE_IS_DOMAIN, TRUSTEE_IS_GROUP,
    TRUSTEE_IS_INVALID, TRUSTEE_IS_UNKNOWN, TRUSTEE_IS_USER, TRUSTEE_IS_WELL_KNOWN_GROUP, TRUSTEE_TYPE,
};
use windows_sys::Win32::Security::Authorization::{NO_MULTIPLE_TRUSTEE, TRUSTEE_IS_NAME, TRUSTEE_IS_SID, TRUSTEE_W};
use windows_sys::Win32::Security::SID;

/// A security principal named either by SID or by account name.
///
/// A SID-form trustee borrows the [`Sid`] it was built from.
pub struct Trustee<'a> {
    inner: TRUSTEE_W,
    wide_name: Option<WideCString>,
    _phantom: PhantomData<&'a SID>,
}

impl<'a> Trustee<'a> {
    pub fn from_sid(sid: &'a Sid) -> Self {
        let trustee = TRUSTEE_W {
            pMultipleTrustee: null_mut(),
            MultipleTrusteeOperation: NO_MULTIPLE_TRUSTEE,
            TrusteeForm: TRUSTEE_IS_SID,
            TrusteeType: TRUSTEE_IS_UNKNOWN,
            ptstrName: sid.as_ptr() as *mut _,
        };
        Self {
            inner: trustee,
            wide_name: None,
            _phantom: PhantomData,
        }
    }

    /// Account name such as `BUILTIN\Users`, resolved by the OS when the grant is applied.
    pub fn from_name<S>(name: S) -> Self
    where
        S: AsRef<str>,
    {
        let wide_name = WideCString::new(name.as_ref());
        let trustee = TRUSTEE_W {
            pMultipleTrustee: null_mut(),
            MultipleTrusteeOperation: NO_MULTIPLE_TRUSTEE,
            TrusteeForm: TRUSTEE_IS_NAME,
            TrusteeType: TRUSTEE_IS_UNKNOWN,
            // the Vec's heap buffer does not move when `wide_name` is moved into `Self`
            ptstrName: wide_name.as_ptr() as *mut _,
        };
        Self {
            inner: trustee,
            wide_name: Some(wide_name),
            _phantom: PhantomData,
        }
    }

    pub fn with_type(mut self, trustee_type: TRUSTEE_TYPE) -> Self {
        self.inner.TrusteeType = trustee_type;
        self
    }

    pub fn trustee_type(&self) -> TRUSTEE_TYPE {
        self.inner.TrusteeType
    }

    pub fn is_sid(&self) -> bool {
        self.inner.TrusteeForm == TRUSTEE_IS_SID
    }

    pub fn get_name(&self) -> Option<String> {
        self.wide_name.as_ref().map(|s| s.as_string())
    }

    pub(crate) fn as_raw(&self) -> TRUSTEE_W {
        self.inner
    }
}

impl<'a> From<&'a Sid> for Trustee<'a> {
    fn from(sid: &'a Sid) -> Self {
        Trustee::from_sid(sid)
    }
}

impl Debug for Trustee<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trustee")
            .field("TrusteeForm", &self.inner.TrusteeForm)
            .field("TrusteeType", &self.inner.TrusteeType)
            .field("name", &self.wide_name)
            .field("ptstrName", &self.inner.ptstrName)
            .finish()
    }
}
