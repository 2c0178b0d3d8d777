//! Explicit access grants and building new ACLs from them
//!
//! The merge of grants into an existing ACL, including entry ordering and precedence, is done
//! entirely by `SetEntriesInAclW`; this module only marshals the parameters.
//!
//! see: [MSDN](https://learn.microsoft.com/en-us/windows/win32/api/aclapi/nf-aclapi-setentriesinaclw)

use bitflags::bitflags;

/// How a grant is merged into the ACL.
///
/// see: [MSDN](https://learn.microsoft.com/en-us/windows/win32/api/accctrl/ne-accctrl-access_mode)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum AccessMode {
    #[default]
    NotUsed = 0,
    /// Adds the rights to whatever the trustee already has.
    Grant = 1,
    /// Replaces every allow entry of the trustee.
    Set = 2,
    Deny = 3,
    /// Removes every allow and deny entry of the trustee.
    Revoke = 4,
    SetAuditSuccess = 5,
    SetAuditFailure = 6,
}

impl AccessMode {
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            0 => AccessMode::NotUsed,
            1 => AccessMode::Grant,
            2 => AccessMode::Set,
            3 => AccessMode::Deny,
            4 => AccessMode::Revoke,
            5 => AccessMode::SetAuditSuccess,
            6 => AccessMode::SetAuditFailure,
            _ => return None,
        })
    }
}

bitflags! {
    /// Inheritance of a grant, the `grfInheritance` member.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Inheritance: u32 {
        const SUB_OBJECTS_ONLY_INHERIT           = 0x1;
        const SUB_CONTAINERS_ONLY_INHERIT        = 0x2;
        const SUB_CONTAINERS_AND_OBJECTS_INHERIT = 0x3;
        const INHERIT_NO_PROPAGATE               = 0x4;
        const INHERIT_ONLY                       = 0x8;
    }
}

impl Inheritance {
    pub const NO_INHERITANCE: Self = Self::empty();
}

#[cfg(windows)]
pub use self::os::{ExplicitAccess, build_acl};

#[cfg(windows)]
mod os {
    use super::{AccessMode, Inheritance};
    use crate::acl::Acl;
    use crate::error::WinError;
    use crate::trustee::Trustee;
    use crate::winapi_call;
    use log::debug;
    use std::ptr::{null, null_mut};
    use windows_sys::Win32::Security::ACL;
    use windows_sys::Win32::Security::Authorization::{EXPLICIT_ACCESS_W, SetEntriesInAclW};

    /// One permission grant for [`build_acl`].
    #[derive(Debug)]
    pub struct ExplicitAccess<'a> {
        pub permissions: u32,
        pub mode: AccessMode,
        pub inheritance: Inheritance,
        pub trustee: Trustee<'a>,
    }

    impl<'a> ExplicitAccess<'a> {
        pub fn new(permissions: u32, mode: AccessMode, inheritance: Inheritance, trustee: Trustee<'a>) -> Self {
            Self {
                permissions,
                mode,
                inheritance,
                trustee,
            }
        }

        pub fn grant(permissions: u32, trustee: Trustee<'a>) -> Self {
            Self::new(permissions, AccessMode::Grant, Inheritance::NO_INHERITANCE, trustee)
        }

        pub fn set(permissions: u32, trustee: Trustee<'a>) -> Self {
            Self::new(permissions, AccessMode::Set, Inheritance::NO_INHERITANCE, trustee)
        }

        pub fn deny(permissions: u32, trustee: Trustee<'a>) -> Self {
            Self::new(permissions, AccessMode::Deny, Inheritance::NO_INHERITANCE, trustee)
        }

        pub fn revoke(trustee: Trustee<'a>) -> Self {
            Self::new(0, AccessMode::Revoke, Inheritance::NO_INHERITANCE, trustee)
        }

        pub fn with_inheritance(mut self, inheritance: Inheritance) -> Self {
            self.inheritance = inheritance;
            self
        }

        fn as_raw(&self) -> EXPLICIT_ACCESS_W {
            EXPLICIT_ACCESS_W {
                grfAccessPermissions: self.permissions,
                grfAccessMode: self.mode.as_raw(),
                grfInheritance: self.inheritance.bits(),
                Trustee: self.trustee.as_raw(),
            }
        }
    }

    /// Builds a new ACL by merging `grants`, in order, into `existing`.
    ///
    /// The returned ACL is owned and freed on drop, on every path. OS failures such as an
    /// unresolvable trustee name are returned unchanged.
    pub fn build_acl(grants: &[ExplicitAccess<'_>], existing: Option<&Acl>) -> Result<Acl, WinError> {
        let entries: Vec<EXPLICIT_ACCESS_W> = grants.iter().map(ExplicitAccess::as_raw).collect();
        let entries_ptr = if entries.is_empty() { null() } else { entries.as_ptr() };
        let old_acl = existing.map_or(null(), Acl::as_ptr);
        let mut new_acl: *mut ACL = null_mut();

        debug!(
            "SetEntriesInAclW with {} entries, merging into existing ACL: {}",
            entries.len(),
            existing.is_some()
        );
        unsafe {
            winapi_call!(SetEntriesInAclW(
                entries.len() as u32,
                entries_ptr,
                old_acl,
                &mut new_acl
            ))
        };

        if new_acl.is_null() {
            // nothing to merge and nothing to merge into
            return Acl::empty();
        }
        Ok(unsafe { Acl::from_owned_ptr(new_acl) })
    }
}
