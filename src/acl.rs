//! Access control list views and the ACE decoder
//!
//! An ACL is an 8-byte [`AclHeader`] followed by `ace_count` records packed back to back. The
//! decoder walks the records using only their declared sizes, so every size is checked against
//! the bytes that are actually there before the cursor moves.

use crate::ace::Ace;
use crate::error::{AclError, CorruptKind};
use log::{debug, trace};
use std::fmt::{Debug, Formatter};
use std::iter::FusedIterator;

/// Revision of ACLs holding only basic, callback and label entries.
pub const ACL_REVISION: u8 = 2;
/// Revision required once object entries are present.
pub const ACL_REVISION_DS: u8 = 4;

/// The fixed ACL header.
///
/// see: [MSDN](https://learn.microsoft.com/en-us/windows/win32/api/winnt/ns-winnt-acl)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AclHeader {
    pub revision: u8,
    /// Byte length of the whole ACL, header and free space included.
    pub size: u16,
    pub ace_count: u16,
}

impl AclHeader {
    pub const SIZE: usize = 8;

    pub fn read(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [revision, _sbz1, s0, s1, c0, c1, _, _, ..] => Some(Self {
                revision: *revision,
                size: u16::from_le_bytes([*s0, *s1]),
                ace_count: u16::from_le_bytes([*c0, *c1]),
            }),
            _ => None,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let [s0, s1] = self.size.to_le_bytes();
        let [c0, c1] = self.ace_count.to_le_bytes();
        [self.revision, 0, s0, s1, c0, c1, 0, 0]
    }
}

/// Decodes `count` ACEs packed at the start of `aces`.
///
/// `aces` must end where the sequence ends: no record may reach beyond it. The views are
/// returned in on-disk order, which is the order Windows evaluates them in. Records with an
/// unrecognized type tag are kept as [`crate::AceShape::Opaque`] views.
///
/// # Errors
///
/// [`AclError::CorruptSequence`] if any record is truncated, undersized or overruns `aces`.
pub fn decode(aces: &[u8], count: usize) -> Result<Vec<Ace<'_>>, AclError> {
    AceIter::new(aces, 0, count).collect()
}

/// Fallible iterator over the ACEs of a packed sequence.
///
/// Yields at most one error, after which it is exhausted.
#[derive(Debug, Clone)]
pub struct AceIter<'a> {
    bytes: &'a [u8],
    base: usize,
    cursor: usize,
    index: usize,
    count: usize,
}

impl<'a> AceIter<'a> {
    /// `base` is the position of `bytes[0]` in the caller's buffer, used for reported offsets.
    pub fn new(bytes: &'a [u8], base: usize, count: usize) -> Self {
        Self {
            bytes,
            base,
            cursor: 0,
            index: 0,
            count,
        }
    }

    /// Number of bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl<'a> Iterator for AceIter<'a> {
    type Item = Result<Ace<'a>, AclError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }

        let offset = self.base + self.cursor;
        match Ace::parse(&self.bytes[self.cursor..], offset) {
            Ok(ace) => {
                trace!(
                    "ACE #{} at byte {}: {:?}, {} bytes",
                    self.index,
                    offset,
                    ace.ace_type(),
                    ace.size()
                );
                if ace.sid().is_none() {
                    debug!(
                        "skipping opaque ACE type {:#04x} at byte {}",
                        ace.header().ace_type,
                        offset
                    );
                }
                self.cursor += ace.size() as usize;
                self.index += 1;
                Some(Ok(ace))
            }
            Err(err) => {
                self.index = self.count;
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.count - self.index))
    }
}

impl FusedIterator for AceIter<'_> {}

/// Borrowed view of a packed ACL: header plus entries.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct AclRef<'a> {
    bytes: &'a [u8],
    header: AclHeader,
}

impl<'a> AclRef<'a> {
    /// Validates the ACL header against `bytes`.
    ///
    /// `bytes` may be longer than the ACL; the view is cut to the declared size.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self, AclError> {
        let header = AclHeader::read(bytes).ok_or_else(|| {
            AclError::corrupt(0, CorruptKind::TruncatedAclHeader { len: bytes.len() })
        })?;
        let declared = header.size as usize;
        if declared < AclHeader::SIZE || declared > bytes.len() {
            return Err(AclError::corrupt(
                0,
                CorruptKind::AclSizeMismatch {
                    declared,
                    available: bytes.len(),
                },
            ));
        }
        Ok(Self {
            bytes: &bytes[..declared],
            header,
        })
    }

    pub fn header(&self) -> AclHeader {
        self.header
    }

    pub fn revision(&self) -> u8 {
        self.header.revision
    }

    pub fn size(&self) -> u16 {
        self.header.size
    }

    pub fn ace_count(&self) -> u16 {
        self.header.ace_count
    }

    pub fn is_empty(&self) -> bool {
        self.header.ace_count == 0
    }

    /// The whole ACL, header included.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// The region after the header holding the entries and any free space.
    pub fn ace_bytes(&self) -> &'a [u8] {
        &self.bytes[AclHeader::SIZE..]
    }

    /// Iterates the entries; reported offsets are relative to the start of the ACL.
    pub fn iter(&self) -> AceIter<'a> {
        AceIter::new(self.ace_bytes(), AclHeader::SIZE, self.header.ace_count as usize)
    }

    /// Decodes every entry, failing as a whole on the first inconsistency.
    pub fn decode(&self) -> Result<Vec<Ace<'a>>, AclError> {
        self.iter().collect()
    }
}

impl<'a> IntoIterator for &AclRef<'a> {
    type Item = Result<Ace<'a>, AclError>;
    type IntoIter = AceIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Debug for AclRef<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut fmt = f.debug_struct("AclRef");
        fmt.field("revision", &self.header.revision)
            .field("size", &self.header.size);
        for ace in self {
            match ace {
                Ok(ace) => fmt.field("ace", &ace),
                Err(err) => fmt.field("error", &format_args!("{err}")),
            };
        }
        fmt.finish()
    }
}

#[cfg(windows)]
pub use self::os::Acl;

#[cfg(windows)]
mod os {
    use super::{ACL_REVISION, AceIter, AclRef};
    use crate::ace::Ace;
    use crate::error::{AclError, WinError};
    use crate::{assert_free, winapi_bool_call};
    use std::fmt::{Debug, Formatter};
    use windows_sys::Win32::Foundation::{ERROR_INVALID_ACL, ERROR_OUTOFMEMORY, FALSE};
    use windows_sys::Win32::Security::{ACL, InitializeAcl, IsValidAcl};
    use windows_sys::Win32::System::Memory::{LMEM_FIXED, LocalAlloc};

    /// An ACL living in OS-allocated memory.
    ///
    /// Owned instances are released with `LocalFree` when dropped.
    pub struct Acl {
        ptr: *mut ACL,
        owned: bool,
    }

    impl Drop for Acl {
        fn drop(&mut self) {
            if self.owned {
                unsafe { assert_free!(self.ptr, "Acl::drop") }
            }
        }
    }

    impl Debug for Acl {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Acl")
                .field("owned", &self.owned)
                .field("acl", &self.as_acl_ref())
                .finish()
        }
    }

    impl Acl {
        /// A header-only ACL with no room for entries.
        pub fn empty() -> Result<Self, WinError> {
            let size = size_of::<ACL>();
            let ptr = unsafe { LocalAlloc(LMEM_FIXED, size) as *mut ACL };
            if ptr.is_null() {
                return Err(ERROR_OUTOFMEMORY.into());
            }
            unsafe {
                winapi_bool_call!(InitializeAcl(ptr, size as u32, ACL_REVISION as u32), {
                    assert_free!(ptr, "Acl::empty");
                })
            };
            Ok(Self { ptr, owned: true })
        }

        /// Copies a packed ACL into OS memory.
        ///
        /// # Errors
        ///
        /// `ERROR_INVALID_ACL` if the header is inconsistent or the OS rejects the copy.
        pub fn from_bytes(bytes: &[u8]) -> Result<Self, WinError> {
            let acl = AclRef::from_bytes(bytes).map_err(|err| WinError {
                code: ERROR_INVALID_ACL,
                message: Some(err.to_string()),
            })?;
            let src = acl.as_bytes();

            let ptr = unsafe { LocalAlloc(LMEM_FIXED, src.len()) as *mut ACL };
            if ptr.is_null() {
                return Err(ERROR_OUTOFMEMORY.into());
            }
            unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), ptr as *mut u8, src.len()) };
            let acl = Self { ptr, owned: true };
            if !acl.is_valid() {
                return Err(WinError {
                    code: ERROR_INVALID_ACL,
                    message: Some("ACL rejected by IsValidAcl".to_owned()),
                });
            }
            Ok(acl)
        }

        /// # Safety
        ///
        /// `ptr` must point to a well-formed ACL header whose `AclSize` bytes stay readable and
        /// unchanged for as long as the returned value lives. The memory is not freed on drop.
        pub unsafe fn from_ptr(ptr: *mut ACL) -> Self {
            Self { ptr, owned: false }
        }

        /// Takes ownership of an ACL allocated with `LocalAlloc`.
        ///
        /// # Safety
        ///
        /// Same as [`Acl::from_ptr`]; additionally the memory must be releasable with `LocalFree`.
        pub(crate) unsafe fn from_owned_ptr(ptr: *mut ACL) -> Self {
            Self { ptr, owned: true }
        }

        pub fn as_ptr(&self) -> *const ACL {
            self.ptr
        }

        pub fn is_valid(&self) -> bool {
            unsafe { IsValidAcl(self.ptr) != FALSE }
        }

        /// The ACL bytes as declared by its header.
        pub fn as_bytes(&self) -> &[u8] {
            unsafe {
                let size = (*self.ptr).AclSize as usize;
                std::slice::from_raw_parts(self.ptr as *const u8, size)
            }
        }

        /// A bounds-checked view of the ACL.
        ///
        /// # Errors
        ///
        /// [`AclError::CorruptSequence`] if the header's size is inconsistent.
        pub fn as_acl_ref(&self) -> Result<AclRef<'_>, AclError> {
            AclRef::from_bytes(self.as_bytes())
        }

        pub fn ace_count(&self) -> u32 {
            unsafe { (*self.ptr).AceCount as u32 }
        }

        /// Iterates the entries; a corrupt header is reported before any entry is read.
        pub fn iter(&self) -> Result<AceIter<'_>, AclError> {
            Ok(self.as_acl_ref()?.iter())
        }

        /// Decodes every entry, failing as a whole on the first inconsistency.
        pub fn decode(&self) -> Result<Vec<Ace<'_>>, AclError> {
            self.as_acl_ref()?.decode()
        }
    }
}
