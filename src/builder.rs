//! Encoder for packed ACLs
//!
//! Produces the same byte layout the decoder reads: an ACL header followed by the entries in
//! the order they were added. Useful for synthesizing sequences and for handing a prepared ACL
//! to the OS through `Acl::from_bytes`.

use crate::ace::{ACE_HEADER_SIZE, AceFlags, AceHeader, AceType, Guid, ObjectAceFlags};
use crate::acl::{ACL_REVISION, ACL_REVISION_DS, AclHeader};
use crate::error::AclError;

/// Builds a packed ACL.
///
/// ```
/// use win_ace_rs::{AclBuilder, AclRef, AceType};
///
/// // S-1-5-18
/// let system = [1u8, 1, 0, 0, 0, 0, 0, 5, 18, 0, 0, 0];
/// let bytes = AclBuilder::new()
///     .allow(0x1F01FF, &system)
///     .deny(0, &system)
///     .build()
///     .unwrap();
///
/// let acl = AclRef::from_bytes(&bytes).unwrap();
/// let aces = acl.decode().unwrap();
/// assert_eq!(aces[1].ace_type(), AceType::AccessDenied);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AclBuilder {
    revision: Option<u8>,
    needs_ds: bool,
    aces: Vec<u8>,
    count: usize,
}

impl AclBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the header revision, otherwise 2, or 4 once an object entry was added.
    pub fn revision(mut self, revision: u8) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn allow(self, mask: u32, sid: &[u8]) -> Self {
        self.ace(AceType::AccessAllowed, AceFlags::empty(), mask, sid)
    }

    pub fn deny(self, mask: u32, sid: &[u8]) -> Self {
        self.ace(AceType::AccessDenied, AceFlags::empty(), mask, sid)
    }

    pub fn audit(self, mask: u32, sid: &[u8], flags: AceFlags) -> Self {
        self.ace(AceType::SystemAudit, flags, mask, sid)
    }

    pub fn mandatory_label(self, policy: u32, label_sid: &[u8]) -> Self {
        self.ace(AceType::SystemMandatoryLabel, AceFlags::empty(), policy, label_sid)
    }

    /// Appends a mask-and-SID entry. For object types no type GUIDs are written.
    pub fn ace(self, ace_type: AceType, flags: AceFlags, mask: u32, sid: &[u8]) -> Self {
        if ace_type.shape().has_object_fields() {
            return self.object(ace_type, flags, mask, None, None, sid);
        }
        let mut body = Vec::with_capacity(4 + sid.len());
        body.extend_from_slice(&mask.to_le_bytes());
        body.extend_from_slice(sid);
        self.raw(ace_type.as_raw(), flags, &body)
    }

    /// Appends a callback entry: mask, SID, then `application_data`.
    pub fn callback(
        self,
        ace_type: AceType,
        flags: AceFlags,
        mask: u32,
        sid: &[u8],
        application_data: &[u8],
    ) -> Self {
        let mut body = Vec::with_capacity(4 + sid.len() + application_data.len());
        body.extend_from_slice(&mask.to_le_bytes());
        body.extend_from_slice(sid);
        body.extend_from_slice(application_data);
        self.raw(ace_type.as_raw(), flags, &body)
    }

    /// Appends an object entry; each GUID is written only when given, with its presence flag set.
    pub fn object(
        mut self,
        ace_type: AceType,
        flags: AceFlags,
        mask: u32,
        object_type: Option<Guid>,
        inherited_object_type: Option<Guid>,
        sid: &[u8],
    ) -> Self {
        let mut object_flags = ObjectAceFlags::empty();
        object_flags.set(ObjectAceFlags::OBJECT_TYPE_PRESENT, object_type.is_some());
        object_flags.set(ObjectAceFlags::INHERITED_OBJECT_TYPE_PRESENT, inherited_object_type.is_some());

        let mut body = Vec::with_capacity(8 + 32 + sid.len());
        body.extend_from_slice(&mask.to_le_bytes());
        body.extend_from_slice(&object_flags.bits().to_le_bytes());
        for guid in [object_type, inherited_object_type].into_iter().flatten() {
            body.extend_from_slice(guid.as_bytes());
        }
        body.extend_from_slice(sid);

        if ace_type.shape().has_object_fields() {
            self.needs_ds = true;
        }
        self.raw(ace_type.as_raw(), flags, &body)
    }

    /// Appends a record with an arbitrary tag; `body` is everything after the header.
    ///
    /// The body is zero-padded so the record size stays a multiple of 4, as the OS requires.
    /// A body too large for the 16-bit size field makes [`AclBuilder::build`] fail.
    pub fn raw(mut self, ace_type: u8, flags: AceFlags, body: &[u8]) -> Self {
        let size = (ACE_HEADER_SIZE + body.len()).next_multiple_of(4);
        let header = AceHeader {
            ace_type,
            flags: flags.bits(),
            size: u16::try_from(size).unwrap_or(0),
        };
        self.aces.extend_from_slice(&header.to_bytes());
        self.aces.extend_from_slice(body);
        self.aces.resize(self.aces.len() + size - ACE_HEADER_SIZE - body.len(), 0);
        self.count += 1;
        self
    }

    /// Number of entries added so far.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Encodes header and entries.
    ///
    /// # Errors
    ///
    /// [`AclError::AclTooLarge`] if the ACL exceeds 65535 bytes, which also covers any single
    /// entry that does.
    pub fn build(self) -> Result<Vec<u8>, AclError> {
        let total = AclHeader::SIZE + self.aces.len();
        let size = u16::try_from(total).map_err(|_| AclError::AclTooLarge { size: total })?;
        let ace_count = u16::try_from(self.count).map_err(|_| AclError::AclTooLarge { size: total })?;

        let revision = self
            .revision
            .unwrap_or(if self.needs_ds { ACL_REVISION_DS } else { ACL_REVISION });
        let header = AclHeader {
            revision,
            size,
            ace_count,
        };

        let mut bytes = Vec::with_capacity(total);
        bytes.extend_from_slice(&header.to_bytes());
        bytes.extend_from_slice(&self.aces);
        Ok(bytes)
    }
}
