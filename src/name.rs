//! Borrowed handle to an encoded name.
//!
//! A [`Name`] is a `Copy` view of one size-prefixed symbol payload. It owns
//! nothing and keeps nothing alive: the backing bytes belong to a
//! [`NameStorage`](crate::NameStorage), a [`NameList`](crate::NameList), or
//! any other structure the encoding was packed into, and the owner must
//! outlive every handle borrowed from it.
//!
//! Equality and hashing work on the raw payload bytes and never touch the
//! table, so they are lock-free. Two handles compare equal exactly when
//! they encode the same token sequence. Ordering by token string, by
//! contrast, requires the table; see
//! [`SymbolTable::less_than`](crate::SymbolTable::less_than).

use std::hash::{Hash, Hasher};

use hashbrown::{HashMap, HashSet};

use crate::encoding::SIZE_ENCODING_BYTES;

/// Hash map keyed by borrowed name handles.
pub type NameHashMap<'a, T> = HashMap<Name<'a>, T, fxhash::FxBuildHasher>;

/// Hash set of borrowed name handles.
pub type NameHashSet<'a> = HashSet<Name<'a>, fxhash::FxBuildHasher>;

/// Backing bytes of the empty name: a zero size header and no payload.
const EMPTY_NAME: [u8; SIZE_ENCODING_BYTES] = [0, 0];

/// A borrowed view of one encoded name.
///
/// # Examples
///
/// ```
/// use statname::SymbolTable;
///
/// let table = SymbolTable::new();
/// let a = table.encode("cluster.upstream_cx.total").unwrap();
/// let b = table.encode("cluster.upstream_cx.total").unwrap();
///
/// assert_eq!(a.name(), b.name());
/// assert_eq!(a.name().hash_value(), b.name().hash_value());
///
/// a.free(&table);
/// b.free(&table);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Name<'a> {
    /// Size header plus payload, exactly `data_len() + 2` bytes.
    bytes: &'a [u8],
}

impl<'a> Name<'a> {
    /// Wraps a size-prefixed buffer produced by the table.
    pub(crate) fn from_bytes(bytes: &'a [u8]) -> Self {
        let name = Self { bytes };
        debug_assert_eq!(bytes.len(), name.data_len() + SIZE_ENCODING_BYTES);
        name
    }

    /// Payload size in bytes, excluding the two-byte size header.
    #[must_use]
    pub fn data_len(&self) -> usize {
        usize::from(self.bytes[0]) | usize::from(self.bytes[1]) << 8
    }

    /// Total size in bytes, including the size header.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data_len() + SIZE_ENCODING_BYTES
    }

    /// Returns true for the empty name, whose payload has no symbols.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data_len() == 0
    }

    /// The varint symbol stream, without the size header.
    #[must_use]
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[SIZE_ENCODING_BYTES..]
    }

    /// The full backing bytes, header included.
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// 64-bit Fx hash of the payload.
    ///
    /// This is a hash of the symbol encoding, not of the elaborated string;
    /// the same name hashes differently in different tables.
    #[must_use]
    pub fn hash_value(&self) -> u64 {
        fxhash::hash64(self.payload())
    }
}

impl Default for Name<'_> {
    /// The empty name.
    fn default() -> Self {
        Self { bytes: &EMPTY_NAME }
    }
}

impl PartialEq for Name<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.payload() == other.payload()
    }
}

impl Eq for Name<'_> {}

impl Hash for Name<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(self.payload());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name() {
        let name = Name::default();
        assert!(name.is_empty());
        assert_eq!(name.data_len(), 0);
        assert_eq!(name.len(), 2);
        assert_eq!(name.payload(), &[] as &[u8]);
    }

    #[test]
    fn test_size_header_little_endian() {
        let mut bytes = vec![0x01, 0x01];
        bytes.extend(std::iter::repeat(0x05).take(0x101));
        let name = Name::from_bytes(&bytes);
        assert_eq!(name.data_len(), 0x101);
        assert_eq!(name.len(), 0x103);
    }

    #[test]
    fn test_equality_ignores_backing_identity() {
        let first = [0x02, 0x00, 0xc8, 0x01];
        let second = first;
        let a = Name::from_bytes(&first);
        let b = Name::from_bytes(&second);
        assert_eq!(a, b);
        assert_eq!(a.hash_value(), b.hash_value());

        let other = [0x01, 0x00, 0x07];
        assert_ne!(a, Name::from_bytes(&other));
    }

    #[test]
    fn test_name_hash_map() {
        let bytes = [0x01, 0x00, 0x01];
        let name = Name::from_bytes(&bytes);

        let mut map: NameHashMap<'_, u64> = NameHashMap::default();
        map.insert(name, 7);
        map.insert(Name::default(), 8);

        assert_eq!(map.get(&Name::from_bytes(&bytes)), Some(&7));
        assert_eq!(map.get(&Name::default()), Some(&8));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_name_hash_set() {
        let bytes = [0x01, 0x00, 0x01];
        let mut set = NameHashSet::default();
        set.insert(Name::from_bytes(&bytes));
        assert!(set.contains(&Name::from_bytes(&bytes)));
        assert!(!set.contains(&Name::default()));
    }
}
