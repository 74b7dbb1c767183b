//! Owning storage for encoded names.
//!
//! [`NameStorage`] owns the bytes of one encoded name and nothing else: it
//! deliberately carries no reference back to its [`SymbolTable`], saving a
//! pointer per metric in deployments where names number in the tens of
//! thousands. The price is manual discipline: the owner must hand the
//! storage back with [`NameStorage::free`] before dropping it. A storage
//! dropped while still holding its bytes fires a debug assertion naming
//! the leak, the same way a scoped arena reports allocations that were
//! never reclaimed.
//!
//! [`ScopedName`] is the convenient form: it bundles an
//! `Arc<SymbolTable>` and releases itself on drop. Use it in tests and
//! short-lived scopes where one extra pointer per name is irrelevant.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use hashbrown::{Equivalent, HashSet};

use crate::error::Result;
use crate::name::Name;
use crate::table::SymbolTable;

/// Owns the size-prefixed bytes of one encoded name.
///
/// # Examples
///
/// ```
/// use statname::{NameStorage, SymbolTable};
///
/// let table = SymbolTable::new();
/// let storage = NameStorage::new("http.downstream_rq.total", &table).unwrap();
/// assert_eq!(table.to_string(storage.name()), "http.downstream_rq.total");
///
/// // Mandatory: return the references before dropping.
/// storage.free(&table);
/// assert_eq!(table.num_symbols(), 0);
/// ```
pub struct NameStorage {
    /// `None` only after `free`, which defuses the drop assertion.
    bytes: Option<Box<[u8]>>,
}

impl NameStorage {
    /// Encodes `name`, interning its tokens in `table`.
    pub fn new(name: &str, table: &SymbolTable) -> Result<Self> {
        table.encode(name)
    }

    /// Obtains fresh backing storage for an already-encoded name, taking
    /// one reference per embedded token.
    ///
    /// Used to persist a name that arrived as a temporary handle, for
    /// example when a cache miss promotes a looked-up name into the cache.
    #[must_use]
    pub fn copy_of(src: Name<'_>, table: &SymbolTable) -> Self {
        table.inc_ref_count(src);
        Self::from_bytes(src.as_bytes().into())
    }

    pub(crate) fn from_bytes(bytes: Box<[u8]>) -> Self {
        Self { bytes: Some(bytes) }
    }

    /// A handle borrowing this storage's bytes.
    #[must_use]
    pub fn name(&self) -> Name<'_> {
        Name::from_bytes(self.bytes.as_deref().expect("storage already freed"))
    }

    /// Returns the references held by this storage's tokens, consuming it.
    ///
    /// Must be called before the storage is dropped.
    pub fn free(mut self, table: &SymbolTable) {
        let bytes = self.bytes.take().expect("storage already freed");
        table.free(Name::from_bytes(&bytes));
    }
}

impl Drop for NameStorage {
    fn drop(&mut self) {
        debug_assert!(
            self.bytes.is_none(),
            "NameStorage dropped without free(); its symbols leak"
        );
    }
}

impl fmt::Debug for NameStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NameStorage").field(&self.bytes).finish()
    }
}

impl PartialEq for NameStorage {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for NameStorage {}

impl Hash for NameStorage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

/// RAII owner for an encoded name.
///
/// Carries its table, so dropping it releases the name automatically, at
/// the cost of one `Arc` per instance.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use statname::{ScopedName, SymbolTable};
///
/// let table = Arc::new(SymbolTable::new());
/// {
///     let scoped = ScopedName::new("listener.ssl.handshake", Arc::clone(&table)).unwrap();
///     assert_eq!(table.to_string(scoped.name()), "listener.ssl.handshake");
/// }
/// assert_eq!(table.num_symbols(), 0);
/// ```
pub struct ScopedName {
    table: Arc<SymbolTable>,
    /// `Some` until drop; taken exactly once.
    storage: Option<NameStorage>,
}

impl ScopedName {
    /// Encodes `name` into a self-releasing owner.
    pub fn new(name: &str, table: Arc<SymbolTable>) -> Result<Self> {
        let storage = table.encode(name)?;
        Ok(Self { table, storage: Some(storage) })
    }

    /// Obtains self-releasing backing storage for an existing handle.
    #[must_use]
    pub fn from_name(src: Name<'_>, table: Arc<SymbolTable>) -> Self {
        let storage = NameStorage::copy_of(src, &table);
        Self { table, storage: Some(storage) }
    }

    /// A handle borrowing this owner's bytes.
    #[must_use]
    pub fn name(&self) -> Name<'_> {
        self.storage.as_ref().expect("storage taken").name()
    }

    /// The table this name belongs to.
    #[must_use]
    pub fn table(&self) -> &Arc<SymbolTable> {
        &self.table
    }
}

impl Drop for ScopedName {
    fn drop(&mut self) {
        if let Some(storage) = self.storage.take() {
            storage.free(&self.table);
        }
    }
}

/// Key adapter so a borrowed [`Name`] can probe a set of owning storages
/// without materializing a temporary [`NameStorage`]. Its `Hash` impl and
/// [`NameStorage`]'s agree byte-for-byte on the payload.
impl Equivalent<NameStorage> for Name<'_> {
    fn equivalent(&self, key: &NameStorage) -> bool {
        *self == key.name()
    }
}

/// A hash set of [`NameStorage`] with lookup by borrowed [`Name`].
///
/// Like a single storage, the set must be drained with
/// [`free`](Self::free) before it is dropped; each remaining entry would
/// otherwise trip its own leak assertion.
#[derive(Default)]
pub struct NameStorageSet {
    set: HashSet<NameStorage, fxhash::FxBuildHasher>,
}

impl NameStorageSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a storage unless an equal name is already present.
    ///
    /// On a duplicate the incoming storage is handed back to the caller
    /// via `Err`, still live, so its references can be released; dropping
    /// it unfreed would trip the leak assertion.
    pub fn insert(&mut self, storage: NameStorage) -> std::result::Result<(), NameStorage> {
        if self.set.contains(&storage.name()) {
            return Err(storage);
        }
        self.set.insert(storage);
        Ok(())
    }

    /// Looks up the owning storage for a borrowed handle.
    #[must_use]
    pub fn get(&self, name: Name<'_>) -> Option<&NameStorage> {
        self.set.get(&name)
    }

    /// Returns true if a storage with this name is present.
    #[must_use]
    pub fn contains(&self, name: Name<'_>) -> bool {
        self.set.contains(&name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.set.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Iterates over the stored names in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = Name<'_>> {
        self.set.iter().map(NameStorage::name)
    }

    /// Releases every entry back to the table, emptying the set.
    pub fn free(&mut self, table: &SymbolTable) {
        for storage in self.set.drain() {
            storage.free(table);
        }
    }
}
