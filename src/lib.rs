//! Symbol-interning table for hierarchical, period-delimited metric names.
//!
//! Large deployments carry tens of thousands of stat names like
//! `cluster.upstream_cx.total`, yet the set of distinct `.`-separated
//! tokens usually stays under a few hundred. This crate compresses each
//! name into a compact byte string of interned token symbols, so a
//! fleet-wide stats registry fits in a fraction of the memory the raw
//! strings would need, while reference counting lets tokens be reclaimed
//! the moment the last name using them is destroyed.
//!
//! # Architecture
//!
//! - [`SymbolTable`]: the interning core. Maps tokens to 32-bit
//!   [`Symbol`]s, counts references, recycles symbols through a LIFO free
//!   pool, and serializes all map access behind one mutex.
//! - [`Name`]: a borrowed, `Copy` handle to one encoded name. Hashing and
//!   equality work on the raw bytes and never touch the table.
//! - [`NameStorage`]: owns one encoded name's bytes. Deliberately holds no
//!   table reference (one pointer saved per metric); the owner must call
//!   [`NameStorage::free`] before dropping it.
//! - [`ScopedName`]: the RAII alternative that bundles an
//!   `Arc<SymbolTable>` and frees itself on drop.
//! - [`NameStorageSet`]: a hash set of owned names with lookup by borrowed
//!   handle.
//! - [`NameList`]: several encoded names packed into one allocation,
//!   iterable front to back.
//!
//! # Example
//!
//! ```
//! use statname::SymbolTable;
//!
//! let table = SymbolTable::new();
//!
//! let total = table.encode("cluster.upstream_cx.total").unwrap();
//! let retry = table.encode("cluster.upstream_rq.retry").unwrap();
//!
//! // "cluster" is interned once and shared by both names.
//! assert_eq!(table.num_symbols(), 5);
//! assert_eq!(table.to_string(total.name()), "cluster.upstream_cx.total");
//!
//! // Owners must return their references before dropping.
//! total.free(&table);
//! retry.free(&table);
//! assert_eq!(table.num_symbols(), 0);
//! ```
//!
//! # Symbol stability
//!
//! This is not a general string interner with process-lifetime identities:
//! once every name referencing a token is freed, the token's symbol is
//! recycled and may later denote a different token. Keep a storage alive
//! to keep an identity stable.

mod encoding;
pub mod error;
pub mod list;
pub mod name;
pub mod storage;
pub mod symbol;
pub mod table;

pub use encoding::{MAX_PAYLOAD_SIZE, SIZE_ENCODING_BYTES};
pub use error::{Error, Result};
pub use list::{NameList, MAX_LIST_SIZE};
pub use name::{Name, NameHashMap, NameHashSet};
pub use storage::{NameStorage, NameStorageSet, ScopedName};
pub use symbol::Symbol;
pub use table::SymbolTable;
