//! The symbol table: interning, ref counting, and symbol recycling.
//!
//! Metric names are arrays of `.`-separated tokens with heavy overlap
//! between names: a deployment may carry tens of thousands of names built
//! from a few hundred distinct tokens. The table maps each token to a
//! [`Symbol`] and encodes a name as the varint stream of its tokens'
//! symbols, so the per-name footprint collapses to a handful of bytes.
//!
//! # Design
//!
//! The table keeps two maps protected by one mutex:
//!
//! - `symbols`: token string → `(Symbol, ref_count)`, used while encoding
//! - `strings`: `Symbol` → token string, used while decoding
//!
//! Both maps share one `Arc<str>` per token, so the string data exists once.
//! Every live encoded name holds one reference on each of its tokens; when
//! a name is freed the counts drop, and a token reaching zero is removed
//! from both maps and its symbol pushed onto a LIFO free pool. The
//! monotonic counter only advances when the pool is empty, keeping the live
//! symbol space dense.
//!
//! Because symbols are recycled, encoding the same string before and after
//! a full release may yield different symbols. Callers that need a stable
//! identity keep a [`NameStorage`] alive instead of comparing raw symbols.
//!
//! # Thread Safety
//!
//! All operations that touch the maps (`encode`, `free`, `inc_ref_count`,
//! `to_string`, `less_than`, `num_symbols`, `populate_list`, `join`)
//! serialize on the table mutex and are linearizable. Handle operations
//! that walk only caller-owned bytes (hash, equality, size) never lock.

use std::sync::{Arc, Mutex};

use hashbrown::HashMap;
use log::{debug, warn};

use crate::encoding::{decode_symbols, Encoding, MAX_PAYLOAD_SIZE};
use crate::error::{Error, Result};
use crate::list::{NameList, MAX_LIST_SIZE};
use crate::name::Name;
use crate::storage::NameStorage;
use crate::symbol::Symbol;

type FxHashMap<K, V> = HashMap<K, V, fxhash::FxBuildHasher>;

/// The first symbol ever minted. 0 is reserved.
const FIRST_SYMBOL: u32 = 1;

/// One interned token: its symbol and the number of live encoded names
/// referencing it.
struct SharedSymbol {
    symbol: Symbol,
    ref_count: u32,
}

/// Mutable table state, guarded by the table mutex.
struct TableState {
    /// Token string → shared symbol, for the encode direction.
    symbols: FxHashMap<Arc<str>, SharedSymbol>,

    /// Symbol → token string, for the decode direction. Shares the `Arc`
    /// with the `symbols` key so each token is stored once.
    strings: FxHashMap<Symbol, Arc<str>>,

    /// Recycled symbols, reused LIFO before the counter advances.
    free_pool: Vec<Symbol>,

    /// Next fresh symbol, used only when the free pool is empty.
    monotonic_counter: u32,
}

impl TableState {
    fn new() -> Self {
        Self {
            symbols: FxHashMap::default(),
            strings: FxHashMap::default(),
            free_pool: Vec::new(),
            monotonic_counter: FIRST_SYMBOL,
        }
    }

    /// Pops a recycled symbol, or advances the monotonic counter.
    fn mint(&mut self) -> Symbol {
        if let Some(symbol) = self.free_pool.pop() {
            return symbol;
        }
        let id = self.monotonic_counter;
        assert!(id < u32::MAX, "symbol space exhausted");
        self.monotonic_counter += 1;
        Symbol::new(id)
    }

    /// Finds or creates the symbol for one token, taking one reference.
    fn intern(&mut self, token: &str) -> Symbol {
        if let Some(shared) = self.symbols.get_mut(token) {
            shared.ref_count = shared
                .ref_count
                .checked_add(1)
                .expect("token ref count overflow");
            return shared.symbol;
        }

        let symbol = self.mint();
        let owned: Arc<str> = Arc::from(token);
        self.symbols
            .insert(Arc::clone(&owned), SharedSymbol { symbol, ref_count: 1 });
        self.strings.insert(symbol, owned);
        symbol
    }

    /// Returns the token string for a live symbol.
    ///
    /// Panics on an unknown symbol: the handle being decoded references a
    /// token with no live count, so the stats set is already corrupt.
    fn resolve(&self, symbol: Symbol) -> &Arc<str> {
        self.strings
            .get(&symbol)
            .unwrap_or_else(|| panic!("stale handle: {symbol} is not interned"))
    }

    /// Takes one additional reference on a live symbol.
    fn acquire(&mut self, symbol: Symbol) {
        let token = Arc::clone(self.resolve(symbol));
        let shared = self
            .symbols
            .get_mut(&*token)
            .expect("symbol maps out of sync");
        shared.ref_count = shared
            .ref_count
            .checked_add(1)
            .expect("token ref count overflow");
    }

    /// Drops one reference on a live symbol, recycling it at zero.
    fn release(&mut self, symbol: Symbol) {
        let token = Arc::clone(
            self.strings
                .get(&symbol)
                .unwrap_or_else(|| panic!("double free: {symbol} is not interned")),
        );
        let shared = self
            .symbols
            .get_mut(&*token)
            .expect("symbol maps out of sync");
        shared.ref_count -= 1;

        if shared.ref_count == 0 {
            self.symbols.remove(&*token);
            self.strings.remove(&symbol);
            self.free_pool.push(symbol);
        }
    }

    /// Splits `name` on `.`, interns each token, and appends the symbols to
    /// `encoding`, which must be fresh.
    ///
    /// On failure every reference taken by this call has been returned and
    /// the encoding is empty again.
    fn add_tokens(&mut self, name: &str, encoding: &mut Encoding) -> Result<()> {
        debug_assert_eq!(encoding.data_bytes_required(), 0);

        if name.is_empty() {
            return Ok(());
        }

        let mut added = Vec::new();
        for token in name.split('.') {
            if token.len() > MAX_PAYLOAD_SIZE {
                self.roll_back(&added, encoding);
                return Err(Error::NameTooLong { size: token.len() });
            }
            let symbol = self.intern(token);
            added.push(symbol);
            encoding.add_symbol(symbol);
        }

        let size = encoding.data_bytes_required();
        if size > MAX_PAYLOAD_SIZE {
            self.roll_back(&added, encoding);
            return Err(Error::NameTooLong { size });
        }
        Ok(())
    }

    /// Returns the references behind a failed encode and empties the
    /// encoding so it can be dropped.
    fn roll_back(&mut self, added: &[Symbol], encoding: &mut Encoding) {
        for &symbol in added {
            self.release(symbol);
        }
        encoding.abandon();
    }

    /// Rolls back a fully built encoding, as `roll_back` does for a partial
    /// one.
    fn release_encoding(&mut self, encoding: &mut Encoding) {
        for symbol in decode_symbols(encoding.payload()) {
            self.release(symbol);
        }
        encoding.abandon();
    }
}

/// Interning table for hierarchical, period-delimited metric names.
///
/// # Examples
///
/// ```
/// use statname::SymbolTable;
///
/// let table = SymbolTable::new();
///
/// let total = table.encode("cluster.upstream_cx.total").unwrap();
/// let active = table.encode("cluster.upstream_cx.active").unwrap();
/// assert_eq!(table.num_symbols(), 4); // "cluster" and "upstream_cx" shared
///
/// assert_eq!(table.to_string(total.name()), "cluster.upstream_cx.total");
/// assert!(table.less_than(active.name(), total.name()));
///
/// total.free(&table);
/// active.free(&table);
/// assert_eq!(table.num_symbols(), 0);
/// ```
pub struct SymbolTable {
    state: Mutex<TableState>,
}

impl SymbolTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TableState::new()),
        }
    }

    /// Encodes a name into freshly allocated backing storage, interning
    /// tokens as needed.
    ///
    /// The empty string encodes to a zero-symbol payload. A lone `"."`
    /// encodes to two zero-length tokens, so it round-trips through
    /// [`to_string`](Self::to_string) unchanged. The call is atomic: on
    /// [`Error::NameTooLong`] no ref count moves.
    ///
    /// The returned storage must be given back via
    /// [`NameStorage::free`] before it is dropped.
    pub fn encode(&self, name: &str) -> Result<NameStorage> {
        let mut encoding = Encoding::new();
        {
            let mut state = self.state.lock().unwrap();
            if let Err(err) = state.add_tokens(name, &mut encoding) {
                warn!("rejecting metric name: {err}");
                return Err(err);
            }
        }
        Ok(NameStorage::from_bytes(encoding.move_to_storage()))
    }

    /// Builds one name whose token sequence is the concatenation of the
    /// given names' tokens, in order. Empty parts are skipped.
    ///
    /// Each embedded token gains one reference for the new storage, so the
    /// result is freed independently of its parts.
    pub fn join(&self, names: &[Name<'_>]) -> Result<NameStorage> {
        let size: usize = names.iter().map(Name::data_len).sum();
        if size > MAX_PAYLOAD_SIZE {
            let err = Error::NameTooLong { size };
            warn!("rejecting joined name: {err}");
            return Err(err);
        }

        let mut bytes = Vec::with_capacity(size + crate::encoding::SIZE_ENCODING_BYTES);
        bytes.push((size & 0xff) as u8);
        bytes.push((size >> 8) as u8);
        for name in names {
            if name.is_empty() {
                continue;
            }
            bytes.extend_from_slice(name.payload());
        }

        let mut state = self.state.lock().unwrap();
        for name in names {
            for symbol in decode_symbols(name.payload()) {
                state.acquire(symbol);
            }
        }
        Ok(NameStorage::from_bytes(bytes.into_boxed_slice()))
    }

    /// Returns the references held by an encoded name, recycling any token
    /// whose count reaches zero.
    ///
    /// This is the low-level release; owners normally go through
    /// [`NameStorage::free`] or [`NameList::free`].
    ///
    /// # Panics
    ///
    /// Panics if the name references a symbol with no live count, which
    /// means it was already freed or never came from this table.
    pub fn free(&self, name: Name<'_>) {
        let symbols = decode_symbols(name.payload());
        let mut state = self.state.lock().unwrap();
        for symbol in symbols {
            state.release(symbol);
        }
    }

    /// Takes one additional reference on every token of an encoded name.
    ///
    /// Used when copying a name into a second owning container; the copy
    /// must later be freed like any other storage.
    pub fn inc_ref_count(&self, name: Name<'_>) {
        let symbols = decode_symbols(name.payload());
        let mut state = self.state.lock().unwrap();
        for symbol in symbols {
            state.acquire(symbol);
        }
    }

    /// Decodes an encoded name back into its period-delimited string.
    ///
    /// # Panics
    ///
    /// Panics if the payload is malformed or references a stale symbol.
    #[must_use]
    pub fn to_string(&self, name: Name<'_>) -> String {
        let symbols = decode_symbols(name.payload());
        let state = self.state.lock().unwrap();
        let tokens: Vec<&str> = symbols
            .iter()
            .map(|&symbol| state.resolve(symbol).as_ref())
            .collect();
        tokens.join(".")
    }

    /// Calls `f` with the decoded string form of `name`.
    pub fn with_string<R>(&self, name: Name<'_>, f: impl FnOnce(&str) -> R) -> R {
        f(&self.to_string(name))
    }

    /// Compares two encoded names lexicographically by token string.
    ///
    /// This is the elaborated-string order, not the byte order of the
    /// payloads; symbol values carry no ordering information. On a common
    /// token prefix the shorter name sorts first.
    #[must_use]
    pub fn less_than(&self, a: Name<'_>, b: Name<'_>) -> bool {
        let a_symbols = decode_symbols(a.payload());
        let b_symbols = decode_symbols(b.payload());

        let state = self.state.lock().unwrap();
        for (&x, &y) in a_symbols.iter().zip(&b_symbols) {
            let token_x = state.resolve(x);
            let token_y = state.resolve(y);
            if token_x != token_y {
                return token_x < token_y;
            }
        }
        a_symbols.len() < b_symbols.len()
    }

    /// Encodes up to [`MAX_LIST_SIZE`] names into one packed allocation.
    ///
    /// The call is atomic: if any name is rejected, the references taken
    /// for the earlier names are returned and the list is left unpopulated.
    ///
    /// # Panics
    ///
    /// Panics if the list is already populated.
    pub fn populate_list(&self, names: &[&str], list: &mut NameList) -> Result<()> {
        assert!(!list.is_populated(), "name list populated twice");
        if names.len() > MAX_LIST_SIZE {
            return Err(Error::ListTooLong { count: names.len() });
        }

        let mut encodings: Vec<Encoding> = Vec::with_capacity(names.len());
        {
            let mut state = self.state.lock().unwrap();
            for name in names {
                let mut encoding = Encoding::new();
                if let Err(err) = state.add_tokens(name, &mut encoding) {
                    for earlier in &mut encodings {
                        state.release_encoding(earlier);
                    }
                    warn!("rejecting name list: {err}");
                    return Err(err);
                }
                encodings.push(encoding);
            }
        }

        let total = 1 + encodings.iter().map(Encoding::bytes_required).sum::<usize>();
        let mut bytes = Vec::with_capacity(total);
        bytes.push(names.len() as u8);
        for encoding in &mut encodings {
            bytes.extend_from_slice(&encoding.move_to_storage());
        }
        list.set_storage(bytes.into_boxed_slice());
        Ok(())
    }

    /// Number of live interned tokens.
    #[must_use]
    pub fn num_symbols(&self) -> u32 {
        let state = self.state.lock().unwrap();
        debug_assert_eq!(state.symbols.len(), state.strings.len());
        state.strings.len() as u32
    }

    /// Dumps the live symbols through the `log` facade, ordered by symbol.
    pub fn debug_print(&self) {
        let state = self.state.lock().unwrap();
        let mut entries: Vec<(Symbol, &Arc<str>)> =
            state.strings.iter().map(|(&s, t)| (s, t)).collect();
        entries.sort_by_key(|&(symbol, _)| symbol);
        debug!("symbol table: {} live symbols", entries.len());
        for (symbol, token) in entries {
            debug!("  {symbol} => {token:?}");
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
