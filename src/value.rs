// ABOUTME: Tagged cell values and the fixed-capacity, reference-counted heap

use crate::config::{HEAP_BYTES, SMALL_INTEGER_CACHE_SIZE};
use crate::env::FrameRef;
use crate::error::Error;
use crate::interp::Interpreter;
use std::collections::HashMap;
use tracing::trace;

/// Handle to a cell in the heap pool.
///
/// Handles are plain indices; the empty reference (the empty list, printed
/// `nil`) is represented as `None` at the [`Value`] level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef(u32);

impl CellRef {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A value is either the empty reference or a live cell.
pub type Value = Option<CellRef>;

/// Discriminant of a cell, used for dispatch and debug output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Free,
    Cons,
    Int,
    UInt,
    Bool,
    Str,
    Symbol,
    Function,
    Macro,
    Primitive,
}

impl Tag {
    pub fn name(self) -> &'static str {
        match self {
            Tag::Free => "free",
            Tag::Cons => "cons",
            Tag::Int => "int",
            Tag::UInt => "uint",
            Tag::Bool => "bool",
            Tag::Str => "str",
            Tag::Symbol => "sym",
            Tag::Function => "func",
            Tag::Macro => "mac",
            Tag::Primitive => "prim",
        }
    }
}

/// Implementation callback of a primitive. Receives the argument list
/// (already evaluated unless the primitive is a special form) and the
/// calling environment.
pub type PrimFn = fn(&mut Interpreter, Value, FrameRef) -> Result<Value, Error>;

/// A built-in function descriptor. Primitives live for the process
/// lifetime and are exempt from reference counting.
#[derive(Clone)]
pub struct Primitive {
    pub name: &'static str,
    /// Expected argument count; -1 disables the check.
    pub arity: i32,
    /// Special forms receive their argument list unevaluated.
    pub special_form: bool,
    pub imp: PrimFn,
}

impl std::fmt::Debug for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Primitive")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("special_form", &self.special_form)
            .finish()
    }
}

/// Payload shared by user functions and macros: a name, a parameter list
/// (list of symbols), a body, and the captured environment frame. The
/// frame's descendant count includes one for each live closure over it.
#[derive(Debug, Clone)]
pub struct Closure {
    pub name: String,
    pub params: Value,
    pub body: Value,
    pub env: FrameRef,
    pub arity: usize,
}

#[derive(Debug)]
pub enum CellKind {
    Free { next: Option<CellRef> },
    Cons { car: Value, cdr: Value },
    Int(i32),
    UInt(u32),
    Bool(bool),
    Str(String),
    Symbol(String),
    Function(Box<Closure>),
    Macro(Box<Closure>),
    Primitive(Primitive),
}

impl CellKind {
    pub fn tag(&self) -> Tag {
        match self {
            CellKind::Free { .. } => Tag::Free,
            CellKind::Cons { .. } => Tag::Cons,
            CellKind::Int(_) => Tag::Int,
            CellKind::UInt(_) => Tag::UInt,
            CellKind::Bool(_) => Tag::Bool,
            CellKind::Str(_) => Tag::Str,
            CellKind::Symbol(_) => Tag::Symbol,
            CellKind::Function(_) => Tag::Function,
            CellKind::Macro(_) => Tag::Macro,
            CellKind::Primitive(_) => Tag::Primitive,
        }
    }
}

#[derive(Debug)]
pub struct Cell {
    pub(crate) refs: u32,
    pub(crate) kind: CellKind,
}

/// The fixed-capacity cell pool. Unused cells form a singly-linked free
/// list threaded through the payload field. The total cell count never
/// changes after construction: `total = free + live` at all times.
pub struct Heap {
    cells: Vec<Cell>,
    free_head: Option<CellRef>,
    free_count: usize,
    interned: HashMap<String, CellRef>,
    small_ints: Vec<CellRef>,
    bool_true: CellRef,
    bool_false: CellRef,
}

/// Number of cells the default heap holds: enough to fit [`HEAP_BYTES`]
/// of cell storage.
pub fn default_cell_count() -> usize {
    HEAP_BYTES / std::mem::size_of::<Cell>()
}

impl Heap {
    pub fn new() -> Result<Self, Error> {
        Self::with_capacity(default_cell_count())
    }

    /// Allocates the pool, threads the free list, and installs the
    /// canonical booleans and the small-integer cache, in that order.
    pub fn with_capacity(total: usize) -> Result<Self, Error> {
        let mut cells = Vec::with_capacity(total);
        for i in 0..total {
            let next = if i + 1 < total {
                Some(CellRef(i as u32 + 1))
            } else {
                None
            };
            cells.push(Cell {
                refs: 0,
                kind: CellKind::Free { next },
            });
        }
        let mut heap = Heap {
            cells,
            free_head: if total > 0 { Some(CellRef(0)) } else { None },
            free_count: total,
            interned: HashMap::new(),
            small_ints: Vec::new(),
            bool_true: CellRef(0),
            bool_false: CellRef(0),
        };
        heap.bool_false = heap.alloc(CellKind::Bool(false))?;
        heap.bool_true = heap.alloc(CellKind::Bool(true))?;
        for i in 0..SMALL_INTEGER_CACHE_SIZE {
            let r = heap.alloc(CellKind::Int(i as i32))?;
            heap.small_ints.push(r);
        }
        Ok(heap)
    }

    // ========================================================================
    // Pool accounting
    // ========================================================================

    pub fn total_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn cells_remaining(&self) -> usize {
        self.free_count
    }

    pub fn cells_allocated(&self) -> usize {
        self.cells.len() - self.free_count
    }

    // ========================================================================
    // Allocation and reference counting
    // ========================================================================

    /// Fetches a cell from the free list.
    pub fn alloc(&mut self, kind: CellKind) -> Result<CellRef, Error> {
        trace!("Allocating a {}.", kind.tag().name());
        let r = self.free_head.ok_or(Error::OutOfMemory)?;
        let cell = &mut self.cells[r.index()];
        self.free_head = match cell.kind {
            CellKind::Free { next } => next,
            // A non-free cell on the free list means the pool is corrupt.
            _ => return Err(Error::OutOfMemory),
        };
        cell.refs = 0;
        cell.kind = kind;
        self.free_count -= 1;
        Ok(r)
    }

    /// Returns a cell to the free list. Lifetime bookkeeping (releasing
    /// owned children) is the caller's job; see `Interpreter::release`.
    pub(crate) fn take_kind(&mut self, r: CellRef) -> CellKind {
        let next = self.free_head;
        let cell = &mut self.cells[r.index()];
        let kind = std::mem::replace(&mut cell.kind, CellKind::Free { next });
        cell.refs = 0;
        self.free_head = Some(r);
        self.free_count += 1;
        trace!("Freed a {}.", kind.tag().name());
        kind
    }

    /// Booleans, interned symbols, primitives, and cached small integers
    /// are preallocated and unique; they are never counted or freed.
    pub fn exempt(&self, r: CellRef) -> bool {
        match &self.cells[r.index()].kind {
            CellKind::Free { .. } => true,
            CellKind::Bool(_) => true,
            CellKind::Symbol(_) => true,
            CellKind::Primitive(_) => true,
            CellKind::Int(n) => *n >= 0 && (*n as usize) < SMALL_INTEGER_CACHE_SIZE,
            _ => false,
        }
    }

    /// Increments the reference count unless the cell is exempt.
    pub fn retain(&mut self, v: Value) {
        let Some(r) = v else { return };
        if self.exempt(r) {
            return;
        }
        self.cells[r.index()].refs += 1;
        trace!(
            "Retaining a {}. Reference count now {}",
            self.tag(v).map_or("?", Tag::name),
            self.cells[r.index()].refs
        );
    }

    /// Cancels one `retain` without ever freeing the cell. Used to shield
    /// a result while the scratch structure it may alias is reclaimed.
    pub(crate) fn unretain(&mut self, v: Value) {
        let Some(r) = v else { return };
        if self.exempt(r) {
            return;
        }
        let cell = &mut self.cells[r.index()];
        if cell.refs > 0 {
            cell.refs -= 1;
        }
    }

    /// True for a live, non-exempt-free cell that nothing has retained.
    /// The driver uses this to release only floating top-level results.
    pub fn unreferenced(&self, v: Value) -> bool {
        match v {
            Some(r) => !self.is_free(r) && self.cells[r.index()].refs == 0,
            None => false,
        }
    }

    pub(crate) fn refs(&self, r: CellRef) -> u32 {
        self.cells[r.index()].refs
    }

    pub fn is_free(&self, r: CellRef) -> bool {
        matches!(self.cells[r.index()].kind, CellKind::Free { .. })
    }

    // ========================================================================
    // Constructors
    // ========================================================================

    pub fn boolean(&self, value: bool) -> Value {
        Some(if value { self.bool_true } else { self.bool_false })
    }

    /// Returns the cached cell for small non-negative values.
    pub fn integer(&mut self, value: i32) -> Result<CellRef, Error> {
        if value >= 0 && (value as usize) < SMALL_INTEGER_CACHE_SIZE {
            Ok(self.small_ints[value as usize])
        } else {
            self.alloc(CellKind::Int(value))
        }
    }

    pub fn unsigned(&mut self, value: u32) -> Result<CellRef, Error> {
        self.alloc(CellKind::UInt(value))
    }

    pub fn string(&mut self, value: String) -> Result<CellRef, Error> {
        self.alloc(CellKind::Str(value))
    }

    /// Canonicalizes a symbol: two symbols with equal names are the same
    /// cell. Interned symbols live for the process lifetime.
    pub fn intern_symbol(&mut self, name: &str) -> Result<CellRef, Error> {
        if let Some(&r) = self.interned.get(name) {
            return Ok(r);
        }
        let r = self.alloc(CellKind::Symbol(name.to_string()))?;
        self.interned.insert(name.to_string(), r);
        Ok(r)
    }

    pub fn primitive(&mut self, prim: Primitive) -> Result<CellRef, Error> {
        self.alloc(CellKind::Primitive(prim))
    }

    /// A cons owns both of its fields.
    pub fn cons(&mut self, car: Value, cdr: Value) -> Result<CellRef, Error> {
        let r = self.alloc(CellKind::Cons { car, cdr })?;
        self.retain(car);
        self.retain(cdr);
        Ok(r)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn tag(&self, v: Value) -> Option<Tag> {
        v.map(|r| self.cells[r.index()].kind.tag())
    }

    pub fn car(&self, v: Value) -> Value {
        match v {
            Some(r) => match self.cells[r.index()].kind {
                CellKind::Cons { car, .. } => car,
                _ => None,
            },
            None => None,
        }
    }

    pub fn cdr(&self, v: Value) -> Value {
        match v {
            Some(r) => match self.cells[r.index()].kind {
                CellKind::Cons { cdr, .. } => cdr,
                _ => None,
            },
            None => None,
        }
    }

    /// Raw field store; does not adjust reference counts.
    pub(crate) fn set_cdr(&mut self, r: CellRef, value: Value) {
        if let CellKind::Cons { cdr, .. } = &mut self.cells[r.index()].kind {
            *cdr = value;
        }
    }

    pub fn integer_value(&self, v: Value) -> i32 {
        match v {
            Some(r) => match self.cells[r.index()].kind {
                CellKind::Int(n) => n,
                CellKind::UInt(n) => n as i32,
                _ => 0,
            },
            None => 0,
        }
    }

    pub fn unsigned_value(&self, v: Value) -> u32 {
        match v {
            Some(r) => match self.cells[r.index()].kind {
                CellKind::Int(n) => n as u32,
                CellKind::UInt(n) => n,
                _ => 0,
            },
            None => 0,
        }
    }

    /// Only the boolean `#t` is truthy; every other value reads as false.
    pub fn boolean_value(&self, v: Value) -> bool {
        match v {
            Some(r) => matches!(self.cells[r.index()].kind, CellKind::Bool(true)),
            None => false,
        }
    }

    pub fn string_value(&self, v: Value) -> &str {
        match v {
            Some(r) => match &self.cells[r.index()].kind {
                CellKind::Str(s) | CellKind::Symbol(s) => s,
                _ => "",
            },
            None => "",
        }
    }

    pub fn closure(&self, r: CellRef) -> Option<&Closure> {
        match &self.cells[r.index()].kind {
            CellKind::Function(c) | CellKind::Macro(c) => Some(c),
            _ => None,
        }
    }

    pub fn primitive_value(&self, r: CellRef) -> Option<&Primitive> {
        match &self.cells[r.index()].kind {
            CellKind::Primitive(p) => Some(p),
            _ => None,
        }
    }

    // ========================================================================
    // Type predicates
    // ========================================================================

    pub fn is_symbol(&self, v: Value) -> bool {
        self.tag(v) == Some(Tag::Symbol)
    }

    pub fn is_string(&self, v: Value) -> bool {
        self.tag(v) == Some(Tag::Str)
    }

    pub fn is_integer(&self, v: Value) -> bool {
        self.tag(v) == Some(Tag::Int)
    }

    pub fn is_unsigned(&self, v: Value) -> bool {
        self.tag(v) == Some(Tag::UInt)
    }

    pub fn is_numeric(&self, v: Value) -> bool {
        matches!(self.tag(v), Some(Tag::Int) | Some(Tag::UInt))
    }

    /// The empty reference counts as a list.
    pub fn is_list(&self, v: Value) -> bool {
        match self.tag(v) {
            None => true,
            Some(Tag::Cons) => true,
            _ => false,
        }
    }

    /// User functions and primitives are both applicable.
    pub fn is_function(&self, v: Value) -> bool {
        matches!(self.tag(v), Some(Tag::Function) | Some(Tag::Primitive))
    }

    pub fn is_macro(&self, v: Value) -> bool {
        self.tag(v) == Some(Tag::Macro)
    }

    /// True when every element of `list` carries the given tag.
    pub fn all_of_type(&self, required: Tag, list: Value) -> bool {
        let mut cell = list;
        while cell.is_some() {
            if self.tag(self.car(cell)) != Some(required) {
                return false;
            }
            cell = self.cdr(cell);
        }
        true
    }

    // ========================================================================
    // List utilities
    // ========================================================================

    pub fn length_of(&self, v: Value) -> usize {
        if self.tag(v) != Some(Tag::Cons) {
            return 0;
        }
        let mut len = 0;
        let mut cell = v;
        while cell.is_some() {
            cell = self.cdr(cell);
            len += 1;
            if len > self.total_cells() {
                // Cyclic structure; a real list cannot outsize the pool.
                break;
            }
        }
        len
    }

    pub fn last_cell(&self, v: Value) -> Value {
        let mut cell = v;
        while cell.is_some() && self.cdr(cell).is_some() {
            cell = self.cdr(cell);
        }
        cell
    }

    /// Builds a list whose conses own the items.
    pub fn list(&mut self, items: &[Value]) -> Result<Value, Error> {
        self.list_with_tail(items, None)
    }

    /// Builds a list ending in `tail` verbatim (a dotted tail unless the
    /// tail is itself a list).
    pub fn list_with_tail(&mut self, items: &[Value], tail: Value) -> Result<Value, Error> {
        let mut acc = tail;
        for &item in items.iter().rev() {
            acc = Some(self.cons(item, acc)?);
        }
        Ok(acc)
    }

    /// Concatenates one level of nesting: list elements contribute their
    /// elements, non-list elements contribute themselves.
    pub fn flatten(&mut self, l: Value) -> Result<Value, Error> {
        let mut items = Vec::new();
        let mut outer = l;
        while outer.is_some() {
            let head = self.car(outer);
            if self.is_list(head) {
                let mut inner = head;
                while inner.is_some() {
                    items.push(self.car(inner));
                    inner = self.cdr(inner);
                }
            } else {
                items.push(head);
            }
            outer = self.cdr(outer);
        }
        self.list(&items)
    }

    // ========================================================================
    // Equality and printing
    // ========================================================================

    /// Structural equality: same identity is equal, different tags are
    /// not; conses compare element-wise including length.
    pub fn is_equal(&self, a: Value, b: Value) -> bool {
        if a == b {
            return true;
        }
        let (Some(ra), Some(rb)) = (a, b) else {
            return false;
        };
        let (ka, kb) = (&self.cells[ra.index()].kind, &self.cells[rb.index()].kind);
        if ka.tag() != kb.tag() {
            return false;
        }
        match (ka, kb) {
            (CellKind::Cons { .. }, CellKind::Cons { .. }) => {
                if self.length_of(a) != self.length_of(b) {
                    return false;
                }
                let (mut a1, mut a2) = (a, b);
                while a1.is_some() {
                    if !self.is_equal(self.car(a1), self.car(a2)) {
                        return false;
                    }
                    a1 = self.cdr(a1);
                    a2 = self.cdr(a2);
                }
                true
            }
            (CellKind::Int(x), CellKind::Int(y)) => x == y,
            (CellKind::UInt(x), CellKind::UInt(y)) => x == y,
            (CellKind::Bool(x), CellKind::Bool(y)) => x == y,
            (CellKind::Str(x), CellKind::Str(y)) => x == y,
            // Functions, macros, and primitives compare by identity only,
            // which the a == b check above already covered.
            _ => false,
        }
    }

    fn cons_to_string(&self, r: CellRef) -> String {
        let mut parts = Vec::new();
        let mut cell = Some(r);
        let mut seen = 0;
        loop {
            match self.tag(cell) {
                Some(Tag::Cons) => {
                    parts.push(self.to_string(self.car(cell)));
                    cell = self.cdr(cell);
                }
                None => break,
                Some(_) => {
                    // Dotted tail.
                    parts.push(".".to_string());
                    parts.push(self.to_string(cell));
                    break;
                }
            }
            seen += 1;
            if seen > self.total_cells() {
                parts.push("...".to_string());
                break;
            }
        }
        format!("({})", parts.join(" "))
    }

    /// Canonical printed form of a value.
    pub fn to_string(&self, v: Value) -> String {
        let Some(r) = v else {
            return "nil".to_string();
        };
        match &self.cells[r.index()].kind {
            CellKind::Free { .. } => "Free-object".to_string(),
            CellKind::Cons { .. } => self.cons_to_string(r),
            CellKind::Int(n) => format!("{}", n),
            CellKind::UInt(n) => format!("#x{:08x}", n),
            CellKind::Bool(b) => if *b { "#t" } else { "#f" }.to_string(),
            CellKind::Str(s) => format!("\"{}\"", s),
            CellKind::Symbol(s) => s.clone(),
            CellKind::Function(c) => format!("<func: {}>", c.name),
            CellKind::Macro(c) => format!("<macro: {}>", c.name),
            CellKind::Primitive(p) => format!("<prim: {}>", p.name),
        }
    }

    // ========================================================================
    // Debugging
    // ========================================================================

    /// Renders one cell for debug output.
    pub fn dump_node(&self, r: CellRef) -> String {
        if self.is_free(r) {
            format!("Node {}\n  free", r.index())
        } else {
            let cell = &self.cells[r.index()];
            format!(
                "Node {}\n  {} references\n  {} - {}",
                r.index(),
                cell.refs,
                cell.kind.tag().name(),
                self.to_string(Some(r))
            )
        }
    }

    /// Renders every live cell in the pool.
    pub fn dump_active_heap(&self) -> String {
        let mut out = String::new();
        for i in 0..self.cells.len() {
            let r = CellRef(i as u32);
            if !self.is_free(r) {
                out.push_str(&self.dump_node(r));
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heap() -> Heap {
        Heap::with_capacity(256).expect("heap")
    }

    #[test]
    fn test_pool_accounting_after_init() {
        let h = heap();
        assert_eq!(h.total_cells(), 256);
        // Two booleans plus the small-integer cache are live from the start.
        assert_eq!(h.cells_allocated(), 2 + SMALL_INTEGER_CACHE_SIZE);
        assert_eq!(h.cells_remaining() + h.cells_allocated(), h.total_cells());
    }

    #[test]
    fn test_with_capacity_too_small_is_out_of_memory() {
        assert!(matches!(Heap::with_capacity(8), Err(Error::OutOfMemory)));
    }

    #[test]
    fn test_small_integer_cache_identity() {
        let mut h = heap();
        let a = h.integer(5).unwrap();
        let b = h.integer(5).unwrap();
        assert_eq!(a, b);
        let big1 = h.integer(100).unwrap();
        let big2 = h.integer(100).unwrap();
        assert_ne!(big1, big2);
    }

    #[test]
    fn test_symbol_interning_identity() {
        let mut h = heap();
        let a = h.intern_symbol("x").unwrap();
        let b = h.intern_symbol("x").unwrap();
        let c = h.intern_symbol("y").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_exempt_cells() {
        let mut h = heap();
        let sym = h.intern_symbol("x").unwrap();
        let small = h.integer(3).unwrap();
        let big = h.integer(99).unwrap();
        assert!(h.exempt(sym));
        assert!(h.exempt(small));
        assert!(!h.exempt(big));
        assert!(h.exempt(h.bool_true));
    }

    #[test]
    fn test_alloc_until_exhaustion() {
        let mut h = Heap::with_capacity(40).expect("heap");
        let mut allocated = Vec::new();
        loop {
            match h.alloc(CellKind::Int(1234)) {
                Ok(r) => allocated.push(r),
                Err(Error::OutOfMemory) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(h.cells_remaining(), 0);
        assert_eq!(allocated.len(), 40 - 2 - SMALL_INTEGER_CACHE_SIZE);
    }

    #[test]
    fn test_to_string_forms() {
        let mut h = heap();
        let i = h.integer(42).unwrap();
        assert_eq!(h.to_string(Some(i)), "42");
        let n = h.integer(-7).unwrap();
        assert_eq!(h.to_string(Some(n)), "-7");
        let u = h.unsigned(0xdead).unwrap();
        assert_eq!(h.to_string(Some(u)), "#x0000dead");
        assert_eq!(h.to_string(h.boolean(true)), "#t");
        assert_eq!(h.to_string(h.boolean(false)), "#f");
        let s = h.string("hi".to_string()).unwrap();
        assert_eq!(h.to_string(Some(s)), "\"hi\"");
        let sym = h.intern_symbol("foo").unwrap();
        assert_eq!(h.to_string(Some(sym)), "foo");
        assert_eq!(h.to_string(None), "nil");
    }

    #[test]
    fn test_to_string_lists() {
        let mut h = heap();
        let one = Some(h.integer(1).unwrap());
        let two = Some(h.integer(2).unwrap());
        let three = Some(h.integer(3).unwrap());
        let l = h.list(&[one, two, three]).unwrap();
        assert_eq!(h.to_string(l), "(1 2 3)");

        let pair = h.cons(one, two).unwrap();
        assert_eq!(h.to_string(Some(pair)), "(1 . 2)");

        let nested = h.list(&[one, l, two]).unwrap();
        assert_eq!(h.to_string(nested), "(1 (1 2 3) 2)");
    }

    #[test]
    fn test_is_equal_structural() {
        let mut h = heap();
        let one = Some(h.integer(1).unwrap());
        let two = Some(h.integer(2).unwrap());
        let a = h.list(&[one, two]).unwrap();
        let b = h.list(&[one, two]).unwrap();
        let c = h.list(&[two, one]).unwrap();
        assert!(h.is_equal(a, b));
        assert!(!h.is_equal(a, c));
        assert!(h.is_equal(None, None));
        assert!(!h.is_equal(a, None));
        // Reflexive on identity.
        assert!(h.is_equal(a, a));
    }

    #[test]
    fn test_is_equal_mixed_tags() {
        let mut h = heap();
        let i = Some(h.integer(1).unwrap());
        let s = Some(h.string("1".to_string()).unwrap());
        assert!(!h.is_equal(i, s));
        let t = h.boolean(true);
        assert!(!h.is_equal(t, i));
    }

    #[test]
    fn test_length_and_last_cell() {
        let mut h = heap();
        let one = Some(h.integer(1).unwrap());
        let two = Some(h.integer(2).unwrap());
        let l = h.list(&[one, two]).unwrap();
        assert_eq!(h.length_of(l), 2);
        assert_eq!(h.length_of(None), 0);
        assert_eq!(h.length_of(one), 0);
        let last = h.last_cell(l);
        assert_eq!(h.car(last), two);
    }

    #[test]
    fn test_flatten_one_level() {
        let mut h = heap();
        let one = Some(h.integer(1).unwrap());
        let two = Some(h.integer(2).unwrap());
        let three = Some(h.integer(3).unwrap());
        let inner = h.list(&[two, three]).unwrap();
        let l = h.list(&[one, inner]).unwrap();
        let flat = h.flatten(l).unwrap();
        assert_eq!(h.to_string(flat), "(1 2 3)");
    }

    #[test]
    fn test_all_of_type() {
        let mut h = heap();
        let a = Some(h.intern_symbol("a").unwrap());
        let b = Some(h.intern_symbol("b").unwrap());
        let one = Some(h.integer(1).unwrap());
        let syms = h.list(&[a, b]).unwrap();
        let mixed = h.list(&[a, one]).unwrap();
        assert!(h.all_of_type(Tag::Symbol, syms));
        assert!(!h.all_of_type(Tag::Symbol, mixed));
        assert!(h.all_of_type(Tag::Symbol, None));
    }
}
