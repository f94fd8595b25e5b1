// ABOUTME: Interpreter context tying the heap and frame registry together
// Cross-cutting lifetime operations (release, bind, scope teardown) live
// here because tearing down a closure touches both the heap and the frames.

use crate::builtins;
use crate::env::{Binding, FrameRef, FrameSet};
use crate::error::Error;
use crate::eval;
use crate::parser;
use crate::special_forms;
use crate::value::{CellKind, CellRef, Closure, Heap, PrimFn, Primitive, Value};
use tracing::{debug, error, trace};

/// The process-wide interpreter state: the cell heap, the symbol interner
/// and caches inside it, and the environment registry rooted at the global
/// frame. Initialization order is fixed: heap (booleans, small integers,
/// interner) → global frame → special forms → primitives.
pub struct Interpreter {
    pub heap: Heap,
    pub frames: FrameSet,
}

impl Interpreter {
    pub fn new() -> Result<Self, Error> {
        let heap = Heap::new()?;
        Self::bootstrap(heap)
    }

    /// Builds an interpreter over a pool of exactly `cells` cells. Useful
    /// for exercising exhaustion.
    pub fn with_heap_cells(cells: usize) -> Result<Self, Error> {
        let heap = Heap::with_capacity(cells)?;
        Self::bootstrap(heap)
    }

    fn bootstrap(heap: Heap) -> Result<Self, Error> {
        let mut interp = Interpreter {
            heap,
            frames: FrameSet::new(),
        };
        special_forms::register_special_forms(&mut interp)?;
        builtins::register_primitives(&mut interp)?;
        Ok(interp)
    }

    pub fn global(&self) -> FrameRef {
        self.frames.global()
    }

    // ========================================================================
    // Reference-count lifetime
    // ========================================================================

    /// Drops one reference. On the last reference the cell's owned
    /// children are released recursively and the cell returns to the free
    /// list. No-op on the empty reference and on exempt cells.
    pub fn release(&mut self, v: Value) {
        let Some(r) = v else { return };
        if self.heap.is_free(r) {
            error!("TRYING TO RELEASE FREED DATA! node {:?}", r);
            return;
        }
        if self.heap.exempt(r) {
            return;
        }
        let refs = self.heap.refs(r);
        if refs > 1 {
            trace!("Decremented ref count to {}.", refs - 1);
            self.heap.unretain(Some(r));
            return;
        }
        trace!("Reference count = 0. Freeing.");
        match self.heap.take_kind(r) {
            CellKind::Cons { car, cdr } => {
                self.release(car);
                self.release(cdr);
            }
            CellKind::Function(c) | CellKind::Macro(c) => {
                self.release(c.params);
                self.release(c.body);
                self.remove_descendant(c.env);
            }
            // The backing string is dropped with the payload.
            _ => {}
        }
    }

    /// Releases a value only when nothing owns it. Used for intermediate
    /// results that may be borrowed straight out of a binding.
    pub fn release_transient(&mut self, v: Value) {
        if self.heap.unreferenced(v) {
            self.release(v);
        }
    }

    /// Releases a scratch structure while keeping `result` alive even if
    /// it aliases part of the scratch. The shield retain guarantees the
    /// result cell survives the traversal; the unretain restores its
    /// count, leaving it floating (or owned exactly as before).
    pub(crate) fn release_keeping(&mut self, scratch: Value, result: Value) {
        if scratch == result {
            // Ownership passes through to the caller untouched.
            return;
        }
        self.heap.retain(result);
        self.release(scratch);
        self.heap.unretain(result);
    }

    /// `release_keeping` for scratch of uncertain ownership.
    pub(crate) fn release_transient_keeping(&mut self, scratch: Value, result: Value) {
        if self.heap.unreferenced(scratch) {
            self.release_keeping(scratch, result);
        }
    }

    // ========================================================================
    // Bindings
    // ========================================================================

    /// Binds `sym` in `frame`, retaining the value. An existing binding is
    /// replaced only in the global frame or a direct child of it; local
    /// frames bind a name at most once per activation.
    pub fn bind(&mut self, frame: FrameRef, sym: CellRef, value: Value) {
        let name = self.heap.string_value(Some(sym)).to_string();
        let global = self.frames.global();
        let exists = self.frames.local_binding(frame, &name).is_some();
        if !exists {
            self.heap.retain(value);
            self.frames
                .frame_mut(frame)
                .bindings
                .insert(name, Binding { sym, val: value });
            return;
        }
        let replaceable = frame == global || self.frames.frame(frame).parent == Some(global);
        if replaceable {
            self.heap.retain(value);
            let old = self
                .frames
                .frame_mut(frame)
                .bindings
                .get_mut(&name)
                .map(|b| std::mem::replace(&mut b.val, value));
            if let Some(old) = old {
                self.release(old);
            }
        }
    }

    /// Replaces an existing local binding; no effect when the frame does
    /// not bind the name. The mutator behind `letrec` and `do` updates.
    pub fn rebind(&mut self, frame: FrameRef, sym: CellRef, value: Value) {
        let name = self.heap.string_value(Some(sym)).to_string();
        if self.frames.local_binding(frame, &name).is_none() {
            return;
        }
        self.heap.retain(value);
        let old = self
            .frames
            .frame_mut(frame)
            .bindings
            .get_mut(&name)
            .map(|b| std::mem::replace(&mut b.val, value));
        if let Some(old) = old {
            self.release(old);
        }
    }

    // ========================================================================
    // Frame lifecycle
    // ========================================================================

    /// Marks a frame not-in-scope. The frame is actually destroyed only
    /// once it also has zero descendants, which defers teardown past the
    /// lifetime of closures created inside it.
    pub fn go_out_of_scope(&mut self, frame: FrameRef) {
        if frame == self.frames.global() {
            return;
        }
        self.frames.frame_mut(frame).in_scope = false;
        if self.frames.frame(frame).descendants == 0 {
            self.destroy_frame(frame);
        }
    }

    /// Like `go_out_of_scope`, but shields `result` so a value bound in
    /// the dying frame survives as the frame's return value.
    pub(crate) fn scope_exit_keeping(&mut self, frame: FrameRef, result: Value) {
        self.heap.retain(result);
        self.go_out_of_scope(frame);
        self.heap.unretain(result);
    }

    /// Drops one descendant. A frame already out of scope is destroyed
    /// when its last descendant goes away.
    pub(crate) fn remove_descendant(&mut self, frame: FrameRef) {
        if !self.frames.is_live(frame) {
            return;
        }
        let (descendants, in_scope) = {
            let f = self.frames.frame_mut(frame);
            if f.descendants > 0 {
                f.descendants -= 1;
            }
            (f.descendants, f.in_scope)
        };
        debug!("Removing descendant from environment. Now has {descendants}");
        if descendants == 0 && !in_scope {
            self.destroy_frame(frame);
        }
    }

    fn destroy_frame(&mut self, frame: FrameRef) {
        debug!("Environment going out of scope; cleaning.");
        let f = self.frames.remove(frame);
        if let Some(parent) = f.parent {
            self.remove_descendant(parent);
        }
        for (_, binding) in f.bindings {
            self.release(binding.val);
        }
    }

    // ========================================================================
    // Closures and primitives
    // ========================================================================

    /// Builds a function cell: parameters and body are retained, and the
    /// captured frame gains a descendant so it outlives the closure.
    pub fn make_function(
        &mut self,
        name: &str,
        params: Value,
        body: Value,
        env: FrameRef,
    ) -> Result<Value, Error> {
        let closure = self.make_closure(name, params, body, env);
        let r = self.heap.alloc(CellKind::Function(Box::new(closure)))?;
        Ok(Some(r))
    }

    /// Same shape as a function, but the body is a single expression that
    /// expands to code.
    pub fn make_macro(
        &mut self,
        name: &str,
        params: Value,
        body: Value,
        env: FrameRef,
    ) -> Result<Value, Error> {
        let closure = self.make_closure(name, params, body, env);
        let r = self.heap.alloc(CellKind::Macro(Box::new(closure)))?;
        Ok(Some(r))
    }

    fn make_closure(&mut self, name: &str, params: Value, body: Value, env: FrameRef) -> Closure {
        self.heap.retain(params);
        self.heap.retain(body);
        self.frames.frame_mut(env).descendants += 1;
        Closure {
            name: name.to_string(),
            params,
            body,
            env,
            arity: self.heap.length_of(params),
        }
    }

    pub fn register_primitive(
        &mut self,
        name: &'static str,
        arity: i32,
        imp: PrimFn,
    ) -> Result<(), Error> {
        self.register(name, arity, false, imp)
    }

    pub fn register_special_form(
        &mut self,
        name: &'static str,
        arity: i32,
        imp: PrimFn,
    ) -> Result<(), Error> {
        self.register(name, arity, true, imp)
    }

    fn register(
        &mut self,
        name: &'static str,
        arity: i32,
        special_form: bool,
        imp: PrimFn,
    ) -> Result<(), Error> {
        let sym = self.heap.intern_symbol(name)?;
        let prim = self.heap.primitive(Primitive {
            name,
            arity,
            special_form,
            imp,
        })?;
        let global = self.frames.global();
        self.bind(global, sym, Some(prim));
        Ok(())
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Parses one expression and evaluates it in the global environment.
    /// The source tree is reclaimed afterwards; the result keeps any part
    /// of it that the evaluation handed back (quoted structure).
    pub fn parse_and_eval(&mut self, source: &str) -> Result<Value, Error> {
        let sexpr = parser::parse(self, source)?;
        let global = self.frames.global();
        match eval::evaluate(self, sexpr, global) {
            Ok(result) => {
                self.release_keeping(sexpr, result);
                Ok(result)
            }
            Err(e) => {
                self.release(sexpr);
                Err(e)
            }
        }
    }

    /// Evaluates every top-level expression in `source`, returning the
    /// value of the last one.
    pub fn parse_and_eval_all(&mut self, source: &str) -> Result<Value, Error> {
        let mut parser = parser::Parser::new(source);
        let global = self.frames.global();
        let mut result = None;
        loop {
            let sexpr = match parser.parse_expression(self) {
                Ok(Some(s)) => s,
                Ok(None) => break,
                Err(e) => return Err(e),
            };
            self.release_transient(result);
            match eval::evaluate(self, sexpr, global) {
                Ok(v) => {
                    self.release_keeping(sexpr, v);
                    result = v;
                }
                Err(e) => {
                    self.release(sexpr);
                    return Err(e);
                }
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interp() -> Interpreter {
        Interpreter::new().expect("interpreter")
    }

    #[test]
    fn test_release_returns_cells_to_free_list() {
        let mut it = interp();
        let before = it.heap.cells_remaining();
        let s = it.heap.string("scratch".to_string()).unwrap();
        assert_eq!(it.heap.cells_remaining(), before - 1);
        it.release(Some(s));
        assert_eq!(it.heap.cells_remaining(), before);
    }

    #[test]
    fn test_release_cons_releases_children() {
        let mut it = interp();
        let before = it.heap.cells_remaining();
        let a = Some(it.heap.string("a".to_string()).unwrap());
        let b = Some(it.heap.string("b".to_string()).unwrap());
        let l = it.heap.list(&[a, b]).unwrap();
        assert_eq!(it.heap.cells_remaining(), before - 4);
        it.release(l);
        assert_eq!(it.heap.cells_remaining(), before);
    }

    #[test]
    fn test_release_exempt_is_noop() {
        let mut it = interp();
        let before = it.heap.cells_remaining();
        let sym = it.heap.intern_symbol("keepme").unwrap();
        let small = it.heap.integer(7).unwrap();
        it.release(Some(sym));
        it.release(Some(small));
        it.release(it.heap.boolean(true));
        // Only the fresh symbol consumed a cell, and it stays live.
        assert_eq!(it.heap.cells_remaining(), before - 1);
        assert!(!it.heap.is_free(sym));
    }

    #[test]
    fn test_retained_value_survives_one_release() {
        let mut it = interp();
        let s = Some(it.heap.string("shared".to_string()).unwrap());
        let l1 = it.heap.list(&[s]).unwrap();
        let l2 = it.heap.list(&[s]).unwrap();
        it.release(l1);
        // Still owned by l2.
        assert!(!it.heap.is_free(s.unwrap()));
        it.release(l2);
        assert!(it.heap.is_free(s.unwrap()));
    }

    #[test]
    fn test_bind_refuses_to_overwrite_in_local_frames() {
        let mut it = interp();
        let g = it.global();
        let local = it.frames.new_frame_below(g);
        let local2 = it.frames.new_frame_below(local);
        let sym = it.heap.intern_symbol("p").unwrap();
        let one = Some(it.heap.integer(1).unwrap());
        let two = Some(it.heap.integer(2).unwrap());
        it.bind(local2, sym, one);
        it.bind(local2, sym, two);
        // local2 is not the global frame nor a direct child of it.
        assert_eq!(it.frames.value_of(local2, "p"), one);
    }

    #[test]
    fn test_bind_replaces_in_global() {
        let mut it = interp();
        let g = it.global();
        let sym = it.heap.intern_symbol("x").unwrap();
        let one = Some(it.heap.integer(1).unwrap());
        let two = Some(it.heap.integer(2).unwrap());
        it.bind(g, sym, one);
        it.bind(g, sym, two);
        assert_eq!(it.frames.value_of(g, "x"), two);
    }

    #[test]
    fn test_rebind_only_touches_existing_bindings() {
        let mut it = interp();
        let g = it.global();
        let local = it.frames.new_frame_below(g);
        let sym = it.heap.intern_symbol("y").unwrap();
        let one = Some(it.heap.integer(1).unwrap());
        it.rebind(local, sym, one);
        assert_eq!(it.frames.value_of(local, "y"), None);
        it.bind(local, sym, one);
        let two = Some(it.heap.integer(2).unwrap());
        it.rebind(local, sym, two);
        assert_eq!(it.frames.value_of(local, "y"), two);
    }

    #[test]
    fn test_frame_teardown_releases_bindings() {
        let mut it = interp();
        let g = it.global();
        let before = it.heap.cells_remaining();
        let local = it.frames.new_frame_below(g);
        let sym = it.heap.intern_symbol("s").unwrap();
        let val = Some(it.heap.string("owned".to_string()).unwrap());
        it.bind(local, sym, val);
        it.go_out_of_scope(local);
        assert!(!it.frames.is_live(local));
        assert_eq!(it.heap.cells_remaining(), before);
    }

    #[test]
    fn test_closure_pins_its_frame() {
        let mut it = interp();
        let g = it.global();
        let local = it.frames.new_frame_below(g);
        let func = it.make_function("anonymous", None, None, local).unwrap();
        it.go_out_of_scope(local);
        // Out of scope but pinned by the closure.
        assert!(it.frames.is_live(local));
        it.release(func);
        assert!(!it.frames.is_live(local));
    }

    #[test]
    fn test_scope_exit_keeping_preserves_bound_result() {
        let mut it = interp();
        let g = it.global();
        let local = it.frames.new_frame_below(g);
        let sym = it.heap.intern_symbol("r").unwrap();
        let val = Some(it.heap.string("result".to_string()).unwrap());
        it.bind(local, sym, val);
        it.scope_exit_keeping(local, val);
        assert!(!it.frames.is_live(local));
        assert!(!it.heap.is_free(val.unwrap()));
        assert!(it.heap.unreferenced(val));
        it.release(val);
    }

    #[test]
    fn test_global_frame_is_never_destroyed() {
        let mut it = interp();
        let g = it.global();
        it.go_out_of_scope(g);
        assert!(it.frames.is_live(g));
    }
}
