//! List constructors and accessors
//!
//! `cons`/`car`/`cdr`, every composed accessor from `caar` to `cddddr`,
//! positional `first`..`tenth`, slicing via `list-ref`/`list-head`/
//! `list-tail`, and concatenation via `append` (fresh spine) and
//! `append!` (destructive splice).

use crate::env::FrameRef;
use crate::error::Error;
use crate::interp::Interpreter;
use crate::value::Value;
use paste::paste;

fn list_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let mut items = Vec::new();
    let mut cell = args;
    while cell.is_some() {
        items.push(interp.heap.car(cell));
        cell = interp.heap.cdr(cell);
    }
    interp.heap.list(&items)
}

fn cons_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let car = interp.heap.car(args);
    let cdr = interp.heap.car(interp.heap.cdr(args));
    Ok(Some(interp.heap.cons(car, cdr)?))
}

fn car_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    Ok(interp.heap.car(interp.heap.car(args)))
}

fn cdr_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    Ok(interp.heap.cdr(interp.heap.car(args)))
}

/// Applies a string of `a`/`d` steps, innermost first: `cadr` walks `d`
/// then `a`.
fn walk_list(interp: &Interpreter, l: Value, ops: &str) -> Result<Value, Error> {
    if !interp.heap.is_list(l) {
        return Err(Error::type_error("List access functions require a list operand"));
    }
    let mut current = l;
    for op in ops.chars().rev() {
        current = if op == 'a' {
            interp.heap.car(current)
        } else {
            interp.heap.cdr(current)
        };
    }
    Ok(current)
}

/// Generates one `_impl` per composed accessor plus a table used by
/// `register`; the walk string is the name minus its `c`/`r` shell.
macro_rules! composed_accessors {
    ($($name:ident),+ $(,)?) => {
        paste! {
            $(
                fn [<$name _impl>](
                    interp: &mut Interpreter,
                    args: Value,
                    _env: FrameRef,
                ) -> Result<Value, Error> {
                    let name = stringify!($name);
                    let l = interp.heap.car(args);
                    walk_list(interp, l, &name[1..name.len() - 1])
                }
            )+

            const COMPOSED_ACCESSORS: &[(&str, crate::value::PrimFn)] = &[
                $((stringify!($name), [<$name _impl>])),+
            ];
        }
    };
}

composed_accessors!(
    caar, cadr, cdar, cddr,
    caaar, caadr, cadar, caddr, cdaar, cdadr, cddar, cdddr,
    caaaar, caaadr, caadar, caaddr, cadaar, cadadr, caddar, cadddr,
    cdaaar, cdaadr, cdadar, cdaddr, cddaar, cddadr, cdddar, cddddr,
);

/// Zero-indexed positional access with bounds checking.
fn nth(interp: &Interpreter, l: Value, n: i32) -> Result<Value, Error> {
    if !interp.heap.is_list(l) {
        return Err(Error::domain("An initial list is required"));
    }
    if n < 0 {
        return Err(Error::domain("A non-negative index is required"));
    }
    if n as usize >= interp.heap.length_of(l) {
        return Err(Error::domain("Index out of bounds"));
    }
    let mut current = l;
    for _ in 0..n {
        current = interp.heap.cdr(current);
    }
    Ok(interp.heap.car(current))
}

fn listref_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let index = interp.heap.car(interp.heap.cdr(args));
    if !interp.heap.is_integer(index) {
        return Err(Error::type_error("list-ref requires an integer index"));
    }
    let n = interp.heap.integer_value(index);
    nth(interp, interp.heap.car(args), n)
}

/// Generates the 1-indexed positional accessors.
macro_rules! positional_accessors {
    ($(($name:ident, $index:literal)),+ $(,)?) => {
        paste! {
            $(
                fn [<$name _impl>](
                    interp: &mut Interpreter,
                    args: Value,
                    _env: FrameRef,
                ) -> Result<Value, Error> {
                    nth(interp, interp.heap.car(args), $index)
                }
            )+

            const POSITIONAL_ACCESSORS: &[(&str, crate::value::PrimFn)] = &[
                $((stringify!($name), [<$name _impl>])),+
            ];
        }
    };
}

positional_accessors!(
    (first, 0),
    (second, 1),
    (third, 2),
    (fourth, 3),
    (fifth, 4),
    (sixth, 5),
    (seventh, 6),
    (eigth, 7),
    (ninth, 8),
    (tenth, 9),
);

fn check_list_and_count(interp: &Interpreter, l: Value, c: Value) -> Result<usize, Error> {
    if !interp.heap.is_list(l) {
        return Err(Error::type_error("list-head/tail requires an initial list"));
    }
    if !interp.heap.is_integer(c) {
        return Err(Error::type_error("list-head/tail requires an integer count"));
    }
    let k = interp.heap.integer_value(c);
    if k < 0 {
        return Err(Error::domain("list-head/tail requires a non-negative count"));
    }
    if k as usize > interp.heap.length_of(l) {
        return Err(Error::domain("list-head/tail's count is out of bounds"));
    }
    Ok(k as usize)
}

/// The first `k` elements as a fresh list.
fn listhead_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let l = interp.heap.car(args);
    let k = check_list_and_count(interp, l, interp.heap.car(interp.heap.cdr(args)))?;
    let mut items = Vec::with_capacity(k);
    let mut current = l;
    for _ in 0..k {
        items.push(interp.heap.car(current));
        current = interp.heap.cdr(current);
    }
    interp.heap.list(&items)
}

/// The shared suffix after dropping `k` elements.
fn listtail_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let l = interp.heap.car(args);
    let k = check_list_and_count(interp, l, interp.heap.car(interp.heap.cdr(args)))?;
    let mut current = l;
    for _ in 0..k {
        current = interp.heap.cdr(current);
    }
    Ok(current)
}

/// Builds a new list from the elements of every argument but the last;
/// the last argument becomes the tail verbatim.
fn append_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    match interp.heap.length_of(args) {
        0 => Ok(None),
        1 => Ok(interp.heap.car(args)),
        n => {
            let mut items = Vec::new();
            let mut arglist = args;
            for _ in 1..n {
                let mut arg = interp.heap.car(arglist);
                while arg.is_some() {
                    items.push(interp.heap.car(arg));
                    arg = interp.heap.cdr(arg);
                }
                arglist = interp.heap.cdr(arglist);
            }
            let tail = interp.heap.car(arglist);
            interp.heap.list_with_tail(&items, tail)
        }
    }
}

/// Destructive concatenation: the final cell of each non-empty argument
/// is rewired to the next argument's head, left to right. The splice
/// point takes ownership of the spliced list.
fn appendbang_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    if args.is_none() {
        return Ok(None);
    }
    let result = interp.heap.car(args);
    let mut last_list = result;
    let mut arglist = interp.heap.cdr(args);
    while arglist.is_some() {
        let next = interp.heap.car(arglist);
        if next.is_some() {
            let last = interp.heap.last_cell(last_list);
            if let Some(cell) = last {
                interp.heap.retain(next);
                interp.heap.set_cdr(cell, next);
            }
            last_list = next;
        }
        arglist = interp.heap.cdr(arglist);
    }
    Ok(result)
}

pub fn register(interp: &mut Interpreter) -> Result<(), Error> {
    interp.register_primitive("list", -1, list_impl)?;
    interp.register_primitive("cons", 2, cons_impl)?;
    interp.register_primitive("car", 1, car_impl)?;
    interp.register_primitive("cdr", 1, cdr_impl)?;
    for (name, imp) in COMPOSED_ACCESSORS {
        interp.register_primitive(name, 1, *imp)?;
    }
    interp.register_primitive("list-ref", 2, listref_impl)?;
    for (name, imp) in POSITIONAL_ACCESSORS {
        interp.register_primitive(name, 1, *imp)?;
    }
    interp.register_primitive("list-head", 2, listhead_impl)?;
    interp.register_primitive("list-tail", 2, listtail_impl)?;
    interp.register_primitive("append", -1, append_impl)?;
    interp.register_primitive("append!", -1, appendbang_impl)?;
    Ok(())
}
