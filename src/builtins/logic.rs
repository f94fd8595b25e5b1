//! Logical operations: and, or, not
//!
//! These operate through the dialect's boolean reading, under which only
//! `#t` is true. Arguments are already evaluated when these run, so
//! `and`/`or` fold without short-circuiting.

use crate::env::FrameRef;
use crate::error::Error;
use crate::interp::Interpreter;
use crate::value::Value;

fn and_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let mut acc = true;
    let mut cell = args;
    while cell.is_some() {
        acc = acc && interp.heap.boolean_value(interp.heap.car(cell));
        cell = interp.heap.cdr(cell);
    }
    Ok(interp.heap.boolean(acc))
}

fn or_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let mut acc = false;
    let mut cell = args;
    while cell.is_some() {
        acc = acc || interp.heap.boolean_value(interp.heap.car(cell));
        cell = interp.heap.cdr(cell);
    }
    Ok(interp.heap.boolean(acc))
}

fn not_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let v = interp.heap.boolean_value(interp.heap.car(args));
    Ok(interp.heap.boolean(!v))
}

pub fn register(interp: &mut Interpreter) -> Result<(), Error> {
    interp.register_primitive("and", -1, and_impl)?;
    interp.register_primitive("or", -1, or_impl)?;
    interp.register_primitive("not", 1, not_impl)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::interp::Interpreter;

    fn eval(src: &str) -> String {
        let mut it = Interpreter::new().expect("interpreter");
        let v = it
            .parse_and_eval_all(src)
            .unwrap_or_else(|e| panic!("eval of {src:?} failed: {e}"));
        it.heap.to_string(v)
    }

    #[test]
    fn test_and() {
        assert_eq!(eval("(and)"), "#t");
        assert_eq!(eval("(and #t #t)"), "#t");
        assert_eq!(eval("(and #t #f)"), "#f");
    }

    #[test]
    fn test_or() {
        assert_eq!(eval("(or)"), "#f");
        assert_eq!(eval("(or #f #t)"), "#t");
        assert_eq!(eval("(or #f #f)"), "#f");
    }

    #[test]
    fn test_not() {
        assert_eq!(eval("(not #t)"), "#f");
        assert_eq!(eval("(not #f)"), "#t");
        // Non-booleans read as false.
        assert_eq!(eval("(not 1)"), "#t");
    }
}
