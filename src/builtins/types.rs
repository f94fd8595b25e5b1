//! Type predicates: nil?, list?, symbol?, string?, integer?, unsigned?,
//! function?, macro?
//!
//! `function?` answers true for user functions and primitives alike.

use crate::env::FrameRef;
use crate::error::Error;
use crate::interp::Interpreter;
use crate::value::Value;

fn nil_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let thing = interp.heap.car(args);
    Ok(interp.heap.boolean(thing.is_none()))
}

fn listp_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let v = interp.heap.is_list(interp.heap.car(args));
    Ok(interp.heap.boolean(v))
}

fn symbolp_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let v = interp.heap.is_symbol(interp.heap.car(args));
    Ok(interp.heap.boolean(v))
}

fn stringp_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let v = interp.heap.is_string(interp.heap.car(args));
    Ok(interp.heap.boolean(v))
}

fn integerp_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let v = interp.heap.is_integer(interp.heap.car(args));
    Ok(interp.heap.boolean(v))
}

fn unsignedp_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let v = interp.heap.is_unsigned(interp.heap.car(args));
    Ok(interp.heap.boolean(v))
}

fn functionp_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let v = interp.heap.is_function(interp.heap.car(args));
    Ok(interp.heap.boolean(v))
}

fn macrop_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let v = interp.heap.is_macro(interp.heap.car(args));
    Ok(interp.heap.boolean(v))
}

pub fn register(interp: &mut Interpreter) -> Result<(), Error> {
    interp.register_primitive("nil?", 1, nil_impl)?;
    interp.register_primitive("list?", 1, listp_impl)?;
    interp.register_primitive("symbol?", 1, symbolp_impl)?;
    interp.register_primitive("string?", 1, stringp_impl)?;
    interp.register_primitive("integer?", 1, integerp_impl)?;
    interp.register_primitive("unsigned?", 1, unsignedp_impl)?;
    interp.register_primitive("function?", 1, functionp_impl)?;
    interp.register_primitive("macro?", 1, macrop_impl)?;
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
    fn test_nil_predicate() {
        assert_eq!(eval("(nil? '())"), "#t");
        assert_eq!(eval("(nil? (cdr '(1)))"), "#t");
        assert_eq!(eval("(nil? '(1))"), "#f");
        assert_eq!(eval("(nil? 0)"), "#f");
    }

    #[test]
    fn test_list_predicate() {
        assert_eq!(eval("(list? '(1 2))"), "#t");
        assert_eq!(eval("(list? '())"), "#t");
        assert_eq!(eval("(list? 1)"), "#f");
    }

    #[test]
    fn test_atom_predicates() {
        assert_eq!(eval("(symbol? 'x)"), "#t");
        assert_eq!(eval("(symbol? \"x\")"), "#f");
        assert_eq!(eval("(string? \"x\")"), "#t");
        assert_eq!(eval("(integer? 1)"), "#t");
        assert_eq!(eval("(integer? #x01)"), "#f");
        assert_eq!(eval("(unsigned? #x01)"), "#t");
        assert_eq!(eval("(unsigned? 1)"), "#f");
    }

    #[test]
    fn test_function_predicate_covers_primitives() {
        assert_eq!(eval("(function? car)"), "#t");
        assert_eq!(eval("(define (f x) x) (function? f)"), "#t");
        assert_eq!(eval("(function? 1)"), "#f");
    }

    #[test]
    fn test_macro_predicate() {
        assert_eq!(
            eval("(defmacro (m x) `(+ ,x 1)) (macro? m)"),
            "#t"
        );
        assert_eq!(eval("(macro? car)"), "#f");
    }
}
