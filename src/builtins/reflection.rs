//! Reflection: definition, heap-size, free-size

use crate::env::FrameRef;
use crate::error::Error;
use crate::interp::Interpreter;
use crate::value::{Tag, Value};

/// Returns the printed body of a user function or macro.
fn definition_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let thing = interp.heap.car(args);
    match (interp.heap.tag(thing), thing) {
        (Some(Tag::Function) | Some(Tag::Macro), Some(r)) => {
            let body = interp.heap.closure(r).map(|c| c.body);
            let printed = interp.heap.to_string(body.unwrap_or(None));
            Ok(Some(interp.heap.string(printed)?))
        }
        _ => Err(Error::type_error("definition requires a function or macro.")),
    }
}

fn heap_size_impl(interp: &mut Interpreter, _args: Value, _env: FrameRef) -> Result<Value, Error> {
    let total = interp.heap.total_cells() as i32;
    Ok(Some(interp.heap.integer(total)?))
}

fn free_size_impl(interp: &mut Interpreter, _args: Value, _env: FrameRef) -> Result<Value, Error> {
    let free = interp.heap.cells_remaining() as i32;
    Ok(Some(interp.heap.integer(free)?))
}

pub fn register(interp: &mut Interpreter) -> Result<(), Error> {
    interp.register_primitive("definition", 1, definition_impl)?;
    interp.register_primitive("heap-size", 0, heap_size_impl)?;
    interp.register_primitive("free-size", 0, free_size_impl)?;
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
    fn test_definition_prints_the_body() {
        assert_eq!(
            eval("(define (inc n) (+ n 1)) (definition inc)"),
            "\"((+ n 1))\""
        );
    }

    #[test]
    fn test_definition_rejects_primitives() {
        let mut it = Interpreter::new().expect("interpreter");
        assert!(it.parse_and_eval_all("(definition car)").is_err());
        assert!(it.parse_and_eval_all("(definition 1)").is_err());
    }

    #[test]
    fn test_heap_and_free_size() {
        let mut it = Interpreter::new().expect("interpreter");
        let total = it.heap.total_cells();
        let v = it.parse_and_eval_all("(heap-size)").expect("eval");
        assert_eq!(it.heap.integer_value(v), total as i32);
        let v = it.parse_and_eval_all("(free-size)").expect("eval");
        assert!(it.heap.integer_value(v) > 0);
        assert!((it.heap.integer_value(v) as usize) < total);
    }
}
