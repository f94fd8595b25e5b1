//! Equality and ordering: eq?, neq?, <, <=, >, >=
//!
//! `eq?`/`neq?` use structural equality. The orderings take exactly two
//! numeric arguments and compare as signed when either operand is signed,
//! otherwise as unsigned.

use crate::env::FrameRef;
use crate::error::Error;
use crate::interp::Interpreter;
use crate::value::Value;

fn eq_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let a = interp.heap.car(args);
    let b = interp.heap.car(interp.heap.cdr(args));
    Ok(interp.heap.boolean(interp.heap.is_equal(a, b)))
}

fn neq_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let a = interp.heap.car(args);
    let b = interp.heap.car(interp.heap.cdr(args));
    Ok(interp.heap.boolean(!interp.heap.is_equal(a, b)))
}

fn relative_operands(interp: &Interpreter, args: Value) -> Result<(Value, Value), Error> {
    let a = interp.heap.car(args);
    let b = interp.heap.car(interp.heap.cdr(args));
    if !interp.heap.is_numeric(a) || !interp.heap.is_numeric(b) {
        return Err(Error::type_error(
            "Relative predicates require numeric arguments",
        ));
    }
    Ok((a, b))
}

/// Compares as signed if either operand is signed, else as unsigned.
fn compare(
    interp: &mut Interpreter,
    args: Value,
    signed: fn(i32, i32) -> bool,
    unsigned: fn(u32, u32) -> bool,
) -> Result<Value, Error> {
    let (a, b) = relative_operands(interp, args)?;
    let result = if interp.heap.is_integer(a) || interp.heap.is_integer(b) {
        signed(interp.heap.integer_value(a), interp.heap.integer_value(b))
    } else {
        unsigned(interp.heap.unsigned_value(a), interp.heap.unsigned_value(b))
    };
    Ok(interp.heap.boolean(result))
}

fn lt_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    compare(interp, args, |a, b| a < b, |a, b| a < b)
}

fn lte_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    compare(interp, args, |a, b| a <= b, |a, b| a <= b)
}

fn gt_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    compare(interp, args, |a, b| a > b, |a, b| a > b)
}

fn gte_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    compare(interp, args, |a, b| a >= b, |a, b| a >= b)
}

pub fn register(interp: &mut Interpreter) -> Result<(), Error> {
    interp.register_primitive("eq?", 2, eq_impl)?;
    interp.register_primitive("neq?", 2, neq_impl)?;
    interp.register_primitive("<", 2, lt_impl)?;
    interp.register_primitive("<=", 2, lte_impl)?;
    interp.register_primitive(">", 2, gt_impl)?;
    interp.register_primitive(">=", 2, gte_impl)?;
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
    fn test_eq_on_atoms() {
        assert_eq!(eval("(eq? 1 1)"), "#t");
        assert_eq!(eval("(eq? 1 2)"), "#f");
        assert_eq!(eval("(eq? \"a\" \"a\")"), "#t");
        assert_eq!(eval("(eq? 'x 'x)"), "#t");
        assert_eq!(eval("(eq? 1 \"1\")"), "#f");
    }

    #[test]
    fn test_eq_is_structural_on_lists() {
        assert_eq!(eval("(eq? '(1 2 3) (list 1 2 3))"), "#t");
        assert_eq!(eval("(eq? '(1 2) '(1 2 3))"), "#f");
        assert_eq!(eval("(eq? '() '())"), "#t");
    }

    #[test]
    fn test_neq() {
        assert_eq!(eval("(neq? 1 2)"), "#t");
        assert_eq!(eval("(neq? 1 1)"), "#f");
    }

    #[test]
    fn test_signed_ordering() {
        assert_eq!(eval("(< 1 2)"), "#t");
        assert_eq!(eval("(<= 2 2)"), "#t");
        assert_eq!(eval("(> -1 1)"), "#f");
        assert_eq!(eval("(>= 3 4)"), "#f");
    }

    #[test]
    fn test_mixed_signedness_compares_as_signed() {
        // #xffffffff as signed is -1.
        assert_eq!(eval("(< #xffffffff 0)"), "#t");
        // Both unsigned compares as unsigned.
        assert_eq!(eval("(> #xffffffff #x00000000)"), "#t");
    }

    #[test]
    fn test_ordering_requires_numbers() {
        let mut it = Interpreter::new().expect("interpreter");
        assert!(it.parse_and_eval_all("(< \"a\" \"b\")").is_err());
    }
}
