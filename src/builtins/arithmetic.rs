//! Arithmetic operations: +, -, *, /, %, abs, zero?
//!
//! Signed 32-bit arithmetic with wrapping overflow. Variadic where the
//! operation folds naturally:
//!
//! - `+`: sum of all arguments (identity: 0)
//! - `*`: product of all arguments (identity: 1)
//! - `-`: no args → 0, one arg → negation, otherwise a left fold
//! - `/`: left-fold integer division, at least 2 arguments required

use crate::env::FrameRef;
use crate::error::Error;
use crate::interp::Interpreter;
use crate::value::Value;

/// Folds the integer arguments with `op`, starting from `identity`.
fn fold_integers(
    interp: &Interpreter,
    args: Value,
    identity: i32,
    what: &str,
    op: fn(i32, i32) -> i32,
) -> Result<i32, Error> {
    let mut acc = identity;
    let mut cell = args;
    while cell.is_some() {
        let arg = interp.heap.car(cell);
        if !interp.heap.is_integer(arg) {
            return Err(Error::type_error(format!("{what} requires integer operands")));
        }
        acc = op(acc, interp.heap.integer_value(arg));
        cell = interp.heap.cdr(cell);
    }
    Ok(acc)
}

fn add_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let acc = fold_integers(interp, args, 0, "Add", i32::wrapping_add)?;
    Ok(Some(interp.heap.integer(acc)?))
}

fn multiply_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let acc = fold_integers(interp, args, 1, "Multiply", i32::wrapping_mul)?;
    Ok(Some(interp.heap.integer(acc)?))
}

fn subtract_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    match interp.heap.length_of(args) {
        0 => Ok(Some(interp.heap.integer(0)?)),
        1 => {
            let first = interp.heap.car(args);
            if !interp.heap.is_integer(first) {
                return Err(Error::type_error("Subtract requires integer operands"));
            }
            let negated = interp.heap.integer_value(first).wrapping_neg();
            Ok(Some(interp.heap.integer(negated)?))
        }
        _ => {
            let first = interp.heap.car(args);
            if !interp.heap.is_integer(first) {
                return Err(Error::type_error("Subtract requires integer operands"));
            }
            let start = interp.heap.integer_value(first);
            let rest = interp.heap.cdr(args);
            let acc = fold_integers(interp, rest, start, "Subtract", i32::wrapping_sub)?;
            Ok(Some(interp.heap.integer(acc)?))
        }
    }
}

fn divide_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    if interp.heap.length_of(args) < 2 {
        return Err(Error::domain("Divide requires at least 2 operands."));
    }
    let first = interp.heap.car(args);
    if !interp.heap.is_integer(first) {
        return Err(Error::type_error("Divide requires integer operands"));
    }
    let mut acc = interp.heap.integer_value(first);
    let mut cell = interp.heap.cdr(args);
    while cell.is_some() {
        let arg = interp.heap.car(cell);
        if !interp.heap.is_integer(arg) {
            return Err(Error::type_error("Divide requires integer operands"));
        }
        let divisor = interp.heap.integer_value(arg);
        if divisor == 0 {
            return Err(Error::domain("Division by zero"));
        }
        acc = acc.wrapping_div(divisor);
        cell = interp.heap.cdr(cell);
    }
    Ok(Some(interp.heap.integer(acc)?))
}

fn modulus_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let a = interp.heap.car(args);
    let b = interp.heap.car(interp.heap.cdr(args));
    if !interp.heap.is_integer(a) || !interp.heap.is_integer(b) {
        return Err(Error::type_error("Modulus requires integer operands"));
    }
    let divisor = interp.heap.integer_value(b);
    if divisor == 0 {
        return Err(Error::domain("Division by zero"));
    }
    let rem = interp.heap.integer_value(a).wrapping_rem(divisor);
    Ok(Some(interp.heap.integer(rem)?))
}

fn abs_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let arg = interp.heap.car(args);
    if !interp.heap.is_integer(arg) {
        return Err(Error::type_error("abs requires an integer operand"));
    }
    let v = interp.heap.integer_value(arg).wrapping_abs();
    Ok(Some(interp.heap.integer(v)?))
}

fn zero_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let arg = interp.heap.car(args);
    if !interp.heap.is_numeric(arg) {
        return Err(Error::type_error("zero? requires an (unsigned) integer operand"));
    }
    Ok(interp.heap.boolean(interp.heap.integer_value(arg) == 0))
}

pub fn register(interp: &mut Interpreter) -> Result<(), Error> {
    interp.register_primitive("+", -1, add_impl)?;
    interp.register_primitive("*", -1, multiply_impl)?;
    interp.register_primitive("-", -1, subtract_impl)?;
    interp.register_primitive("/", -1, divide_impl)?;
    interp.register_primitive("%", 2, modulus_impl)?;
    interp.register_primitive("abs", 1, abs_impl)?;
    interp.register_primitive("zero?", 1, zero_impl)?;
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

    fn eval_err(src: &str) -> String {
        let mut it = Interpreter::new().expect("interpreter");
        it.parse_and_eval_all(src).unwrap_err().to_string()
    }

    #[test]
    fn test_add() {
        assert_eq!(eval("(+)"), "0");
        assert_eq!(eval("(+ 5)"), "5");
        assert_eq!(eval("(+ 1 2 3)"), "6");
    }

    #[test]
    fn test_multiply() {
        assert_eq!(eval("(*)"), "1");
        assert_eq!(eval("(* 2 3 4)"), "24");
    }

    #[test]
    fn test_subtract_short_cases() {
        assert_eq!(eval("(-)"), "0");
        assert_eq!(eval("(- 5)"), "-5");
        assert_eq!(eval("(- 10 1 2 3)"), "4");
    }

    #[test]
    fn test_divide() {
        assert_eq!(eval("(/ 20 4)"), "5");
        assert_eq!(eval("(/ 100 2 5)"), "10");
        assert_eq!(eval("(/ 7 2)"), "3");
        assert_eq!(eval_err("(/)"), "Divide requires at least 2 operands.");
        assert_eq!(eval_err("(/ 5)"), "Divide requires at least 2 operands.");
        assert_eq!(eval_err("(/ 5 0)"), "Division by zero");
    }

    #[test]
    fn test_modulus() {
        assert_eq!(eval("(% 17 5)"), "2");
        assert_eq!(eval_err("(% 1 0)"), "Division by zero");
        assert!(eval_err("(% 1)").contains("Wrong number of arguments"));
    }

    #[test]
    fn test_abs() {
        assert_eq!(eval("(abs -9)"), "9");
        assert_eq!(eval("(abs 9)"), "9");
    }

    #[test]
    fn test_zero_predicate() {
        assert_eq!(eval("(zero? 0)"), "#t");
        assert_eq!(eval("(zero? 3)"), "#f");
        assert_eq!(eval("(zero? (unsigned 0))"), "#t");
    }

    #[test]
    fn test_type_errors() {
        assert_eq!(eval_err("(+ 1 \"x\")"), "Add requires integer operands");
        assert_eq!(eval_err("(* #t)"), "Multiply requires integer operands");
    }
}
