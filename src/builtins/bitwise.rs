//! Bitwise operations on unsigned 32-bit values
//!
//! Operands may be signed or unsigned integers; the result is always
//! unsigned. Shift counts are masked to the word width.

use crate::env::FrameRef;
use crate::error::Error;
use crate::interp::Interpreter;
use crate::value::Value;

fn binary_operands(
    interp: &Interpreter,
    args: Value,
    what: &str,
) -> Result<(u32, u32), Error> {
    let a = interp.heap.car(args);
    let b = interp.heap.car(interp.heap.cdr(args));
    if !interp.heap.is_numeric(a) || !interp.heap.is_numeric(b) {
        return Err(Error::type_error(format!(
            "{what} requires (unsigned) integer operands"
        )));
    }
    Ok((interp.heap.unsigned_value(a), interp.heap.unsigned_value(b)))
}

fn binary_and_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let (a, b) = binary_operands(interp, args, "Binary and")?;
    Ok(Some(interp.heap.unsigned(a & b)?))
}

fn binary_or_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let (a, b) = binary_operands(interp, args, "Binary or")?;
    Ok(Some(interp.heap.unsigned(a | b)?))
}

fn binary_xor_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let (a, b) = binary_operands(interp, args, "Binary xor")?;
    Ok(Some(interp.heap.unsigned(a ^ b)?))
}

fn binary_not_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let arg = interp.heap.car(args);
    if !interp.heap.is_numeric(arg) {
        return Err(Error::type_error(
            "Binary not requires an (unsigned) integer operand",
        ));
    }
    let v = interp.heap.unsigned_value(arg);
    Ok(Some(interp.heap.unsigned(!v)?))
}

fn left_shift_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let (a, b) = binary_operands(interp, args, "Left shift")?;
    Ok(Some(interp.heap.unsigned(a.wrapping_shl(b))?))
}

fn right_shift_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let (a, b) = binary_operands(interp, args, "Right shift")?;
    Ok(Some(interp.heap.unsigned(a.wrapping_shr(b))?))
}

pub fn register(interp: &mut Interpreter) -> Result<(), Error> {
    interp.register_primitive("binary-and", 2, binary_and_impl)?;
    interp.register_primitive("binary-or", 2, binary_or_impl)?;
    interp.register_primitive("binary-not", 1, binary_not_impl)?;
    interp.register_primitive("binary-xor", 2, binary_xor_impl)?;
    interp.register_primitive("left-shift", 2, left_shift_impl)?;
    interp.register_primitive("right-shift", 2, right_shift_impl)?;
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
    fn test_and_or_xor() {
        assert_eq!(eval("(binary-and #xff #x0f)"), "#x0000000f");
        assert_eq!(eval("(binary-or #xf0 #x0f)"), "#x000000ff");
        assert_eq!(eval("(binary-xor #xff #x0f)"), "#x000000f0");
    }

    #[test]
    fn test_not() {
        assert_eq!(eval("(binary-not #x00000000)"), "#xffffffff");
    }

    #[test]
    fn test_shifts() {
        assert_eq!(eval("(left-shift #x01 4)"), "#x00000010");
        assert_eq!(eval("(right-shift #x10 4)"), "#x00000001");
    }

    #[test]
    fn test_signed_operands_are_accepted() {
        assert_eq!(eval("(binary-and 255 15)"), "#x0000000f");
    }

    #[test]
    fn test_type_errors() {
        let mut it = Interpreter::new().expect("interpreter");
        assert!(it.parse_and_eval_all("(binary-and #t 1)").is_err());
    }
}
