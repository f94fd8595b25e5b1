//! Conversions between the two integer flavors

use crate::env::FrameRef;
use crate::error::Error;
use crate::interp::Interpreter;
use crate::value::Value;

fn integer_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let arg = interp.heap.car(args);
    if !interp.heap.is_numeric(arg) {
        return Err(Error::type_error(
            "Conversion to integer requires an (unsigned) integer operand",
        ));
    }
    let v = interp.heap.integer_value(arg);
    Ok(Some(interp.heap.integer(v)?))
}

fn unsigned_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    let arg = interp.heap.car(args);
    if !interp.heap.is_numeric(arg) {
        return Err(Error::type_error(
            "Conversion to unsigned integer requires an (unsigned) integer operand",
        ));
    }
    let v = interp.heap.unsigned_value(arg);
    Ok(Some(interp.heap.unsigned(v)?))
}

pub fn register(interp: &mut Interpreter) -> Result<(), Error> {
    interp.register_primitive("integer", 1, integer_impl)?;
    interp.register_primitive("unsigned", 1, unsigned_impl)?;
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
    fn test_integer_conversion() {
        assert_eq!(eval("(integer #x0000002a)"), "42");
        assert_eq!(eval("(integer 42)"), "42");
        assert_eq!(eval("(integer #xffffffff)"), "-1");
    }

    #[test]
    fn test_unsigned_conversion() {
        assert_eq!(eval("(unsigned 255)"), "#x000000ff");
        assert_eq!(eval("(unsigned -1)"), "#xffffffff");
        assert_eq!(eval("(unsigned #x10)"), "#x00000010");
    }

    #[test]
    fn test_conversion_rejects_non_numbers() {
        let mut it = Interpreter::new().expect("interpreter");
        assert!(it.parse_and_eval_all("(integer \"5\")").is_err());
        assert!(it.parse_and_eval_all("(unsigned #t)").is_err());
    }
}
