//! # Primitive functions
//!
//! The built-in, non-special-form primitives, organized by category. Each
//! sub-module exposes a `register` function that binds its primitives in
//! the global environment:
//!
//! - **[arithmetic]**: `+ - * / % abs zero?`
//! - **[logic]**: `and or not`
//! - **[bitwise]**: `binary-and binary-or binary-xor binary-not left-shift right-shift`
//! - **[conversion]**: `integer unsigned`
//! - **[lists]**: constructors, accessors to depth 4, positional
//!   `first`..`tenth`, slicing, `append`/`append!`
//! - **[comparison]**: `eq? neq? < <= > >=`
//! - **[types]**: the type predicates
//! - **[reflection]**: `definition heap-size free-size`
//!
//! All of these receive their arguments already evaluated; the special
//! forms live in `special_forms`.

use crate::error::Error;
use crate::interp::Interpreter;

pub mod arithmetic;
pub mod bitwise;
pub mod comparison;
pub mod conversion;
pub mod lists;
pub mod logic;
pub mod reflection;
pub mod types;

/// Registers every primitive category in the global environment.
pub fn register_primitives(interp: &mut Interpreter) -> Result<(), Error> {
    arithmetic::register(interp)?;
    logic::register(interp)?;
    bitwise::register(interp)?;
    conversion::register(interp)?;
    lists::register(interp)?;
    comparison::register(interp)?;
    types::register(interp)?;
    reflection::register(interp)?;
    Ok(())
}
