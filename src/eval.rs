// ABOUTME: Evaluator: dispatch over value shape, function/macro/primitive application

use crate::env::FrameRef;
use crate::error::Error;
use crate::interp::Interpreter;
use crate::value::{CellRef, Tag, Value};

/// Evaluates one expression. Atoms other than symbols are
/// self-evaluating; symbols look up their binding (absence is the empty
/// reference at this layer); a cons applies its head.
pub fn evaluate(interp: &mut Interpreter, expr: Value, env: FrameRef) -> Result<Value, Error> {
    let Some(r) = expr else { return Ok(None) };
    match interp.heap.tag(expr) {
        Some(Tag::Free) => Ok(None),
        Some(Tag::Symbol) => {
            let name = interp.heap.string_value(Some(r));
            Ok(interp.frames.value_of(env, name))
        }
        Some(Tag::Cons) => evaluate_application(interp, expr, env),
        // Int, UInt, Bool, Str, Function, Macro, Primitive.
        _ => Ok(expr),
    }
}

/// Resolves the head of an application and dispatches on the callable's
/// tag. A symbol head resolves by name lookup only; a list head is
/// evaluated recursively, which is what lets an inline `(lambda …)` or a
/// closure-returning `let` sit in applicable position.
fn evaluate_application(
    interp: &mut Interpreter,
    expr: Value,
    env: FrameRef,
) -> Result<Value, Error> {
    let head = interp.heap.car(expr);
    let callable = match interp.heap.tag(head) {
        Some(Tag::Symbol) => {
            let name = interp.heap.string_value(head);
            match interp.frames.value_of(env, name) {
                Some(c) => Some(c),
                None => return Err(Error::Unbound(name.to_string())),
            }
        }
        Some(Tag::Cons) => evaluate(interp, head, env)?,
        _ => return Err(Error::Unbound(interp.heap.to_string(head))),
    };
    let Some(c) = callable else {
        return Err(Error::Unbound(interp.heap.to_string(head)));
    };

    let args = interp.heap.cdr(expr);
    let result = match interp.heap.tag(callable) {
        Some(Tag::Primitive) => apply_prim(interp, c, args, env),
        Some(Tag::Function) => apply_func(interp, c, args, env),
        Some(Tag::Macro) => apply_macro(interp, c, args, env),
        _ => Err(Error::type_error(
            "Function, special-form, or macro expected.",
        )),
    };

    // A callable produced by evaluating a list head is scratch unless
    // something owns it (e.g. it came out of a binding).
    match result {
        Ok(v) => {
            interp.release_transient_keeping(callable, v);
            Ok(v)
        }
        Err(e) => {
            interp.release_transient(callable);
            Err(e)
        }
    }
}

/// Evaluates each expression in order, reclaiming every unowned
/// intermediate, and returns the final value.
pub fn evaluate_each(
    interp: &mut Interpreter,
    exprs: Value,
    env: FrameRef,
) -> Result<Value, Error> {
    let mut result = None;
    let mut cell = exprs;
    while cell.is_some() {
        interp.release_transient(result);
        let expr = interp.heap.car(cell);
        result = evaluate(interp, expr, env)?;
        cell = interp.heap.cdr(cell);
    }
    Ok(result)
}

/// Evaluates each argument in the caller's environment and binds it to
/// the matching parameter symbol in `local`. Tears the frame down on any
/// error.
fn bind_arguments(
    interp: &mut Interpreter,
    params: Value,
    args: Value,
    env: FrameRef,
    local: FrameRef,
) -> Result<(), Error> {
    let mut arg_cell = args;
    let mut param_cell = params;
    while arg_cell.is_some() {
        let arg_expr = interp.heap.car(arg_cell);
        let value = match evaluate(interp, arg_expr, env) {
            Ok(v) => v,
            Err(e) => {
                interp.go_out_of_scope(local);
                return Err(e);
            }
        };
        if let Some(sym) = interp.heap.car(param_cell) {
            interp.bind(local, sym, value);
        }
        param_cell = interp.heap.cdr(param_cell);
        arg_cell = interp.heap.cdr(arg_cell);
    }
    Ok(())
}

/// Applies a user function: arity check, fresh frame below the captured
/// environment, arguments bound in lockstep, body evaluated as a
/// sequence in the local frame.
pub fn apply_func(
    interp: &mut Interpreter,
    func: CellRef,
    args: Value,
    env: FrameRef,
) -> Result<Value, Error> {
    let (name, params, body, fenv, arity) = {
        let c = interp
            .heap
            .closure(func)
            .ok_or_else(|| Error::type_error("Function expected."))?;
        (c.name.clone(), c.params, c.body, c.env, c.arity)
    };
    let got = interp.heap.length_of(args);
    if got != arity {
        return Err(Error::arity(&name, arity as i32, got));
    }

    let local = interp.frames.new_frame_below(fenv);
    bind_arguments(interp, params, args, env, local)?;

    let result = match evaluate_each(interp, body, local) {
        Ok(v) => v,
        Err(e) => {
            interp.go_out_of_scope(local);
            return Err(e);
        }
    };
    interp.scope_exit_keeping(local, result);
    Ok(result)
}

/// Produces a macro's expansion: arguments are evaluated in the caller's
/// environment and bound once each (the binding holds the sole new
/// reference), then the body is evaluated once in the local frame.
pub fn expand(
    interp: &mut Interpreter,
    mac: CellRef,
    args: Value,
    env: FrameRef,
) -> Result<Value, Error> {
    let (name, params, body, menv, arity) = {
        let c = interp
            .heap
            .closure(mac)
            .ok_or_else(|| Error::type_error("Macro expected."))?;
        (c.name.clone(), c.params, c.body, c.env, c.arity)
    };
    let got = interp.heap.length_of(args);
    if got != arity {
        return Err(Error::arity(&name, arity as i32, got));
    }

    let local = interp.frames.new_frame_below(menv);
    bind_arguments(interp, params, args, env, local)?;

    let expansion = match evaluate(interp, body, local) {
        Ok(v) => v,
        Err(e) => {
            interp.go_out_of_scope(local);
            return Err(e);
        }
    };
    interp.scope_exit_keeping(local, expansion);
    Ok(expansion)
}

/// Expansion followed by evaluation of the expansion in the caller's
/// environment.
pub fn apply_macro(
    interp: &mut Interpreter,
    mac: CellRef,
    args: Value,
    env: FrameRef,
) -> Result<Value, Error> {
    let expansion = expand(interp, mac, args, env)?;
    match evaluate(interp, expansion, env) {
        Ok(result) => {
            interp.release_transient_keeping(expansion, result);
            Ok(result)
        }
        Err(e) => {
            interp.release_transient(expansion);
            Err(e)
        }
    }
}

/// Applies a primitive. Special forms receive the raw argument list;
/// ordinary primitives receive a freshly constructed list of evaluated
/// arguments, reclaimed after the call.
pub fn apply_prim(
    interp: &mut Interpreter,
    prim: CellRef,
    args: Value,
    env: FrameRef,
) -> Result<Value, Error> {
    let p = interp
        .heap
        .primitive_value(prim)
        .ok_or_else(|| Error::type_error("Primitive expected."))?
        .clone();
    let got = interp.heap.length_of(args);
    if p.arity >= 0 && got != p.arity as usize {
        return Err(Error::arity(p.name, p.arity, got));
    }

    if p.special_form {
        return (p.imp)(interp, args, env);
    }

    let mut values = Vec::with_capacity(got);
    let mut cell = args;
    while cell.is_some() {
        let arg_expr = interp.heap.car(cell);
        match evaluate(interp, arg_expr, env) {
            Ok(v) => values.push(v),
            Err(e) => {
                for v in values {
                    interp.release_transient(v);
                }
                return Err(e);
            }
        }
        cell = interp.heap.cdr(cell);
    }
    let arg_list = match interp.heap.list(&values) {
        Ok(l) => l,
        Err(e) => {
            for v in values {
                interp.release_transient(v);
            }
            return Err(e);
        }
    };

    match (p.imp)(interp, arg_list, env) {
        Ok(result) => {
            interp.release_keeping(arg_list, result);
            Ok(result)
        }
        Err(e) => {
            interp.release(arg_list);
            Err(e)
        }
    }
}
