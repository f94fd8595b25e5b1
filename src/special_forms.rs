// ABOUTME: Special form implementations: binding, control flow, quotation

use crate::env::FrameRef;
use crate::error::Error;
use crate::eval::{evaluate, evaluate_each, expand};
use crate::interp::Interpreter;
use crate::value::{Tag, Value};

fn lambda_impl(interp: &mut Interpreter, args: Value, env: FrameRef) -> Result<Value, Error> {
    let arg_names = interp.heap.car(args);
    let body = interp.heap.cdr(args);
    if !interp.heap.all_of_type(Tag::Symbol, arg_names) {
        return Err(Error::type_error("All argument names must be symbols"));
    }
    interp.make_function("anonymous", arg_names, body, env)
}

/// `(define name value)` binds a value; `(define (name params…) body…)`
/// is lambda sugar that keeps the name.
fn define_impl(interp: &mut Interpreter, args: Value, env: FrameRef) -> Result<Value, Error> {
    let declaration = interp.heap.car(args);
    match interp.heap.tag(declaration) {
        Some(Tag::Symbol) => {
            let value_expr = interp.heap.car(interp.heap.cdr(args));
            let value = evaluate(interp, value_expr, env)?;
            if let Some(sym) = declaration {
                interp.bind(env, sym, value);
            }
            Ok(value)
        }
        Some(Tag::Cons) => {
            let name_cell = interp.heap.car(declaration);
            if !interp.heap.is_symbol(name_cell) {
                return Err(Error::type_error("Function names must be symbols"));
            }
            let arg_names = interp.heap.cdr(declaration);
            if !interp.heap.all_of_type(Tag::Symbol, arg_names) {
                return Err(Error::type_error("All argument names must be symbols"));
            }
            let body = interp.heap.cdr(args);
            let name = interp.heap.string_value(name_cell).to_string();
            let func = interp.make_function(&name, arg_names, body, env)?;
            if let Some(sym) = name_cell {
                interp.bind(env, sym, func);
            }
            Ok(func)
        }
        _ => Err(Error::type_error("Invalid definition")),
    }
}

/// `(defmacro (name params…) body)` binds a macro whose body is a single
/// expression that expands to code.
fn defmacro_impl(interp: &mut Interpreter, args: Value, env: FrameRef) -> Result<Value, Error> {
    let declaration = interp.heap.car(args);
    if interp.heap.tag(declaration) != Some(Tag::Cons) {
        return Err(Error::type_error("Invalid macro definition"));
    }
    let name_cell = interp.heap.car(declaration);
    if !interp.heap.is_symbol(name_cell) {
        return Err(Error::type_error("Macro name has to be a symbol"));
    }
    let params = interp.heap.cdr(declaration);
    if !interp.heap.all_of_type(Tag::Symbol, params) {
        return Err(Error::type_error("All argument names must be symbols"));
    }
    let body = interp.heap.car(interp.heap.cdr(args));
    let name = interp.heap.string_value(name_cell).to_string();
    let mac = interp.make_macro(&name, params, body, env)?;
    if let Some(sym) = name_cell {
        interp.bind(env, sym, mac);
    }
    Ok(mac)
}

/// Clauses are `(pred body…)`; the magic symbol `else` always matches.
fn cond_impl(interp: &mut Interpreter, args: Value, env: FrameRef) -> Result<Value, Error> {
    let mut clauses = args;
    while clauses.is_some() {
        let clause = interp.heap.car(clauses);
        let predicate = interp.heap.car(clause);
        let clause_body = interp.heap.cdr(clause);
        let is_else =
            interp.heap.is_symbol(predicate) && interp.heap.string_value(predicate) == "else";
        if is_else {
            return evaluate_each(interp, clause_body, env);
        }
        let predicate_value = evaluate(interp, predicate, env)?;
        let truthy = interp.heap.boolean_value(predicate_value);
        interp.release_transient(predicate_value);
        if truthy {
            return evaluate_each(interp, clause_body, env);
        }
        clauses = interp.heap.cdr(clauses);
    }
    Ok(None)
}

fn if_impl(interp: &mut Interpreter, args: Value, env: FrameRef) -> Result<Value, Error> {
    if interp.heap.length_of(args) > 3 {
        return Err(Error::type_error("if accepts up to 3 arguments"));
    }
    let condition_expr = interp.heap.car(args);
    let true_clause = interp.heap.car(interp.heap.cdr(args));
    let false_clause = interp.heap.car(interp.heap.cdr(interp.heap.cdr(args)));

    let condition = evaluate(interp, condition_expr, env)?;
    let truthy = interp.heap.boolean_value(condition);
    interp.release_transient(condition);

    let clause = if truthy { true_clause } else { false_clause };
    match clause {
        Some(_) => evaluate(interp, clause, env),
        None => Ok(None),
    }
}

/// Shared body of `let` and `let*`: the only difference is which frame
/// the binding values are evaluated in.
fn let_like(
    interp: &mut Interpreter,
    args: Value,
    env: FrameRef,
    sequential: bool,
    form: &str,
) -> Result<Value, Error> {
    let local = interp.frames.new_frame_below(env);
    let mut binding_cell = interp.heap.car(args);
    while binding_cell.is_some() {
        let binding = interp.heap.car(binding_cell);
        let name = interp.heap.car(binding);
        if !interp.heap.is_symbol(name) {
            interp.go_out_of_scope(local);
            return Err(Error::type_error(format!(
                "{form} requires symbols as binding names"
            )));
        }
        let value_expr = interp.heap.car(interp.heap.cdr(binding));
        let value_env = if sequential { local } else { env };
        let value = match evaluate(interp, value_expr, value_env) {
            Ok(v) => v,
            Err(e) => {
                interp.go_out_of_scope(local);
                return Err(e);
            }
        };
        if let Some(sym) = name {
            interp.bind(local, sym, value);
        }
        binding_cell = interp.heap.cdr(binding_cell);
    }

    let body = interp.heap.cdr(args);
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

fn let_impl(interp: &mut Interpreter, args: Value, env: FrameRef) -> Result<Value, Error> {
    let_like(interp, args, env, false, "let")
}

fn letstar_impl(interp: &mut Interpreter, args: Value, env: FrameRef) -> Result<Value, Error> {
    let_like(interp, args, env, true, "let*")
}

/// Every name is bound to the empty reference first, so the value
/// expressions can refer to any of them (self-reference included).
fn letrec_impl(interp: &mut Interpreter, args: Value, env: FrameRef) -> Result<Value, Error> {
    let local = interp.frames.new_frame_below(env);
    let bindings = interp.heap.car(args);

    let mut binding_cell = bindings;
    while binding_cell.is_some() {
        let binding = interp.heap.car(binding_cell);
        let name = interp.heap.car(binding);
        if !interp.heap.is_symbol(name) {
            interp.go_out_of_scope(local);
            return Err(Error::type_error(
                "letrec requires symbols as binding names",
            ));
        }
        if let Some(sym) = name {
            interp.bind(local, sym, None);
        }
        binding_cell = interp.heap.cdr(binding_cell);
    }

    let mut binding_cell = bindings;
    while binding_cell.is_some() {
        let binding = interp.heap.car(binding_cell);
        let name = interp.heap.car(binding);
        let value_expr = interp.heap.car(interp.heap.cdr(binding));
        let value = match evaluate(interp, value_expr, local) {
            Ok(v) => v,
            Err(e) => {
                interp.go_out_of_scope(local);
                return Err(e);
            }
        };
        if let Some(sym) = name {
            interp.rebind(local, sym, value);
        }
        binding_cell = interp.heap.cdr(binding_cell);
    }

    let body = interp.heap.cdr(args);
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

/// Mutates the nearest enclosing binding of the symbol.
fn set_impl(interp: &mut Interpreter, args: Value, env: FrameRef) -> Result<Value, Error> {
    let target = interp.heap.car(args);
    if !interp.heap.is_symbol(target) {
        return Err(Error::type_error(
            "set! requires a symbol as its first argument.",
        ));
    }
    let value_expr = interp.heap.car(interp.heap.cdr(args));
    let value = evaluate(interp, value_expr, env)?;
    let name = interp.heap.string_value(target).to_string();
    if let (Some(frame), Some(sym)) = (interp.frames.binding_frame(env, &name), target) {
        interp.rebind(frame, sym, value);
    }
    Ok(value)
}

fn quote_impl(interp: &mut Interpreter, args: Value, _env: FrameRef) -> Result<Value, Error> {
    Ok(interp.heap.car(args))
}

/// Walks a quasiquoted template, returning a list of "parts": ordinary
/// elements come back as single-element lists, a level-1 splicing form
/// contributes its value list directly, and the enclosing list is rebuilt
/// by flattening the concatenated parts one level.
fn process_quasiquoted(
    interp: &mut Interpreter,
    sexpr: Value,
    level: u32,
    env: FrameRef,
) -> Result<Value, Error> {
    if sexpr.is_none() || !interp.heap.is_list(sexpr) {
        return Ok(Some(interp.heap.cons(sexpr, None)?));
    }

    let head = interp.heap.car(sexpr);
    let head_name = if interp.heap.is_symbol(head) {
        interp.heap.string_value(head).to_string()
    } else {
        String::new()
    };
    let argument = interp.heap.car(interp.heap.cdr(sexpr));

    match head_name.as_str() {
        "quasiquote" => {
            let processed = process_quasiquoted(interp, argument, level + 1, env)?;
            rebuild_marked(interp, "quasiquote", processed)
        }
        "unquote" if level == 1 => {
            let processed = process_quasiquoted(interp, argument, level, env)?;
            let to_eval = interp.heap.car(processed);
            let result = match evaluate(interp, to_eval, env) {
                Ok(v) => v,
                Err(e) => {
                    interp.release(processed);
                    return Err(e);
                }
            };
            // Wrap first: once the wrapper owns the result, reclaiming
            // the processed scratch cannot take it down.
            match interp.heap.cons(result, None) {
                Ok(w) => {
                    interp.release(processed);
                    Ok(Some(w))
                }
                Err(e) => {
                    interp.release(processed);
                    Err(e)
                }
            }
        }
        "unquote" => {
            let processed = process_quasiquoted(interp, argument, level - 1, env)?;
            rebuild_marked(interp, "unquote", processed)
        }
        "unquote-splicing" if level == 1 => {
            let processed = process_quasiquoted(interp, argument, level, env)?;
            let to_eval = interp.heap.car(processed);
            match evaluate(interp, to_eval, env) {
                Ok(result) => {
                    interp.release_keeping(processed, result);
                    Ok(result)
                }
                Err(e) => {
                    interp.release(processed);
                    Err(e)
                }
            }
        }
        "unquote-splicing" => {
            let processed = process_quasiquoted(interp, argument, level - 1, env)?;
            rebuild_marked(interp, "unquote-splicing", processed)
        }
        _ => {
            let mut parts = Vec::new();
            let mut cell = sexpr;
            while cell.is_some() {
                let element = interp.heap.car(cell);
                match process_quasiquoted(interp, element, level, env) {
                    Ok(p) => parts.push(p),
                    Err(e) => {
                        for p in parts {
                            interp.release_transient(p);
                        }
                        return Err(e);
                    }
                }
                cell = interp.heap.cdr(cell);
            }
            let parts_list = interp.heap.list(&parts)?;
            let flat = interp.heap.flatten(parts_list)?;
            interp.release(parts_list);
            Ok(Some(interp.heap.cons(flat, None)?))
        }
    }
}

/// Reattaches a quotation marker to a processed parts list and wraps the
/// result as a single part, preserving the structure at other levels.
fn rebuild_marked(
    interp: &mut Interpreter,
    marker: &str,
    processed: Value,
) -> Result<Value, Error> {
    let sym = Some(interp.heap.intern_symbol(marker)?);
    let rebuilt = Some(interp.heap.cons(sym, processed)?);
    Ok(Some(interp.heap.cons(rebuilt, None)?))
}

fn quasiquote_impl(interp: &mut Interpreter, args: Value, env: FrameRef) -> Result<Value, Error> {
    let template = interp.heap.car(args);
    let parts = process_quasiquoted(interp, template, 1, env)?;
    let result = interp.heap.car(parts);
    interp.release_keeping(parts, result);
    Ok(result)
}

fn unquote_impl(_interp: &mut Interpreter, _args: Value, _env: FrameRef) -> Result<Value, Error> {
    Err(Error::domain(
        "unquote should not be used outside of a quasiquoted expression.",
    ))
}

fn unquote_splicing_impl(
    _interp: &mut Interpreter,
    _args: Value,
    _env: FrameRef,
) -> Result<Value, Error> {
    Err(Error::domain(
        "unquote-splicing should not be used outside of a quasiquoted expression.",
    ))
}

/// `(expand m args…)` evaluates `m`, requires a macro, and returns its
/// expansion on the remaining, unevaluated arguments.
fn expand_impl(interp: &mut Interpreter, args: Value, env: FrameRef) -> Result<Value, Error> {
    let macro_expr = interp.heap.car(args);
    let m = evaluate(interp, macro_expr, env)?;
    if !interp.heap.is_macro(m) {
        interp.release_transient(m);
        return Err(Error::type_error(
            "expand expects a macro as its first argument.",
        ));
    }
    let Some(mac) = m else {
        return Err(Error::type_error(
            "expand expects a macro as its first argument.",
        ));
    };
    let rest = interp.heap.cdr(args);
    match expand(interp, mac, rest, env) {
        Ok(result) => {
            interp.release_transient_keeping(m, result);
            Ok(result)
        }
        Err(e) => {
            interp.release_transient(m);
            Err(e)
        }
    }
}

/// `(do ((v init step)…) (test result…) body…)`: bind the inits in a
/// fresh frame, then loop test → body → steps until the test is truthy.
fn do_impl(interp: &mut Interpreter, args: Value, env: FrameRef) -> Result<Value, Error> {
    if interp.heap.length_of(args) < 2 {
        return Err(Error::domain(
            "do requires at least bindings and a termination clause.",
        ));
    }
    let bindings = interp.heap.car(args);
    if !interp.heap.is_list(bindings) {
        return Err(Error::type_error("do bindings must be a list."));
    }
    let termination = interp.heap.car(interp.heap.cdr(args));
    if !interp.heap.is_list(termination) {
        return Err(Error::type_error("do termination clause must be a list"));
    }
    let test_expr = interp.heap.car(termination);
    let result_exprs = interp.heap.cdr(termination);
    let body = interp.heap.cdr(interp.heap.cdr(args));

    let local = interp.frames.new_frame_below(env);
    let mut binding_cell = bindings;
    while binding_cell.is_some() {
        let binding = interp.heap.car(binding_cell);
        let name = interp.heap.car(binding);
        if !interp.heap.is_symbol(name) {
            interp.go_out_of_scope(local);
            return Err(Error::type_error("do requires symbols as binding names"));
        }
        let init_expr = interp.heap.car(interp.heap.cdr(binding));
        let value = match evaluate(interp, init_expr, env) {
            Ok(v) => v,
            Err(e) => {
                interp.go_out_of_scope(local);
                return Err(e);
            }
        };
        if let Some(sym) = name {
            interp.bind(local, sym, value);
        }
        binding_cell = interp.heap.cdr(binding_cell);
    }

    loop {
        let condition = match evaluate(interp, test_expr, local) {
            Ok(v) => v,
            Err(e) => {
                interp.go_out_of_scope(local);
                return Err(e);
            }
        };
        let done = interp.heap.boolean_value(condition);
        interp.release_transient(condition);
        if done {
            let result = match evaluate_each(interp, result_exprs, local) {
                Ok(v) => v,
                Err(e) => {
                    interp.go_out_of_scope(local);
                    return Err(e);
                }
            };
            interp.scope_exit_keeping(local, result);
            return Ok(result);
        }

        match evaluate_each(interp, body, local) {
            Ok(v) => interp.release_transient(v),
            Err(e) => {
                interp.go_out_of_scope(local);
                return Err(e);
            }
        }

        let mut binding_cell = bindings;
        while binding_cell.is_some() {
            let binding = interp.heap.car(binding_cell);
            let name = interp.heap.car(binding);
            let step = interp.heap.cdr(interp.heap.cdr(binding));
            if step.is_some() {
                let step_expr = interp.heap.car(step);
                let value = match evaluate(interp, step_expr, local) {
                    Ok(v) => v,
                    Err(e) => {
                        interp.go_out_of_scope(local);
                        return Err(e);
                    }
                };
                if let Some(sym) = name {
                    interp.rebind(local, sym, value);
                }
            }
            binding_cell = interp.heap.cdr(binding_cell);
        }
    }
}

pub fn register_special_forms(interp: &mut Interpreter) -> Result<(), Error> {
    interp.register_special_form("lambda", -1, lambda_impl)?;
    interp.register_special_form("define", -1, define_impl)?;
    interp.register_special_form("defmacro", 2, defmacro_impl)?;
    interp.register_special_form("cond", -1, cond_impl)?;
    interp.register_special_form("if", -1, if_impl)?;
    interp.register_special_form("let", -1, let_impl)?;
    interp.register_special_form("let*", -1, letstar_impl)?;
    interp.register_special_form("letrec", -1, letrec_impl)?;
    interp.register_special_form("set!", 2, set_impl)?;
    interp.register_special_form("quote", 1, quote_impl)?;
    interp.register_special_form("quasiquote", 1, quasiquote_impl)?;
    interp.register_special_form("unquote", 1, unquote_impl)?;
    interp.register_special_form("unquote-splicing", 1, unquote_splicing_impl)?;
    interp.register_special_form("expand", -1, expand_impl)?;
    interp.register_special_form("do", -1, do_impl)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::interp::Interpreter;
    use crate::value::Value;

    fn interp() -> Interpreter {
        Interpreter::new().expect("interpreter")
    }

    fn eval_str(it: &mut Interpreter, src: &str) -> Value {
        it.parse_and_eval_all(src)
            .unwrap_or_else(|e| panic!("eval of {src:?} failed: {e}"))
    }

    fn eval_to_string(it: &mut Interpreter, src: &str) -> String {
        let v = eval_str(it, src);
        it.heap.to_string(v)
    }

    #[test]
    fn test_lambda_captures_environment() {
        let mut it = interp();
        assert_eq!(
            eval_to_string(&mut it, "((let ((x 10)) (lambda (y) (+ x y))) 5)"),
            "15"
        );
    }

    #[test]
    fn test_lambda_rejects_non_symbol_params() {
        let mut it = interp();
        assert!(it.parse_and_eval_all("(lambda (x 1) x)").is_err());
    }

    #[test]
    fn test_define_sugar_keeps_the_name() {
        let mut it = interp();
        eval_str(&mut it, "(define (inc n) (+ n 1))");
        assert_eq!(eval_to_string(&mut it, "inc"), "<func: inc>");
    }

    #[test]
    fn test_define_returns_the_value() {
        let mut it = interp();
        assert_eq!(eval_to_string(&mut it, "(define x 42)"), "42");
    }

    #[test]
    fn test_if_branches() {
        let mut it = interp();
        assert_eq!(eval_to_string(&mut it, "(if #t 1 2)"), "1");
        assert_eq!(eval_to_string(&mut it, "(if #f 1 2)"), "2");
        assert_eq!(eval_to_string(&mut it, "(if #f 1)"), "nil");
        assert!(it.parse_and_eval_all("(if #t 1 2 3)").is_err());
    }

    #[test]
    fn test_only_true_is_truthy() {
        let mut it = interp();
        // Numbers, strings, and lists all read as false in this dialect.
        assert_eq!(eval_to_string(&mut it, "(if 1 'yes 'no)"), "no");
        assert_eq!(eval_to_string(&mut it, "(if \"s\" 'yes 'no)"), "no");
        assert_eq!(eval_to_string(&mut it, "(if '(1) 'yes 'no)"), "no");
    }

    #[test]
    fn test_cond_first_truthy_clause_wins() {
        let mut it = interp();
        assert_eq!(
            eval_to_string(&mut it, "(cond ((eq? 1 2) 'a) ((eq? 1 1) 'b) (else 'c))"),
            "b"
        );
        assert_eq!(
            eval_to_string(&mut it, "(cond ((eq? 1 2) 'a) (else 'c))"),
            "c"
        );
        assert_eq!(eval_to_string(&mut it, "(cond ((eq? 1 2) 'a))"), "nil");
    }

    #[test]
    fn test_let_evaluates_values_in_outer_env() {
        let mut it = interp();
        eval_str(&mut it, "(define x 1)");
        assert_eq!(eval_to_string(&mut it, "(let ((x 2) (y x)) y)"), "1");
    }

    #[test]
    fn test_letstar_sees_earlier_bindings() {
        let mut it = interp();
        assert_eq!(eval_to_string(&mut it, "(let* ((x 2) (y (* x 3))) y)"), "6");
    }

    #[test]
    fn test_letrec_self_reference() {
        let mut it = interp();
        assert_eq!(
            eval_to_string(
                &mut it,
                "(letrec ((f (lambda (n) (if (eq? n 0) 1 (* n (f (- n 1))))))) (f 5))"
            ),
            "120"
        );
    }

    #[test]
    fn test_set_reaches_enclosing_scope() {
        let mut it = interp();
        eval_str(&mut it, "(define x 1)");
        eval_str(&mut it, "(let ((y 2)) (set! x (+ x y)))");
        assert_eq!(eval_to_string(&mut it, "x"), "3");
    }

    #[test]
    fn test_quote() {
        let mut it = interp();
        assert_eq!(eval_to_string(&mut it, "(quote (1 2 3))"), "(1 2 3)");
        assert_eq!(eval_to_string(&mut it, "'sym"), "sym");
    }

    #[test]
    fn test_quasiquote_unquote_and_splicing() {
        let mut it = interp();
        assert_eq!(
            eval_to_string(&mut it, "(let ((a 1) (b '(2 3))) `(x ,a ,@b y))"),
            "(x 1 2 3 y)"
        );
    }

    #[test]
    fn test_quasiquote_without_unquote_is_quote() {
        let mut it = interp();
        assert_eq!(eval_to_string(&mut it, "`(1 2 3)"), "(1 2 3)");
        assert_eq!(eval_to_string(&mut it, "`x"), "x");
    }

    #[test]
    fn test_quasiquote_splicing_empty_list() {
        let mut it = interp();
        assert_eq!(
            eval_to_string(&mut it, "(let ((b '())) `(x ,@b y))"),
            "(x y)"
        );
    }

    #[test]
    fn test_nested_quasiquote_preserves_structure() {
        let mut it = interp();
        assert_eq!(
            eval_to_string(&mut it, "`(a `(b ,(c)))"),
            "(a (quasiquote (b (unquote (c)))))"
        );
    }

    #[test]
    fn test_unquote_outside_quasiquote_is_an_error() {
        let mut it = interp();
        assert!(it.parse_and_eval_all("(unquote 1)").is_err());
        assert!(it.parse_and_eval_all("(unquote-splicing 1)").is_err());
    }

    #[test]
    fn test_defmacro_and_application() {
        let mut it = interp();
        eval_str(&mut it, "(defmacro (when c body) `(if ,c ,body #f))");
        assert_eq!(eval_to_string(&mut it, "(when #t 42)"), "42");
        assert_eq!(eval_to_string(&mut it, "(when #f 42)"), "#f");
    }

    #[test]
    fn test_expand_returns_the_expansion() {
        let mut it = interp();
        eval_str(&mut it, "(defmacro (when c body) `(if ,c ,body #f))");
        assert_eq!(
            eval_to_string(&mut it, "(expand when #t 42)"),
            "(if #t 42 #f)"
        );
    }

    #[test]
    fn test_expand_requires_a_macro() {
        let mut it = interp();
        assert!(it.parse_and_eval_all("(expand 1 2)").is_err());
    }

    #[test]
    fn test_do_loop() {
        let mut it = interp();
        assert_eq!(
            eval_to_string(
                &mut it,
                "(do ((i 0 (+ i 1)) (acc 0 (+ acc i))) ((eq? i 5) acc))"
            ),
            "10"
        );
    }

    #[test]
    fn test_do_body_runs_each_iteration() {
        let mut it = interp();
        eval_str(&mut it, "(define n 0)");
        eval_str(&mut it, "(do ((i 0 (+ i 1))) ((eq? i 3)) (set! n (+ n 10)))");
        assert_eq!(eval_to_string(&mut it, "n"), "30");
    }
}
