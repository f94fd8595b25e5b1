// ABOUTME: Recursive-descent parser building s-expressions on the heap

use crate::error::Error;
use crate::interp::Interpreter;
use crate::tokenizer::{Token, Tokenizer};
use crate::value::Value;

/// Parses a token stream into heap values. The parser owns the tokenizer;
/// allocation goes through the interpreter context.
pub struct Parser<'a> {
    tokens: Tokenizer<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Parser {
            tokens: Tokenizer::new(source),
        }
    }

    /// Yields one s-expression, `None` at end of input.
    pub fn parse_expression(&mut self, interp: &mut Interpreter) -> Result<Option<Value>, Error> {
        match self.tokens.token() {
            Token::EndOfFile => Ok(None),
            Token::Integer => {
                let n: i32 = self
                    .tokens
                    .lexeme()
                    .parse()
                    .map_err(|_| Error::syntax(format!("Bad integer literal: {}", self.tokens.lexeme())))?;
                self.tokens.advance();
                Ok(Some(Some(interp.heap.integer(n)?)))
            }
            Token::HexInteger => {
                // The lexeme starts with '#x'; the digits follow.
                let digits = &self.tokens.lexeme()[2..];
                let n = u32::from_str_radix(digits, 16)
                    .map_err(|_| Error::syntax(format!("Bad hex literal: {}", self.tokens.lexeme())))?;
                self.tokens.advance();
                Ok(Some(Some(interp.heap.unsigned(n)?)))
            }
            Token::Str => {
                let s = self.tokens.lexeme().to_string();
                self.tokens.advance();
                Ok(Some(Some(interp.heap.string(s)?)))
            }
            Token::True => {
                self.tokens.advance();
                Ok(Some(interp.heap.boolean(true)))
            }
            Token::False => {
                self.tokens.advance();
                Ok(Some(interp.heap.boolean(false)))
            }
            Token::Symbol => {
                let sym = interp.heap.intern_symbol(self.tokens.lexeme())?;
                self.tokens.advance();
                Ok(Some(Some(sym)))
            }
            Token::LParen => {
                self.tokens.advance();
                Ok(Some(self.parse_cons_cell(interp)?))
            }
            Token::Quote => self.parse_sugar(interp, "quote"),
            Token::Backquote => self.parse_sugar(interp, "quasiquote"),
            Token::Comma => self.parse_sugar(interp, "unquote"),
            Token::CommaAt => self.parse_sugar(interp, "unquote-splicing"),
            Token::Illegal => Err(Error::syntax(format!(
                "Illegal character: {}",
                self.tokens.lexeme()
            ))),
            other => Err(Error::syntax(format!(
                "Unexpected token: {:?} ({})",
                other,
                self.tokens.lexeme()
            ))),
        }
    }

    /// Rewrites `'x` to `(quote x)` and friends.
    fn parse_sugar(
        &mut self,
        interp: &mut Interpreter,
        name: &str,
    ) -> Result<Option<Value>, Error> {
        self.tokens.advance();
        let expr = match self.parse_expression(interp)? {
            Some(e) => e,
            None => return Err(Error::syntax(format!("Unexpected EOF after {}", name))),
        };
        let sym = match interp.heap.intern_symbol(name) {
            Ok(s) => s,
            Err(e) => {
                interp.release(expr);
                return Err(e);
            }
        };
        match interp.heap.list(&[Some(sym), expr]) {
            Ok(l) => Ok(Some(l)),
            Err(e) => {
                interp.release(expr);
                Err(e)
            }
        }
    }

    /// Reads list elements up to the matching `)`. A `.` introduces a
    /// dotted tail, after which the list must close immediately.
    fn parse_cons_cell(&mut self, interp: &mut Interpreter) -> Result<Value, Error> {
        let mut cells: Vec<Value> = Vec::new();
        loop {
            match self.tokens.token() {
                Token::RParen => {
                    self.tokens.advance();
                    return interp.heap.list(&cells);
                }
                Token::Period => {
                    self.tokens.advance();
                    let tail = match self.parse_expression(interp) {
                        Ok(Some(t)) => t,
                        Ok(None) => {
                            self.release_partial(interp, &cells);
                            return Err(Error::syntax(
                                "Unexpected EOF (expected a closing parenthesis)",
                            ));
                        }
                        Err(e) => {
                            self.release_partial(interp, &cells);
                            return Err(e);
                        }
                    };
                    if self.tokens.token() != Token::RParen {
                        self.release_partial(interp, &cells);
                        interp.release(tail);
                        return Err(Error::syntax("Expected ')'"));
                    }
                    self.tokens.advance();
                    return interp.heap.list_with_tail(&cells, tail);
                }
                Token::EndOfFile => {
                    self.release_partial(interp, &cells);
                    return Err(Error::syntax(
                        "Unexpected EOF (expected a closing parenthesis)",
                    ));
                }
                _ => match self.parse_expression(interp) {
                    Ok(Some(expr)) => cells.push(expr),
                    Ok(None) => {
                        self.release_partial(interp, &cells);
                        return Err(Error::syntax(
                            "Unexpected EOF (expected a closing parenthesis)",
                        ));
                    }
                    Err(e) => {
                        self.release_partial(interp, &cells);
                        return Err(e);
                    }
                },
            }
        }
    }

    fn release_partial(&self, interp: &mut Interpreter, cells: &[Value]) {
        for &c in cells {
            interp.release(c);
        }
    }
}

/// Parses exactly one expression from `source`.
pub fn parse(interp: &mut Interpreter, source: &str) -> Result<Value, Error> {
    let mut parser = Parser::new(source);
    match parser.parse_expression(interp)? {
        Some(v) => Ok(v),
        None => Err(Error::syntax("Unexpected end of input")),
    }
}
