
use std::collections::HashMap;
use std::str::Chars;

use itertools::{put_back, PutBack};

pub mod char_class;
use char_class::CharClass;

use crate::parser::functions::FunctionTable;
use crate::parser::operator::Operator;
use crate::parser::token::Token;
use crate::parser::Program;

// Tokenizer classes:
//    - CharClass: Categorizes each character of the expression (see char_class.rs)
//    - Tokenizer: Iterates over a string and yields one Token per lexical element

//..................................................................

/// Tokenizer is a lexical analyzer for breaking an expression string into a
/// series of Tokens in infix order, in a single left-to-right pass.
///
/// It never fails: malformed number literals are absorbed as zero and
/// unrecognized characters (whitespace included) are skipped without a token.
/// Identifier classification consults the function table and the formula
/// registry, in that order: a name followed by `(` that matches a function
/// becomes a Function token, then a name matching a registered formula
/// becomes a Formula token, and anything else is a plain Identifier left for
/// the parameter registry to resolve at evaluation time.
pub struct Tokenizer<'e> {
    /// Iterates over the characters of the expression, with the ability to
    /// put one character back after looking ahead.
    chars: PutBack<Chars<'e>>,

    functions: &'e FunctionTable,

    formulas: &'e HashMap<String, Program>,
}

impl<'e> Tokenizer<'e> {
    pub fn new(
        expression: &'e str,
        functions: &'e FunctionTable,
        formulas: &'e HashMap<String, Program>,
    ) -> Tokenizer<'e> {
        Tokenizer {
            chars: put_back(expression.chars()),
            functions,
            formulas,
        }
    }

    //..................................................................

    // Lookahead processing

    /// Peek at the next character and compare it to the given one.
    /// Returns false if the input is exhausted.
    fn next_is(&mut self, expected: char) -> bool {
        match self.chars.next() {
            Some(c) => {
                self.chars.put_back(c);
                c == expected
            }
            None => false,
        }
    }

    fn next_is_digit(&mut self) -> bool {
        match self.chars.next() {
            Some(c) => {
                self.chars.put_back(c);
                matches!(CharClass::new(c), CharClass::Digit(_))
            }
            None => false,
        }
    }

    //..................................................................

    // Scanners for the multi-character tokens

    /// Scan a number literal: a run of digits with at most one decimal point.
    /// A second decimal point or any other character ends the literal and is
    /// put back for the next round. Text that fails to parse as a float is
    /// absorbed as zero; the tokenizer raises no errors.
    fn scan_number(&mut self, negative: bool) -> Token {
        let mut literal = String::new();
        if negative {
            literal.push('-');
        }
        let mut seen_decimal_point = false;
        while let Some(c) = self.chars.next() {
            match CharClass::new(c) {
                CharClass::Digit(digit) => literal.push(digit),
                CharClass::Period if !seen_decimal_point => {
                    seen_decimal_point = true;
                    literal.push('.');
                }
                _ => {
                    self.chars.put_back(c);
                    break;
                }
            }
        }
        Token::Number(literal.parse::<f32>().unwrap_or(0.0))
    }

    /// Scan an identifier: a run of letters. The name is then classified as a
    /// boolean literal, a function call, a formula reference or a plain
    /// identifier, in that order.
    fn scan_identifier(&mut self) -> Token {
        let mut name = String::new();
        while let Some(c) = self.chars.next() {
            match CharClass::new(c) {
                CharClass::Letter(letter) => name.push(letter),
                _ => {
                    self.chars.put_back(c);
                    break;
                }
            }
        }
        if name.eq_ignore_ascii_case("true") {
            return Token::Boolean(true);
        }
        if name.eq_ignore_ascii_case("false") {
            return Token::Boolean(false);
        }
        // Function-call syntax wins over formula names, which win over
        // parameter names.
        if self.next_is('(') && self.functions.contains(&name) {
            return Token::Function(name);
        }
        if self.formulas.contains_key(&name) {
            return Token::Formula(name);
        }
        Token::Identifier(name)
    }
}

impl<'e> Iterator for Tokenizer<'e> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        while let Some(c) = self.chars.next() {
            match CharClass::new(c) {
                CharClass::Digit(_) | CharClass::Period => {
                    self.chars.put_back(c);
                    return Some(self.scan_number(false));
                }
                CharClass::OperatorSymbol(symbol) => {
                    // A minus sign glued to a digit is part of the literal.
                    // Unary minus on anything else is left for the evaluator.
                    if symbol == '-' && self.next_is_digit() {
                        return Some(self.scan_number(true));
                    }
                    if let Some(op) = Operator::from_symbol(symbol) {
                        return Some(Token::Operator(op));
                    }
                }
                CharClass::Letter(_) => {
                    self.chars.put_back(c);
                    return Some(self.scan_identifier());
                }
                CharClass::OpenParenthesis => return Some(Token::OpenParenthesis),
                CharClass::CloseParenthesis => return Some(Token::CloseParenthesis),
                CharClass::Comma => return Some(Token::Comma),
                // Whitespace and unrecognized characters yield no token.
                CharClass::Space | CharClass::Other(_) => continue,
            }
        }
        None
    }
}

//..................................................................
