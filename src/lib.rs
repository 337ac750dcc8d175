//! A formula evaluation engine built on the shunting yard algorithm.
//!
//! Expressions arrive as text, are tokenized and rearranged into postfix
//! order, then evaluated against named parameters (live value providers) and
//! named formulas (pre-compiled expressions that may reference other
//! formulas). A result cache and a buffer pool keep repeated evaluation cheap.

#[macro_use]
extern crate custom_derive;
#[macro_use]
extern crate enum_derive;
#[macro_use]
extern crate lazy_static;

pub mod error;

pub mod lexer;

pub mod parser;

pub mod engine;

pub mod cache;

pub mod pool;

pub use engine::Engine;
pub use error::{EngineError, Result};
pub use parser::token::Token;
pub use parser::{Program, ShuntingYard};
