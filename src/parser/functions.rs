
use std::collections::HashMap;
use super::token::{is_truthy, truth_value};

//..................................................................

/// The widest arity any function may declare. Argument buffers drawn from the
/// pool are sized to this.
pub const MAX_ARITY: usize = 3;

/// Two floats closer together than this compare as equal under `eq`.
pub const EQUALITY_EPSILON: f32 = 1e-5;

type NativeFunction = Box<dyn Fn(&[f32]) -> f32>;

/// A FunctionDef pairs a fixed arity with the native code that computes the
/// function. The evaluator pops exactly `arity` operands before calling.
pub struct FunctionDef {
    arity: usize,
    body: NativeFunction,
}

impl FunctionDef {
    pub fn new<F>(arity: usize, body: F) -> Self
    where F: Fn(&[f32]) -> f32 + 'static {
        FunctionDef { arity, body: Box::new(body) }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn call(&self, args: &[f32]) -> f32 {
        (self.body)(args)
    }
}

//..................................................................

/// FunctionTable holds the named functions callable from expressions.
/// The standard set is built once when an engine is constructed; callers may
/// add to it through `register` but nothing removes or replaces entries while
/// expressions are being evaluated.
pub struct FunctionTable {
    functions: HashMap<String, FunctionDef>,
}

impl FunctionTable {
    /// Define a function over a single argument.
    /// A call with the wrong argument count yields NaN rather than a panic.
    fn unary<F>(f: F) -> FunctionDef
    where F: Fn(f32) -> f32 + 'static {
        FunctionDef::new(1, move |args| match args {
            [x] => f(*x),
            _ => f32::NAN,
        })
    }

    fn binary<F>(f: F) -> FunctionDef
    where F: Fn(f32, f32) -> f32 + 'static {
        FunctionDef::new(2, move |args| match args {
            [a, b] => f(*a, *b),
            _ => f32::NAN,
        })
    }

    fn ternary<F>(f: F) -> FunctionDef
    where F: Fn(f32, f32, f32) -> f32 + 'static {
        FunctionDef::new(3, move |args| match args {
            [a, b, c] => f(*a, *b, *c),
            _ => f32::NAN,
        })
    }

    /// Construct the standard function table.
    pub fn standard() -> Self {
        let mut table = FunctionTable { functions: HashMap::new() };

        // Functions that take a float and return a float
        table.add("sin", Self::unary(|x| x.sin()));
        table.add("cos", Self::unary(|x| x.cos()));
        table.add("tan", Self::unary(|x| x.tan()));
        table.add("sqrt", Self::unary(|x| x.sqrt()));
        table.add("abs", Self::unary(|x| x.abs()));
        table.add("floor", Self::unary(|x| x.floor()));
        table.add("ceil", Self::unary(|x| x.ceil()));
        table.add("round", Self::unary(|x| x.round()));

        // Functions that take two floats
        table.add("min", Self::binary(|a, b| a.min(b)));
        table.add("max", Self::binary(|a, b| a.max(b)));
        table.add("pow", Self::binary(|a, b| a.powf(b)));

        // Range and interpolation functions
        table.add("clamp", Self::ternary(|x, lo, hi| x.max(lo).min(hi)));
        table.add("lerp", Self::ternary(|a, b, t| a + (b - a) * t));

        // Logical functions on truthiness, returning 1 or 0
        table.add("and", Self::binary(|a, b| truth_value(is_truthy(a) && is_truthy(b))));
        table.add("or", Self::binary(|a, b| truth_value(is_truthy(a) || is_truthy(b))));
        table.add("xor", Self::binary(|a, b| truth_value(is_truthy(a) != is_truthy(b))));
        table.add("not", Self::unary(|a| truth_value(!is_truthy(a))));

        // Comparison functions, returning 1 or 0.
        // Equality is approximate to absorb accumulated rounding.
        table.add("eq", Self::binary(|a, b| truth_value((a - b).abs() < EQUALITY_EPSILON)));
        table.add("neq", Self::binary(|a, b| truth_value((a - b).abs() > EQUALITY_EPSILON)));
        table.add("gt", Self::binary(|a, b| truth_value(a > b)));
        table.add("lt", Self::binary(|a, b| truth_value(a < b)));
        table.add("gte", Self::binary(|a, b| truth_value(a >= b)));
        table.add("lte", Self::binary(|a, b| truth_value(a <= b)));

        // Conditional selection
        table.add("if", Self::ternary(|c, t, f| if is_truthy(c) { t } else { f }));

        table
    }

    fn add(&mut self, name: &str, def: FunctionDef) {
        self.functions.insert(name.to_string(), def);
    }

    /// Add a caller-defined function, replacing any function already
    /// registered under the same name.
    pub fn register<F>(&mut self, name: &str, arity: usize, body: F)
    where F: Fn(&[f32]) -> f32 + 'static {
        self.add(name, FunctionDef::new(arity, body));
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

//..................................................................
