
use std::collections::HashMap;
use std::fmt;

//..................................................................

type ValueProvider = Box<dyn Fn() -> f32>;

/// ParameterRegistry holds the named runtime quantities that expressions can
/// reference. Every entry is a zero-argument provider; registering a plain
/// value wraps it in a constant provider. Providers are invoked fresh on
/// every lookup, so a provider reading a live source such as a clock yields
/// its current value each time an expression mentions it; the registry never
/// memoizes.
pub struct ParameterRegistry {
    providers: HashMap<String, ValueProvider>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        ParameterRegistry { providers: HashMap::new() }
    }

    /// Register a provider under the given name, silently replacing any
    /// previous registration for that name.
    pub fn register<F>(&mut self, name: &str, provider: F)
    where F: Fn() -> f32 + 'static {
        self.providers.insert(name.to_string(), Box::new(provider));
    }

    /// Register a constant value, wrapped in a provider.
    pub fn register_value(&mut self, name: &str, value: f32) {
        self.register(name, move || value);
    }

    /// Remove a parameter. Returns true if it was present.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.providers.remove(name).is_some()
    }

    /// Invoke the provider for the named parameter and return its current
    /// value, or None if no such parameter is registered.
    pub fn get(&self, name: &str) -> Option<f32> {
        self.providers.get(name).map(|provider| provider())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn clear(&mut self) {
        self.providers.clear();
    }
}

impl Default for ParameterRegistry {
    fn default() -> Self {
        ParameterRegistry::new()
    }
}

impl fmt::Debug for ParameterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        write!(f, "ParameterRegistry {:?}", names)
    }
}

//..................................................................
