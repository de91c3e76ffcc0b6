//! Type-name registry.
//!
//! Records carry a `MyType` and a `TargetType` name. The matcher compares
//! them by number: each distinct name (case-insensitively) is numbered in
//! the order it is first registered. One registry is created per process,
//! or per test, and shared by every record built against it.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Type name that matches every target type.
pub const ANY_TYPE: &str = "ANY";

/// Interning table from type name to type number.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    inner: Mutex<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    numbers: FxHashMap<String, i32>,
    names: Vec<String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the number of `name`, registering it if it is new.
    pub fn register(&self, name: &str) -> i32 {
        let key = name.to_ascii_lowercase();
        let mut inner = self.inner.lock();
        if let Some(number) = inner.numbers.get(&key) {
            return *number;
        }
        let number = inner.names.len() as i32;
        inner.names.push(name.to_string());
        inner.numbers.insert(key, number);
        number
    }

    /// Number of an already registered name.
    pub fn number(&self, name: &str) -> Option<i32> {
        self.inner
            .lock()
            .numbers
            .get(&name.to_ascii_lowercase())
            .copied()
    }

    /// The spelling under which `number` was first registered.
    pub fn name(&self, number: i32) -> Option<String> {
        let index = usize::try_from(number).ok()?;
        self.inner.lock().names.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
