//! # Dependency Container
//!
//! A type-keyed value store. Each scope holds at most one value per type
//! (last write wins) and reads through to an optional parent scope.
//!
//! The server owns a root [`Injector`] for the lifetime of the process. Every
//! request gets a fresh child whose writes are invisible to the root and to
//! every other request.
//!
//! ```rust
//! use std::sync::Arc;
//! use yawf::injector::Injector;
//!
//! #[derive(Clone)]
//! struct Greeting(&'static str);
//!
//! let mut root = Injector::new();
//! root.insert(Greeting("hello"));
//!
//! let mut request = Injector::with_parent(Arc::new(root));
//! assert_eq!(request.get::<Greeting>().map(|g| g.0), Some("hello"));
//!
//! request.insert(Greeting("shadowed"));
//! assert_eq!(request.get::<Greeting>().map(|g| g.0), Some("shadowed"));
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Slot = Arc<dyn Any + Send + Sync>;

/// Type-keyed value store with read-through to a parent scope.
#[derive(Default)]
pub struct Injector {
    values: HashMap<TypeId, Slot>,
    parent: Option<Arc<Injector>>,
}

impl Injector {
    /// Create an empty root scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty scope that reads through to `parent`.
    #[must_use]
    pub fn with_parent(parent: Arc<Injector>) -> Self {
        Self {
            values: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Map `value` under its own type, replacing any previous value in this scope.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.values.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Map an already shared value under `T`.
    pub fn insert_arc<T: Send + Sync + 'static>(&mut self, value: Arc<T>) {
        self.values.insert(TypeId::of::<T>(), value);
    }

    /// Look up the shared value for `T`, searching this scope then its parents.
    #[must_use]
    pub fn get_arc<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        match self.values.get(&TypeId::of::<T>()) {
            Some(slot) => Arc::clone(slot).downcast::<T>().ok(),
            None => self.parent.as_ref().and_then(|p| p.get_arc::<T>()),
        }
    }

    /// Look up and clone the value for `T`.
    #[must_use]
    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.get_arc::<T>().map(|v| T::clone(&v))
    }

    /// Whether a value for `T` is visible from this scope.
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
            || self.parent.as_ref().is_some_and(|p| p.contains::<T>())
    }

    /// Number of values mapped directly in this scope.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("values", &self.values.len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
