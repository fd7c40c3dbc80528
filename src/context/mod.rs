//! Per-request context: the request, the path bits left over after routing, and
//! typed extensions injected by middleware.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
};

use crate::Request;

/// Type-erased request extensions map: used to inject per-request state
/// into handlers without requiring handlers to know about each other's types.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    /// Create a new empty extensions map
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Insert a value, replacing any previous value of the same type
    pub fn insert<T>(&mut self, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.map.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Get a value from the extensions map
    pub fn get<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }
}

/// Path bits paired with the parameter names the matched route declared.
///
/// Only as many names are bound as there are bits; surplus bits stay unnamed.
#[derive(Default, Debug, Clone)]
pub struct Parameters {
    map: HashMap<String, String>,
}

impl Parameters {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Zips declared names with the bits, in order.
    pub fn bind(names: &[String], bits: &[String]) -> Self {
        Self {
            map: names.iter().cloned().zip(bits.iter().cloned()).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|value| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Everything a handler gets to see for one request.
pub struct Context {
    request: Request,
    bits: Vec<String>,
    params: Parameters,
    extensions: Extensions,
}

impl Context {
    /// Create a new context from a request; routing fills in bits later.
    pub fn new(request: Request) -> Self {
        Self {
            request,
            bits: Vec::new(),
            params: Parameters::new(),
            extensions: Extensions::new(),
        }
    }

    /// Records the trailing path segments that were not part of the matched key.
    pub(crate) fn set_bits(&mut self, bits: Vec<String>, names: &[String]) {
        self.params = Parameters::bind(names, &bits);
        self.bits = bits;
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Path segments following the matched route key, left to right.
    pub fn bits(&self) -> &[String] {
        &self.bits
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}
