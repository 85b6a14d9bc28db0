//! Keyword libraries and the catalog they are imported from
//!
//! A library is anything exposing a fixed set of keyword names and a way to
//! run them with positional arguments. The catalog maps library identifiers to
//! constructors, so the importer can instantiate a library by name.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::common::{Error, Result};
use crate::rpc::protocol::{library, KEYWORD_LIBRARY};
use crate::rpc::Service;

use super::builtin::{BuiltinKeywords, LoggingKeywords};

/// A set of remotely invokable keywords
#[async_trait]
pub trait Library: Send + Sync + 'static {
    /// Names of every keyword this library provides
    fn keyword_names(&self) -> Vec<String>;

    /// Run one keyword; arguments are passed as given by the caller
    async fn run_keyword(&self, name: &str, args: Vec<Value>) -> Result<Value>;
}

type Factory = dyn Fn() -> Box<dyn Library> + Send + Sync;

/// Library constructors by identifier
#[derive(Clone, Default)]
pub struct LibraryCatalog {
    factories: BTreeMap<String, Arc<Factory>>,
}

impl LibraryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the libraries shipped in this crate
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register(BuiltinKeywords::IDENTIFIER, || Box::new(BuiltinKeywords));
        catalog.register(LoggingKeywords::IDENTIFIER, || Box::new(LoggingKeywords));
        catalog
    }

    /// Register a constructor; a later registration replaces an earlier one
    pub fn register<F>(&mut self, identifier: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Library> + Send + Sync + 'static,
    {
        self.factories
            .insert(identifier.to_string(), Arc::new(factory));
        self
    }

    /// Construct a new instance of the identified library
    pub fn instantiate(&self, identifier: &str) -> Result<Box<dyn Library>> {
        let factory = self
            .factories
            .get(identifier)
            .ok_or_else(|| Error::LibraryNotFound(identifier.to_string()))?;
        Ok(factory())
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

/// Publishes a [`Library`] as a keyword-library service
pub struct KeywordService {
    library: Box<dyn Library>,
}

impl KeywordService {
    pub fn new(library: Box<dyn Library>) -> Self {
        Self { library }
    }

    async fn run_keyword(&self, mut args: Vec<Value>) -> Result<Value> {
        if args.is_empty() {
            return Err(Error::invalid_arguments(
                library::RUN_KEYWORD,
                "expected a keyword name",
            ));
        }
        let keyword_args = match args.len() {
            1 => Vec::new(),
            _ => match args.swap_remove(1) {
                Value::Array(values) => values,
                Value::Null => Vec::new(),
                other => vec![other],
            },
        };
        let name = match &args[0] {
            Value::String(name) => name.clone(),
            other => {
                return Err(Error::invalid_arguments(
                    library::RUN_KEYWORD,
                    format!("keyword name must be a string, got {}", other),
                ))
            }
        };

        if !self.library.keyword_names().iter().any(|k| *k == name) {
            return Err(Error::UnknownKeyword(name));
        }
        self.library.run_keyword(&name, keyword_args).await
    }
}

#[async_trait]
impl Service for KeywordService {
    fn interface(&self) -> &'static str {
        KEYWORD_LIBRARY
    }

    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        match method {
            library::GET_KEYWORD_NAMES => Ok(Value::from(self.library.keyword_names())),
            library::RUN_KEYWORD => self.run_keyword(args).await,
            other => Err(Error::NoSuchMethod {
                service: KEYWORD_LIBRARY.to_string(),
                method: other.to_string(),
            }),
        }
    }
}

/// Positional string argument of a keyword
pub fn string_arg(keyword: &str, args: &[Value], index: usize, name: &str) -> Result<String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) | None => Err(Error::invalid_arguments(
            keyword,
            format!("missing argument '{}'", name),
        )),
        Some(other) => Ok(other.to_string()),
    }
}
