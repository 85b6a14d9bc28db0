//! Scripted in-memory RPC endpoints for host-side tests

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::common::{Error, Result};
use crate::rpc::protocol::{importer, library, KEYWORD_LIBRARY, LIBRARY_IMPORTER};
use crate::rpc::{EndpointUrl, RpcChannel, RpcConnector};

#[derive(Default)]
pub(crate) struct MockState {
    /// importer url -> (library identifier -> library url)
    importers: HashMap<String, HashMap<String, String>>,
    /// library url -> (tag, keyword names)
    libraries: HashMap<String, (String, Vec<String>)>,
    /// url -> upcoming invocations failing with a transport error
    failures: HashMap<String, usize>,
    /// url -> upcoming connects refused
    refusals: HashMap<String, usize>,
    /// urls whose connects never complete
    hangs: HashSet<String>,
    /// url -> code of a permanent error raised by every connect
    rejections: HashMap<String, String>,
    /// close_service answers instead of severing the connection
    pub close_refused: bool,
    connects: Vec<String>,
    invocations: Vec<(String, String)>,
}

#[derive(Clone, Default)]
pub(crate) struct MockConnector {
    inner: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Serve an importer at `url` resolving `(identifier, library url)` pairs
    pub fn importer(&self, url: &str, imports: &[(&str, &str)]) -> &Self {
        let imports = imports
            .iter()
            .map(|(id, lib)| (id.to_string(), lib.to_string()))
            .collect();
        self.state().importers.insert(url.to_string(), imports);
        self
    }

    /// Serve a keyword library at `url`; `run_keyword` answers with `tag`
    pub fn library(&self, url: &str, tag: &str, keywords: &[&str]) -> &Self {
        let keywords = keywords.iter().map(|k| k.to_string()).collect();
        self.state()
            .libraries
            .insert(url.to_string(), (tag.to_string(), keywords));
        self
    }

    pub fn fail_invokes(&self, url: &str, count: usize) {
        self.state().failures.insert(url.to_string(), count);
    }

    pub fn refuse_connects(&self, url: &str, count: usize) {
        self.state().refusals.insert(url.to_string(), count);
    }

    /// Accept connects to `url` but never finish the handshake
    pub fn hang_connects(&self, url: &str) {
        self.state().hangs.insert(url.to_string());
    }

    /// Fail every connect to `url` with a non-connectivity error
    pub fn reject_connects(&self, url: &str, code: &str) {
        self.state()
            .rejections
            .insert(url.to_string(), code.to_string());
    }

    pub fn connects_to(&self, url: &str) -> usize {
        self.state().connects.iter().filter(|u| *u == url).count()
    }

    pub fn invocations_of(&self, url: &str, method: &str) -> usize {
        self.state()
            .invocations
            .iter()
            .filter(|(u, m)| u == url && m == method)
            .count()
    }

    pub fn arc(&self) -> Arc<dyn RpcConnector> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl RpcConnector for MockConnector {
    async fn connect(&self, url: &EndpointUrl, interface: &str) -> Result<Box<dyn RpcChannel>> {
        let key = url.to_string();
        let hangs = {
            let mut state = self.state();
            state.connects.push(key.clone());
            state.hangs.contains(&key)
        };
        if hangs {
            std::future::pending::<()>().await;
        }

        let mut state = self.state();
        if let Some(code) = state.rejections.get(&key) {
            return Err(Error::Remote {
                code: code.clone(),
                message: format!("{} rejected the connection", key),
            });
        }

        if let Some(refusals) = state.refusals.get_mut(&key) {
            if *refusals > 0 {
                *refusals -= 1;
                return Err(Error::unavailable(url, "connection refused"));
            }
        }

        let serving = match interface {
            LIBRARY_IMPORTER => state.importers.contains_key(&key),
            KEYWORD_LIBRARY => state.libraries.contains_key(&key),
            _ => false,
        };
        if !serving {
            return Err(Error::unavailable(url, "nothing listening"));
        }

        Ok(Box::new(MockChannel {
            url: url.clone(),
            inner: self.inner.clone(),
        }))
    }
}

struct MockChannel {
    url: EndpointUrl,
    inner: Arc<Mutex<MockState>>,
}

#[async_trait]
impl RpcChannel for MockChannel {
    fn url(&self) -> &EndpointUrl {
        &self.url
    }

    async fn invoke(&mut self, method: &str, args: Vec<Value>) -> Result<Value> {
        let key = self.url.to_string();
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.invocations.push((key.clone(), method.to_string()));

        if let Some(failures) = state.failures.get_mut(&key) {
            if *failures > 0 {
                *failures -= 1;
                return Err(Error::Transport("connection reset".to_string()));
            }
        }

        if let Some(imports) = state.importers.get(&key) {
            return match method {
                importer::IMPORT_LIBRARY => {
                    let id = args.first().and_then(Value::as_str).unwrap_or_default();
                    imports
                        .get(id)
                        .map(|lib| json!(lib))
                        .ok_or_else(|| Error::Remote {
                            code: "LIBRARY_NOT_FOUND".to_string(),
                            message: format!("Library '{}' not found", id),
                        })
                }
                importer::CLOSE_SERVICE if state.close_refused => Ok(Value::Null),
                importer::CLOSE_SERVICE => Err(Error::Transport("connection severed".into())),
                other => Err(Error::NoSuchMethod {
                    service: key,
                    method: other.to_string(),
                }),
            };
        }

        if let Some((tag, keywords)) = state.libraries.get(&key) {
            return match method {
                library::GET_KEYWORD_NAMES => Ok(json!(keywords)),
                library::RUN_KEYWORD => Ok(json!({
                    "library": tag,
                    "keyword": args.first(),
                    "args": args.get(1),
                })),
                other => Err(Error::NoSuchMethod {
                    service: key,
                    method: other.to_string(),
                }),
            };
        }

        Err(Error::Transport("endpoint went away".to_string()))
    }

    async fn close(&mut self) {}
}
