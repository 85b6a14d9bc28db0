//! Host-side proxy for one imported library endpoint

use std::sync::Arc;

use serde_json::Value;

use crate::common::{Error, Result};
use crate::rpc::protocol::{library, KEYWORD_LIBRARY};
use crate::rpc::{EndpointUrl, RpcChannel, RpcConnector};

pub struct RemoteLibrary {
    url: EndpointUrl,
    connector: Arc<dyn RpcConnector>,
    channel: Box<dyn RpcChannel>,
    keywords: Option<Vec<String>>,
}

impl RemoteLibrary {
    pub async fn open(connector: Arc<dyn RpcConnector>, url: EndpointUrl) -> Result<Self> {
        let channel = connector.connect(&url, KEYWORD_LIBRARY).await?;
        Ok(Self {
            url,
            connector,
            channel,
            keywords: None,
        })
    }

    pub fn url(&self) -> &EndpointUrl {
        &self.url
    }

    /// Keyword names, fetched on first use and cached afterwards
    pub async fn keyword_names(&mut self) -> Result<Vec<String>> {
        if let Some(keywords) = &self.keywords {
            return Ok(keywords.clone());
        }

        let value = self.channel.invoke(library::GET_KEYWORD_NAMES, Vec::new()).await?;
        let keywords: Vec<String> = serde_json::from_value(value).map_err(|e| {
            Error::Internal(format!("{} returned malformed keyword names: {}", self.url, e))
        })?;
        self.keywords = Some(keywords.clone());
        Ok(keywords)
    }

    /// Membership check against the cached names; false before they are fetched
    pub fn has_keyword(&self, name: &str) -> bool {
        self.keywords
            .as_ref()
            .is_some_and(|keywords| keywords.iter().any(|k| k == name))
    }

    /// Run a keyword, reconnecting once if the connection dropped
    pub async fn run_keyword(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        let call = vec![Value::String(name.to_string()), Value::Array(args)];

        let first = self.channel.invoke(library::RUN_KEYWORD, call.clone()).await;
        match first {
            Err(e) if e.is_connectivity() => {
                tracing::debug!("Lost connection to {} ({}), reconnecting", self.url, e);
                self.reconnect().await?;
                self.channel.invoke(library::RUN_KEYWORD, call).await
            }
            result => result,
        }
    }

    pub async fn close(&mut self) {
        self.channel.close().await;
    }

    async fn reconnect(&mut self) -> Result<()> {
        self.channel.close().await;
        self.channel = self.connector.connect(&self.url, KEYWORD_LIBRARY).await?;
        Ok(())
    }
}
