//! Libraries shipped with the agent

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Mutex, MutexGuard, OnceLock};

use async_trait::async_trait;
use serde_json::Value;

use crate::common::{timestr, Error, Result};

use super::library::{string_arg, Library};

/// Properties shared by every library instance in the agent process
fn properties() -> MutexGuard<'static, HashMap<String, String>> {
    static PROPERTIES: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
    PROPERTIES
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

/// General purpose keywords: process properties, echo and sleep
pub struct BuiltinKeywords;

impl BuiltinKeywords {
    pub const IDENTIFIER: &'static str = "remoteapps.BuiltinKeywords";

    const SET_PROPERTY: &'static str = "Set System Property";
    const GET_PROPERTY: &'static str = "Get System Property";
    const CLEAR_PROPERTY: &'static str = "Clear System Property";
    const ECHO: &'static str = "Echo";
    const SLEEP: &'static str = "Sleep";
}

#[async_trait]
impl Library for BuiltinKeywords {
    fn keyword_names(&self) -> Vec<String> {
        [
            Self::SET_PROPERTY,
            Self::GET_PROPERTY,
            Self::CLEAR_PROPERTY,
            Self::ECHO,
            Self::SLEEP,
        ]
        .map(String::from)
        .to_vec()
    }

    async fn run_keyword(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        match name {
            Self::SET_PROPERTY => {
                let key = string_arg(name, &args, 0, "name")?;
                let value = string_arg(name, &args, 1, "value")?;
                properties().insert(key, value);
                Ok(Value::Null)
            }
            Self::GET_PROPERTY => {
                let key = string_arg(name, &args, 0, "name")?;
                let value = properties().get(&key).cloned();
                Ok(value.map_or(Value::Null, Value::from))
            }
            Self::CLEAR_PROPERTY => {
                let key = string_arg(name, &args, 0, "name")?;
                let previous = properties().remove(&key);
                Ok(previous.map_or(Value::Null, Value::from))
            }
            Self::ECHO => Ok(Value::Array(args)),
            Self::SLEEP => {
                let time = string_arg(name, &args, 0, "time")?;
                let duration = timestr::parse_timeout(&time)?;
                tokio::time::sleep(duration).await;
                Ok(Value::Null)
            }
            other => Err(Error::UnknownKeyword(other.to_string())),
        }
    }
}

/// Writes fixed text to stdout and stderr and returns `true`
pub struct LoggingKeywords;

impl LoggingKeywords {
    pub const IDENTIFIER: &'static str = "remoteapps.LoggingKeywords";
    pub const KEYWORD: &'static str = "LoggingKeyword";
    pub const STDOUT_TEXT: &'static str = "mock keyword executing";
    pub const STDERR_TEXT: &'static str = "some error occurred";
}

#[async_trait]
impl Library for LoggingKeywords {
    fn keyword_names(&self) -> Vec<String> {
        vec![Self::KEYWORD.to_string()]
    }

    async fn run_keyword(&self, name: &str, _args: Vec<Value>) -> Result<Value> {
        if name != Self::KEYWORD {
            return Err(Error::UnknownKeyword(name.to_string()));
        }
        print!("{}", Self::STDOUT_TEXT);
        eprint!("{}", Self::STDERR_TEXT);
        std::io::stdout().flush()?;
        Ok(Value::Bool(true))
    }
}
