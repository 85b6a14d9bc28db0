//! Lifecycle keywords handled by the registry itself
//!
//! Their signatures are declared statically so the host can answer argument
//! and documentation queries without asking any application.

use serde_json::Value;

use crate::common::{normalize, timestr::DEFAULT_TIMEOUT, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalKeyword {
    StartApplication,
    ApplicationStarted,
    SwitchToApplication,
    CloseApplication,
    CloseAllApplications,
    TakeLibrariesIntoUse,
    TakeLibraryIntoUse,
}

#[derive(Debug, Clone, Copy)]
pub enum Param {
    Required(&'static str),
    /// Optional argument with the default shown to users, if any
    Optional(&'static str, Option<&'static str>),
    Variadic(&'static str),
}

#[derive(Debug)]
pub struct KeywordSpec {
    pub keyword: LocalKeyword,
    pub name: &'static str,
    pub params: &'static [Param],
    pub doc: &'static str,
}

pub static LOCAL_KEYWORDS: &[KeywordSpec] = &[
    KeywordSpec {
        keyword: LocalKeyword::StartApplication,
        name: "start_application",
        params: &[
            Param::Required("alias"),
            Param::Required("command"),
            Param::Optional("timeout", Some(DEFAULT_TIMEOUT)),
            Param::Optional("port", None),
        ],
        doc: "Launches `command` through the agent and connects to it.\n\n\
              The application is registered under `alias`, which must not be in \
              use. `timeout` limits how long to wait for the application to \
              publish its importer. With `port` the importer is published on \
              that port and contacted directly instead of through the \
              rendezvous file.",
    },
    KeywordSpec {
        keyword: LocalKeyword::ApplicationStarted,
        name: "application_started",
        params: &[
            Param::Required("alias"),
            Param::Optional("timeout", Some(DEFAULT_TIMEOUT)),
            Param::Optional("rmi_url", None),
        ],
        doc: "Connects to an application that was started by other means.\n\n\
              The importer URL is read from the rendezvous file under `alias` \
              unless `rmi_url` is given. The connected application becomes the \
              active one.",
    },
    KeywordSpec {
        keyword: LocalKeyword::SwitchToApplication,
        name: "switch_to_application",
        params: &[Param::Required("alias")],
        doc: "Makes the application registered under `alias` the active one.",
    },
    KeywordSpec {
        keyword: LocalKeyword::CloseApplication,
        name: "close_application",
        params: &[Param::Optional("alias", None)],
        doc: "Closes the application registered under `alias`, or the active \
              application when no alias is given. The alias is released even \
              if closing fails.",
    },
    KeywordSpec {
        keyword: LocalKeyword::CloseAllApplications,
        name: "close_all_applications",
        params: &[],
        doc: "Closes every registered application. Failures are logged and do \
              not stop the remaining applications from being closed.",
    },
    KeywordSpec {
        keyword: LocalKeyword::TakeLibrariesIntoUse,
        name: "take_libraries_into_use",
        params: &[Param::Variadic("library_names")],
        doc: "Imports the given libraries into the active application. \
              Keywords resolve to the first imported library that has them.",
    },
    KeywordSpec {
        keyword: LocalKeyword::TakeLibraryIntoUse,
        name: "take_library_into_use",
        params: &[Param::Required("library_name")],
        doc: "Imports one library into the active application and returns the \
              names of the keywords it provides.",
    },
];

/// Positional arguments bound to a keyword's parameters
#[derive(Debug, Default)]
pub struct BoundArgs {
    values: Vec<Option<String>>,
    rest: Vec<String>,
}

impl BoundArgs {
    /// Value of the parameter at `index`; `None` for omitted optionals
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    /// Value of a required parameter
    pub fn required(&self, index: usize) -> &str {
        self.get(index).unwrap_or_default()
    }

    pub fn rest(&self) -> &[String] {
        &self.rest
    }
}

impl KeywordSpec {
    /// Look up a local keyword, ignoring case, spaces and underscores
    pub fn find(name: &str) -> Option<&'static KeywordSpec> {
        let wanted = normalize(name);
        LOCAL_KEYWORDS.iter().find(|spec| normalize(spec.name) == wanted)
    }

    /// Argument signature such as `["alias", "timeout=60 seconds", "*names"]`
    pub fn arguments(&self) -> Vec<String> {
        self.params
            .iter()
            .map(|param| match param {
                Param::Required(name) => name.to_string(),
                Param::Optional(name, Some(default)) => format!("{}={}", name, default),
                Param::Optional(name, None) => format!("{}=", name),
                Param::Variadic(name) => format!("*{}", name),
            })
            .collect()
    }

    /// Bind positional arguments, checking arity
    ///
    /// Strings are taken as-is, `null` counts as omitted and any other JSON
    /// value is used in its textual form.
    pub fn bind(&self, args: Vec<Value>) -> Result<BoundArgs> {
        let fixed = self
            .params
            .iter()
            .filter(|p| !matches!(p, Param::Variadic(_)))
            .count();
        let required = self
            .params
            .iter()
            .filter(|p| matches!(p, Param::Required(_)))
            .count();
        let variadic = self.params.iter().any(|p| matches!(p, Param::Variadic(_)));

        if args.len() < required || (!variadic && args.len() > fixed) {
            let expected = if variadic {
                format!("at least {}", required)
            } else if required == fixed {
                required.to_string()
            } else {
                format!("{} to {}", required, fixed)
            };
            return Err(Error::invalid_arguments(
                self.name,
                format!("expected {} arguments, got {}", expected, args.len()),
            ));
        }

        let mut args = args.into_iter().map(text);
        let mut bound = BoundArgs::default();
        for param in self.params {
            match param {
                Param::Required(name) => {
                    let value = args.next().flatten().ok_or_else(|| {
                        Error::invalid_arguments(self.name, format!("'{}' must not be null", name))
                    })?;
                    bound.values.push(Some(value));
                }
                Param::Optional(..) => bound.values.push(args.next().flatten()),
                Param::Variadic(_) => bound.rest.extend(args.by_ref().flatten()),
            }
        }
        Ok(bound)
    }
}

fn text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_find_ignores_case_spaces_and_underscores() {
        let spec = KeywordSpec::find("Application Started").unwrap();
        assert_eq!(spec.keyword, LocalKeyword::ApplicationStarted);
        assert_eq!(
            KeywordSpec::find("TAKE_libraries intouse").unwrap().keyword,
            LocalKeyword::TakeLibrariesIntoUse
        );
        assert!(KeywordSpec::find("Echo").is_none());
    }

    #[test]
    fn test_arguments() {
        let spec = KeywordSpec::find("start_application").unwrap();
        assert_eq!(
            spec.arguments(),
            vec!["alias", "command", "timeout=60 seconds", "port="]
        );
        let spec = KeywordSpec::find("take_libraries_into_use").unwrap();
        assert_eq!(spec.arguments(), vec!["*library_names"]);
        assert!(KeywordSpec::find("close_all_applications")
            .unwrap()
            .arguments()
            .is_empty());
    }

    #[test]
    fn test_bind_optional_and_numbers() {
        let spec = KeywordSpec::find("start_application").unwrap();
        let bound = spec
            .bind(vec![json!("A"), json!("myapp --flag"), json!(null), json!(4000)])
            .unwrap();
        assert_eq!(bound.required(0), "A");
        assert_eq!(bound.required(1), "myapp --flag");
        assert_eq!(bound.get(2), None);
        assert_eq!(bound.get(3), Some("4000"));

        let bound = spec.bind(vec![json!("A"), json!("myapp")]).unwrap();
        assert_eq!(bound.get(2), None);
        assert_eq!(bound.get(3), None);
    }

    #[test]
    fn test_bind_variadic() {
        let spec = KeywordSpec::find("take_libraries_into_use").unwrap();
        let bound = spec.bind(vec![json!("a.Lib"), json!("b.Lib")]).unwrap();
        assert_eq!(bound.rest(), ["a.Lib", "b.Lib"]);
        assert!(spec.bind(vec![]).unwrap().rest().is_empty());
    }

    #[test]
    fn test_bind_arity_errors() {
        let spec = KeywordSpec::find("switch_to_application").unwrap();
        let err = spec.bind(vec![]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Keyword 'switch_to_application' got invalid arguments: expected 1 arguments, got 0"
        );
        assert!(spec.bind(vec![json!("A"), json!("B")]).is_err());
        assert!(spec.bind(vec![json!(null)]).is_err());

        let spec = KeywordSpec::find("application_started").unwrap();
        let err = spec.bind(vec![]).unwrap_err();
        assert!(err.to_string().contains("expected 1 to 3 arguments"));
    }
}
