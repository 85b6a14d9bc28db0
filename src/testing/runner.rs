//! Suite runner implementation
//!
//! Executes keyword suites through a [`ConnectorRegistry`] and checks each
//! step's structured result rather than printed output.

use std::path::Path;
use std::process::Stdio;

use colored::Colorize;
use serde_json::Value;
use tokio::process::Command as TokioCommand;

use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::connector::ConnectorRegistry;

use super::config::{Expectation, KeywordStep, Suite};

/// Result of a suite run
#[derive(Debug)]
pub struct SuiteResult {
    pub name: String,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    pub error: Option<String>,
}

/// Load a suite from a YAML file
pub fn load_suite(path: &Path) -> Result<Suite> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    serde_yaml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse suite '{}': {}", path.display(), e)))
}

/// Run a keyword suite from a YAML file
pub async fn run_suite(path: &Path, verbose: bool) -> Result<SuiteResult> {
    let suite = load_suite(path)?;

    let mut config = Config::load()?;
    if let Some(rendezvous) = &suite.rendezvous {
        let suite_dir = path.parent().unwrap_or(Path::new("."));
        config.rendezvous.path = suite_dir.join(rendezvous);
    }

    print_header(&suite);

    if !suite.setup.is_empty() {
        println!("\n{}", "Setup:".cyan());
    }
    for step in &suite.setup {
        if verbose {
            println!("  $ {}", step.shell.dimmed());
        }

        let status = TokioCommand::new("sh")
            .arg("-c")
            .arg(&step.shell)
            .stdin(Stdio::null())
            .stdout(if verbose { Stdio::inherit() } else { Stdio::null() })
            .stderr(if verbose { Stdio::inherit() } else { Stdio::null() })
            .status()
            .await
            .map_err(|e| Error::Config(format!("Setup command failed to execute: {}", e)))?;

        if !status.success() {
            return Ok(SuiteResult {
                name: suite.name.clone(),
                passed: false,
                steps_run: 0,
                steps_total: suite.steps.len(),
                error: Some(format!(
                    "Setup command '{}' failed with exit code {:?}",
                    step.shell,
                    status.code()
                )),
            });
        }
        println!("  {} {}", "✓".green(), step.shell.dimmed());
    }

    let mut registry = ConnectorRegistry::new(&config);
    Ok(run_steps(&mut registry, &suite, verbose).await)
}

/// Run every step of `suite`, then close all applications
pub async fn run_steps(registry: &mut ConnectorRegistry, suite: &Suite, verbose: bool) -> SuiteResult {
    let steps_total = suite.steps.len();
    println!("\n{}", "Steps:".cyan());

    for (i, step) in suite.steps.iter().enumerate() {
        let step_num = i + 1;

        if let Err(e) = execute_step(registry, step, step_num, verbose).await {
            println!("  {} Step {}: {}", "✗".red(), step_num, e);
            registry.close_all_applications().await;

            return SuiteResult {
                name: suite.name.clone(),
                passed: false,
                steps_run: step_num,
                steps_total,
                error: Some(e.to_string()),
            };
        }
    }

    registry.close_all_applications().await;

    println!("\n{} {}\n", "✓".green().bold(), "Suite Passed".green().bold());

    SuiteResult {
        name: suite.name.clone(),
        passed: true,
        steps_run: steps_total,
        steps_total,
        error: None,
    }
}

fn print_header(suite: &Suite) {
    println!("\n{} {}", "Running Suite:".blue().bold(), suite.name.white().bold());
    if let Some(desc) = &suite.description {
        println!("  {}", desc.dimmed());
    }
}

/// Execute a single keyword step
async fn execute_step(
    registry: &mut ConnectorRegistry,
    step: &KeywordStep,
    step_num: usize,
    verbose: bool,
) -> Result<()> {
    let result = registry.run_keyword(&step.keyword, step.args.clone()).await;
    let label = describe(step);

    match (result, step.expect.as_ref()) {
        (Ok(value), expect) => {
            if let Some(exp) = expect {
                check_success(exp, &label)?;
            }
            check_value(&value, expect, &label)?;
            println!("  {} Step {}: {}", "✓".green(), step_num, label.dimmed());
            if verbose && !value.is_null() {
                println!("      => {}", value.to_string().dimmed());
            }
            Ok(())
        }
        (Err(e), Some(exp)) if exp.success == Some(false) => {
            if let Some(expected) = &exp.result_contains {
                if !e.to_string().contains(expected.as_str()) {
                    return Err(Error::TestAssertion(format!(
                        "Keyword '{}' failed with '{}', expected an error containing '{}'",
                        step.keyword, e, expected
                    )));
                }
            }
            println!(
                "  {} Step {}: {} (expected failure)",
                "✓".green(),
                step_num,
                label.dimmed()
            );
            Ok(())
        }
        (Err(e), _) => Err(e),
    }
}

fn check_success(exp: &Expectation, label: &str) -> Result<()> {
    if exp.success == Some(false) {
        return Err(Error::TestAssertion(format!(
            "'{}' expected success=false, got success=true",
            label
        )));
    }
    Ok(())
}

fn check_value(value: &Value, expect: Option<&Expectation>, label: &str) -> Result<()> {
    let Some(exp) = expect else {
        return Ok(());
    };

    if let Some(expected) = &exp.result {
        if expected != value {
            return Err(Error::TestAssertion(format!(
                "'{}' expected result {}, got {}",
                label, expected, value
            )));
        }
    }

    if let Some(expected) = &exp.result_contains {
        let actual = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if !actual.contains(expected.as_str()) {
            return Err(Error::TestAssertion(format!(
                "'{}' expected result containing '{}', got '{}'",
                label, expected, actual
            )));
        }
    }

    Ok(())
}

fn describe(step: &KeywordStep) -> String {
    if step.args.is_empty() {
        return step.keyword.clone();
    }
    let args: Vec<String> = step
        .args
        .iter()
        .map(|a| match a {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    format!("{}  {}", step.keyword, args.join("  "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::launch::{LaunchConfig, ProcessLauncher};
    use crate::connector::mock::MockConnector;

    const IMPORTER: &str = "rmi://localhost:4000/robotrmiservice";
    const LIB: &str = "rmi://localhost:4100/calc";

    struct NoLaunch;

    impl ProcessLauncher for NoLaunch {
        fn launch(&self, _config: &LaunchConfig) -> Result<()> {
            Ok(())
        }
    }

    fn registry(dir: &tempfile::TempDir) -> (MockConnector, ConnectorRegistry) {
        let connector = MockConnector::new();
        connector
            .importer(IMPORTER, &[("calc.Keywords", LIB)])
            .library(LIB, "calc", &["Add"]);
        let mut config = Config::default();
        config.rendezvous.path = dir.path().join("launcher.txt");
        let registry = ConnectorRegistry::with_parts(&config, connector.arc(), Box::new(NoLaunch));
        (connector, registry)
    }

    fn suite(yaml: &str) -> Suite {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_parse_suite() {
        let suite = suite(
            r#"
name: Calculator
description: Adds numbers
steps:
  - keyword: Application Started
    args: [Calc, 5 seconds, "rmi://localhost:4000/robotrmiservice"]
  - keyword: Add
    args: [1, 2]
    expect:
      result_contains: Add
  - keyword: Switch To Application
    args: [Nope]
    expect:
      success: false
"#,
        );
        assert_eq!(suite.name, "Calculator");
        assert!(suite.setup.is_empty());
        assert_eq!(suite.steps.len(), 3);
        assert_eq!(suite.steps[1].args, vec![serde_json::json!(1), serde_json::json!(2)]);
        assert_eq!(suite.steps[2].expect.as_ref().unwrap().success, Some(false));
    }

    #[tokio::test]
    async fn test_suite_passes_and_closes_applications() {
        let dir = tempfile::tempdir().unwrap();
        let (connector, mut registry) = registry(&dir);
        let suite = suite(
            r#"
name: Calculator
steps:
  - keyword: Application Started
    args: [Calc, 5 seconds, "rmi://localhost:4000/robotrmiservice"]
  - keyword: Take Library Into Use
    args: [calc.Keywords]
    expect:
      result: [Add]
  - keyword: Add
    args: [1, 2]
    expect:
      result_contains: calc
  - keyword: Switch To Application
    args: [Nope]
    expect:
      success: false
      result_contains: Nope
"#,
        );

        let result = run_steps(&mut registry, &suite, false).await;
        assert!(result.passed, "{:?}", result.error);
        assert_eq!(result.steps_run, 4);
        assert!(registry.aliases().is_empty());
        assert_eq!(
            connector.invocations_of(IMPORTER, crate::rpc::protocol::importer::CLOSE_SERVICE),
            1
        );
    }

    #[tokio::test]
    async fn test_failed_expectation_stops_suite() {
        let dir = tempfile::tempdir().unwrap();
        let (_connector, mut registry) = registry(&dir);
        let suite = suite(
            r#"
name: Failing
steps:
  - keyword: Application Started
    args: [Calc, 5 seconds, "rmi://localhost:4000/robotrmiservice"]
  - keyword: Take Library Into Use
    args: [calc.Keywords]
    expect:
      result: [Subtract]
  - keyword: Add
"#,
        );

        let result = run_steps(&mut registry, &suite, false).await;
        assert!(!result.passed);
        assert_eq!(result.steps_run, 2);
        assert!(result.error.unwrap().contains("expected result"));
        assert!(registry.aliases().is_empty());
    }

    #[test]
    fn test_describe_step() {
        let step = KeywordStep {
            keyword: "Add".into(),
            args: vec![serde_json::json!("x"), serde_json::json!(2)],
            expect: None,
        };
        assert_eq!(describe(&step), "Add  x  2");
    }
}
