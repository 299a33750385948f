//! Capability registry for engine-invocable tools.
//!
//! Tools form a closed, explicitly registered set: the engine may only
//! request names that were registered up front, and every request is
//! schema-checked before the handler runs. A request for an unregistered
//! name is a configuration error, not a lookup miss.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

use anyhow::{Context, Result, bail};
use jsonschema::Draft;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::core::usage::{BudgetExceededError, UsageLedger, UsageLimits};

/// Declared interface of a registered tool, shared with the engine.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema (Draft 2020-12) for the arguments object.
    pub parameters: Value,
}

/// Session context threaded into every tool call.
///
/// Carries the session ledger by mutable reference so nested work inside a
/// handler bills the same session total.
pub struct ToolContext<'a> {
    pub ledger: &'a mut UsageLedger,
    pub limits: &'a UsageLimits,
}

/// A callable capability the engine may request by name.
///
/// Handlers take `&self` so a registry can be shared read-only across
/// sessions; per-invocation state lives in the arguments and context.
pub trait Tool {
    fn spec(&self) -> ToolSpec;

    /// Invoke with schema-valid arguments.
    ///
    /// A returned error is surfaced to the engine as an observation, not a
    /// session failure. [`BudgetExceededError`] is the exception and stays
    /// fatal.
    fn call(&self, arguments: &Value, ctx: &mut ToolContext<'_>) -> Result<Value>;
}

/// The engine requested a name that was never registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownToolError {
    pub name: String,
}

impl fmt::Display for UnknownToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown tool '{}'", self.name)
    }
}

impl Error for UnknownToolError {}

/// Failure modes of [`ToolRegistry::invoke`].
#[derive(Debug)]
pub enum InvokeError {
    /// Unregistered name. Fatal upstream: indicates a configuration error.
    Unknown(UnknownToolError),
    /// The session budget ran out inside the handler. Fatal upstream.
    Budget(BudgetExceededError),
    /// The arguments failed schema validation or the handler failed.
    /// Recoverable upstream: fed back to the engine as an observation.
    Failed { name: String, message: String },
}

struct Entry {
    tool: Box<dyn Tool>,
    spec: ToolSpec,
    arguments_schema: jsonschema::Validator,
}

/// Maps tool names to callable capabilities with declared schemas.
#[derive(Default)]
pub struct ToolRegistry {
    entries: BTreeMap<String, Entry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its declared name.
    ///
    /// Fails on duplicate names and on argument schemas that do not compile.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<()> {
        let spec = tool.spec();
        if self.entries.contains_key(&spec.name) {
            bail!("tool '{}' is already registered", spec.name);
        }
        let arguments_schema = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(&spec.parameters)
            .with_context(|| format!("compile arguments schema for tool '{}'", spec.name))?;
        debug!(tool = %spec.name, "registered tool");
        self.entries.insert(
            spec.name.clone(),
            Entry {
                tool,
                spec,
                arguments_schema,
            },
        );
        Ok(())
    }

    /// Declared specs of all registered tools, in deterministic name order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.entries.values().map(|e| e.spec.clone()).collect()
    }

    /// Invoke a registered tool with the given arguments.
    pub fn invoke(
        &self,
        name: &str,
        arguments: &Value,
        ctx: &mut ToolContext<'_>,
    ) -> Result<Value, InvokeError> {
        let entry = self.entries.get(name).ok_or_else(|| {
            InvokeError::Unknown(UnknownToolError {
                name: name.to_string(),
            })
        })?;

        let violations: Vec<String> = entry
            .arguments_schema
            .iter_errors(arguments)
            .map(|err| err.to_string())
            .collect();
        if !violations.is_empty() {
            return Err(InvokeError::Failed {
                name: name.to_string(),
                message: format!("invalid arguments: {}", violations.join("; ")),
            });
        }

        entry.tool.call(arguments, ctx).map_err(|err| {
            if let Some(budget) = err.downcast_ref::<BudgetExceededError>() {
                return InvokeError::Budget(budget.clone());
            }
            InvokeError::Failed {
                name: name.to_string(),
                message: format!("{err:#}"),
            }
        })
    }
}
