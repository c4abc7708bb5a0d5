//! Lua-based plugin execution with per-invocation isolation.
//!
//! [`LuaExecutor`] implements the [`PluginExecutor`] trait by building a
//! fresh `mlua::Lua` state for every call: the module's code file is loaded
//! into a uniquely named chunk, the entry function is resolved and invoked
//! with the input mapping, and the return value is decoded back into JSON.
//! The state is dropped when the call returns, so global state mutated by
//! one invocation can never be observed by another, and identically named
//! modules from different plugins never collide.
//!
//! A wall-clock budget is enforced through an instruction-count hook that
//! aborts the VM once the deadline passes, and the allocator is capped by
//! the configured memory ceiling.

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use mlua::{Function, HookTriggers, Lua, LuaSerdeExt, Value as LuaValue, VmState};
use serde_json::Value;
use tracing::debug;

use plinth_config::InvocationLimits;

use crate::engine::{Invocation, PluginExecutor};
use crate::error::PluginError;

/// Tracing target for runtime operations.
const RUNTIME_TARGET: &str = "plinth_engine::runtime";

/// How many VM instructions run between deadline checks.
const DEADLINE_CHECK_INSTRUCTIONS: u32 = 8192;

/// Message carried by the error the deadline hook raises; the hook also
/// records the deadline hit in a flag so a plugin raising the same text
/// cannot masquerade as a timeout.
const BUDGET_EXCEEDED: &str = "invocation budget exceeded";

/// Executes plugins inside disposable Lua states.
///
/// # Example
///
/// ```rust,no_run
/// use plinth_config::InvocationLimits;
/// use plinth_engine::runtime::LuaExecutor;
///
/// let executor = LuaExecutor::new(InvocationLimits::default());
/// // engine.run(...) delegates each invocation to a fresh Lua state.
/// # let _ = executor;
/// ```
#[derive(Debug, Clone)]
pub struct LuaExecutor {
    limits: InvocationLimits,
}

impl LuaExecutor {
    /// Creates an executor enforcing the given per-invocation limits.
    #[must_use]
    pub const fn new(limits: InvocationLimits) -> Self {
        Self { limits }
    }

    /// Returns the limits applied to every invocation.
    #[must_use]
    pub const fn limits(&self) -> &InvocationLimits {
        &self.limits
    }

    fn fresh_state(
        &self,
        invocation: &Invocation<'_>,
    ) -> Result<(Lua, Arc<AtomicBool>), PluginError> {
        let lua = Lua::new();
        if let Some(limit) = self.limits.memory_limit_bytes() {
            lua.set_memory_limit(limit)
                .map_err(|err| PluginError::Internal {
                    message: format!("cannot apply memory limit to Lua state: {err}"),
                })?;
        }
        let deadline_hit = self.arm_deadline(&lua);
        debug!(
            target: RUNTIME_TARGET,
            plugin = invocation.plugin(),
            budget_ms = self.limits.budget_ms(),
            "created fresh execution context"
        );
        Ok((lua, deadline_hit))
    }

    /// Installs the deadline hook and returns the flag it sets on expiry.
    fn arm_deadline(&self, lua: &Lua) -> Arc<AtomicBool> {
        let deadline = Instant::now() + self.limits.budget();
        let deadline_hit = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&deadline_hit);
        lua.set_hook(
            HookTriggers::new().every_nth_instruction(DEADLINE_CHECK_INSTRUCTIONS),
            move |_lua, _debug| {
                if Instant::now() >= deadline {
                    flag.store(true, Ordering::Relaxed);
                    Err(mlua::Error::RuntimeError(BUDGET_EXCEEDED.to_owned()))
                } else {
                    Ok(VmState::Continue)
                }
            },
        );
        deadline_hit
    }

    fn fault(
        &self,
        invocation: &Invocation<'_>,
        deadline_hit: &AtomicBool,
        err: &mlua::Error,
    ) -> PluginError {
        if deadline_hit.load(Ordering::Relaxed) {
            return PluginError::Timeout {
                plugin: invocation.plugin().to_owned(),
                budget_ms: self.limits.budget_ms(),
            };
        }
        let message = err.to_string();
        let (message, trace) = split_traceback(&message);
        PluginError::Execution {
            plugin: invocation.plugin().to_owned(),
            message,
            trace,
        }
    }
}

impl PluginExecutor for LuaExecutor {
    fn invoke(&self, invocation: &Invocation<'_>) -> Result<Value, PluginError> {
        let source = fs::read_to_string(invocation.module_path()).map_err(|err| {
            PluginError::Load {
                plugin: invocation.plugin().to_owned(),
                message: format!(
                    "cannot read module file '{}': {err}",
                    invocation.module_path().display()
                ),
            }
        })?;

        let (lua, deadline_hit) = self.fresh_state(invocation)?;

        // Unique chunk name per plugin so diagnostics from two plugins with
        // identically named modules stay distinguishable.
        let chunk_name = format!("@{}/{}", invocation.id(), invocation.entry().module_file());
        let exports: LuaValue = lua
            .load(&source)
            .set_name(chunk_name)
            .eval()
            .map_err(|err| PluginError::Load {
                plugin: invocation.plugin().to_owned(),
                message: err.to_string(),
            })?;

        let entry_function = resolve_function(&lua, &exports, invocation)?;

        let input = lua
            .to_value(invocation.input())
            .map_err(|err| self.fault(invocation, &deadline_hit, &err))?;
        let returned: LuaValue = entry_function
            .call(input)
            .map_err(|err| self.fault(invocation, &deadline_hit, &err))?;

        lua.from_value(returned)
            .map_err(|err| PluginError::Execution {
                plugin: invocation.plugin().to_owned(),
                message: format!("plugin returned a value that cannot be serialised: {err}"),
                trace: None,
            })
    }
}

/// Resolves the entry function from the chunk's exports or the globals.
///
/// A module may either return a table of functions or define its entry
/// function as a global; the exported table takes precedence.
fn resolve_function(
    lua: &Lua,
    exports: &LuaValue,
    invocation: &Invocation<'_>,
) -> Result<Function, PluginError> {
    let name = invocation.entry().function();
    if let LuaValue::Table(table) = exports {
        if let Ok(Some(function)) = table.get::<Option<Function>>(name) {
            return Ok(function);
        }
    }
    lua.globals()
        .get::<Option<Function>>(name)
        .ok()
        .flatten()
        .ok_or_else(|| PluginError::MissingFunction {
            plugin: invocation.plugin().to_owned(),
            module: invocation.entry().module().to_owned(),
            function: name.to_owned(),
        })
}

/// Splits a Lua error message into its head and the stack traceback tail.
fn split_traceback(message: &str) -> (String, Option<String>) {
    message.find("stack traceback:").map_or_else(
        || (message.trim().to_owned(), None),
        |position| {
            let (head, tail) = message.split_at(position);
            (head.trim().to_owned(), Some(tail.trim().to_owned()))
        },
    )
}
