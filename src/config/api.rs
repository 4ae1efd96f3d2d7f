//! lark::options - editor options from init scripts
//!
//! Usage in Rhai:
//! ```rhai
//! lark::options::set("ignorecase", true);
//! lark::options::set("shiftwidth", 4);
//! lark::options::set("iskeyword", "@,48-57,_,-");
//! lark::options::append("viminfo", "f1");
//! ```
//!
//! Every write goes to the global value, which new editors start from.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rhai::{Array, Dynamic, EvalAltResult, Module};

use crate::options::{OptionError, OptionScope, OptionService, OptionValue};
use crate::script::Value;

type Shared = Arc<RwLock<OptionService>>;

fn read(options: &Shared) -> RwLockReadGuard<'_, OptionService> {
    options.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(options: &Shared) -> RwLockWriteGuard<'_, OptionService> {
    options.write().unwrap_or_else(PoisonError::into_inner)
}

fn script_error(err: OptionError) -> Box<EvalAltResult> {
    err.to_string().into()
}

/// Create the options module over a shared option service
pub fn create_module(options: Shared) -> Module {
    let mut module = Module::new();

    // set(name, bool)
    {
        let o = Arc::clone(&options);
        module.set_native_fn(
            "set",
            move |name: &str, enabled: bool| -> Result<(), Box<EvalAltResult>> {
                write(&o)
                    .set_value(OptionScope::Global, name, OptionValue::Boolean(enabled))
                    .map_err(script_error)
            },
        );
    }

    // set(name, i64)
    {
        let o = Arc::clone(&options);
        module.set_native_fn(
            "set",
            move |name: &str, number: i64| -> Result<(), Box<EvalAltResult>> {
                write(&o)
                    .set_option_value(OptionScope::Global, name, &Value::Integer(number))
                    .map_err(script_error)
            },
        );
    }

    // set(name, text): parsed as if typed after `=`
    {
        let o = Arc::clone(&options);
        module.set_native_fn(
            "set",
            move |name: &str, text: &str| -> Result<(), Box<EvalAltResult>> {
                write(&o)
                    .set_from_text(OptionScope::Global, name, text)
                    .map_err(script_error)
            },
        );
    }

    // get(name) -> bool | i64 | String
    {
        let o = Arc::clone(&options);
        module.set_native_fn(
            "get",
            move |name: &str| -> Result<Dynamic, Box<EvalAltResult>> {
                let value = read(&o).get(OptionScope::Global, name).map_err(script_error)?;
                Ok(match value {
                    OptionValue::Boolean(b) => Dynamic::from(b),
                    OptionValue::Number(n) => Dynamic::from(n),
                    other => Dynamic::from(other.to_string()),
                })
            },
        );
    }

    // is_set(name) -> bool
    {
        let o = Arc::clone(&options);
        module.set_native_fn(
            "is_set",
            move |name: &str| -> Result<bool, Box<EvalAltResult>> {
                read(&o).is_set(OptionScope::Global, name).map_err(script_error)
            },
        );
    }

    // append(name, operand)
    {
        let o = Arc::clone(&options);
        module.set_native_fn(
            "append",
            move |name: &str, operand: &str| -> Result<(), Box<EvalAltResult>> {
                write(&o)
                    .append_value(OptionScope::Global, name, operand)
                    .map_err(script_error)
            },
        );
    }

    // prepend(name, operand)
    {
        let o = Arc::clone(&options);
        module.set_native_fn(
            "prepend",
            move |name: &str, operand: &str| -> Result<(), Box<EvalAltResult>> {
                write(&o)
                    .prepend_value(OptionScope::Global, name, operand)
                    .map_err(script_error)
            },
        );
    }

    // remove(name, operand)
    {
        let o = Arc::clone(&options);
        module.set_native_fn(
            "remove",
            move |name: &str, operand: &str| -> Result<(), Box<EvalAltResult>> {
                write(&o)
                    .remove_value(OptionScope::Global, name, operand)
                    .map_err(script_error)
            },
        );
    }

    // reset(name)
    {
        let o = Arc::clone(&options);
        module.set_native_fn(
            "reset",
            move |name: &str| -> Result<(), Box<EvalAltResult>> {
                write(&o)
                    .reset_default(OptionScope::Global, name)
                    .map_err(script_error)
            },
        );
    }

    // list() -> Array of option names
    {
        let o = Arc::clone(&options);
        module.set_native_fn("list", move || -> Result<Array, Box<EvalAltResult>> {
            Ok(read(&o)
                .declarations()
                .map(|decl| Dynamic::from(decl.name.clone()))
                .collect())
        });
    }

    module
}
