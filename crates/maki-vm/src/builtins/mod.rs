//! Native functions bridged into the global table.

use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;

use crate::core::value::Value;
use crate::vm::engine::VM;

/// Signature of a host function. Errors surface as runtime errors at the
/// call site's source line.
pub type NativeFn = fn(&mut VM, &[Value]) -> Result<Value, String>;

#[derive(Debug, Clone)]
pub struct Native {
    pub name: &'static str,
    pub function: NativeFn,
}

/// Install the builtin natives into a fresh global table.
pub fn register(globals: &mut IndexMap<String, Value>) {
    let natives = [
        Native {
            name: "println",
            function: println,
        },
        Native {
            name: "clock",
            function: clock,
        },
    ];

    for native in natives {
        globals.insert(native.name.to_string(), Value::Native(Rc::new(native)));
    }
}

/// Write each argument's display form, then a newline.
fn println(vm: &mut VM, args: &[Value]) -> Result<Value, String> {
    for arg in args {
        write!(vm.out, "{}", arg).map_err(|err| err.to_string())?;
    }
    writeln!(vm.out).map_err(|err| err.to_string())?;
    Ok(Value::Nil)
}

/// Seconds since the Unix epoch, whole-second precision.
fn clock(_vm: &mut VM, _args: &[Value]) -> Result<Value, String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| err.to_string())?;
    Ok(Value::Number(now.as_secs() as f64))
}
