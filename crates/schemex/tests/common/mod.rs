//! Helpers shared by the integration tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::mpsc::{self, Receiver};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use schemex::{Console, Error, Module, ModuleExports, ModuleResolver, Result};

/// Console whose streams are captured in channels.
pub struct Captured {
    pub console: Console,
    pub out: Receiver<String>,
    pub diag: Receiver<String>,
}

impl Captured {
    pub fn new() -> Self {
        let (out_tx, out) = mpsc::channel();
        let (diag_tx, diag) = mpsc::channel();
        Self {
            console: Console::with_sinks(out_tx, diag_tx),
            out,
            diag,
        }
    }

    pub fn stdout(&self) -> String {
        self.out.try_iter().collect()
    }

    pub fn diagnostics(&self) -> Vec<String> {
        self.diag.try_iter().collect()
    }
}

/// Resolver serving a fixed module value, or a fixed evaluation error.
pub struct StaticResolver {
    module: Mutex<std::result::Result<Value, String>>,
}

impl StaticResolver {
    pub fn new(module: Value) -> Self {
        Self {
            module: Mutex::new(Ok(module)),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            module: Mutex::new(Err(message.to_string())),
        }
    }

    pub fn set(&self, module: Value) {
        *self.module.lock().unwrap() = Ok(module);
    }
}

#[async_trait]
impl ModuleResolver for StaticResolver {
    async fn load(&self, path: &Path) -> Result<Module> {
        match &*self.module.lock().unwrap() {
            Ok(Value::Object(bindings)) => Ok(Module {
                path: path.to_path_buf(),
                exports: ModuleExports::new(bindings.clone()),
                dependencies: Vec::new(),
            }),
            Ok(_) => Err(Error::evaluate(path, "not a mapping")),
            Err(message) => Err(Error::evaluate(path, message.as_str())),
        }
    }
}

/// A `{ name: string, age: number }` module with a default export.
pub fn person_module() -> Value {
    serde_json::json!({
        "default": {
            "type": "object",
            "shape": {
                "name": { "type": "string" },
                "age": { "type": "number" }
            }
        }
    })
}
