//! Module loading and import resolution
//!
//! A module is a JSON or YAML document whose top-level keys are its exports.
//! Values may pull in exports of other modules with an import node:
//!
//! ```yaml
//! default:
//!   type: object
//!   shape:
//!     address: { $import: "./common.yaml#address" }
//! ```
//!
//! Modules are evaluated from disk on every load; nothing is cached between
//! runs, so edits are always picked up.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Export name selecting a module's default export.
pub const DEFAULT_EXPORT: &str = "default";

/// Key marking an import node.
pub const IMPORT_KEY: &str = "$import";

/// The exported bindings of an evaluated module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleExports {
    bindings: Map<String, Value>,
}

impl ModuleExports {
    pub fn new(bindings: Map<String, Value>) -> Self {
        Self { bindings }
    }

    /// Look up an export by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Export names in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// An evaluated module with the files it was assembled from.
#[derive(Debug, Clone)]
pub struct Module {
    /// Absolute path to the module file
    pub path: PathBuf,
    pub exports: ModuleExports,
    /// Every imported file, direct or transitive
    pub dependencies: Vec<PathBuf>,
}

/// Loads a module with its exports and the files it imports.
///
/// Implementations must evaluate the module afresh on every call.
#[async_trait]
pub trait ModuleResolver: Send + Sync {
    async fn load(&self, path: &Path) -> Result<Module>;
}

/// Resolver evaluating JSON and YAML modules from the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsModuleResolver;

/// Bookkeeping for one top-level resolution.
#[derive(Default)]
struct Resolution {
    /// Modules currently being visited (for cycle detection)
    visiting: HashSet<PathBuf>,
    dependencies: Vec<PathBuf>,
}

type ResolveFuture<'a> = Pin<Box<dyn Future<Output = Result<Map<String, Value>>> + Send + 'a>>;

impl FsModuleResolver {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate the module at `path` and everything it imports.
    pub async fn resolve(&self, path: &Path) -> Result<Module> {
        let path = canonical(path, path)?;
        let mut resolution = Resolution::default();
        let bindings = self.resolve_module(path.clone(), &mut resolution).await?;

        Ok(Module {
            path,
            exports: ModuleExports::new(bindings),
            dependencies: resolution.dependencies,
        })
    }

    fn resolve_module<'a>(&'a self, path: PathBuf, resolution: &'a mut Resolution) -> ResolveFuture<'a> {
        Box::pin(async move {
            if resolution.visiting.contains(&path) {
                return Err(Error::CircularImport(path));
            }
            resolution.visiting.insert(path.clone());

            let source = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::read(&path, e))?;
            let mut bindings = match parse_module(&path, &source)? {
                Value::Object(bindings) => bindings,
                other => {
                    return Err(Error::evaluate(
                        &path,
                        format!("a module must be a mapping of exports, found {}", value_kind(&other)),
                    ))
                }
            };

            let mut specifiers = Vec::new();
            for value in bindings.values() {
                collect_imports(value, &mut specifiers);
            }

            let mut imported = HashMap::new();
            for specifier in specifiers {
                let value = self.resolve_import(&specifier, &path, resolution).await?;
                imported.insert(specifier, value);
            }

            for value in bindings.values_mut() {
                substitute_imports(value, &imported);
            }

            resolution.visiting.remove(&path);
            Ok(bindings)
        })
    }

    /// Resolve `./file.yaml#export` relative to the importing module.
    async fn resolve_import(&self, specifier: &str, from: &Path, resolution: &mut Resolution) -> Result<Value> {
        let (relative, export) = match specifier.split_once('#') {
            Some((relative, export)) => (relative, export),
            None => (specifier, DEFAULT_EXPORT),
        };

        let dir = from.parent().ok_or_else(|| Error::evaluate(from, "cannot get parent directory"))?;
        let target = dir.join(relative);
        if !target.exists() {
            return Err(Error::ModuleNotFound {
                module: relative.to_string(),
                from: from.to_path_buf(),
            });
        }
        let target = canonical(&target, from)?;

        if !resolution.dependencies.contains(&target) {
            resolution.dependencies.push(target.clone());
        }

        let mut bindings = self.resolve_module(target.clone(), resolution).await?;
        bindings.remove(export).ok_or_else(|| {
            Error::evaluate(
                from,
                format!("'{}' is not exported by {}", export, target.display()),
            )
        })
    }
}

#[async_trait]
impl ModuleResolver for FsModuleResolver {
    async fn load(&self, path: &Path) -> Result<Module> {
        let module = self.resolve(path).await?;
        tracing::debug!(
            module = %module.path.display(),
            exports = module.exports.len(),
            dependencies = ?module.dependencies,
            "module evaluated"
        );
        Ok(module)
    }
}

fn canonical(path: &Path, context: &Path) -> Result<PathBuf> {
    path.canonicalize().map_err(|e| Error::read(context, e))
}

/// Parse module source according to its extension.
///
/// Unknown extensions are tried as JSON, then as YAML.
fn parse_module(path: &Path, source: &str) -> Result<Value> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let parsed: std::result::Result<Value, String> = match extension.as_deref() {
        Some("json") => serde_json::from_str(source).map_err(|e| e.to_string()),
        Some("yaml") | Some("yml") => serde_yaml::from_str(source).map_err(|e| e.to_string()),
        _ => serde_json::from_str(source)
            .or_else(|_| serde_yaml::from_str(source))
            .map_err(|e| e.to_string()),
    };

    parsed.map_err(|message| Error::evaluate(path, message))
}

/// The import specifier if `value` is an import node.
fn import_specifier(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) if map.len() == 1 => map.get(IMPORT_KEY)?.as_str(),
        _ => None,
    }
}

fn collect_imports(value: &Value, specifiers: &mut Vec<String>) {
    if let Some(specifier) = import_specifier(value) {
        if !specifiers.iter().any(|s| s == specifier) {
            specifiers.push(specifier.to_string());
        }
        return;
    }

    match value {
        Value::Object(map) => map.values().for_each(|v| collect_imports(v, specifiers)),
        Value::Array(items) => items.iter().for_each(|v| collect_imports(v, specifiers)),
        _ => {}
    }
}

fn substitute_imports(value: &mut Value, imported: &HashMap<String, Value>) {
    if let Some(replacement) = import_specifier(value).and_then(|specifier| imported.get(specifier)) {
        *value = replacement.clone();
        return;
    }

    match value {
        Value::Object(map) => map.values_mut().for_each(|v| substitute_imports(v, imported)),
        Value::Array(items) => items.iter_mut().for_each(|v| substitute_imports(v, imported)),
        _ => {}
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "nothing",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
