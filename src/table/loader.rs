//! Project Loader
//!
//! Deserializes a TOML description of a compilation unit (the function
//! table the frontend would normally hand over in-process) so the
//! allocator can run standalone from the command line.
//!
//! ```toml
//! target = "c64"
//!
//! [[function]]
//! name = "main"
//! entry = "reset"
//! calls = ["update", "draw"]
//!
//! [[function.var]]
//! name = "frame"
//! size = 2
//! uses = 12
//! pointer = true
//! ```

use serde::Deserialize;

use crate::config::{PlatformConfig, ZpRange};
use crate::table::{
    CallSite, EntryKind, Function, FunctionTable, Signature, StorageWish, Variable,
};

/// A loaded compilation unit: the function table plus the resolved
/// platform (project target, overridden reservations applied).
#[derive(Debug)]
pub struct Project {
    pub table: FunctionTable,
    pub platform: PlatformConfig,
}

#[derive(Debug, Deserialize)]
struct ProjectFile {
    target: Option<String>,
    #[serde(default)]
    zp_reserved: Vec<ZpRange>,
    #[serde(default, rename = "function")]
    functions: Vec<FunctionDecl>,
}

#[derive(Debug, Deserialize)]
struct FunctionDecl {
    name: String,
    entry: Option<String>,
    #[serde(default)]
    recursive: bool,
    #[serde(default)]
    calls: Vec<String>,
    #[serde(default, rename = "indirect")]
    indirect_calls: Vec<IndirectDecl>,
    #[serde(default)]
    returns: u16,
    #[serde(default, rename = "var")]
    variables: Vec<VariableDecl>,
}

#[derive(Debug, Deserialize)]
struct IndirectDecl {
    #[serde(default)]
    params: Vec<u16>,
    #[serde(default)]
    returns: u16,
}

#[derive(Debug, Deserialize)]
struct VariableDecl {
    name: String,
    #[serde(default = "default_size")]
    size: u16,
    #[serde(default = "default_uses")]
    uses: u32,
    storage: Option<String>,
    #[serde(default)]
    parameter: bool,
    #[serde(default)]
    volatile: bool,
    #[serde(default)]
    pointer: bool,
    address: Option<u16>,
}

fn default_size() -> u16 {
    1
}

fn default_uses() -> u32 {
    1
}

#[derive(Debug, Clone)]
pub enum LoadError {
    Parse { reason: String },
    DuplicateFunction { name: String },
    UnknownCallee { function: String, callee: String },
    UnknownEntryKind { function: String, value: String },
    UnknownStorage { function: String, variable: String, value: String },
    UnknownTarget { name: String },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Parse { reason } => write!(f, "invalid project file: {}", reason),
            LoadError::DuplicateFunction { name } => {
                write!(f, "duplicate function '{}'", name)
            }
            LoadError::UnknownCallee { function, callee } => {
                write!(f, "function '{}' calls unknown function '{}'", function, callee)
            }
            LoadError::UnknownEntryKind { function, value } => {
                write!(
                    f,
                    "function '{}': unknown entry kind '{}' (expected reset, irq or nmi)",
                    function, value
                )
            }
            LoadError::UnknownStorage { function, variable, value } => {
                write!(
                    f,
                    "variable '{}::{}': unknown storage wish '{}' (expected zp or ram)",
                    function, variable, value
                )
            }
            LoadError::UnknownTarget { name } => {
                write!(f, "unknown target '{}' (expected c64, c128, vic20 or x16)", name)
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// Parse a project description. `override_target` (from the command
/// line) wins over the file's own `target` key.
pub fn load_str(text: &str, override_target: Option<&str>) -> Result<Project, LoadError> {
    let file: ProjectFile =
        toml::from_str(text).map_err(|e| LoadError::Parse { reason: e.to_string() })?;

    let target = override_target
        .map(str::to_owned)
        .or(file.target)
        .unwrap_or_else(|| "c64".to_string());
    let mut platform = PlatformConfig::by_name(&target)
        .ok_or(LoadError::UnknownTarget { name: target })?;
    platform.user_reserved.extend(file.zp_reserved);

    let mut table = FunctionTable::new();

    // First pass: register every function so calls can refer forward.
    for decl in &file.functions {
        if table.lookup(&decl.name).is_some() {
            return Err(LoadError::DuplicateFunction { name: decl.name.clone() });
        }
        let mut function = Function::new(decl.name.clone());
        function.declared_recursive = decl.recursive;
        function.entry = match decl.entry.as_deref() {
            None => None,
            Some("reset") => Some(EntryKind::Reset),
            Some("irq") => Some(EntryKind::Irq),
            Some("nmi") => Some(EntryKind::Nmi),
            Some(other) => {
                return Err(LoadError::UnknownEntryKind {
                    function: decl.name.clone(),
                    value: other.to_string(),
                });
            }
        };

        for var in &decl.variables {
            let mut variable = Variable::new(var.name.clone(), var.size);
            variable.use_count = var.uses;
            variable.is_parameter = var.parameter;
            variable.is_volatile = var.volatile;
            variable.is_pointer = var.pointer;
            variable.fixed_address = var.address;
            variable.storage_wish = match var.storage.as_deref() {
                None => StorageWish::Default,
                Some("zp") => StorageWish::RequireZeroPage,
                Some("ram") => StorageWish::RequireRam,
                Some(other) => {
                    return Err(LoadError::UnknownStorage {
                        function: decl.name.clone(),
                        variable: var.name.clone(),
                        value: other.to_string(),
                    });
                }
            };
            function.variables.push(variable);
        }

        function.signature = Signature {
            params: function
                .variables
                .iter()
                .filter(|v| v.is_parameter)
                .map(|v| v.size)
                .collect(),
            returns: decl.returns,
        };
        table.add(function);
    }

    // Second pass: resolve call edges.
    for decl in &file.functions {
        let caller = table.lookup(&decl.name).expect("registered above");
        let mut sites = Vec::new();
        for callee in &decl.calls {
            let id = table.lookup(callee).ok_or_else(|| LoadError::UnknownCallee {
                function: decl.name.clone(),
                callee: callee.clone(),
            })?;
            sites.push(CallSite::Direct(id));
        }
        for indirect in &decl.indirect_calls {
            sites.push(CallSite::Indirect(Signature {
                params: indirect.params.clone(),
                returns: indirect.returns,
            }));
        }
        table.get_mut(caller).call_sites = sites;
    }

    Ok(Project { table, platform })
}
