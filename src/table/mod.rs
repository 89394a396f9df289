//! Function Table
//!
//! The input side of the allocator: a flat arena of functions, each with
//! its ordered variable list and call sites. Everything downstream
//! refers to functions and variables by dense indices into this table,
//! so cyclic call graphs are plain index references with no ownership
//! concerns.

pub mod loader;

use rustc_hash::FxHashMap as HashMap;

/// Dense index of a function in the [`FunctionTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FunctionId(pub u32);

impl FunctionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifies one variable as (owning function, position in its list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableId {
    pub function: FunctionId,
    pub index: u32,
}

/// One interrupt source (or the implicit main line, thread 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub u8);

/// The implicit main-line thread.
pub const MAIN_LINE: ThreadId = ThreadId(0);

/// Set of threads a function may run on, as a bitmask.
///
/// Realistic 6502 targets have a handful of interrupt sources (IRQ, NMI,
/// BRK), so 32 bits is plenty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThreadSet(u32);

impl ThreadSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn single(thread: ThreadId) -> Self {
        Self(1 << thread.0)
    }

    pub fn insert(&mut self, thread: ThreadId) {
        self.0 |= 1 << thread.0;
    }

    pub fn contains(self, thread: ThreadId) -> bool {
        self.0 & (1 << thread.0) != 0
    }

    pub fn union(self, other: ThreadSet) -> ThreadSet {
        Self(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when the set names exactly one thread.
    pub fn is_singleton(self) -> bool {
        self.0 != 0 && self.0 & (self.0 - 1) == 0
    }

    pub fn iter(self) -> impl Iterator<Item = ThreadId> {
        (0..32).filter(move |b| self.0 & (1 << b) != 0).map(ThreadId)
    }
}

/// Where the author asked a variable to live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageWish {
    #[default]
    Default,
    RequireZeroPage,
    RequireRam,
}

/// How a function's parameters and locals are passed and stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallingConvention {
    /// Fixed-address storage, zero call overhead. The default.
    #[default]
    Static,
    /// Explicit stack frames; required for recursive functions.
    StackFrame,
}

/// Why a function is an entry point, if it is one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Main-line entry (the reset vector).
    Reset,
    /// Maskable interrupt handler.
    Irq,
    /// Non-maskable interrupt handler.
    Nmi,
}

impl EntryKind {
    pub fn label(self) -> &'static str {
        match self {
            EntryKind::Reset => "reset",
            EntryKind::Irq => "irq",
            EntryKind::Nmi => "nmi",
        }
    }
}

/// Byte-level shape of a function, used to resolve indirect calls:
/// an indirect call site conservatively targets every function whose
/// signature matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Byte size of each parameter, in declaration order.
    pub params: Vec<u16>,
    /// Byte size of the return value (0 for none).
    pub returns: u16,
}

/// One call site inside a function body.
#[derive(Debug, Clone)]
pub enum CallSite {
    /// Direct `jsr` to a known function.
    Direct(FunctionId),
    /// Call through a function-typed variable; matched by signature.
    Indirect(Signature),
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    /// Size in bytes.
    pub size: u16,
    pub storage_wish: StorageWish,
    /// Static occurrence count, used for zero-page weighting.
    pub use_count: u32,
    pub is_parameter: bool,
    /// Hardware-mapped; never coalesced, never cached.
    pub is_volatile: bool,
    /// True for pointer-typed variables (they benefit most from the
    /// zero page's indirect addressing modes).
    pub is_pointer: bool,
    /// Explicit hardware address, if the author pinned one.
    pub fixed_address: Option<u16>,
}

impl Variable {
    pub fn new(name: impl Into<String>, size: u16) -> Self {
        Self {
            name: name.into(),
            size,
            storage_wish: StorageWish::Default,
            use_count: 1,
            is_parameter: false,
            is_volatile: false,
            is_pointer: false,
            fixed_address: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    /// Parameters first, then locals and temporaries, in declaration order.
    pub variables: Vec<Variable>,
    pub call_sites: Vec<CallSite>,
    pub signature: Signature,
    /// Author opted in to recursion; validated by the recursion pass.
    pub declared_recursive: bool,
    pub entry: Option<EntryKind>,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            call_sites: Vec::new(),
            signature: Signature { params: Vec::new(), returns: 0 },
            declared_recursive: false,
            entry: None,
        }
    }

    /// This function's parameters, in declaration order.
    pub fn parameters<'a>(
        &'a self,
        id: FunctionId,
    ) -> impl Iterator<Item = (VariableId, &'a Variable)> + 'a {
        self.variables
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_parameter)
            .map(move |(i, v)| (VariableId { function: id, index: i as u32 }, v))
    }

    /// True when any variable is hardware-mapped.
    pub fn touches_volatile(&self) -> bool {
        self.variables.iter().any(|v| v.is_volatile)
    }

    /// Total bytes of variables that need placement in the static frame
    /// (excludes hardware-pinned variables).
    pub fn frame_bytes(&self) -> u32 {
        self.variables
            .iter()
            .filter(|v| v.fixed_address.is_none())
            .map(|v| v.size as u32)
            .sum()
    }
}

/// Flat arena of all functions in the compilation unit.
///
/// Built fresh per compilation; nothing here survives a run.
#[derive(Debug, Default)]
pub struct FunctionTable {
    functions: Vec<Function>,
    by_name: HashMap<String, FunctionId>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, function: Function) -> FunctionId {
        let id = FunctionId(self.functions.len() as u32);
        self.by_name.insert(function.name.clone(), id);
        self.functions.push(function);
        id
    }

    pub fn get(&self, id: FunctionId) -> &Function {
        &self.functions[id.index()]
    }

    pub fn get_mut(&mut self, id: FunctionId) -> &mut Function {
        &mut self.functions[id.index()]
    }

    pub fn lookup(&self, name: &str) -> Option<FunctionId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = FunctionId> {
        (0..self.functions.len() as u32).map(FunctionId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FunctionId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(i, f)| (FunctionId(i as u32), f))
    }

    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.get(id.function).variables[id.index as usize]
    }

    /// Qualified `function::variable` name, used for deterministic
    /// symbol naming in diagnostics and the layout report.
    pub fn qualified_name(&self, id: VariableId) -> String {
        format!("{}::{}", self.get(id.function).name, self.variable(id).name)
    }
}
