//! Test harness for building synthetic function tables
//!
//! Provides a small builder so tests can describe call graphs and
//! variable sets without the TOML loader, plus helpers to run the
//! pipeline with a chosen platform and strategy.

use shade::config::PlatformConfig;
use shade::table::{
    CallSite, EntryKind, Function, FunctionTable, Signature, StorageWish, Variable,
};
use shade::{AllocError, CoalesceStrategy, ProgramLayout, allocate};

/// Declarative description of one function; call targets are resolved
/// by name once the whole table is assembled.
pub struct FnSpec {
    function: Function,
    calls: Vec<String>,
}

impl FnSpec {
    pub fn new(name: &str) -> Self {
        Self { function: Function::new(name), calls: Vec::new() }
    }

    pub fn entry(mut self, kind: EntryKind) -> Self {
        self.function.entry = Some(kind);
        self
    }

    pub fn recursive(mut self) -> Self {
        self.function.declared_recursive = true;
        self
    }

    pub fn calls(mut self, name: &str) -> Self {
        self.calls.push(name.to_string());
        self
    }

    pub fn returns(mut self, bytes: u16) -> Self {
        self.function.signature.returns = bytes;
        self
    }

    pub fn var(mut self, variable: Variable) -> Self {
        if variable.is_parameter {
            self.function.signature.params.push(variable.size);
        }
        self.function.variables.push(variable);
        self
    }

    pub fn local(self, name: &str, size: u16) -> Self {
        self.var(Variable::new(name, size))
    }

    pub fn param(self, name: &str, size: u16) -> Self {
        let mut v = Variable::new(name, size);
        v.is_parameter = true;
        self.var(v)
    }

    pub fn pointer(self, name: &str, uses: u32) -> Self {
        let mut v = Variable::new(name, 2);
        v.is_pointer = true;
        v.use_count = uses;
        self.var(v)
    }

    pub fn zp_local(self, name: &str, size: u16) -> Self {
        let mut v = Variable::new(name, size);
        v.storage_wish = StorageWish::RequireZeroPage;
        self.var(v)
    }

    pub fn ram_local(self, name: &str, size: u16) -> Self {
        let mut v = Variable::new(name, size);
        v.storage_wish = StorageWish::RequireRam;
        self.var(v)
    }

    pub fn volatile(self, name: &str, size: u16) -> Self {
        let mut v = Variable::new(name, size);
        v.is_volatile = true;
        self.var(v)
    }

    pub fn fixed(self, name: &str, size: u16, address: u16) -> Self {
        let mut v = Variable::new(name, size);
        v.is_volatile = true;
        v.fixed_address = Some(address);
        self.var(v)
    }

    pub fn indirect_call(mut self, params: Vec<u16>, returns: u16) -> Self {
        self.function
            .call_sites
            .push(CallSite::Indirect(Signature { params, returns }));
        self
    }
}

/// Assemble a table from specs, resolving call names to ids.
pub fn build(specs: Vec<FnSpec>) -> FunctionTable {
    let mut table = FunctionTable::new();
    let calls: Vec<Vec<String>> = specs.iter().map(|s| s.calls.clone()).collect();
    for spec in specs {
        table.add(spec.function);
    }
    for (index, names) in calls.iter().enumerate() {
        let caller = shade::table::FunctionId(index as u32);
        for name in names {
            let callee = table
                .lookup(name)
                .unwrap_or_else(|| panic!("call to unknown function '{}'", name));
            table.get_mut(caller).call_sites.push(CallSite::Direct(callee));
        }
    }
    table
}

/// Run the full pipeline with the default strategy on the C64 map.
pub fn run(table: &FunctionTable) -> Result<ProgramLayout, Vec<AllocError>> {
    allocate(table, &PlatformConfig::c64(), CoalesceStrategy::LargestFirst)
}

/// Run with an explicit platform and strategy.
pub fn run_with(
    table: &FunctionTable,
    platform: &PlatformConfig,
    strategy: CoalesceStrategy,
) -> Result<ProgramLayout, Vec<AllocError>> {
    allocate(table, platform, strategy)
}
