//! Layout Emission
//!
//! Turns the coalescing, zero-page and convention decisions into the
//! final symbol table the code generator consumes: one address (or
//! frame offset) per variable, plus per-function frame sizes and
//! parameter plans. Equivalence classes are placed back to back in the
//! platform's data section; members of a class overlay the same base.

use rustc_hash::FxHashMap as HashMap;

use crate::alloc::coalesce::CoalesceResult;
use crate::alloc::convention::{ConventionInfo, ParamPlacement, ReturnPlacement};
use crate::alloc::zero_page::ZeroPageResult;
use crate::alloc::{AllocError, AllocWarning};
use crate::config::PlatformConfig;
use crate::graph::recursion::RecursionInfo;
use crate::table::{CallingConvention, FunctionId, FunctionTable, VariableId};

/// Closed set of storage regions; every consumer must handle all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    ZeroPage,
    Ram,
    /// Stack-frame storage; `address` is the offset inside the frame.
    Stack,
}

/// Final placement of one variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub region: Region,
    pub address: u16,
}

/// Per-function results for the code generator.
#[derive(Debug, Clone)]
pub struct FunctionLayout {
    pub frame_size: u16,
    pub convention: CallingConvention,
    pub params: Vec<ParamPlacement>,
    pub returns: ReturnPlacement,
}

/// The whole program's storage decisions.
#[derive(Debug)]
pub struct ProgramLayout {
    allocations: HashMap<VariableId, Allocation>,
    functions: Vec<FunctionLayout>,
    pub warnings: Vec<AllocWarning>,
}

impl ProgramLayout {
    pub fn allocation(&self, var: VariableId) -> Option<Allocation> {
        self.allocations.get(&var).copied()
    }

    pub fn function(&self, id: FunctionId) -> &FunctionLayout {
        &self.functions[id.index()]
    }

    /// Total bytes granted in the zero page.
    pub fn zero_page_bytes(&self, table: &FunctionTable) -> usize {
        self.allocations
            .iter()
            .filter(|(_, a)| a.region == Region::ZeroPage)
            .map(|(var, _)| table.variable(*var).size as usize)
            .sum()
    }

    /// Deterministic text report, one line per symbol in table order.
    pub fn report(&self, table: &FunctionTable, platform: &PlatformConfig) -> String {
        let mut out = String::new();
        out.push_str(&format!("; target {}\n", platform.name));
        for (id, function) in table.iter() {
            let layout = self.function(id);
            let convention = match layout.convention {
                CallingConvention::Static => "static",
                CallingConvention::StackFrame => "stack",
            };
            out.push_str(&format!(
                "{}: {} call, frame {} byte(s)\n",
                function.name, convention, layout.frame_size
            ));
            for (index, variable) in function.variables.iter().enumerate() {
                let var = VariableId { function: id, index: index as u32 };
                let Some(allocation) = self.allocation(var) else { continue };
                let place = match allocation.region {
                    Region::ZeroPage => format!("zp ${:02X}", allocation.address),
                    Region::Ram => format!("ram ${:04X}", allocation.address),
                    Region::Stack => format!("stack+{}", allocation.address),
                };
                out.push_str(&format!("  {}::{} = {}\n", function.name, variable.name, place));
            }
        }
        out
    }
}

/// Assemble the final layout. Collects every remaining error instead of
/// stopping at the first.
pub fn emit(
    table: &FunctionTable,
    platform: &PlatformConfig,
    recursion: &RecursionInfo,
    classes: &CoalesceResult,
    zero_page: &ZeroPageResult,
    conventions: &ConventionInfo,
) -> Result<ProgramLayout, Vec<AllocError>> {
    let mut errors = Vec::new();
    let mut allocations: HashMap<VariableId, Allocation> = HashMap::default();

    // Hardware-pinned variables first; they are independent of all
    // allocation decisions but must not collide with reserved ranges or
    // the managed data section.
    for (id, function) in table.iter() {
        for (index, variable) in function.variables.iter().enumerate() {
            let var = VariableId { function: id, index: index as u32 };
            let Some(address) = variable.fixed_address else { continue };
            let end = address.saturating_add(variable.size.saturating_sub(1));
            if let Some(range) = fixed_conflict(platform, address, end) {
                errors.push(AllocError::ReservedAddressConflict {
                    variable: table.qualified_name(var),
                    address,
                    range,
                });
                continue;
            }
            let region = if end < 0x100 { Region::ZeroPage } else { Region::Ram };
            allocations.insert(var, Allocation { region, address });
        }
    }

    // Zero-page grants.
    for placement in &zero_page.placements {
        allocations.insert(
            placement.var,
            Allocation { region: Region::ZeroPage, address: placement.address as u16 },
        );
    }

    // Implausibly large single frames are caught before any placement;
    // the linker would reject them anyway, with a worse message.
    for (_, function) in table.iter() {
        if function.frame_bytes() as usize > platform.ram.size() {
            errors.push(AllocError::FrameOverflow {
                name: function.name.clone(),
                bytes: function.frame_bytes(),
                available: platform.ram.size(),
            });
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    // Overlay each equivalence class at one base address.
    let mut cursor = platform.ram.start as u32;
    let mut frame_sizes = vec![0u16; table.len()];
    for class in &classes.classes {
        let mut class_size = 0u32;
        for &member in &class.members {
            let mut offset = 0u32;
            for (index, variable) in table.get(member).variables.iter().enumerate() {
                let var = VariableId { function: member, index: index as u32 };
                if variable.fixed_address.is_some()
                    || variable.is_volatile
                    || allocations.contains_key(&var)
                {
                    continue;
                }
                allocations.insert(
                    var,
                    Allocation { region: Region::Ram, address: (cursor + offset) as u16 },
                );
                offset += variable.size as u32;
            }
            frame_sizes[member.index()] = offset as u16;
            class_size = class_size.max(offset);
        }
        if class_size > 0 {
            let end = cursor + class_size - 1;
            if end > platform.ram.end as u32 {
                errors.push(AllocError::FrameOverflow {
                    name: table.get(class.members[0]).name.clone(),
                    bytes: class_size,
                    available: platform.ram.size(),
                });
                break;
            }
            cursor += class_size;
        }
    }

    // Volatile variables without a pinned address are singletons: never
    // part of any overlay, one private slot each.
    for (id, function) in table.iter() {
        if recursion.is_recursive(id) {
            continue;
        }
        for (index, variable) in function.variables.iter().enumerate() {
            let var = VariableId { function: id, index: index as u32 };
            if !variable.is_volatile || allocations.contains_key(&var) {
                continue;
            }
            let end = cursor + variable.size as u32 - 1;
            if end > platform.ram.end as u32 {
                errors.push(AllocError::FrameOverflow {
                    name: table.qualified_name(var),
                    bytes: variable.size as u32,
                    available: platform.ram.size(),
                });
                continue;
            }
            allocations.insert(var, Allocation { region: Region::Ram, address: cursor as u16 });
            cursor += variable.size as u32;
        }
    }

    // Recursive functions: frame-relative offsets on the software stack.
    for id in recursion.recursive_ids() {
        let mut offset = 0u16;
        for (index, variable) in table.get(id).variables.iter().enumerate() {
            let var = VariableId { function: id, index: index as u32 };
            if allocations.contains_key(&var) {
                continue;
            }
            allocations.insert(var, Allocation { region: Region::Stack, address: offset });
            offset += variable.size;
        }
        frame_sizes[id.index()] = offset;
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let functions = table
        .ids()
        .map(|id| {
            let plan = conventions.plan(id);
            FunctionLayout {
                frame_size: frame_sizes[id.index()],
                convention: plan.convention,
                params: plan.params.clone(),
                returns: plan.returns,
            }
        })
        .collect();

    let warnings = zero_page
        .fallbacks
        .iter()
        .map(|&var| AllocWarning::ZeroPageFallback { variable: table.qualified_name(var) })
        .collect();

    Ok(ProgramLayout { allocations, functions, warnings })
}

/// Description of the reserved range a fixed address runs into, if any.
fn fixed_conflict(platform: &PlatformConfig, start: u16, end: u16) -> Option<String> {
    for range in platform.reserved() {
        if start <= range.end as u16 && end >= range.start as u16 {
            return Some(format!("zero page ${:02X}-${:02X}", range.start, range.end));
        }
    }
    if start <= platform.ram.end && end >= platform.ram.start {
        return Some(format!(
            "data section ${:04X}-${:04X}",
            platform.ram.start, platform.ram.end
        ));
    }
    None
}
