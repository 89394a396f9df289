//! Zero Page Allocation
//!
//! Scores every zero-page candidate and greedily fills the page from the
//! highest score down, skipping platform- and user-reserved ranges. The
//! zero page is the only region with fast indirect addressing, so
//! pointers outrank everything else.

use crate::alloc::AllocError;
use crate::config::PlatformConfig;
use crate::graph::recursion::RecursionInfo;
use crate::table::{FunctionTable, StorageWish, Variable, VariableId};

/// Pointer-equivalent width on the 6502.
pub const POINTER_BYTES: u16 = 2;

/// One variable placed in the zero page.
#[derive(Debug, Clone, Copy)]
pub struct ZpPlacement {
    pub var: VariableId,
    pub address: u8,
    pub score: u32,
}

/// Outcome of the zero-page pass.
#[derive(Debug, Default)]
pub struct ZeroPageResult {
    /// Successful placements, highest score first.
    pub placements: Vec<ZpPlacement>,
    /// Candidates that did not fit and fall back to RAM (warning, not
    /// error: they never required the zero page).
    pub fallbacks: Vec<VariableId>,
}

impl ZeroPageResult {
    pub fn address_of(&self, var: VariableId) -> Option<u8> {
        self.placements.iter().find(|p| p.var == var).map(|p| p.address)
    }

    /// Total zero-page bytes granted.
    pub fn bytes_used(&self, table: &FunctionTable) -> usize {
        self.placements.iter().map(|p| table.variable(p.var).size as usize).sum()
    }
}

/// `use_count * type_weight`. Pointers dominate, then single bytes,
/// then words; anything wider scores zero and is excluded.
pub fn score(variable: &Variable) -> u32 {
    let weight = if variable.is_pointer && variable.size == POINTER_BYTES {
        0x800
    } else if variable.size == 1 {
        0x100
    } else if variable.size == 2 {
        0x080
    } else {
        0
    };
    variable.use_count * weight
}

/// Run the greedy fill. `RequireZeroPage` variables that cannot be
/// placed make the whole pass fail with the current occupant list, so
/// the author can pick a variable to evict.
pub fn allocate(
    table: &FunctionTable,
    recursion: &RecursionInfo,
    platform: &PlatformConfig,
) -> Result<ZeroPageResult, Vec<AllocError>> {
    let mut free = [true; 256];
    for addr in 0..=0xFFu8 {
        if platform.zp_is_reserved(addr) {
            free[addr as usize] = false;
        }
    }

    // Bytes pinned into the page by fixed-address variables are spoken
    // for before any scoring happens.
    for (_, function) in table.iter() {
        for variable in &function.variables {
            let Some(address) = variable.fixed_address else { continue };
            for offset in 0..variable.size as u32 {
                let byte = address as u32 + offset;
                if byte < 0x100 {
                    free[byte as usize] = false;
                }
            }
        }
    }

    // Candidates: static-frame variables without a pinned address that
    // did not ask for RAM. Volatile variables sit out too; the layout
    // pass gives them private RAM slots. Stack-frame (recursive)
    // functions are excluded outright; a zero-page local would not be
    // reentrant.
    let mut candidates: Vec<(VariableId, u32)> = Vec::new();
    let mut unplaced_required: Vec<VariableId> = Vec::new();

    for (id, function) in table.iter() {
        for (index, variable) in function.variables.iter().enumerate() {
            let var = VariableId { function: id, index: index as u32 };
            if variable.fixed_address.is_some()
                || variable.is_volatile
                || variable.storage_wish == StorageWish::RequireRam
            {
                continue;
            }
            let required = variable.storage_wish == StorageWish::RequireZeroPage;
            // Score orders the fill; a required variable competes even
            // at score zero.
            let eligible = !recursion.is_recursive(id)
                && variable.size <= POINTER_BYTES
                && (required || score(variable) > 0);
            if eligible {
                candidates.push((var, score(variable)));
            } else if required {
                // Required but pre-excluded (too wide, or recursive
                // owner); reported with the occupant list below.
                unplaced_required.push(var);
            }
        }
    }

    candidates.sort_by_key(|&(var, score)| (std::cmp::Reverse(score), var));

    let mut result = ZeroPageResult::default();
    for (var, score) in candidates {
        let size = table.variable(var).size;
        match first_fit(&free, size) {
            Some(address) => {
                for offset in 0..size {
                    free[(address + offset as u8) as usize] = false;
                }
                result.placements.push(ZpPlacement { var, address, score });
            }
            None => {
                if table.variable(var).storage_wish == StorageWish::RequireZeroPage {
                    unplaced_required.push(var);
                } else {
                    result.fallbacks.push(var);
                }
            }
        }
    }

    if unplaced_required.is_empty() {
        Ok(result)
    } else {
        unplaced_required.sort();
        let occupants = result
            .placements
            .iter()
            .map(|p| (table.qualified_name(p.var), p.score))
            .collect();
        Err(vec![AllocError::ZeroPageExhausted {
            unplaced: unplaced_required
                .into_iter()
                .map(|v| table.qualified_name(v))
                .collect(),
            occupants,
        }])
    }
}

/// Lowest free run of `size` consecutive bytes, if any.
fn first_fit(free: &[bool; 256], size: u16) -> Option<u8> {
    if size == 0 || size > 256 {
        return None;
    }
    let size = size as usize;
    let mut run = 0;
    for addr in 0..256 {
        if free[addr] {
            run += 1;
            if run == size {
                return Some((addr + 1 - size) as u8);
            }
        } else {
            run = 0;
        }
    }
    None
}
