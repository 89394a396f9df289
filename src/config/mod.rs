//! Platform configuration
//!
//! Zero-page reserved ranges and the RAM data section for each supported
//! target. Built-in presets cover the Commodore 64/128, VIC-20 and
//! Commander X16; a TOML memory map passed on the command line can
//! replace any of them.

use serde::Deserialize;
use std::path::Path;

/// Inclusive zero-page address range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ZpRange {
    pub start: u8,
    pub end: u8,
}

impl ZpRange {
    pub fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, addr: u8) -> bool {
        addr >= self.start && addr <= self.end
    }
}

/// Inclusive RAM range used for static frames and RAM-resident variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RamSection {
    pub start: u16,
    pub end: u16,
}

impl RamSection {
    pub fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    pub fn size(&self) -> usize {
        self.end as usize - self.start as usize + 1
    }
}

/// Memory map parameters for one target machine.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    pub name: String,
    /// Zero-page ranges the platform ROM/runtime owns.
    pub zp_reserved: Vec<ZpRange>,
    /// Additional user-declared zero-page reservations.
    #[serde(default)]
    pub user_reserved: Vec<ZpRange>,
    /// Where static frames and RAM variables are placed.
    pub ram: RamSection,
}

impl PlatformConfig {
    /// Commodore 64 with BASIC banked out: $02-$8F free, KERNAL keeps
    /// $90-$FF, the CPU port owns $00-$01. Data lives below the I/O area.
    pub fn c64() -> Self {
        Self {
            name: "c64".into(),
            zp_reserved: vec![ZpRange::new(0x00, 0x01), ZpRange::new(0x90, 0xFF)],
            user_reserved: Vec::new(),
            ram: RamSection::new(0xC000, 0xCFFF),
        }
    }

    /// Commodore 128; data goes into the $1300-$1BFF application area
    /// that both RAM banks map identically.
    pub fn c128() -> Self {
        Self {
            name: "c128".into(),
            zp_reserved: vec![ZpRange::new(0x00, 0x01), ZpRange::new(0x90, 0xFF)],
            user_reserved: Vec::new(),
            ram: RamSection::new(0x1300, 0x1BFF),
        }
    }

    /// Unexpanded VIC-20; KERNAL and BASIC between them own the whole
    /// zero page except $00FB-$00FE.
    pub fn vic20() -> Self {
        Self {
            name: "vic20".into(),
            zp_reserved: vec![ZpRange::new(0x00, 0xFA), ZpRange::new(0xFF, 0xFF)],
            user_reserved: Vec::new(),
            ram: RamSection::new(0x1000, 0x1DFF),
        }
    }

    /// Commander X16: $00-$01 are the banking registers, $02-$21 the
    /// KERNAL ABI registers r0-r15, $80-$FF KERNAL workspace.
    pub fn x16() -> Self {
        Self {
            name: "x16".into(),
            zp_reserved: vec![ZpRange::new(0x00, 0x21), ZpRange::new(0x80, 0xFF)],
            user_reserved: Vec::new(),
            ram: RamSection::new(0xA000, 0xBEFF),
        }
    }

    /// Look up a built-in target by name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "c64" => Some(Self::c64()),
            "c128" => Some(Self::c128()),
            "vic20" => Some(Self::vic20()),
            "x16" => Some(Self::x16()),
            _ => None,
        }
    }

    /// Load a platform description from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&path.display().to_string(), &text)
    }

    /// Parse and validate a platform description. Ranges are
    /// user-supplied; a backwards range must be a diagnostic, not an
    /// arithmetic panic later on.
    pub fn parse(path: &str, text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        if config.ram.start > config.ram.end {
            return Err(ConfigError::Parse {
                path: path.to_string(),
                reason: format!(
                    "ram section ${:04X}-${:04X} is backwards",
                    config.ram.start, config.ram.end
                ),
            });
        }
        for range in config.reserved() {
            if range.start > range.end {
                return Err(ConfigError::Parse {
                    path: path.to_string(),
                    reason: format!(
                        "zero page range ${:02X}-${:02X} is backwards",
                        range.start, range.end
                    ),
                });
            }
        }
        Ok(config)
    }

    /// All reserved zero-page ranges, platform and user combined.
    pub fn reserved(&self) -> impl Iterator<Item = &ZpRange> {
        self.zp_reserved.iter().chain(self.user_reserved.iter())
    }

    /// True when a zero-page address is off limits.
    pub fn zp_is_reserved(&self, addr: u8) -> bool {
        self.reserved().any(|r| r.contains(addr))
    }

    /// Free zero-page bytes after all reservations.
    pub fn zp_budget(&self) -> usize {
        (0..=0xFFu8).filter(|&a| !self.zp_is_reserved(a)).count()
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self::c64()
    }
}

#[derive(Debug, Clone)]
pub enum ConfigError {
    Io { path: String, reason: String },
    Parse { path: String, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, reason } => {
                write!(f, "cannot read '{}': {}", path, reason)
            }
            ConfigError::Parse { path, reason } => {
                write!(f, "invalid platform file '{}': {}", path, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
