// src/arch.rs

//! Architecture families
//!
//! The index carries one URL per processor family; 32-bit and 64-bit
//! variants of a family share it.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Processor family selecting a download URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchFamily {
    /// x86 and x86_64
    Amd,
    /// 32-bit ARM and aarch64
    Arm,
}

impl ArchFamily {
    /// Family of the architecture this binary was built for
    pub fn host() -> Result<Self> {
        Self::from_arch(std::env::consts::ARCH)
    }

    /// Map an architecture name to its family
    ///
    /// Accepts Rust target names (`x86_64`, `aarch64`, ...) as well as the
    /// Debian/Go spellings (`amd64`, `386`, `arm64`).
    pub fn from_arch(arch: &str) -> Result<Self> {
        match arch {
            "x86" | "i386" | "i686" | "386" | "x86_64" | "amd64" => Ok(ArchFamily::Amd),
            "arm" | "armv7" | "aarch64" | "arm64" => Ok(ArchFamily::Arm),
            other => Err(Error::UnsupportedArchitecture(other.to_string())),
        }
    }

    /// Element name of this family in `index.xml`
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchFamily::Amd => "amd",
            ArchFamily::Arm => "arm",
        }
    }
}

impl fmt::Display for ArchFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArchFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "amd" => Ok(ArchFamily::Amd),
            "arm" => Ok(ArchFamily::Arm),
            other => Self::from_arch(other),
        }
    }
}
