//! Per-node access mode.
//!
//! A permission is a single octal digit (`0`..=`7`) bundling read (4),
//! write (2) and execute (1). The engine only enforces the execute bit,
//! in the executor gate; the other bits are carried and displayed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{VfsError, VfsResult};

/// Octal access mode of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Permission(u8);

impl Permission {
    /// Read capability bit.
    pub const READ: u8 = 0o4;
    /// Write capability bit.
    pub const WRITE: u8 = 0o2;
    /// Execute capability bit.
    pub const EXECUTE: u8 = 0o1;

    /// `---`
    pub const NONE: Permission = Permission(0);
    /// `rw-`, the mode given to newly created nodes.
    pub const READ_WRITE: Permission = Permission(Self::READ | Self::WRITE);
    /// `rwx`
    pub const ALL: Permission = Permission(Self::READ | Self::WRITE | Self::EXECUTE);

    /// Build from a raw ordinal, rejecting anything above 7.
    pub fn new(bits: u8) -> VfsResult<Self> {
        if bits > Self::ALL.0 {
            return Err(VfsError::invalid_permission(bits.to_string()));
        }
        Ok(Self(bits))
    }

    /// Parse a caller-supplied mode: a single digit `0`-`7`, or the
    /// symbolic `rwx` form (`r-x`, `---`, ...).
    pub fn parse(s: &str) -> VfsResult<Self> {
        let s = s.trim();
        let bytes = s.as_bytes();
        match bytes {
            [d @ b'0'..=b'7'] => Ok(Self(d - b'0')),
            [r, w, x] => {
                let bit = |c: u8, on: u8, mask: u8| match c {
                    b'-' => Some(0),
                    c if c == on => Some(mask),
                    _ => None,
                };
                match (bit(*r, b'r', Self::READ), bit(*w, b'w', Self::WRITE), bit(*x, b'x', Self::EXECUTE)) {
                    (Some(r), Some(w), Some(x)) => Ok(Self(r | w | x)),
                    _ => Err(VfsError::invalid_permission(s)),
                }
            }
            _ => Err(VfsError::invalid_permission(s)),
        }
    }

    /// The raw ordinal.
    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn can_read(self) -> bool {
        self.0 & Self::READ != 0
    }

    pub fn can_write(self) -> bool {
        self.0 & Self::WRITE != 0
    }

    /// Whether the executor gate lets this node run.
    pub fn can_execute(self) -> bool {
        self.0 & Self::EXECUTE != 0
    }

    /// Symbolic `rwx` rendering.
    pub fn symbolic(self) -> String {
        let flag = |mask: u8, c: char| if self.0 & mask != 0 { c } else { '-' };
        [
            flag(Self::READ, 'r'),
            flag(Self::WRITE, 'w'),
            flag(Self::EXECUTE, 'x'),
        ]
        .iter()
        .collect()
    }
}

impl Default for Permission {
    fn default() -> Self {
        Self::READ_WRITE
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Permission {
    type Err = VfsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<u8> for Permission {
    type Error = VfsError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        Self::new(bits)
    }
}

impl From<Permission> for u8 {
    fn from(p: Permission) -> Self {
        p.0
    }
}
