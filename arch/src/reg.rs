use bimap::BiMap;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Number of addressable registers. A register id must fit the 4-bit slot.
pub const REG_COUNT: u8 = 16;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Default,
    TryFromPrimitive,
    IntoPrimitive,
    EnumString,
    EnumIter,
    Display,
)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum Reg {
    #[default]
    ZERO,
    AT,
    SP,
    FP,
    RA,
    A0,
    A1,
    A2,
    T0,
    T1,
    T2,
    T3,
    S0,
    S1,
    S2,
    S3,
}

impl Reg {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_ascii_lowercase().parse::<Self>() {
            Ok(a) => Ok(a),
            Err(_) => Err(format!("Unknown reg name: {s}")),
        }
    }

    pub fn id(self) -> u8 {
        self.into()
    }
}

/// Alias name <-> register id.
///
/// The default table holds the lowercase names of [`Reg`]. Numeric names such
/// as `r7` or `$7` never live in the table; they are handled by
/// [`RegTable::resolve`] falling back to the trailing number.
#[derive(Debug, Clone)]
pub struct RegTable(BiMap<String, u8>);

pub static DEFAULT_REGS: Lazy<RegTable> = Lazy::new(RegTable::new);

impl RegTable {
    pub fn new() -> Self {
        let mut map = BiMap::new();
        for reg in Reg::iter() {
            map.insert(reg.to_string(), reg.id());
        }
        RegTable(map)
    }

    pub fn empty() -> Self {
        RegTable(BiMap::new())
    }

    /// Add or replace an alias. Any previous alias of the same id is dropped.
    pub fn alias(&mut self, name: &str, id: u8) {
        self.0.insert(name.to_string(), id);
    }

    pub fn get(&self, name: &str) -> Option<u8> {
        self.0.get_by_left(name).copied()
    }

    pub fn name_of(&self, id: u8) -> Option<&str> {
        self.0.get_by_right(&id).map(|s| s.as_str())
    }

    /// Alias lookup first, then the trailing decimal suffix of the name.
    /// `None` if neither works.
    ///
    /// The id is not range checked here. A suffix too long for `u64`
    /// saturates to `u64::MAX`.
    pub fn resolve(&self, name: &str) -> Option<u64> {
        let name = name.strip_prefix('$').unwrap_or(name);
        if let Some(id) = self.get(name) {
            return Some(id.into());
        }
        let digits = name.trim_start_matches(|c: char| !c.is_ascii_digit());
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(digits.parse::<u64>().unwrap_or(u64::MAX))
    }
}

impl Default for RegTable {
    fn default() -> Self {
        Self::new()
    }
}
