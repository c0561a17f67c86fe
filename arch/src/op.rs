// ----------------------------------------------------------------------------
// Opcode word, format version 1
//
//  31             16 15   12 11    8 7             0
// +-----------------+-------+-------+---------------+
// |   imm (i16)     | reg2  | reg1  |      cmd      |
// +-----------------+-------+-------+---------------+
//
// Stored little-endian, one word per instruction.

use crate::exe::WORD_SIZE;
use color_print::cformat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Opcode {
    pub cmd: u8,
    pub reg1: u8,
    pub reg2: u8,
    pub imm: i16,
}

fn enc_format(cmd: u8, reg1: u8, reg2: u8, imm: i16) -> u32 {
    ((cmd as u32) << 0)
        | (((reg1 & 0xF) as u32) << 8)
        | (((reg2 & 0xF) as u32) << 12)
        | (((imm as u16) as u32) << 16)
}

fn dec_format(bin: u32) -> (u8, u8, u8, i16) {
    let cmd = ((bin >> 0) & 0xFF) as u8;
    let reg1 = ((bin >> 8) & 0xF) as u8;
    let reg2 = ((bin >> 12) & 0xF) as u8;
    let imm = ((bin >> 16) & 0xFFFF) as u16 as i16;
    (cmd, reg1, reg2, imm)
}

impl Opcode {
    pub fn new(cmd: u8) -> Self {
        Opcode {
            cmd,
            ..Default::default()
        }
    }

    /// Register slots are numbered from 1. Returns `false` for any other slot.
    pub fn set_reg(&mut self, slot: usize, id: u8) -> bool {
        match slot {
            1 => self.reg1 = id,
            2 => self.reg2 = id,
            _ => return false,
        }
        true
    }

    pub fn to_bin(&self) -> u32 {
        enc_format(self.cmd, self.reg1, self.reg2, self.imm)
    }

    pub fn from_bin(bin: u32) -> Self {
        let (cmd, reg1, reg2, imm) = dec_format(bin);
        Opcode {
            cmd,
            reg1,
            reg2,
            imm,
        }
    }

    pub fn to_bytes(&self) -> [u8; WORD_SIZE as usize] {
        self.to_bin().to_le_bytes()
    }

    /// Decoded fields for listings, `name` being the mnemonic of `cmd`.
    pub fn cformat(&self, name: &str) -> String {
        cformat!(
            "<r>{:<8}</><b>{:<2} {:<2}</> <y>{:>6}</>",
            name,
            self.reg1,
            self.reg2,
            self.imm
        )
    }
}

// ----------------------------------------------------------------------------
