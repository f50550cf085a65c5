use std::fmt::Display;

use crate::error::MemoryError;
use crate::registers::Registers;
use crate::{FONT_ADDR, FONT_CHAR_LENGTH, FONT_DATA, MEM_SIZE, ROM_ADDR};

/// RAM, the variable registers and the index register.
///
/// Every accessor is bounds checked and leaves state untouched when it fails.
pub struct Memory {
    data: [u8; MEM_SIZE],
    v: Registers,
    /// The index register is used to point at locations in memory
    i: u16,
}

impl Memory {
    /// Create an empty instance of the Memory struct
    pub fn new() -> Self {
        Self {
            data: [0; MEM_SIZE],
            v: Registers::new(),
            i: 0,
        }
    }

    pub fn read(&self, addr: usize) -> Result<u8, MemoryError> {
        self.data
            .get(addr)
            .copied()
            .ok_or(MemoryError::AddressOutOfBounds { addr })
    }

    pub fn write(&mut self, addr: usize, byte: u8) -> Result<(), MemoryError> {
        let slot = self
            .data
            .get_mut(addr)
            .ok_or(MemoryError::AddressOutOfBounds { addr })?;
        *slot = byte;
        Ok(())
    }

    /// Write `data` into memory starting at `addr`. Nothing is written unless all of it fits.
    pub fn write_slice(&mut self, addr: usize, data: &[u8]) -> Result<(), MemoryError> {
        if addr >= MEM_SIZE {
            return Err(MemoryError::AddressOutOfBounds { addr });
        }
        let end = addr + data.len();
        if end > MEM_SIZE {
            return Err(MemoryError::AddressOutOfBounds { addr: end - 1 });
        }
        self.data[addr..end].copy_from_slice(data);
        Ok(())
    }

    pub fn load_font(&mut self) -> Result<(), MemoryError> {
        self.write_slice(FONT_ADDR, &FONT_DATA)
    }

    /// Copy a program image to `ROM_ADDR`, rejecting images that would run past the end of memory
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<(), MemoryError> {
        let max = MEM_SIZE - ROM_ADDR;
        if rom.len() > max {
            return Err(MemoryError::ProgramTooLarge {
                len: rom.len(),
                max,
            });
        }
        self.write_slice(ROM_ADDR, rom)
    }

    pub fn register(&self, index: u8) -> Result<u8, MemoryError> {
        self.v.get(index)
    }

    pub fn set_register(&mut self, index: u8, value: u8) -> Result<(), MemoryError> {
        self.v.set(index, value)
    }

    pub fn registers(&self) -> &Registers {
        &self.v
    }

    pub fn i(&self) -> u16 {
        self.i
    }

    pub fn set_i(&mut self, value: u16) {
        self.i = value;
    }

    /// Address of the built-in sprite for a hex digit
    pub fn font_address(digit: u8) -> u16 {
        (FONT_ADDR + digit as usize * FONT_CHAR_LENGTH) as u16
    }
}

impl Display for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const BYTES_PER_LINE: usize = 16;
        for (line, chunk) in self.data.chunks(BYTES_PER_LINE).enumerate() {
            write!(f, "{:04X}: ", line * BYTES_PER_LINE)?;
            for byte in chunk {
                write!(f, "{:02X} ", byte)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
