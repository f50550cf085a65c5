use crate::error::MemoryError;
use crate::REGISTER_COUNT;

/// Index of the flag register, overwritten by arithmetic, shifts and draws
pub const VF: u8 = 0xF;

/// 16 8-bit general-purpose variable registers numbered 0 through F hexadecimal
#[derive(Debug, Clone, Default)]
pub struct Registers([u8; REGISTER_COUNT]);

impl Registers {
    pub fn new() -> Self {
        Self([0; REGISTER_COUNT])
    }

    pub fn get(&self, index: u8) -> Result<u8, MemoryError> {
        self.0
            .get(index as usize)
            .copied()
            .ok_or(MemoryError::InvalidRegister { index })
    }

    pub fn set(&mut self, index: u8, value: u8) -> Result<(), MemoryError> {
        let slot = self
            .0
            .get_mut(index as usize)
            .ok_or(MemoryError::InvalidRegister { index })?;
        *slot = value;
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}
