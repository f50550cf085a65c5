use thiserror::Error;

/// A rejected access to memory, the register file or the keypad.
///
/// These are recoverable: the interpreter logs them and carries on with
/// whatever is left of the instruction.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    #[error("address {addr:#06x} is out of bounds")]
    AddressOutOfBounds { addr: usize },

    #[error("register V{index:X} does not exist")]
    InvalidRegister { index: u8 },

    #[error("program is too large ({len} bytes), max size is {max} bytes")]
    ProgramTooLarge { len: usize, max: usize },

    #[error("key {key:#04x} is not on the keypad")]
    InvalidKey { key: u8 },
}

/// A fault the interpreter cannot recover from. Once one has been returned
/// the machine is halted and must not be stepped again.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CpuError {
    #[error("instruction fetch out of bounds at {pc:#06x}")]
    FetchOutOfBounds { pc: u16 },

    #[error("call stack overflow at {pc:#06x}")]
    StackOverflow { pc: u16 },

    #[error("return with empty call stack at {pc:#06x}")]
    StackUnderflow { pc: u16 },

    #[error("machine is halted")]
    Halted,
}
