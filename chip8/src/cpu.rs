use log::{debug, error, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::Quirks;
use crate::display::Display;
use crate::error::{CpuError, MemoryError};
use crate::instruction::Instruction;
use crate::keypad::Keypad;
use crate::memory::Memory;
use crate::registers::VF;
use crate::timers::Timers;
use crate::{ROM_ADDR, STACK_SIZE};

/// The longest sprite a single DXYN can draw
const MAX_SPRITE_HEIGHT: usize = 0xF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuState {
    Running,
    /// FX0A is waiting for a key press to store in the register
    AwaitingKey { register: u8 },
    /// A fatal fault occurred, nothing more will execute
    Halted,
}

/// What a call to `step` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Executed(Instruction),
    /// Still waiting for a key, nothing executed
    AwaitingKey,
    /// The pending FX0A completed with this key
    KeyReceived(u8),
}

/// Everything an instruction can touch besides the CPU's own state
pub(crate) struct Bus<'a> {
    pub memory: &'a mut Memory,
    pub display: &'a mut Display,
    pub keypad: &'a mut Keypad,
    pub timers: &'a mut Timers,
    pub quirks: &'a Quirks,
}

pub struct Cpu {
    /// The program counter points to the next byte to fetch
    pub(crate) pc: u16,
    /// Return addresses for subroutine calls
    pub(crate) stack: [u16; STACK_SIZE],
    /// Number of addresses on the stack
    pub(crate) sp: usize,
    pub(crate) state: CpuState,
    /// Address of the instruction being executed, for diagnostics
    op_pc: u16,
    anomalies: u64,
    rng: StdRng,
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            pc: ROM_ADDR as u16,
            stack: [0; STACK_SIZE],
            sp: 0,
            state: CpuState::Running,
            op_pc: ROM_ADDR as u16,
            anomalies: 0,
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Start over at `pc` with an empty stack
    pub fn reset(&mut self, pc: u16) {
        self.pc = pc;
        self.op_pc = pc;
        self.sp = 0;
        self.state = CpuState::Running;
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn state(&self) -> CpuState {
        self.state
    }

    pub fn stack_depth(&self) -> usize {
        self.sp
    }

    /// Number of rejected memory, register or key accesses so far
    pub fn anomalies(&self) -> u64 {
        self.anomalies
    }

    pub(crate) fn step(&mut self, bus: &mut Bus<'_>) -> Result<Step, CpuError> {
        match self.state {
            CpuState::Halted => return Err(CpuError::Halted),
            CpuState::AwaitingKey { register } => return Ok(self.poll_key(register, bus)),
            CpuState::Running => {}
        }

        self.op_pc = self.pc;
        let instruction = self.fetch(bus.memory).map_err(|e| self.halt(e))?;
        trace!("{:#05x} {}", self.op_pc, instruction);
        self.execute(instruction, bus).map_err(|e| self.halt(e))?;
        Ok(Step::Executed(instruction))
    }

    fn halt(&mut self, err: CpuError) -> CpuError {
        error!("{}", err);
        self.state = CpuState::Halted;
        err
    }

    fn poll_key(&mut self, register: u8, bus: &mut Bus<'_>) -> Step {
        match bus.keypad.take_press() {
            Some(key) => {
                debug!("key {:X} pressed, resuming at {:#05x}", key, self.pc);
                self.set_reg(bus.memory, register, key);
                self.state = CpuState::Running;
                Step::KeyReceived(key)
            }
            None => Step::AwaitingKey,
        }
    }

    fn fetch_byte(&mut self, memory: &Memory) -> Result<u8, CpuError> {
        let byte = memory
            .read(self.pc as usize)
            .map_err(|_| CpuError::FetchOutOfBounds { pc: self.pc })?;
        self.pc = self.pc.wrapping_add(1);
        Ok(byte)
    }

    fn fetch(&mut self, memory: &Memory) -> Result<Instruction, CpuError> {
        let hi = self.fetch_byte(memory)?;
        let lo = self.fetch_byte(memory)?;
        Ok(Instruction::decode(hi, lo))
    }

    /// Skipping fetches and discards the next instruction
    fn skip(&mut self, memory: &Memory) -> Result<(), CpuError> {
        self.fetch(memory).map(|_| ())
    }

    fn skip_if(&mut self, cond: bool, memory: &Memory) -> Result<(), CpuError> {
        if cond {
            self.skip(memory)?;
        }
        Ok(())
    }

    fn anomaly(&mut self, err: MemoryError) {
        self.anomalies += 1;
        warn!("{:#05x}: {}", self.op_pc, err);
    }

    fn reg(&mut self, memory: &Memory, index: u8) -> u8 {
        memory.register(index).unwrap_or_else(|e| {
            self.anomaly(e);
            0
        })
    }

    fn set_reg(&mut self, memory: &mut Memory, index: u8, value: u8) {
        if let Err(e) = memory.set_register(index, value) {
            self.anomaly(e);
        }
    }

    fn read_mem(&mut self, memory: &Memory, addr: usize) -> u8 {
        memory.read(addr).unwrap_or_else(|e| {
            self.anomaly(e);
            0
        })
    }

    fn write_mem(&mut self, memory: &mut Memory, addr: usize, byte: u8) {
        if let Err(e) = memory.write(addr, byte) {
            self.anomaly(e);
        }
    }

    fn key_down(&mut self, keypad: &Keypad, key: u8) -> bool {
        if !Keypad::is_valid_key(key) {
            self.anomaly(MemoryError::InvalidKey { key });
            return false;
        }
        keypad.is_key_down(key)
    }

    fn execute(&mut self, instruction: Instruction, bus: &mut Bus<'_>) -> Result<(), CpuError> {
        use Instruction::*;

        match instruction {
            Cls => bus.display.clear(),
            Ret => self.op_return()?,
            Jp(nnn) => self.pc = nnn,
            Call(nnn) => self.op_call(nnn)?,
            SeByte(x, nn) => {
                let vx = self.reg(bus.memory, x);
                self.skip_if(vx == nn, bus.memory)?;
            }
            SneByte(x, nn) => {
                let vx = self.reg(bus.memory, x);
                self.skip_if(vx != nn, bus.memory)?;
            }
            SeReg(x, y) => {
                let (vx, vy) = (self.reg(bus.memory, x), self.reg(bus.memory, y));
                self.skip_if(vx == vy, bus.memory)?;
            }
            LdByte(x, nn) => self.set_reg(bus.memory, x, nn),
            AddByte(x, nn) => {
                let vx = self.reg(bus.memory, x);
                self.set_reg(bus.memory, x, vx.wrapping_add(nn));
            }
            LdReg(x, y) => {
                let vy = self.reg(bus.memory, y);
                self.set_reg(bus.memory, x, vy);
            }
            Or(x, y) => self.op_logic(bus.memory, x, y, |a, b| a | b),
            And(x, y) => self.op_logic(bus.memory, x, y, |a, b| a & b),
            Xor(x, y) => self.op_logic(bus.memory, x, y, |a, b| a ^ b),
            AddReg(x, y) => {
                let (vx, vy) = (self.reg(bus.memory, x), self.reg(bus.memory, y));
                let (sum, carry) = vx.overflowing_add(vy);
                self.set_flagged(bus.memory, x, sum, carry);
            }
            Sub(x, y) => {
                let (vx, vy) = (self.reg(bus.memory, x), self.reg(bus.memory, y));
                self.set_flagged(bus.memory, x, vx.saturating_sub(vy), vx > vy);
            }
            Subn(x, y) => {
                let (vx, vy) = (self.reg(bus.memory, x), self.reg(bus.memory, y));
                self.set_flagged(bus.memory, x, vy.saturating_sub(vx), vy > vx);
            }
            Shr(x, y) => {
                let src = self.shift_source(bus, x, y);
                self.set_flagged(bus.memory, x, src >> 1, src & 0x1 == 1);
            }
            Shl(x, y) => {
                let src = self.shift_source(bus, x, y);
                self.set_flagged(bus.memory, x, src << 1, src >> 7 == 1);
            }
            SneReg(x, y) => {
                let (vx, vy) = (self.reg(bus.memory, x), self.reg(bus.memory, y));
                self.skip_if(vx != vy, bus.memory)?;
            }
            LdI(nnn) => bus.memory.set_i(nnn),
            JpV0(nnn) => {
                let index = if bus.quirks.jump_add_offset {
                    (nnn >> 8) as u8
                } else {
                    0
                };
                self.pc = nnn + self.reg(bus.memory, index) as u16;
            }
            Rnd(x, nn) => {
                let byte = self.rng.random::<u8>();
                self.set_reg(bus.memory, x, byte & nn);
            }
            Drw(x, y, n) => self.op_draw(bus, x, y, n),
            Skp(x) => {
                let key = self.reg(bus.memory, x);
                let down = self.key_down(bus.keypad, key);
                self.skip_if(down, bus.memory)?;
            }
            Sknp(x) => {
                let key = self.reg(bus.memory, x);
                let down = self.key_down(bus.keypad, key);
                self.skip_if(!down, bus.memory)?;
            }
            LdRegDt(x) => self.set_reg(bus.memory, x, bus.timers.delay() as u8),
            LdKey(x) => {
                // only presses that happen from now on count
                bus.keypad.take_press();
                debug!("{:#05x}: waiting for key press into V{:X}", self.op_pc, x);
                self.state = CpuState::AwaitingKey { register: x };
            }
            LdDtReg(x) => {
                let vx = self.reg(bus.memory, x);
                bus.timers.set_delay(vx as u32);
            }
            LdSt(x) => {
                let vx = self.reg(bus.memory, x);
                bus.timers.set_sound(vx as u32);
            }
            AddI(x) => {
                let i = bus.memory.i().wrapping_add(self.reg(bus.memory, x) as u16);
                bus.memory.set_i(i);
            }
            LdF(x) => {
                let vx = self.reg(bus.memory, x);
                bus.memory.set_i(Memory::font_address(vx));
            }
            LdB(x) => {
                let vx = self.reg(bus.memory, x);
                let i = bus.memory.i() as usize;
                for (offset, digit) in [vx / 100, vx / 10 % 10, vx % 10].into_iter().enumerate() {
                    self.write_mem(bus.memory, i + offset, digit);
                }
            }
            LdDerefIReg(x) => {
                let i = bus.memory.i() as usize;
                for k in 0..=x {
                    let vk = self.reg(bus.memory, k);
                    self.write_mem(bus.memory, i + k as usize, vk);
                }
                self.advance_i(bus, x);
            }
            LdRegDerefI(x) => {
                let i = bus.memory.i() as usize;
                for k in 0..=x {
                    let byte = self.read_mem(bus.memory, i + k as usize);
                    self.set_reg(bus.memory, k, byte);
                }
                self.advance_i(bus, x);
            }
            Unknown(op) => warn!("{:#05x}: unknown opcode {:#06x}", self.op_pc, op),
        }
        Ok(())
    }

    fn op_return(&mut self) -> Result<(), CpuError> {
        if self.sp == 0 {
            return Err(CpuError::StackUnderflow { pc: self.op_pc });
        }
        self.sp -= 1;
        self.pc = self.stack[self.sp];
        Ok(())
    }

    fn op_call(&mut self, nnn: u16) -> Result<(), CpuError> {
        if self.sp >= STACK_SIZE {
            return Err(CpuError::StackOverflow { pc: self.op_pc });
        }
        self.stack[self.sp] = self.pc;
        self.sp += 1;
        self.pc = nnn;
        Ok(())
    }

    fn op_logic(&mut self, memory: &mut Memory, x: u8, y: u8, op: impl Fn(u8, u8) -> u8) {
        let (vx, vy) = (self.reg(memory, x), self.reg(memory, y));
        self.set_reg(memory, x, op(vx, vy));
    }

    /// Store the result before the flag so VF ends up holding the flag
    fn set_flagged(&mut self, memory: &mut Memory, x: u8, value: u8, flag: bool) {
        self.set_reg(memory, x, value);
        self.set_reg(memory, VF, flag as u8);
    }

    fn shift_source(&mut self, bus: &mut Bus<'_>, x: u8, y: u8) -> u8 {
        let src = if bus.quirks.legacy_shift { y } else { x };
        self.reg(bus.memory, src)
    }

    fn advance_i(&mut self, bus: &mut Bus<'_>, x: u8) {
        if bus.quirks.memory_increment_i {
            let i = bus.memory.i();
            bus.memory.set_i(i.wrapping_add(x as u16 + 1));
        }
    }

    fn op_draw(&mut self, bus: &mut Bus<'_>, x: u8, y: u8, n: u8) {
        let vx = self.reg(bus.memory, x) as usize;
        let vy = self.reg(bus.memory, y) as usize;
        let i = bus.memory.i() as usize;

        let mut sprite = [0u8; MAX_SPRITE_HEIGHT];
        let rows = &mut sprite[..n as usize];
        for (row, byte) in rows.iter_mut().enumerate() {
            *byte = self.read_mem(bus.memory, i + row);
        }

        let collision = bus.display.draw_sprite(vx, vy, rows);
        self.set_reg(bus.memory, VF, collision as u8);
    }
}
