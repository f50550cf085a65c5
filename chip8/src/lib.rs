pub mod config;
pub mod cpu;
pub mod display;
pub mod error;
pub mod instruction;
pub mod keypad;
pub mod memory;
pub mod registers;
pub mod timers;

use std::fmt::Display as FmtDisplay;
use std::path::Path;

use anyhow::Context;
use log::debug;

use crate::config::{Config, Palette, Quirks, Rgba};
use crate::cpu::{Bus, Cpu, CpuState, Step};
use crate::display::{Display, FrameBuffer};
use crate::error::{CpuError, MemoryError};
use crate::keypad::Keypad;
use crate::memory::Memory;
use crate::registers::Registers;
use crate::timers::Timers;

pub use crate::instruction::{disassemble, Instruction};
pub use crate::keypad::Layout;

pub const FONT_CHAR_LENGTH: usize = 5;

pub const FONT_DATA: [u8; FONT_CHAR_LENGTH * 0x10] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// The font sits at the very bottom of the reserved area
pub const FONT_ADDR: usize = 0x000;

pub const MEM_SIZE: usize = 0x1000;
pub const ROM_ADDR: usize = 0x200;
pub const STACK_SIZE: usize = 0x10;
pub const REGISTER_COUNT: usize = 0x10;

pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;

pub struct Chip8 {
    config: Config,
    /// Program counter, call stack and run state
    cpu: Cpu,
    /// RAM that stores font data and ROMs, plus the V and I registers
    memory: Memory,
    /// A frame buffer containing binary pixel states
    display: Display,
    /// A hexadecimal keypad containing 16 key states labelled 0 through F
    keypad: Keypad,
    /// Delay and sound timers, decremented at 60 Hz
    timers: Timers,
}

impl Chip8 {
    pub fn new() -> anyhow::Result<Self> {
        let config = Config::default();
        let mut memory = Memory::new();
        memory.load_font().context("write font into memory")?;

        Ok(Chip8 {
            display: Display::new(config.palette),
            config,
            cpu: Cpu::new(),
            memory,
            keypad: Keypad::new(),
            timers: Timers::new(),
        })
    }

    /* Config builder functions */
    pub fn legacy_shift(mut self, value: bool) -> Self {
        self.config.quirks.legacy_shift = value;
        self
    }

    pub fn jump_add_offset(mut self, value: bool) -> Self {
        self.config.quirks.jump_add_offset = value;
        self
    }

    pub fn memory_increment_i(mut self, value: bool) -> Self {
        self.config.quirks.memory_increment_i = value;
        self
    }

    pub fn legacy_wrap(mut self, value: bool) -> Self {
        self.config.quirks.legacy_wrap = value;
        self.display.set_legacy_wrap(value);
        self
    }

    pub fn quirks(self, quirks: Quirks) -> Self {
        self.legacy_shift(quirks.legacy_shift)
            .jump_add_offset(quirks.jump_add_offset)
            .memory_increment_i(quirks.memory_increment_i)
            .legacy_wrap(quirks.legacy_wrap)
    }

    pub fn ops_per_cycle(mut self, value: usize) -> Self {
        self.config.ops_per_cycle = value;
        self
    }

    pub fn palette(mut self, palette: Palette) -> Self {
        self.config.palette = palette;
        self.display.set_palette(palette);
        self
    }

    /// Make CXNN deterministic
    pub fn seed(mut self, seed: u64) -> Self {
        self.cpu.reseed(seed);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load a program into a freshly reset machine. Configuration and the random
    /// source carry over; memory, display, timers and keypad do not.
    pub fn load_rom(&mut self, rom: &[u8]) -> anyhow::Result<()> {
        let mut memory = Memory::new();
        memory.load_font().context("write font into memory")?;
        memory.load_rom(rom).context("write rom into memory")?;

        self.memory = memory;
        self.display.clear();
        self.timers = Timers::new();
        self.keypad = Keypad::new();
        self.cpu.reset(ROM_ADDR as u16);
        debug!("loaded {} byte rom at {:#05x}", rom.len(), ROM_ADDR);
        Ok(())
    }

    pub fn load_rom_from_file(&mut self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let buf = std::fs::read(path).with_context(|| format!("read rom file {}", path.display()))?;
        self.load_rom(&buf).context("load rom from file")?;
        Ok(())
    }

    /// Execute a single instruction, or poll for the key a pending FX0A is waiting on
    pub fn step(&mut self) -> Result<Step, CpuError> {
        let mut bus = Bus {
            memory: &mut self.memory,
            display: &mut self.display,
            keypad: &mut self.keypad,
            timers: &mut self.timers,
            quirks: &self.config.quirks,
        };
        self.cpu.step(&mut bus)
    }

    /// One 60 Hz frame: tick the timers once, then run up to `ops_per_cycle` instructions
    pub fn cycle(&mut self) -> Result<(), CpuError> {
        self.tick_timers();
        for _ in 0..self.config.ops_per_cycle {
            if self.step()? == Step::AwaitingKey {
                break;
            }
        }
        Ok(())
    }

    pub fn tick_timers(&mut self) {
        self.timers.tick();
    }

    pub fn keydown(&mut self, key: u8) -> Result<(), MemoryError> {
        self.keypad.press(key)
    }

    pub fn keyup(&mut self, key: u8) -> Result<(), MemoryError> {
        self.keypad.release(key)
    }

    pub fn is_key_down(&self, key: u8) -> bool {
        self.keypad.is_key_down(key)
    }

    pub fn is_fb_dirty(&self) -> bool {
        self.display.is_dirty()
    }

    pub fn take_fb_dirty(&mut self) -> bool {
        self.display.take_dirty()
    }

    pub fn fb(&self) -> &FrameBuffer {
        self.display.fb()
    }

    /// Pixel colours for the current frame, row-major
    pub fn frame(&self) -> &[Rgba] {
        self.display.frame()
    }

    pub fn is_sound_playing(&self) -> bool {
        self.timers.is_sound_active()
    }

    pub fn pc(&self) -> u16 {
        self.cpu.pc()
    }

    pub fn state(&self) -> CpuState {
        self.cpu.state()
    }

    pub fn is_halted(&self) -> bool {
        self.cpu.state() == CpuState::Halted
    }

    pub fn anomalies(&self) -> u64 {
        self.cpu.anomalies()
    }

    pub fn registers(&self) -> &Registers {
        self.memory.registers()
    }

    pub fn i(&self) -> u16 {
        self.memory.i()
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }
}

impl FmtDisplay for Chip8 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "=== CPU ===\nPC: {:#05x} SP: {} I: {:#05x} DT: {} ST: {}",
            self.cpu.pc(),
            self.cpu.stack_depth(),
            self.memory.i(),
            self.timers.delay(),
            self.timers.sound()
        )?;
        for (index, value) in self.memory.registers().as_slice().iter().enumerate() {
            write!(f, "V{:X}: {:02X} ", index, value)?;
        }
        write!(f, "\n=== Memory ===\n{}", self.memory)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Chip8, Step, FONT_ADDR, FONT_DATA, MEM_SIZE, REGISTER_COUNT, ROM_ADDR, SCREEN_WIDTH,
    };
    use crate::config::Palette;
    use crate::cpu::CpuState;
    use crate::error::CpuError;

    #[test]
    fn test_load_rom_resets_cpu() {
        let mut chip8 = Chip8::new().unwrap();
        chip8.load_rom(&[0x12, 0x04]).unwrap();
        chip8.step().unwrap();
        assert_eq!(chip8.pc(), 0x204);
        chip8.load_rom(&[0x00, 0xE0]).unwrap();
        assert_eq!(chip8.pc(), ROM_ADDR as u16);
        assert_eq!(chip8.state(), CpuState::Running);
    }

    #[test]
    fn test_load_rom_too_large() {
        let mut chip8 = Chip8::new().unwrap();
        assert!(chip8.load_rom(&vec![0; MEM_SIZE - ROM_ADDR + 1]).is_err());
        assert!(chip8.load_rom(&vec![0; MEM_SIZE - ROM_ADDR]).is_ok());
    }

    #[test]
    fn test_load_rom_from_missing_file() {
        let mut chip8 = Chip8::new().unwrap();
        assert!(chip8.load_rom_from_file("does/not/exist.ch8").is_err());
    }

    #[test]
    fn test_cycle_ticks_timers_and_runs_ops() {
        // set V0 to 5, load DT from it, then count V1 up forever
        let mut chip8 = Chip8::new().unwrap().ops_per_cycle(5);
        chip8
            .load_rom(&[0x60, 0x05, 0xF0, 0x15, 0x71, 0x01, 0x12, 0x04])
            .unwrap();
        assert_eq!(chip8.config().ops_per_cycle, 5);
        chip8.cycle().unwrap();
        assert_eq!(chip8.timers().delay(), 5);
        assert_eq!(chip8.registers().get(1), Ok(2));

        chip8.cycle().unwrap();
        assert_eq!(chip8.timers().delay(), 4);
        for _ in 0..10 {
            chip8.cycle().unwrap();
        }
        assert_eq!(chip8.timers().delay(), 0);
    }

    #[test]
    fn test_cycle_stops_while_awaiting_key() {
        let mut chip8 = Chip8::new().unwrap();
        chip8.load_rom(&[0xF3, 0x0A, 0x12, 0x02]).unwrap();
        chip8.cycle().unwrap();
        assert_eq!(chip8.state(), CpuState::AwaitingKey { register: 3 });
        assert_eq!(chip8.pc(), 0x202);

        chip8.keydown(0xB).unwrap();
        chip8.keyup(0xB).unwrap();
        assert_eq!(chip8.step(), Ok(Step::KeyReceived(0xB)));
        assert_eq!(chip8.registers().get(3), Ok(0xB));
        chip8.cycle().unwrap();
        assert_eq!(chip8.state(), CpuState::Running);
    }

    #[test]
    fn test_cycle_reports_fatal_fault() {
        let mut chip8 = Chip8::new().unwrap();
        chip8.load_rom(&[0x00, 0xEE]).unwrap();
        assert_eq!(chip8.cycle(), Err(CpuError::StackUnderflow { pc: 0x200 }));
        assert!(chip8.is_halted());
        assert_eq!(chip8.cycle(), Err(CpuError::Halted));
    }

    #[test]
    fn test_draw_updates_frame() {
        let palette = Palette {
            on: [0, 255, 0, 255],
            off: [0, 0, 0, 255],
        };
        let mut chip8 = Chip8::new().unwrap().palette(palette);
        // draw the "0" glyph at (0, 0)
        chip8.load_rom(&[0xD0, 0x05]).unwrap();
        chip8.take_fb_dirty();
        chip8.step().unwrap();
        assert!(chip8.take_fb_dirty());
        assert!(!chip8.is_fb_dirty());
        assert_eq!(chip8.fb()[0][0], 1);
        assert_eq!(chip8.frame()[0], palette.on);
        assert_eq!(chip8.frame()[4], palette.off);
    }

    #[test]
    fn test_draw_with_legacy_wrap() {
        // V0 = 62, V1 = 0, then draw the top row of the "0" glyph (0xF0)
        let rom = [0x60, 0x3E, 0x61, 0x00, 0xD0, 0x11];

        let mut chip8 = Chip8::new().unwrap();
        chip8.load_rom(&rom).unwrap();
        for _ in 0..3 {
            chip8.step().unwrap();
        }
        let lit: Vec<_> = (0..SCREEN_WIDTH).filter(|&x| chip8.fb()[0][x] == 1).collect();
        assert_eq!(lit, vec![0, 1, 62, 63]);

        let mut chip8 = Chip8::new().unwrap().legacy_wrap(true);
        assert!(chip8.config().quirks.legacy_wrap);
        chip8.load_rom(&rom).unwrap();
        for _ in 0..3 {
            chip8.step().unwrap();
        }
        let lit: Vec<_> = (0..SCREEN_WIDTH).filter(|&x| chip8.fb()[0][x] == 1).collect();
        assert_eq!(lit, vec![0, 1, 2, 62]);
    }

    #[test]
    fn test_load_rom_resets_machine() {
        let mut chip8 = Chip8::new().unwrap();
        // V0 = 0x20, DT = V0, ST = V0, draw "0" at (0x20, 0x20)
        chip8
            .load_rom(&[0x60, 0x20, 0xF0, 0x15, 0xF0, 0x18, 0xD0, 0x05, 0x00, 0xE0])
            .unwrap();
        for _ in 0..4 {
            chip8.step().unwrap();
        }
        chip8.keydown(0x5).unwrap();
        assert!(chip8.fb().iter().flatten().any(|&p| p == 1));

        chip8.load_rom(&[0x12, 0x00]).unwrap();
        assert_eq!(chip8.memory.read(ROM_ADDR), Ok(0x12));
        assert_eq!(chip8.memory.read(ROM_ADDR + 2), Ok(0x00));
        assert_eq!(chip8.memory.read(ROM_ADDR + 9), Ok(0x00));
        assert_eq!(chip8.memory.read(FONT_ADDR), Ok(FONT_DATA[0]));
        assert_eq!(chip8.registers().as_slice(), &[0; REGISTER_COUNT]);
        assert_eq!(chip8.i(), 0);
        assert_eq!(chip8.timers().delay(), 0);
        assert_eq!(chip8.timers().sound(), 0);
        assert!(!chip8.is_key_down(0x5));
        assert!(chip8.take_fb_dirty());
        assert!(chip8.fb().iter().flatten().all(|&p| p == 0));
        assert_eq!(chip8.pc(), ROM_ADDR as u16);
    }

    #[test]
    fn test_rejected_rom_keeps_machine() {
        let mut chip8 = Chip8::new().unwrap();
        chip8.load_rom(&[0x6A, 0x42]).unwrap();
        chip8.step().unwrap();
        assert!(chip8.load_rom(&vec![0; MEM_SIZE]).is_err());
        assert_eq!(chip8.registers().get(0xA), Ok(0x42));
        assert_eq!(chip8.memory.read(ROM_ADDR), Ok(0x6A));
    }

    #[test]
    fn test_invalid_key_events() {
        let mut chip8 = Chip8::new().unwrap();
        assert!(chip8.keydown(0x10).is_err());
        assert!(chip8.keyup(0x10).is_err());
        chip8.keydown(0x1).unwrap();
        assert!(chip8.is_key_down(0x1));
    }

    #[test]
    fn test_state_dump() {
        let mut chip8 = Chip8::new().unwrap();
        chip8.load_rom(&[0x6A, 0x42]).unwrap();
        chip8.step().unwrap();
        let dump = chip8.to_string();
        assert!(dump.starts_with("=== CPU ===\nPC: 0x202"));
        assert!(dump.contains("VA: 42"));
        assert!(dump.contains("0200: 6A 42"));
        assert_eq!(chip8.i(), 0);
    }
}
