use std::fmt;

/// A decoded instruction. Register operands are the 4-bit indices X and Y,
/// addresses are the 12-bit NNN field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0
    Cls,
    /// 00EE
    Ret,
    /// 1NNN
    Jp(u16),
    /// 2NNN
    Call(u16),
    /// 3XNN
    SeByte(u8, u8),
    /// 4XNN
    SneByte(u8, u8),
    /// 5XY0
    SeReg(u8, u8),
    /// 6XNN
    LdByte(u8, u8),
    /// 7XNN
    AddByte(u8, u8),
    /// 8XY0
    LdReg(u8, u8),
    /// 8XY1
    Or(u8, u8),
    /// 8XY2
    And(u8, u8),
    /// 8XY3
    Xor(u8, u8),
    /// 8XY4
    AddReg(u8, u8),
    /// 8XY5
    Sub(u8, u8),
    /// 8XY6
    Shr(u8, u8),
    /// 8XY7
    Subn(u8, u8),
    /// 8XYE
    Shl(u8, u8),
    /// 9XY0
    SneReg(u8, u8),
    /// ANNN
    LdI(u16),
    /// BNNN
    JpV0(u16),
    /// CXNN
    Rnd(u8, u8),
    /// DXYN
    Drw(u8, u8, u8),
    /// EX9E
    Skp(u8),
    /// EXA1
    Sknp(u8),
    /// FX07
    LdRegDt(u8),
    /// FX0A
    LdKey(u8),
    /// FX15
    LdDtReg(u8),
    /// FX18
    LdSt(u8),
    /// FX1E
    AddI(u8),
    /// FX29
    LdF(u8),
    /// FX33
    LdB(u8),
    /// FX55
    LdDerefIReg(u8),
    /// FX65
    LdRegDerefI(u8),
    /// Anything else, carrying the raw opcode
    Unknown(u16),
}

impl Instruction {
    pub fn decode(hi: u8, lo: u8) -> Self {
        use Instruction::*;

        let c = hi >> 4;
        let x = hi & 0xF;
        let y = lo >> 4;
        let n = lo & 0xF;
        let nn = lo;
        let nnn = ((x as u16) << 8) | lo as u16;

        match c {
            0x0 => match (x, nn) {
                (0, 0xE0) => Cls,
                (0, 0xEE) => Ret,
                _ => Unknown(opcode(hi, lo)),
            },
            0x1 => Jp(nnn),
            0x2 => Call(nnn),
            0x3 => SeByte(x, nn),
            0x4 => SneByte(x, nn),
            0x5 => SeReg(x, y),
            0x6 => LdByte(x, nn),
            0x7 => AddByte(x, nn),
            0x8 => match n {
                0x0 => LdReg(x, y),
                0x1 => Or(x, y),
                0x2 => And(x, y),
                0x3 => Xor(x, y),
                0x4 => AddReg(x, y),
                0x5 => Sub(x, y),
                0x6 => Shr(x, y),
                0x7 => Subn(x, y),
                0xE => Shl(x, y),
                _ => Unknown(opcode(hi, lo)),
            },
            0x9 => SneReg(x, y),
            0xA => LdI(nnn),
            0xB => JpV0(nnn),
            0xC => Rnd(x, nn),
            0xD => Drw(x, y, n),
            0xE => match nn {
                0x9E => Skp(x),
                0xA1 => Sknp(x),
                _ => Unknown(opcode(hi, lo)),
            },
            _ => match nn {
                0x07 => LdRegDt(x),
                0x0A => LdKey(x),
                0x15 => LdDtReg(x),
                0x18 => LdSt(x),
                0x1E => AddI(x),
                0x29 => LdF(x),
                0x33 => LdB(x),
                0x55 => LdDerefIReg(x),
                0x65 => LdRegDerefI(x),
                _ => Unknown(opcode(hi, lo)),
            },
        }
    }
}

fn opcode(hi: u8, lo: u8) -> u16 {
    (hi as u16) << 8 | lo as u16
}

/// Decode a program image two bytes at a time, pairing each instruction with
/// the address it would be loaded at. A trailing odd byte is ignored, and so is
/// anything past the top of the 16-bit address space.
pub fn disassemble(rom: &[u8], base: u16) -> impl Iterator<Item = (u16, Instruction)> + '_ {
    let addrs = (base..=u16::MAX).step_by(2);
    rom.chunks_exact(2)
        .zip(addrs)
        .map(|(pair, addr)| (addr, Instruction::decode(pair[0], pair[1])))
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match *self {
            Cls => write!(f, "CLS"),
            Ret => write!(f, "RET"),
            Jp(nnn) => write!(f, "JP {nnn:#05x}"),
            Call(nnn) => write!(f, "CALL {nnn:#05x}"),
            SeByte(x, nn) => write!(f, "SE V{x:X}, {nn:#04x}"),
            SneByte(x, nn) => write!(f, "SNE V{x:X}, {nn:#04x}"),
            SeReg(x, y) => write!(f, "SE V{x:X}, V{y:X}"),
            LdByte(x, nn) => write!(f, "LD V{x:X}, {nn:#04x}"),
            AddByte(x, nn) => write!(f, "ADD V{x:X}, {nn:#04x}"),
            LdReg(x, y) => write!(f, "LD V{x:X}, V{y:X}"),
            Or(x, y) => write!(f, "OR V{x:X}, V{y:X}"),
            And(x, y) => write!(f, "AND V{x:X}, V{y:X}"),
            Xor(x, y) => write!(f, "XOR V{x:X}, V{y:X}"),
            AddReg(x, y) => write!(f, "ADD V{x:X}, V{y:X}"),
            Sub(x, y) => write!(f, "SUB V{x:X}, V{y:X}"),
            Shr(x, y) => write!(f, "SHR V{x:X}, V{y:X}"),
            Subn(x, y) => write!(f, "SUBN V{x:X}, V{y:X}"),
            Shl(x, y) => write!(f, "SHL V{x:X}, V{y:X}"),
            SneReg(x, y) => write!(f, "SNE V{x:X}, V{y:X}"),
            LdI(nnn) => write!(f, "LD I, {nnn:#05x}"),
            JpV0(nnn) => write!(f, "JP V0, {nnn:#05x}"),
            Rnd(x, nn) => write!(f, "RND V{x:X}, {nn:#04x}"),
            Drw(x, y, n) => write!(f, "DRW V{x:X}, V{y:X}, {n}"),
            Skp(x) => write!(f, "SKP V{x:X}"),
            Sknp(x) => write!(f, "SKNP V{x:X}"),
            LdRegDt(x) => write!(f, "LD V{x:X}, DT"),
            LdKey(x) => write!(f, "LD V{x:X}, K"),
            LdDtReg(x) => write!(f, "LD DT, V{x:X}"),
            LdSt(x) => write!(f, "LD ST, V{x:X}"),
            AddI(x) => write!(f, "ADD I, V{x:X}"),
            LdF(x) => write!(f, "LD F, V{x:X}"),
            LdB(x) => write!(f, "LD B, V{x:X}"),
            LdDerefIReg(x) => write!(f, "LD [I], V{x:X}"),
            LdRegDerefI(x) => write!(f, "LD V{x:X}, [I]"),
            Unknown(op) => write!(f, "DW {op:#06x}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{disassemble, Instruction, Instruction::*};

    fn decode(op: u16) -> Instruction {
        Instruction::decode((op >> 8) as u8, op as u8)
    }

    #[test]
    fn test_decode() {
        let cases = [
            (0x00E0, Cls),
            (0x00EE, Ret),
            (0x1234, Jp(0x234)),
            (0x2456, Call(0x456)),
            (0x342A, SeByte(0x4, 0x2A)),
            (0x4A75, SneByte(0xA, 0x75)),
            (0x5AE0, SeReg(0xA, 0xE)),
            (0x63F5, LdByte(0x3, 0xF5)),
            (0x7B12, AddByte(0xB, 0x12)),
            (0x8590, LdReg(0x5, 0x9)),
            (0x8101, Or(0x1, 0x0)),
            (0x8642, And(0x6, 0x4)),
            (0x87F3, Xor(0x7, 0xF)),
            (0x8264, AddReg(0x2, 0x6)),
            (0x8C45, Sub(0xC, 0x4)),
            (0x8106, Shr(0x1, 0x0)),
            (0x86D7, Subn(0x6, 0xD)),
            (0x8E0E, Shl(0xE, 0x0)),
            (0x9990, SneReg(0x9, 0x9)),
            (0xA568, LdI(0x568)),
            (0xBABC, JpV0(0xABC)),
            (0xC5AF, Rnd(0x5, 0xAF)),
            (0xD7B3, Drw(0x7, 0xB, 3)),
            (0xE49E, Skp(0x4)),
            (0xECA1, Sknp(0xC)),
            (0xF907, LdRegDt(0x9)),
            (0xFD0A, LdKey(0xD)),
            (0xF315, LdDtReg(0x3)),
            (0xF718, LdSt(0x7)),
            (0xF91E, AddI(0x9)),
            (0xFF29, LdF(0xF)),
            (0xF533, LdB(0x5)),
            (0xF655, LdDerefIReg(0x6)),
            (0xF065, LdRegDerefI(0x0)),
        ];
        for (op, expected) in cases {
            assert_eq!(decode(op), expected, "opcode {:#06x}", op);
        }
    }

    #[test]
    fn test_decode_unknown() {
        for op in [0x0000, 0x0123, 0x00E1, 0x8008, 0x800F, 0xE19F, 0xF000, 0xF0FF] {
            assert_eq!(decode(op), Unknown(op));
        }
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(decode(0x1200).to_string(), "JP 0x200");
        assert_eq!(decode(0x8014).to_string(), "ADD V0, V1");
        assert_eq!(decode(0xD125).to_string(), "DRW V1, V2, 5");
        assert_eq!(decode(0xFA55).to_string(), "LD [I], VA");
        assert_eq!(decode(0xFFFF).to_string(), "DW 0xffff");
    }

    #[test]
    fn test_disassemble() {
        let listing: Vec<_> = disassemble(&[0x00, 0xE0, 0x12, 0x00, 0xFF], 0x200).collect();
        assert_eq!(listing, vec![(0x200, Cls), (0x202, Jp(0x200))]);
    }

    #[test]
    fn test_disassemble_stops_at_top_of_address_space() {
        let image = vec![0u8; 0x10000];
        let listing: Vec<_> = disassemble(&image, 0x200).collect();
        assert_eq!(listing.len(), (0x10000 - 0x200) / 2);
        assert_eq!(listing.last(), Some(&(0xFFFE, Unknown(0x0000))));

        let listing: Vec<_> = disassemble(&[0x00, 0xE0, 0x00, 0xE0], 0xFFFF).collect();
        assert_eq!(listing, vec![(0xFFFF, Cls)]);
    }
}
