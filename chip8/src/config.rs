/// An RGBA colour as it is written into the presentation buffer
pub type Rgba = [u8; 4];

/// Historical variants of a few instructions. Everything off gives the
/// behaviour most programs written since the 1990s expect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quirks {
    /// 8XY6 and 8XYE copy VY into VX before shifting
    pub legacy_shift: bool,
    /// BNNN adds VX (X being the top nibble of NNN) instead of V0
    pub jump_add_offset: bool,
    /// FX55 and FX65 leave I pointing past the last byte transferred
    pub memory_increment_i: bool,
    /// Wrap sprites horizontally modulo 63 like the original draw routine
    pub legacy_wrap: bool,
}

/// Colours used for lit and unlit pixels in the presentation buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub on: Rgba,
    pub off: Rgba,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            on: [255, 255, 255, 255],
            off: [0, 0, 0, 255],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub quirks: Quirks,
    pub palette: Palette,
    /// Instructions executed per call to `Chip8::cycle`, i.e. per 60 Hz frame
    pub ops_per_cycle: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quirks: Quirks::default(),
            palette: Palette::default(),
            ops_per_cycle: 11,
        }
    }
}
