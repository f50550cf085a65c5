use crate::error::MemoryError;

pub const KEY_COUNT: usize = 0x10;

/// How the 4x4 block of keys starting at `1`, `Q`, `A` and `Z` on a QWERTY
/// keyboard is assigned to the hexadecimal keypad
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Layout {
    /// The physical arrangement of the COSMAC VIP keypad
    #[default]
    Cosmac,
    /// Keys numbered 0 through F left to right, top to bottom
    Sequential,
}

impl Layout {
    /// Map a lowercase key label to a keypad key
    pub fn key_for_label(self, label: char) -> Option<u8> {
        match self {
            Layout::Cosmac => match label {
                '1' => Some(0x1), // 1 -> 1
                '2' => Some(0x2), // 2 -> 2
                '3' => Some(0x3), // 3 -> 3
                '4' => Some(0xC), // 4 -> C
                'q' => Some(0x4), // Q -> 4
                'w' => Some(0x5), // W -> 5
                'e' => Some(0x6), // E -> 6
                'r' => Some(0xD), // R -> D
                'a' => Some(0x7), // A -> 7
                's' => Some(0x8), // S -> 8
                'd' => Some(0x9), // D -> 9
                'f' => Some(0xE), // F -> E
                'z' => Some(0xA), // Z -> A
                'x' => Some(0x0), // X -> 0
                'c' => Some(0xB), // C -> B
                'v' => Some(0xF), // V -> F
                _ => None,
            },
            Layout::Sequential => "1234qwerasdfzxcv"
                .chars()
                .position(|c| c == label)
                .map(|key| key as u8),
        }
    }
}

pub struct Keypad {
    pub(crate) keys: [bool; KEY_COUNT],
    /// The most recent key press, consumed by a pending wait for key
    pressed: Option<u8>,
}

impl Keypad {
    pub fn new() -> Self {
        Self {
            keys: [false; KEY_COUNT],
            pressed: None,
        }
    }

    pub fn is_valid_key(key: u8) -> bool {
        (key as usize) < KEY_COUNT
    }

    pub fn press(&mut self, key: u8) -> Result<(), MemoryError> {
        if !Self::is_valid_key(key) {
            return Err(MemoryError::InvalidKey { key });
        }
        self.keys[key as usize] = true;
        self.pressed = Some(key);
        Ok(())
    }

    pub fn release(&mut self, key: u8) -> Result<(), MemoryError> {
        if !Self::is_valid_key(key) {
            return Err(MemoryError::InvalidKey { key });
        }
        self.keys[key as usize] = false;
        Ok(())
    }

    /// Take the latched key press, if one happened since the last call
    pub fn take_press(&mut self) -> Option<u8> {
        self.pressed.take()
    }

    pub fn is_key_down(&self, key: u8) -> bool {
        self.keys.get(key as usize).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::{Keypad, Layout};
    use crate::error::MemoryError;

    #[test]
    fn test_press_release() {
        let mut keypad = Keypad::new();
        keypad.press(0xA).unwrap();
        assert!(keypad.is_key_down(0xA));
        assert!(!keypad.is_key_down(0xB));
        keypad.release(0xA).unwrap();
        assert!(!keypad.is_key_down(0xA));
    }

    #[test]
    fn test_invalid_keys() {
        let mut keypad = Keypad::new();
        assert!(Keypad::is_valid_key(0xF));
        assert!(!Keypad::is_valid_key(0x10));
        assert_eq!(keypad.press(0x10), Err(MemoryError::InvalidKey { key: 0x10 }));
        assert!(!keypad.is_key_down(0x10));
        assert_eq!(keypad.take_press(), None);
    }

    #[test]
    fn test_press_latch() {
        let mut keypad = Keypad::new();
        keypad.press(0x3).unwrap();
        keypad.press(0x7).unwrap();
        keypad.release(0x7).unwrap();
        assert_eq!(keypad.take_press(), Some(0x7));
        assert_eq!(keypad.take_press(), None);
    }

    #[test]
    fn test_layouts() {
        assert_eq!(Layout::Cosmac.key_for_label('x'), Some(0x0));
        assert_eq!(Layout::Cosmac.key_for_label('4'), Some(0xC));
        assert_eq!(Layout::Sequential.key_for_label('1'), Some(0x0));
        assert_eq!(Layout::Sequential.key_for_label('r'), Some(0x7));
        assert_eq!(Layout::Sequential.key_for_label('v'), Some(0xF));
        assert_eq!(Layout::Sequential.key_for_label('p'), None);
        for layout in [Layout::Cosmac, Layout::Sequential] {
            let mut keys: Vec<u8> = "1234qwerasdfzxcv"
                .chars()
                .filter_map(|c| layout.key_for_label(c))
                .collect();
            keys.sort();
            assert_eq!(keys, (0..0x10).collect::<Vec<u8>>());
        }
    }
}
