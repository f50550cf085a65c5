/// The delay and sound timers, both counting down at 60 Hz until they reach 0
#[derive(Debug, Clone, Default)]
pub struct Timers {
    dt: u32,
    st: u32,
}

impl Timers {
    pub fn new() -> Self {
        Self { dt: 0, st: 0 }
    }

    pub fn tick(&mut self) {
        self.dt = self.dt.saturating_sub(1);
        self.st = self.st.saturating_sub(1);
    }

    pub fn delay(&self) -> u32 {
        self.dt
    }

    pub fn set_delay(&mut self, value: u32) {
        self.dt = value;
    }

    pub fn sound(&self) -> u32 {
        self.st
    }

    pub fn set_sound(&mut self, value: u32) {
        self.st = value;
    }

    /// A tone should be playing for as long as the sound timer is non-zero
    pub fn is_sound_active(&self) -> bool {
        self.st > 0
    }
}
