mod keymap;

use std::{path::PathBuf, process::ExitCode, sync::Arc, time};

use anyhow::Context;
use chip8::{config::Quirks, Chip8, Layout};
use clap::{Parser, ValueEnum};
use log::{debug, error, info, warn};
use pixels::{Pixels, SurfaceTexture};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::WindowEvent,
    event_loop::{self, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::Window,
};

const TITLE: &str = "CHIP-8";
const FRAME_INTERVAL: time::Duration = time::Duration::new(0, 1_000_000_000u32 / 60);

struct AppConfig {
    pub window: winit::window::WindowAttributes,
    pub layout: Layout,
}

impl AppConfig {
    pub fn new(args: &Args) -> Self {
        Self {
            window: Window::default_attributes()
                .with_title(TITLE)
                .with_inner_size(LogicalSize::new(
                    (chip8::SCREEN_WIDTH as u32) * args.scale,
                    (chip8::SCREEN_HEIGHT as u32) * args.scale,
                ))
                .with_resizable(false),
            layout: args.layout.into(),
        }
    }
}

struct State {
    pub(crate) chip8: Chip8,
    pub(crate) window: Arc<Window>,
    pub(crate) pixels: Pixels<'static>,
    pub(crate) beeping: bool,
}

struct App {
    config: AppConfig,
    /// The machine until the window exists, after which it lives in `state`
    pending: Option<Chip8>,
    state: Option<State>,
}

impl App {
    pub fn new(config: AppConfig, chip8: Chip8) -> Self {
        Self {
            config,
            pending: Some(chip8),
            state: None,
        }
    }

    pub fn init(&mut self, event_loop: &event_loop::ActiveEventLoop) -> anyhow::Result<()> {
        let Some(chip8) = self.pending.take() else {
            return Ok(());
        };

        let window = event_loop
            .create_window(self.config.window.to_owned())
            .context("create window")?;
        let window = Arc::new(window);

        let window_size = window.inner_size();
        let surface_texture =
            SurfaceTexture::new(window_size.width, window_size.height, window.clone());

        let pixels = Pixels::new(
            chip8::SCREEN_WIDTH as u32,
            chip8::SCREEN_HEIGHT as u32,
            surface_texture,
        )
        .context("create pixels instance")?;

        let mut state = State {
            chip8,
            window,
            pixels,
            beeping: false,
        };
        App::render(&mut state).context("render first frame")?;
        state.window.request_redraw();
        self.state = Some(state);

        Ok(())
    }

    pub fn render(state: &mut State) -> anyhow::Result<()> {
        let frame = state.chip8.frame();
        for (pixel, rgba) in state.pixels.frame_mut().chunks_exact_mut(4).zip(frame) {
            pixel.copy_from_slice(rgba);
        }
        state.pixels.render().context("render pixels")
    }

    /// Run one 60 Hz frame of the machine. Returns false once it has halted.
    pub fn frame(&mut self) -> bool {
        let Some(state) = self.state.as_mut() else {
            return true;
        };

        if let Err(e) = state.chip8.cycle() {
            error!("emulation stopped: {}", e);
            debug!("{}", state.chip8);
            return false;
        }

        if state.chip8.take_fb_dirty() {
            state.window.request_redraw();
        }

        let beeping = state.chip8.is_sound_playing();
        if beeping != state.beeping {
            state.beeping = beeping;
            let title = if beeping { "CHIP-8 (beep)" } else { TITLE };
            state.window.set_title(title);
        }
        true
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &event_loop::ActiveEventLoop) {
        if let Err(e) = self.init(event_loop) {
            error!("init failed: {:?}", e);
            std::process::exit(1);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &event_loop::ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: winit::event::WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Exiting...");
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                let Some(state) = self.state.as_mut() else {
                    return;
                };

                state.window.pre_present_notify();
                if let Err(e) = App::render(state) {
                    error!("render failed: {:?}", e);
                    event_loop.exit();
                }
            }
            WindowEvent::KeyboardInput {
                device_id: _,
                event,
                is_synthetic: _,
            } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                if code == KeyCode::Escape {
                    event_loop.exit();
                    return;
                }

                let Some(state) = self.state.as_mut() else {
                    return;
                };
                let Some(key) = keymap::label(code).and_then(|l| self.config.layout.key_for_label(l))
                else {
                    return;
                };

                let result = if event.state.is_pressed() {
                    if event.repeat {
                        return;
                    }
                    state.chip8.keydown(key)
                } else {
                    state.chip8.keyup(key)
                };
                if let Err(e) = result {
                    warn!("key event dropped: {}", e);
                }
            }
            _ => (),
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KeyLayout {
    /// 1234/QWER/ASDF/ZXCV laid out like the COSMAC VIP keypad
    Cosmac,
    /// 1234/QWER/ASDF/ZXCV mapped to 0 through F in reading order
    Sequential,
}

impl From<KeyLayout> for Layout {
    fn from(value: KeyLayout) -> Self {
        match value {
            KeyLayout::Cosmac => Layout::Cosmac,
            KeyLayout::Sequential => Layout::Sequential,
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(value_name = "ROM", help = "Program image to load at 0x200", value_hint = clap::ValueHint::FilePath)]
    rom: PathBuf,
    #[arg(long, help = "Copy VY into VX before 8XY6/8XYE shifts")]
    legacy_shift: bool,
    #[arg(long, help = "Make BNNN add VX instead of V0")]
    jump_add_offset: bool,
    #[arg(long, help = "Make FX55/FX65 advance I")]
    memory_increment_i: bool,
    #[arg(long, help = "Wrap sprites horizontally at 63 columns")]
    legacy_wrap: bool,
    #[arg(long, value_name = "N", default_value_t = 11, help = "Instructions executed per 60 Hz frame")]
    ops_per_frame: usize,
    #[arg(long, value_name = "SEED", help = "Seed the random number generator")]
    seed: Option<u64>,
    #[arg(long, value_name = "N", default_value_t = 10, help = "Window pixels per CHIP-8 pixel")]
    scale: u32,
    #[arg(long, value_enum, default_value_t = KeyLayout::Cosmac, help = "Keyboard to keypad mapping")]
    layout: KeyLayout,
    #[arg(long, help = "Print the program's disassembly and exit")]
    disassemble: bool,
}

impl Args {
    fn quirks(&self) -> Quirks {
        Quirks {
            legacy_shift: self.legacy_shift,
            jump_add_offset: self.jump_add_offset,
            memory_increment_i: self.memory_increment_i,
            legacy_wrap: self.legacy_wrap,
        }
    }
}

fn build_chip8(args: &Args) -> anyhow::Result<Chip8> {
    let mut chip8 = Chip8::new()
        .context("construct new chip8 instance")?
        .quirks(args.quirks())
        .ops_per_cycle(args.ops_per_frame);
    if let Some(seed) = args.seed {
        chip8 = chip8.seed(seed);
    }

    chip8
        .load_rom_from_file(&args.rom)
        .context("load rom from file")?;
    info!("loaded {}", args.rom.display());
    log::trace!("{}", chip8);

    Ok(chip8)
}

fn disassemble(args: &Args) -> anyhow::Result<()> {
    let rom = std::fs::read(&args.rom).context("read rom file")?;
    for (addr, instruction) in chip8::disassemble(&rom, chip8::ROM_ADDR as u16) {
        println!("{:#05x}  {}", addr, instruction);
    }
    Ok(())
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
    if args.disassemble {
        disassemble(&args)?;
        return Ok(ExitCode::SUCCESS);
    }

    let chip8 = build_chip8(&args)?;
    let mut event_loop = EventLoop::new().context("create event loop")?;
    let mut app = App::new(AppConfig::new(&args), chip8);

    loop {
        let frame_start = time::Instant::now();
        let timeout = Some(time::Duration::ZERO);
        let status = event_loop.pump_app_events(timeout, &mut app);

        if let PumpStatus::Exit(exit_code) = status {
            break Ok(ExitCode::from(exit_code as u8));
        }

        if !app.frame() {
            break Ok(ExitCode::FAILURE);
        }

        std::thread::sleep(FRAME_INTERVAL.saturating_sub(frame_start.elapsed()));
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}
