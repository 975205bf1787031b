/// Terminal mesh viewer with an ASCII rasterizer and repair keys
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use log::debug;
use meshmend_core::{RepairOp, Session};
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};

pub mod renderer;

pub use renderer::AsciiRenderer;

/// Radians per orbit key press.
const ORBIT_STEP: f32 = 0.1;
/// Radians per frame while auto-rotating.
const AUTO_ROTATE_STEP: f32 = 0.02;
/// Dolly factor per zoom key press.
const ZOOM_STEP: f32 = 0.9;
/// Diagnostics entries shown in the status overlay.
const STATUS_ENTRIES: usize = 6;

/// Terminal cells are roughly twice as tall as they are wide.
const CELL_ASPECT: u32 = 2;

/// Something the operator asked for from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Quit,
    Orbit { yaw: f32, pitch: f32 },
    Zoom(f32),
    Repair(RepairOp),
    ToggleAutoRotate,
    ToggleStatus,
}

/// Key bindings
pub fn key_action(code: KeyCode) -> Option<Action> {
    let action = match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('w') | KeyCode::Up => Action::Orbit { yaw: 0.0, pitch: -ORBIT_STEP },
        KeyCode::Char('s') | KeyCode::Down => Action::Orbit { yaw: 0.0, pitch: ORBIT_STEP },
        KeyCode::Char('a') | KeyCode::Left => Action::Orbit { yaw: -ORBIT_STEP, pitch: 0.0 },
        KeyCode::Char('d') | KeyCode::Right => Action::Orbit { yaw: ORBIT_STEP, pitch: 0.0 },
        KeyCode::Char('+') | KeyCode::Char('=') => Action::Zoom(ZOOM_STEP),
        KeyCode::Char('-') => Action::Zoom(1.0 / ZOOM_STEP),
        KeyCode::Char('n') => Action::Repair(RepairOp::RecomputeNormals),
        KeyCode::Char('i') => Action::Repair(RepairOp::RebaseIndices),
        KeyCode::Char('y') => Action::Repair(RepairOp::SwapYZ),
        KeyCode::Char('x') => Action::Repair(RepairOp::FlipX),
        KeyCode::Char('c') => Action::Repair(RepairOp::CenterAndZoom),
        KeyCode::Char(' ') => Action::ToggleAutoRotate,
        KeyCode::Char('h') => Action::ToggleStatus,
        _ => return None,
    };
    Some(action)
}

/// Run-time options for the viewer loop.
#[derive(Debug, Clone, Copy)]
pub struct AppOptions {
    pub fps: u32,
    pub auto_rotate: bool,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            fps: 30,
            auto_rotate: false,
        }
    }
}

/// Main application struct for the terminal viewer
pub struct TerminalApp {
    session: Session,
    renderer: AsciiRenderer,
    running: bool,
    auto_rotate: bool,
    show_status: bool,
    frame_time: Duration,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(mut session: Session, options: AppOptions) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        session.resize(u32::from(width), u32::from(height) * CELL_ASPECT);

        Ok(Self {
            session,
            renderer: AsciiRenderer::new(width as usize, height as usize),
            running: true,
            auto_rotate: options.auto_rotate,
            show_status: true,
            frame_time: Duration::from_millis(1000 / u64::from(options.fps.max(1))),
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        while self.running {
            // Block for input until the next frame is due.
            if event::poll(self.frame_time)? {
                self.handle_event(event::read()?);
            }

            if self.auto_rotate {
                self.session.orbit(AUTO_ROTATE_STEP, 0.0);
            }

            // Only redraw when something changed.
            if self.session.take_dirty() {
                self.render()?;
                self.frame_count += 1;
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press | KeyEventKind::Repeat,
                ..
            }) => {
                if let Some(action) = key_action(code) {
                    self.apply(action);
                }
            }
            Event::Resize(width, height) => {
                self.renderer.resize(width as usize, height as usize);
                self.session
                    .resize(u32::from(width), u32::from(height) * CELL_ASPECT);
            }
            _ => {}
        }
    }

    /// Apply one operator action to the session.
    pub fn apply(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::Orbit { yaw, pitch } => self.session.orbit(yaw, pitch),
            Action::Zoom(factor) => self.session.zoom(factor),
            Action::Repair(op) => {
                let outcome = self.session.apply(op);
                debug!("{op}: {outcome:?}");
                // Skipped and unchanged repairs still update the status text.
                self.session.mark_dirty();
            }
            Action::ToggleAutoRotate => self.auto_rotate = !self.auto_rotate,
            Action::ToggleStatus => {
                self.show_status = !self.show_status;
                self.session.mark_dirty();
            }
        }
    }

    fn render(&mut self) -> io::Result<()> {
        self.renderer.clear();
        self.renderer
            .render(self.session.geometry(), self.session.view());

        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;
        self.renderer.draw(&mut stdout)?;

        // Draw UI overlay
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "meshmend | FPS: {:.1} | WASD/Arrows=orbit +/-=zoom n/i/y/x/c=repair space=spin h=status q=quit",
                self.fps
            )),
            terminal::Clear(ClearType::UntilNewLine),
            ResetColor
        )?;

        if self.show_status {
            for (row, line) in self.session.status_lines(STATUS_ENTRIES).iter().enumerate() {
                let color = if line.contains("error:") {
                    Color::Red
                } else if line.contains("warning:") {
                    Color::Magenta
                } else {
                    Color::Green
                };
                queue!(
                    stdout,
                    cursor::MoveTo(0, row as u16 + 1),
                    SetForegroundColor(color),
                    Print(line),
                    ResetColor
                )?;
            }
        }

        stdout.flush()?;
        Ok(())
    }
}
