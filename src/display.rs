use crate::config::Palette;
use crate::screen::{DisplayMode, Screen};
use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use log::warn;
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// Display is used by the interpreter to draw things on the screen. It should
/// abstract the implementation details, so a variety of kinds of screen would
/// work.
pub trait Display {
    /// paint the visible part of the screen in the given colours
    fn draw(&mut self, screen: &Screen, palette: &Palette) -> io::Result<()>;

    /// forget what is on the physical display so the next draw repaints all
    /// of it; needed after something else has scribbled on the terminal
    fn invalidate(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// logical size of the screen in the current mode, and how to plot it
struct Resolution(usize, usize);

impl Resolution {
    fn of(screen: &Screen) -> Self {
        Resolution(screen.width(), screen.height())
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// canvas coordinates of every lit pixel; y grows downwards on the
    /// chip-8 but upwards on the canvas
    fn points(&self, screen: &Screen) -> Vec<(f64, f64)> {
        screen
            .lit_pixels()
            .map(|(x, y)| (x as f64, -1.0 * y as f64))
            .collect()
    }
}

fn rgb(colour: u32) -> Color {
    Color::Rgb((colour >> 16) as u8, (colour >> 8) as u8, colour as u8)
}

/// terminal cells the canvas occupies, border included. standard mode is one
/// block per pixel; extended mode packs 2x2 pixels into each braille cell
const CANVAS_CELLS: (u16, u16) = (64 + 2, 32 + 2);

/// monochrome display in a terminal, rendered using TUI and Crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl MonoTermDisplay {
    pub fn new() -> io::Result<MonoTermDisplay> {
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, Hide)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        Ok(MonoTermDisplay { terminal })
    }
}

impl Drop for MonoTermDisplay {
    fn drop(&mut self) {
        if let Err(e) = execute!(self.terminal.backend_mut(), Show, LeaveAlternateScreen) {
            warn!("couldn't restore terminal: {}", e);
        }
    }
}

impl Display for MonoTermDisplay {
    fn draw(&mut self, screen: &Screen, palette: &Palette) -> io::Result<()> {
        let resolution = Resolution::of(screen);
        let marker = match screen.mode() {
            DisplayMode::Standard => Marker::Block,
            DisplayMode::Extended => Marker::Braille,
        };
        let (bg, fg) = (rgb(palette.background), rgb(palette.foreground));
        let coords = resolution.points(screen);

        self.terminal.draw(|f| {
            let size = Rect::new(0, 0, CANVAS_CELLS.0, CANVAS_CELLS.1).intersection(f.size());
            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().fg(fg).bg(bg)),
                )
                .background_color(bg)
                .x_bounds(resolution.x_bounds())
                .y_bounds(resolution.y_bounds())
                .marker(marker)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &coords,
                        color: fg,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }

    fn invalidate(&mut self) -> io::Result<()> {
        execute!(self.terminal.backend_mut(), EnterAlternateScreen, Hide)?;
        self.terminal.clear()
    }
}

/// useful for testing non-display routines; counts frames and keeps a copy
/// of the last one
#[derive(Debug, Default)]
pub struct DummyDisplay {
    pub frames: usize,
    pub last: Option<Screen>,
}

impl DummyDisplay {
    pub fn new() -> DummyDisplay {
        DummyDisplay::default()
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, screen: &Screen, _palette: &Palette) -> io::Result<()> {
        self.frames += 1;
        self.last = Some(screen.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_follow_mode() {
        let mut s = Screen::new();
        let r = Resolution::of(&s);
        assert_eq!(r.x_bounds(), [0.0, 63.0]);
        assert_eq!(r.y_bounds(), [-31.0, 0.0]);
        s.set_mode(DisplayMode::Extended);
        let r = Resolution::of(&s);
        assert_eq!(r.x_bounds(), [0.0, 127.0]);
        assert_eq!(r.y_bounds(), [-63.0, 0.0]);
    }

    #[test]
    fn test_points_flip_y() {
        let mut s = Screen::new();
        s.toggle(3, 7);
        assert_eq!(Resolution::of(&s).points(&s), vec![(3.0, -7.0)]);
    }

    #[test]
    fn test_rgb() {
        assert_eq!(rgb(0x102030), Color::Rgb(0x10, 0x20, 0x30));
    }

    #[test]
    fn test_dummy_display_counts_frames() -> io::Result<()> {
        let mut d = DummyDisplay::new();
        let mut s = Screen::new();
        s.toggle(0, 0);
        d.draw(&s, &Palette::default())?;
        d.draw(&s, &Palette::default())?;
        assert_eq!(d.frames, 2);
        assert_eq!(d.last.map(|l| l.lit_pixels().count()), Some(1));
        Ok(())
    }
}
