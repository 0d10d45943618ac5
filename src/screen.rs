/// # screen
///
/// the interpreter's pixel grid. it is always allocated at the extended
/// resolution; standard mode just uses the top-left 64x32 corner. extended
/// mode additionally applies a wrapping viewport offset, which is how the
/// SCHIP scroll instructions move the picture without copying pixels about.
pub const LOW_WIDTH: usize = 64;
pub const LOW_HEIGHT: usize = 32;
pub const HIGH_WIDTH: usize = 128;
pub const HIGH_HEIGHT: usize = 64;
pub const PIXEL_COUNT: usize = HIGH_WIDTH * HIGH_HEIGHT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// 64x32
    #[default]
    Standard,
    /// 128x64
    Extended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pixels: Box<[bool]>,
    mode: DisplayMode,
    x_offset: usize,
    y_offset: usize,
}

impl Default for Screen {
    fn default() -> Self {
        Screen::new()
    }
}

impl Screen {
    pub fn new() -> Self {
        Screen {
            pixels: vec![false; PIXEL_COUNT].into_boxed_slice(),
            mode: DisplayMode::Standard,
            x_offset: 0,
            y_offset: 0,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: DisplayMode) {
        self.mode = mode;
    }

    pub fn width(&self) -> usize {
        match self.mode {
            DisplayMode::Standard => LOW_WIDTH,
            DisplayMode::Extended => HIGH_WIDTH,
        }
    }

    pub fn height(&self) -> usize {
        match self.mode {
            DisplayMode::Standard => LOW_HEIGHT,
            DisplayMode::Extended => HIGH_HEIGHT,
        }
    }

    /// viewport offset; only meaningful in extended mode
    pub fn offset(&self) -> (usize, usize) {
        (self.x_offset, self.y_offset)
    }

    pub fn set_offset(&mut self, x: usize, y: usize) {
        self.x_offset = x % HIGH_WIDTH;
        self.y_offset = y % HIGH_HEIGHT;
    }

    // logical (x, y) in the current mode to a buffer index; coordinates wrap
    fn index(&self, x: usize, y: usize) -> usize {
        let (x, y) = match self.mode {
            DisplayMode::Standard => (x % LOW_WIDTH, y % LOW_HEIGHT),
            DisplayMode::Extended => (
                (x + self.x_offset) % HIGH_WIDTH,
                (y + self.y_offset) % HIGH_HEIGHT,
            ),
        };
        y * HIGH_WIDTH + x
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[self.index(x, y)]
    }

    /// flip a pixel; returns whether it was lit beforehand
    pub fn toggle(&mut self, x: usize, y: usize) -> bool {
        let i = self.index(x, y);
        let before = self.pixels[i];
        self.pixels[i] = !before;
        before
    }

    /// blank every pixel of both resolutions
    pub fn clear(&mut self) {
        self.pixels.iter_mut().for_each(|p| *p = false);
    }

    pub fn scroll_right(&mut self, n: usize) {
        self.x_offset = (self.x_offset + HIGH_WIDTH - n % HIGH_WIDTH) % HIGH_WIDTH;
    }

    pub fn scroll_left(&mut self, n: usize) {
        self.x_offset = (self.x_offset + n) % HIGH_WIDTH;
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.y_offset = (self.y_offset + HIGH_HEIGHT - n % HIGH_HEIGHT) % HIGH_HEIGHT;
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.y_offset = (self.y_offset + n) % HIGH_HEIGHT;
    }

    /// logical coordinates of every lit pixel in the visible area
    pub fn lit_pixels(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let w = self.width();
        (0..self.height())
            .flat_map(move |y| (0..w).map(move |x| (x, y)))
            .filter(move |(x, y)| self.pixel(*x, *y))
    }

    /// raw buffer, independent of mode and offset
    pub fn raw(&self) -> &[bool] {
        &self.pixels
    }

    pub fn raw_mut(&mut self) -> &mut [bool] {
        &mut self.pixels
    }
}
