//! Session - The engine object
//!
//! Owns everything a terminal instance needs: options, tilesets, the
//! layered stage, the renderer and its surface, and the input queue.
//! The "current" drawing state (layer, colors, composition) lives here
//! and scopes every later drawing call until changed.
//!
//! All drawing and configuration calls must come from the thread owning
//! the session. Only the input queue is shared, through `InputSender`.

use std::thread;
use std::time::Duration;

use log::{debug, error, info};

use crate::config::{parse_options, Options, Update};
use crate::core::{color_from_name, Color, Composition, Corners, Grid, Leaf, Rect, Size, Stage, MAX_LAYER};
use crate::error::{EngineError, Result};
use crate::font::FontManager;
use crate::input::keys::*;
use crate::input::{Event, InputQueue, InputSender, LineEditor, LineOutcome};
use crate::renderer::{HeadlessSurface, Renderer, Surface};
use crate::text::layout::ALIGN_DEFAULT;
use crate::text::{tokenize, TextLayout, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Open,
    Closed,
}

pub struct Session {
    lifecycle: Lifecycle,
    options: Options,
    fonts: FontManager,
    stage: Stage,
    renderer: Renderer,
    surface: Box<dyn Surface>,
    queue: InputQueue,
    cell_size: Size,
    // Current drawing state
    layer: usize,
    color: Color,
    bkcolor: Color,
    composition: Composition,
}

impl Session {
    /// An idle session presenting to `surface`
    pub fn new(surface: Box<dyn Surface>) -> Self {
        let options = Options::default();
        let fonts = FontManager::new();
        let cell_size = fonts.base_cell_size();
        Self {
            lifecycle: Lifecycle::Idle,
            stage: Stage::new(options.window_size, Color::BLACK),
            options,
            fonts,
            renderer: Renderer::new(),
            surface,
            queue: InputQueue::new(),
            cell_size,
            layer: 0,
            color: Color::WHITE,
            bkcolor: Color::BLACK,
            composition: Composition::Off,
        }
    }

    /// A session that keeps frames in memory
    pub fn headless() -> Self {
        Self::new(Box::new(HeadlessSurface::new()))
    }

    fn ensure_open(&self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Open => Ok(()),
            Lifecycle::Idle => Err(EngineError::NotOpen),
            Lifecycle::Closed => Err(EngineError::EngineClosed),
        }
    }

    fn ensure_alive(&self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Closed => Err(EngineError::EngineClosed),
            _ => Ok(()),
        }
    }

    // ========== Lifecycle ==========

    /// Initialize the surface with default options. Returns false when
    /// the surface failed and the session fell back to headless.
    pub fn open(&mut self) -> Result<bool> {
        match self.lifecycle {
            Lifecycle::Open => return Ok(true),
            Lifecycle::Closed => return Err(EngineError::EngineClosed),
            Lifecycle::Idle => {}
        }

        self.options = Options::default();
        self.fonts = FontManager::new();
        self.cell_size = self.fonts.base_cell_size();
        self.fonts.set_cell_size(self.cell_size);
        self.stage = Stage::new(self.options.window_size, self.bkcolor);

        let size = self.options.window_size;
        let mut native = true;
        if let Err(e) = self.surface.init(&self.options.window_title, size, self.cell_size) {
            let err = EngineError::PlatformInit(format!("{} surface: {}", self.surface.name(), e));
            error!("{}", err);
            self.surface = Box::new(HeadlessSurface::new());
            self.surface.init(&self.options.window_title, size, self.cell_size)?;
            native = false;
        }

        self.queue.set_cell_size(self.cell_size);
        self.queue.set_size(size);
        self.queue.configure(
            self.options.input_filter.clone(),
            self.options.input_precise_mouse,
            self.options.input_sticky_close,
        );
        self.lifecycle = Lifecycle::Open;
        info!(
            "Session open: {} cells of {} on {} surface",
            size,
            self.cell_size,
            self.surface.name()
        );
        Ok(native)
    }

    /// Shut down; wakes blocked readers. Safe to call more than once.
    pub fn close(&mut self) {
        if self.lifecycle == Lifecycle::Closed {
            return;
        }
        let was_open = self.lifecycle == Lifecycle::Open;
        self.lifecycle = Lifecycle::Closed;
        self.queue.shutdown();
        if was_open {
            self.surface.shutdown();
            info!("Session closed after {} frames", self.renderer.frames());
        }
    }

    pub fn is_open(&self) -> bool {
        self.lifecycle == Lifecycle::Open
    }

    // ========== Configuration ==========

    /// Apply an option string; nothing changes unless all of it is valid
    pub fn set(&mut self, options: &str) -> Result<()> {
        self.ensure_open()?;
        let groups = parse_options(options)?;
        let update = self.options.validate(&groups, &self.fonts)?;
        self.apply(update);
        Ok(())
    }

    /// `set` for an option string in `terminal.encoding`
    pub fn set_bytes(&mut self, options: &[u8]) -> Result<()> {
        let text = self.options.terminal_encoding.decode(options);
        self.set(&text)
    }

    fn apply(&mut self, update: Update) {
        let touches_fonts = update.touches_fonts();
        let Update {
            options,
            tilesets,
            log_level_changed,
        } = update;

        self.fonts.apply(tilesets);

        let cell_size = options.window_cellsize.unwrap_or_else(|| self.fonts.base_cell_size());
        if cell_size != self.cell_size || touches_fonts {
            debug!("Cell size {}", cell_size);
            self.cell_size = cell_size;
            self.fonts.set_cell_size(cell_size);
            self.queue.set_cell_size(cell_size);
        }

        if options.window_size != self.stage.size {
            self.resize(options.window_size);
        }
        if options.window_title != self.options.window_title {
            self.surface.set_title(&options.window_title);
        }
        if log_level_changed {
            log::set_max_level(options.log_level);
        }
        self.queue.configure(
            options.input_filter.clone(),
            options.input_precise_mouse,
            options.input_sticky_close,
        );
        self.options = options;
    }

    fn resize(&mut self, size: Size) {
        info!("Stage resized to {}", size);
        self.stage.resize(size);
        self.options.window_size = size;
        self.queue.set_size(size);
    }

    /// Current value of an option, or `default` when it has none
    pub fn get(&self, key: &str, default: &str) -> Result<String> {
        self.ensure_alive()?;
        Ok(self
            .options
            .get(key, &self.fonts)
            .unwrap_or_else(|| default.to_string()))
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    // ========== Output ==========

    /// Compose the drawn layers and show them
    pub fn refresh(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.stage.commit();
        let frame = self.renderer.compose(&self.stage.front, &mut self.fonts, self.cell_size);
        self.surface.present(&frame)
    }

    /// Empty every layer; layer 0 takes the current background color
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.stage.clear(self.bkcolor);
        Ok(())
    }

    /// Empty an area of the current layer
    pub fn clear_area(&mut self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        self.ensure_open()?;
        let bg = if self.layer == 0 { self.bkcolor } else { Color::TRANSPARENT };
        self.stage
            .back
            .layer_mut(self.layer)
            .grid
            .clear_area(Rect::new(x, y, width, height), bg);
        Ok(())
    }

    /// Restrict the current layer to an area; an empty area resets it
    pub fn crop(&mut self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        self.ensure_open()?;
        let crop = (width > 0 && height > 0).then(|| Rect::new(x, y, width, height));
        self.stage.back.layer_mut(self.layer).crop = crop;
        Ok(())
    }

    /// Select the layer later drawing goes to, clamped to 0..=255
    pub fn layer(&mut self, index: i32) -> Result<()> {
        self.ensure_open()?;
        self.layer = (index.max(0) as usize).min(MAX_LAYER);
        self.stage.back.layer_mut(self.layer);
        Ok(())
    }

    pub fn color(&mut self, color: Color) -> Result<()> {
        self.ensure_open()?;
        self.color = color;
        Ok(())
    }

    pub fn bkcolor(&mut self, color: Color) -> Result<()> {
        self.ensure_open()?;
        self.bkcolor = color;
        Ok(())
    }

    /// Set the composition mode, recording it on the current layer
    pub fn composition(&mut self, mode: Composition) -> Result<()> {
        self.ensure_open()?;
        self.composition = mode;
        self.stage.back.layer_mut(self.layer).composition = mode;
        Ok(())
    }

    fn put_code(&self, code: u32) -> u32 {
        if self.options.terminal_encoding_affects_put && code <= 0xFF {
            self.options.terminal_encoding.tile_code(code)
        } else {
            code
        }
    }

    /// Write a leaf on the current layer; off-grid writes are dropped
    fn place(&mut self, x: i32, y: i32, leaf: Leaf, stack: bool, bg: Color) {
        let grid = &mut self.stage.back.layer_mut(self.layer).grid;
        grid.put(x, y, leaf, stack);
        if bg.a() > 0 {
            grid.set_bg(x, y, bg);
        }
    }

    pub fn put(&mut self, x: i32, y: i32, code: u32) -> Result<()> {
        self.ensure_open()?;
        let leaf = Leaf::new(self.put_code(code), self.color);
        self.place(x, y, leaf, self.composition == Composition::On, self.bkcolor);
        Ok(())
    }

    /// Put a glyph stretched over `dx`x`dy` cells (natural size when
    /// either is not positive), its corners displaced by pixel offsets
    pub fn put_ext(&mut self, x: i32, y: i32, dx: i32, dy: i32, code: u32, corners: Option<Corners>) -> Result<()> {
        self.ensure_open()?;
        let mut leaf = Leaf::new(self.put_code(code), self.color);
        leaf.span = (dx > 0 && dy > 0).then_some((dx, dy));
        leaf.corners = corners;
        self.place(x, y, leaf, self.composition == Composition::On, self.bkcolor);
        Ok(())
    }

    fn layout(&self, text: &str, bounds: Size) -> TextLayout {
        let tokens = tokenize(text, self.options.output_postformatting);
        let fonts = &self.fonts;
        TextLayout::new(&tokens, |code| fonts.spacing(code), bounds)
    }

    /// Print text in a box (0 = unbounded); returns its size in cells
    pub fn print(&mut self, x: i32, y: i32, text: &str, width: i32, height: i32, align: i32) -> Result<Size> {
        self.ensure_open()?;
        let bounds = Size::new(width.max(0), height.max(0));
        let layout = self.layout(text, bounds);
        let stack = self.composition == Composition::On;
        for p in layout.place(x, y, bounds, align) {
            let leaf = Leaf::new(p.item.code, p.item.fg.unwrap_or(self.color));
            let bg = p.item.bg.unwrap_or(self.bkcolor);
            self.place(p.x, p.y, leaf, stack || p.item.combine, bg);
        }
        Ok(layout.size)
    }

    /// `print` for text in `terminal.encoding`
    pub fn print_bytes(&mut self, x: i32, y: i32, text: &[u8], width: i32, height: i32, align: i32) -> Result<Size> {
        let text = self.options.terminal_encoding.decode(text);
        self.print(x, y, &text, width, height, align)
    }

    /// Size `print` would return, without drawing
    pub fn measure(&self, text: &str, width: i32, height: i32) -> Result<Size> {
        self.ensure_open()?;
        Ok(self.layout(text, Size::new(width.max(0), height.max(0))).size)
    }

    pub fn measure_bytes(&self, text: &[u8], width: i32, height: i32) -> Result<Size> {
        let text = self.options.terminal_encoding.decode(text);
        self.measure(&text, width, height)
    }

    // ========== Readback ==========

    /// Code of the top leaf in the z-th occupied layer from the top, 0 if none
    pub fn pick(&self, x: i32, y: i32, z: i32) -> Result<u32> {
        self.ensure_open()?;
        Ok(self.stage.back.pick(x, y, z.max(0) as usize).map(|l| l.code).unwrap_or(0))
    }

    pub fn pick_color(&self, x: i32, y: i32, z: i32) -> Result<Color> {
        self.ensure_open()?;
        Ok(self
            .stage
            .back
            .pick(x, y, z.max(0) as usize)
            .map(|l| l.color)
            .unwrap_or(Color::TRANSPARENT))
    }

    pub fn pick_bkcolor(&self, x: i32, y: i32, z: i32) -> Result<Color> {
        self.ensure_open()?;
        Ok(self.stage.back.pick_bkcolor(x, y, z.max(0) as usize))
    }

    // ========== Input ==========

    pub fn has_input(&self) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.queue.has_input())
    }

    /// Dequeue an event, applying resizes to the stage
    fn next_event(&mut self) -> Event {
        let event = self.queue.read();
        if let Event::Resize { width, height } = event {
            let size = Size::new(width, height);
            if self.options.window_resizeable && !size.is_empty() && size != self.stage.size {
                self.resize(size);
            }
        }
        event
    }

    /// Block until an event arrives and return its code. After close
    /// this returns `TK_CLOSE` instead of failing.
    pub fn read(&mut self) -> i32 {
        if self.lifecycle != Lifecycle::Open {
            return TK_CLOSE;
        }
        self.next_event().code()
    }

    /// Code of the next event without dequeuing, 0 when none
    pub fn peek(&self) -> Result<i32> {
        self.ensure_open()?;
        Ok(self.queue.peek())
    }

    /// Instantaneous value of a state slot
    pub fn state(&self, slot: i32) -> Result<i32> {
        self.ensure_open()?;
        let value = match slot {
            TK_WIDTH => self.stage.size.width,
            TK_HEIGHT => self.stage.size.height,
            TK_CELL_WIDTH => self.cell_size.width,
            TK_CELL_HEIGHT => self.cell_size.height,
            TK_COLOR => self.color.0 as i32,
            TK_BKCOLOR => self.bkcolor.0 as i32,
            TK_LAYER => self.layer as i32,
            TK_COMPOSITION => self.composition.code(),
            TK_FULLSCREEN => 0,
            _ => self.queue.state(slot),
        };
        Ok(value)
    }

    /// Edit a line of text at (x, y) until RETURN or ESCAPE. The area
    /// is drawn on the current layer and restored afterwards.
    pub fn read_str(&mut self, x: i32, y: i32, initial: &str, max: i32) -> Result<LineOutcome> {
        self.ensure_open()?;
        let max = max.max(0) as usize;
        let Some(mut editor) = LineEditor::new(initial, max) else {
            return Ok(LineOutcome::TooLong);
        };

        let saved = self.stage.back.layer_mut(self.layer).grid.clone();
        let result = self.edit_line(x, y, &mut editor, &saved);
        self.stage.back.layer_mut(self.layer).grid = saved;
        let outcome = result?;
        self.refresh()?;
        debug!("read_str finished with {}", outcome.code());
        Ok(outcome)
    }

    /// `read_str` with initial text in `terminal.encoding`; the result
    /// is re-encoded the same way
    pub fn read_str_bytes(&mut self, x: i32, y: i32, initial: &[u8], max: i32) -> Result<(LineOutcome, Vec<u8>)> {
        let encoding = self.options.terminal_encoding;
        let outcome = self.read_str(x, y, &encoding.decode(initial), max)?;
        let bytes = match &outcome {
            LineOutcome::Ok(text) => encoding.encode(text),
            _ => initial.to_vec(),
        };
        Ok((outcome, bytes))
    }

    fn edit_line(
        &mut self,
        x: i32,
        y: i32,
        editor: &mut LineEditor,
        saved: &Grid,
    ) -> Result<LineOutcome> {
        loop {
            self.draw_line(x, y, editor, saved);
            self.refresh()?;
            let event = self.next_event();
            if let Some(outcome) = editor.handle(&event) {
                return Ok(outcome);
            }
        }
    }

    fn draw_line(&mut self, x: i32, y: i32, editor: &LineEditor, saved: &Grid) {
        self.stage.back.layer_mut(self.layer).grid = saved.clone();
        let (color, bkcolor) = (self.color, self.bkcolor);

        // Blank the field plus the cursor cell, limited to the grid
        let last = x
            .saturating_add(editor.max().min(i32::MAX as usize) as i32)
            .min(self.stage.size.width - 1);
        for cx in x.max(0)..=last {
            self.place(cx, y, Leaf::new(' ' as u32, color), false, bkcolor);
        }

        let tokens: Vec<Token> = editor.chars().iter().map(|&c| Token::Code(c as u32)).collect();
        let fonts = &self.fonts;
        let layout = TextLayout::new(&tokens, |code| fonts.spacing(code), Size::default());
        let placements = layout.place(x, y, Size::default(), ALIGN_DEFAULT);

        let cursor_x = placements
            .iter()
            .take(editor.cursor())
            .map(|p| p.item.advance)
            .fold(x, i32::saturating_add);
        for p in placements {
            self.place(p.x, p.y, Leaf::new(p.item.code, color), p.item.combine, bkcolor);
        }
        let cursor = Leaf::new(self.options.input_cursor_symbol, color);
        self.place(cursor_x, y, cursor, true, Color::TRANSPARENT);
    }

    /// Sleep the calling thread
    pub fn delay(&self, ms: i32) -> Result<()> {
        self.ensure_open()?;
        thread::sleep(Duration::from_millis(ms.max(0) as u64));
        Ok(())
    }

    /// Handle for the platform side to push events
    pub fn input_sender(&self) -> InputSender {
        self.queue.sender()
    }

    /// Input events lost to queue overflow
    pub fn dropped_events(&self) -> u64 {
        self.queue.dropped()
    }

    // ========== Colors ==========

    /// Resolve a color name; unknown names give opaque white
    pub fn color_from_name(&self, name: &str) -> Result<Color> {
        self.ensure_alive()?;
        Ok(color_from_name(name))
    }

    pub fn color_from_name_bytes(&self, name: &[u8]) -> Result<Color> {
        let name = self.options.terminal_encoding.decode(name);
        self.color_from_name(&name)
    }

    pub fn color_from_argb(&self, a: u8, r: u8, g: u8, b: u8) -> Result<Color> {
        self.ensure_alive()?;
        Ok(Color::from_argb(a, r, g, b))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{Frame, FrameHandle};
    use pretty_assertions::assert_eq;

    fn open() -> (Session, FrameHandle) {
        let surface = HeadlessSurface::new();
        let handle = surface.handle();
        let mut session = Session::new(Box::new(surface));
        assert!(session.open().unwrap());
        (session, handle)
    }

    fn key(c: char) -> Event {
        Event::Key {
            code: key_for_char(c).0,
            released: false,
            character: Some(c),
        }
    }

    fn special(code: i32) -> Event {
        Event::Key {
            code,
            released: false,
            character: None,
        }
    }

    struct BrokenSurface;

    impl Surface for BrokenSurface {
        fn name(&self) -> &str {
            "broken"
        }

        fn init(&mut self, _title: &str, _size: Size, _cell_size: Size) -> Result<()> {
            Err(EngineError::PlatformInit("no display".to_string()))
        }

        fn present(&mut self, _frame: &Frame) -> Result<()> {
            Ok(())
        }

        fn set_title(&mut self, _title: &str) {}

        fn shutdown(&mut self) {}
    }

    #[test]
    fn test_put_refresh_pick() {
        let (mut session, handle) = open();
        for (x, y) in [(0, 0), (79, 24), (40, 12)] {
            session.put(x, y, 'x' as u32).unwrap();
            session.refresh().unwrap();
            assert_eq!(session.pick(x, y, 0).unwrap(), 'x' as u32);
        }
        let frame = handle.latest().unwrap();
        assert_eq!(frame.cell(79, 24).map(|c| c.code), Some('x' as u32));
    }

    #[test]
    fn test_out_of_bounds_put_is_ignored() {
        let (mut session, _) = open();
        session.put(-1, 0, 'x' as u32).unwrap();
        session.put(80, 0, 'x' as u32).unwrap();
        session.put(0, 25, 'x' as u32).unwrap();
        session.put_ext(-5, -5, 2, 2, 'x' as u32, None).unwrap();
        for y in 0..25 {
            for x in 0..80 {
                assert_eq!(session.pick(x, y, 0).unwrap(), 0);
            }
        }
    }

    #[test]
    fn test_measure_matches_print() {
        let (mut session, _) = open();
        for (text, w, h) in [
            ("hello", 0, 0),
            ("hello world, how are you", 7, 0),
            ("one\ntwo\nthree", 0, 2),
            ("[color=red]tagged[/color] text", 4, 0),
        ] {
            let measured = session.measure(text, w, h).unwrap();
            let printed = session.print(0, 0, text, w, h, ALIGN_DEFAULT).unwrap();
            assert_eq!(measured, printed, "{:?}", text);
        }
    }

    #[test]
    fn test_window_size_round_trip() {
        let (mut session, _) = open();
        session.set("window.size=80x25").unwrap();
        assert_eq!(session.get("window.size", "").unwrap(), "80x25");
        session.set("window.size=20x10").unwrap();
        assert_eq!(session.get("window.size", "").unwrap(), "20x10");
        assert_eq!(session.state(TK_WIDTH).unwrap(), 20);
        assert_eq!(session.state(TK_HEIGHT).unwrap(), 10);
    }

    #[test]
    fn test_malformed_set_changes_nothing() {
        let (mut session, _) = open();
        assert!(matches!(session.set("window.size=abc"), Err(EngineError::Config(_))));
        assert_eq!(session.get("window.size", "").unwrap(), "80x25");

        // Valid first group, invalid second: the batch fails as a whole
        assert!(session.set("window.size=30x30; window.title=x; bogus.key=1").is_err());
        assert_eq!(session.get("window.size", "").unwrap(), "80x25");
        assert_eq!(session.get("window.title", "").unwrap(), "cellterm");
    }

    #[test]
    fn test_get_default_for_unknown_key() {
        let (session, _) = open();
        assert_eq!(session.get("nothing.here", "fallback").unwrap(), "fallback");
        assert_eq!(session.get("font.name", "").unwrap(), "default");
    }

    #[test]
    fn test_press_and_release_differ_by_release_bit() {
        let (mut session, _) = open();
        let sender = session.input_sender();
        sender.push(Event::Key {
            code: TK_A,
            released: false,
            character: Some('a'),
        });
        sender.push(Event::Key {
            code: TK_A,
            released: true,
            character: None,
        });
        let press = session.read();
        let release = session.read();
        assert_ne!(press, release);
        assert_eq!(press ^ release, TK_KEY_RELEASED);
        assert_eq!(press, TK_A);
    }

    #[test]
    fn test_small_window_scenario() {
        let (mut session, _) = open();
        session.set("window.size=20x10").unwrap();
        session.put(5, 5, '@' as u32).unwrap();
        session.refresh().unwrap();
        assert_eq!(session.pick(5, 5, 0).unwrap(), '@' as u32);
        assert_eq!(session.pick(5, 6, 0).unwrap(), 0);
    }

    #[test]
    fn test_read_str_commits_on_enter() {
        let (mut session, _) = open();
        let sender = session.input_sender();
        sender.push(key('c'));
        sender.push(special(TK_RETURN));
        let outcome = session.read_str(2, 3, "ab", 4).unwrap();
        assert_eq!(outcome, LineOutcome::Ok("abc".to_string()));
        assert_eq!(outcome.code(), 3);
        // Drawn area is restored
        assert_eq!(session.pick(2, 3, 0).unwrap(), 0);
    }

    #[test]
    fn test_read_str_cancel_and_too_long() {
        let (mut session, _) = open();
        session.input_sender().push(special(TK_ESCAPE));
        assert_eq!(session.read_str(0, 0, "", 5).unwrap(), LineOutcome::Cancelled);
        assert_eq!(session.read_str(0, 0, "abcdef", 3).unwrap(), LineOutcome::TooLong);
    }

    #[test]
    fn test_read_str_restores_existing_content() {
        let (mut session, _) = open();
        session.put(1, 0, '#' as u32).unwrap();
        session.input_sender().push(special(TK_RETURN));
        session.read_str(0, 0, "xyz", 5).unwrap();
        assert_eq!(session.pick(1, 0, 0).unwrap(), '#' as u32);
    }

    #[test]
    fn test_failing_surface_falls_back_to_headless() {
        let mut session = Session::new(Box::new(BrokenSurface));
        assert!(!session.open().unwrap());
        session.put(0, 0, 'k' as u32).unwrap();
        session.refresh().unwrap();
        assert_eq!(session.pick(0, 0, 0).unwrap(), 'k' as u32);
    }

    #[test]
    fn test_closed_session() {
        let (mut session, _) = open();
        session.close();
        session.close();
        assert!(matches!(session.put(0, 0, 1), Err(EngineError::EngineClosed)));
        assert!(matches!(session.set("window.size=10x10"), Err(EngineError::EngineClosed)));
        assert!(matches!(session.refresh(), Err(EngineError::EngineClosed)));
        assert_eq!(session.read(), TK_CLOSE);
        assert_eq!(session.read(), TK_CLOSE);
    }

    #[test]
    fn test_calls_before_open() {
        let mut session = Session::headless();
        assert!(matches!(session.put(0, 0, 1), Err(EngineError::NotOpen)));
        assert_eq!(session.get("window.size", "").unwrap(), "80x25");
    }

    #[test]
    fn test_layers_and_composition() {
        let (mut session, _) = open();
        session.put(1, 1, 'a' as u32).unwrap();
        session.layer(2).unwrap();
        session.put(1, 1, 'c' as u32).unwrap();
        assert_eq!(session.state(TK_LAYER).unwrap(), 2);
        assert_eq!(session.pick(1, 1, 0).unwrap(), 'c' as u32);
        assert_eq!(session.pick(1, 1, 1).unwrap(), 'a' as u32);

        session.layer(0).unwrap();
        session.composition(Composition::On).unwrap();
        session.put(3, 3, 'x' as u32).unwrap();
        session.put(3, 3, 'y' as u32).unwrap();
        assert_eq!(session.pick(3, 3, 0).unwrap(), 'y' as u32);
        assert_eq!(session.state(TK_COMPOSITION).unwrap(), TK_ON);

        session.clear().unwrap();
        assert_eq!(session.pick(1, 1, 0).unwrap(), 0);
    }

    #[test]
    fn test_colors_and_markup() {
        let (mut session, _) = open();
        let red = session.color_from_name("red").unwrap();
        assert_eq!(red, Color::rgb(255, 0, 0));
        assert_eq!(session.color_from_argb(0x80, 1, 2, 3).unwrap(), Color(0x8001_0203));

        session.print(0, 0, "[color=red]x[/color]y", 0, 0, ALIGN_DEFAULT).unwrap();
        assert_eq!(session.pick_color(0, 0, 0).unwrap(), red);
        assert_eq!(session.pick_color(1, 0, 0).unwrap(), Color::WHITE);

        let blue = Color::rgb(0, 0, 255);
        session.bkcolor(blue).unwrap();
        session.put(5, 5, 'z' as u32).unwrap();
        assert_eq!(session.pick_bkcolor(5, 5, 0).unwrap(), blue);
        assert_eq!(session.state(TK_BKCOLOR).unwrap(), blue.0 as i32);
    }

    #[test]
    fn test_clear_area_and_crop() {
        let (mut session, _) = open();
        session.print(0, 0, "abcd", 0, 0, ALIGN_DEFAULT).unwrap();
        session.clear_area(1, 0, 2, 1).unwrap();
        assert_eq!(session.pick(0, 0, 0).unwrap(), 'a' as u32);
        assert_eq!(session.pick(1, 0, 0).unwrap(), 0);
        assert_eq!(session.pick(3, 0, 0).unwrap(), 'd' as u32);

        session.crop(0, 0, 1, 1).unwrap();
        session.refresh().unwrap();
        session.crop(0, 0, 0, 0).unwrap();
    }

    #[test]
    fn test_resize_event_resizes_stage() {
        let (mut session, _) = open();
        session.set("window.resizeable=true").unwrap();
        session.input_sender().push(Event::Resize { width: 30, height: 12 });
        assert_eq!(session.read(), TK_RESIZED);
        assert_eq!(session.state(TK_WIDTH).unwrap(), 30);
        assert_eq!(session.get("window.size", "").unwrap(), "30x12");
    }

    #[test]
    fn test_cellsize_option() {
        let (mut session, handle) = open();
        assert_eq!(session.state(TK_CELL_WIDTH).unwrap(), 8);
        session.set("window.cellsize=10x20").unwrap();
        assert_eq!(session.state(TK_CELL_WIDTH).unwrap(), 10);
        assert_eq!(session.state(TK_CELL_HEIGHT).unwrap(), 20);
        session.refresh().unwrap();
        let frame = handle.latest().unwrap();
        assert_eq!(frame.pixels.size(), Size::new(800, 500));
    }

    #[test]
    fn test_narrow_entry_points() {
        let (mut session, _) = open();
        session.set("terminal.encoding=437").unwrap();
        session.print_bytes(0, 0, &[0xDB], 0, 0, ALIGN_DEFAULT).unwrap();
        assert_eq!(session.pick(0, 0, 0).unwrap(), '█' as u32);
        assert_eq!(session.measure_bytes(&[0xDB, 0xDB], 0, 0).unwrap(), Size::new(2, 1));

        session.set("terminal.encoding-affects-put=true").unwrap();
        session.put(1, 0, 0xDB).unwrap();
        assert_eq!(session.pick(1, 0, 0).unwrap(), '█' as u32);
    }

    #[test]
    fn test_drawing_at_extreme_coordinates() {
        use crate::text::layout::{ALIGN_BOTTOM, ALIGN_RIGHT};

        let (mut session, handle) = open();
        assert_eq!(session.print(i32::MAX, 0, "ab", 0, 0, ALIGN_DEFAULT).unwrap(), Size::new(2, 1));
        session.print(i32::MIN, i32::MIN, "ab", 0, 0, ALIGN_RIGHT | ALIGN_BOTTOM).unwrap();
        session.put(i32::MAX, i32::MIN, '@' as u32).unwrap();
        session
            .put_ext(0, 0, i32::MAX, i32::MAX, '█' as u32, Some([(i32::MAX, i32::MIN); 4]))
            .unwrap();
        session.clear_area(1, 0, i32::MAX, 1).unwrap();
        session.clear_area(i32::MIN, i32::MIN, i32::MAX, i32::MAX).unwrap();
        session.refresh().unwrap();
        assert!(handle.latest().is_some());
        assert_eq!(session.pick(0, 0, 0).unwrap(), '█' as u32);
    }

    #[test]
    fn test_huge_crop_still_draws() {
        let (mut session, handle) = open();
        session.crop(0, 0, 1 << 28, 25).unwrap();
        session.put(1, 1, '█' as u32).unwrap();
        session.refresh().unwrap();
        let frame = handle.latest().unwrap();
        assert_eq!(frame.pixels.get(9, 17), Color::WHITE);
    }

    #[test]
    fn test_read_str_at_right_edge_of_range() {
        let (mut session, _) = open();
        let sender = session.input_sender();
        sender.push(key('z'));
        sender.push(special(TK_RETURN));
        let outcome = session.read_str(i32::MAX - 1, 0, "", 4).unwrap();
        assert_eq!(outcome, LineOutcome::Ok("z".to_string()));
    }

    #[test]
    fn test_read_str_with_huge_limit() {
        let (mut session, _) = open();
        session.put(79, 0, '#' as u32).unwrap();
        let sender = session.input_sender();
        sender.push(key('o'));
        sender.push(key('k'));
        sender.push(special(TK_RETURN));
        let outcome = session.read_str(0, 0, "", i32::MAX).unwrap();
        assert_eq!(outcome, LineOutcome::Ok("ok".to_string()));
        assert_eq!(session.pick(79, 0, 0).unwrap(), '#' as u32);
    }
}
