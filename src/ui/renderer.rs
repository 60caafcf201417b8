/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// One stage tile covers `tile_size` terminal cells (`[display]` in the
/// config). Entities are placed from their scaled render positions, so a
/// crate slides cell by cell while the turn clock runs.
///
/// Draw order: tiles → player trail → objects (dying ones fade) → player.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::Direction;
use crate::domain::tile::{self, TileId};
use crate::sim::object::{AnimationMode, CollectibleKind, CrateKind, FieldObject, ObjectKind, StarOutcome};
use crate::sim::world::{Phase, World};

type Rgb = (u8, u8, u8);

const BASE_BG: Rgb = (22, 22, 35);
const FLOOR_BG: Rgb = (34, 34, 48);
const HUD_BG: Rgb = (20, 20, 60);
const MSG_BG: Rgb = (200, 180, 50);

/// Vertical float of collectibles, in tiles.
const FLOAT_AMPLITUDE: f32 = 0.25;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: rgb(BASE_BG) };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg }
    }
}

const fn rgb(c: Rgb) -> Color {
    Color::Rgb { r: c.0, g: c.1, b: c.2 }
}

/// Linear blend, `t = 0` gives `a`.
fn mix(a: Rgb, b: Rgb, t: f32) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    let ch = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    (ch(a.0, b.0), ch(a.1, b.1), ch(a.2, b.2))
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }
}

// ── Glyphs ──

/// Two characters repeated across a tile's width.
#[derive(Clone, Copy)]
struct Glyph {
    chars: [char; 2],
    fg: Rgb,
    bg: Option<Rgb>,
}

impl Glyph {
    const fn new(chars: [char; 2], fg: Rgb, bg: Option<Rgb>) -> Self {
        Glyph { chars, fg, bg }
    }
}

fn tile_glyph(w: &World, x: i32, y: i32) -> Glyph {
    if w.grid.solid_tile_at(x, y) == tile::VOID {
        return Glyph::new(['·', ' '], (70, 60, 90), Some((8, 6, 14)));
    }
    let lava_glow = (w.grid.lava_phase() * std::f32::consts::TAU).sin() * 0.5 + 0.5;
    match w.grid.tile_at(x, y) {
        tile::WALL => Glyph::new(['█', '█'], (120, 120, 120), Some((70, 70, 70))),
        tile::LAVA => Glyph::new(['≈', '~'], mix((255, 120, 0), (255, 200, 60), lava_glow), Some((150, 30, 0))),
        tile::PURPLE_LAVA => Glyph::new(['≈', '~'], mix((230, 90, 255), (255, 170, 255), lava_glow), Some((90, 0, 110))),
        tile::LOCK => Glyph::new(['▒', '▒'], (200, 160, 40), Some((90, 70, 10))),
        id @ (tile::PURPLE_ON | tile::PURPLE_OFF) => purple_glyph(w, id),
        _ => Glyph::new([' ', ' '], (255, 255, 255), Some(FLOOR_BG)),
    }
}

/// Collision flips at once; colors cross-fade while the grid says so.
fn purple_glyph(w: &World, id: TileId) -> Glyph {
    let on = ((200, 90, 255), (90, 30, 130));
    let off = ((90, 60, 110), FLOOR_BG);
    let (from, to) = if id == tile::PURPLE_ON { (off, on) } else { (on, off) };
    let t = if w.grid.purple_fading() { 1.0 - w.grid.purple_alpha() } else { 1.0 };
    let ch = if id == tile::PURPLE_ON { '▓' } else { '░' };
    Glyph::new([ch, ch], mix(from.0, to.0, t), Some(mix(from.1, to.1, t)))
}

/// Pushables and openers brighten while the player stands next to them.
fn object_glyph(obj: &FieldObject) -> Glyph {
    let glyph = base_glyph(obj);
    let interactive = !matches!(obj.kind, ObjectKind::Collectible(_) | ObjectKind::StarContainer);
    if interactive && obj.player_dir().is_some() {
        Glyph { fg: mix(glyph.fg, (255, 255, 255), 0.35), ..glyph }
    } else {
        glyph
    }
}

fn base_glyph(obj: &FieldObject) -> Glyph {
    match obj.kind {
        ObjectKind::Crate(CrateKind::Plain) => Glyph::new(['[', ']'], (230, 170, 90), Some((110, 70, 30))),
        ObjectKind::Crate(CrateKind::Purple) => Glyph::new(['[', ']'], (230, 150, 255), Some((90, 30, 120))),
        ObjectKind::Crate(CrateKind::BlackHole) => {
            let spin = ['(', '{', '<', '{'];
            let i = (obj.angle() * 2.0).rem_euclid(4.0) as usize % spin.len();
            let glow = (obj.pulse() - 1.0).clamp(0.0, 1.0);
            Glyph::new([spin[i], ')'], mix((90, 70, 140), (200, 160, 255), glow * 2.5), Some((5, 0, 12)))
        }
        ObjectKind::Crate(CrateKind::LavaEater) => {
            let eyes = if obj.eyes_closed() { ['-', '-'] } else { ['o', 'o'] };
            Glyph::new(eyes, (255, 230, 120), Some((170, 60, 20)))
        }
        ObjectKind::Collectible(kind) => {
            let shine = match kind.animation_mode() {
                AnimationMode::Shine => obj.float_offset() * 0.5 + 0.5,
                _ => 0.0,
            };
            match kind {
                CollectibleKind::Key => Glyph::new(['o', '-'], (255, 220, 60), None),
                CollectibleKind::Hammer => Glyph::new(['T', ' '], (200, 200, 210), None),
                CollectibleKind::Gem => Glyph::new(['<', '>'], mix((180, 80, 255), (255, 200, 255), shine), None),
                CollectibleKind::Emerald => Glyph::new(['<', '>'], mix((40, 200, 90), (180, 255, 200), shine), None),
                CollectibleKind::Star => {
                    // Shrinks away once picked up
                    let chars = if obj.exists() { ['*', '*'] } else { ['+', ' '] };
                    match obj.star_outcome() {
                        StarOutcome::Golden => Glyph::new(chars, (255, 215, 0), None),
                        StarOutcome::Gray => Glyph::new(chars, (140, 140, 140), None),
                    }
                }
            }
        }
        ObjectKind::Lock => Glyph::new(['╓', '╖'], (255, 220, 80), Some((90, 70, 10))),
        ObjectKind::LavaContainer { purple: false } => Glyph::new(['▕', '▏'], (255, 120, 40), Some((80, 30, 20))),
        ObjectKind::LavaContainer { purple: true } => Glyph::new(['▕', '▏'], (230, 100, 255), Some((60, 20, 80))),
        ObjectKind::StarContainer => Glyph::new(['{', '}'], (60, 220, 120), Some((20, 70, 40))),
    }
}

fn player_glyph(facing: Direction) -> [char; 2] {
    match facing {
        Direction::Left => ['<', '@'],
        Direction::Up => ['@', '^'],
        Direction::Down => ['@', 'v'],
        Direction::Right | Direction::None => ['@', '>'],
    }
}

// ── Renderer ──

/// Vertical offsets
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    tile_w: usize,
    tile_h: usize,
    frame: u64,
    last_phase: Option<Phase>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            tile_w: 1,
            tile_h: 1,
            frame: 0,
            last_phase: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(rgb(BASE_BG)),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &mut World, total_stages: usize) -> io::Result<()> {
        self.frame = self.frame.wrapping_add(1);
        self.tile_w = (world.ctx.tile_size.0.round() as usize).max(1);
        self.tile_h = (world.ctx.tile_size.1.round() as usize).max(1);

        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(rgb(BASE_BG)), Clear(ClearType::All))?;
        }

        // Viewport in tiles: terminal minus HUD + gap + message + help
        let reserved_rows = MAP_ROW + 4;
        let max_view_h = self.term_h.saturating_sub(reserved_rows).max(1) / self.tile_h;
        world.camera.view_w = (self.term_w / self.tile_w).min(world.width()).max(1);
        world.camera.view_h = max_view_h.min(world.height()).max(1);
        let (ww, wh) = (world.width(), world.height());
        world.camera.follow(world.player.pos(), ww, wh);

        // Phase change → clear for a clean transition
        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(rgb(BASE_BG)), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.front.clear();
        self.compose_game(world, total_stages);
        match world.phase {
            Phase::Playing => {}
            Phase::Paused => self.compose_pause_overlay(world),
            Phase::StageClear { golden } => self.compose_clear_overlay(world, golden, total_stages),
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = rgb(BASE_BG);
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors; ResetColor would fall back to the
        // terminal's own default and leave seams between rows.
        queue!(self.writer,
            SetForegroundColor(last_fg),
            SetBackgroundColor(last_bg),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game(&mut self, w: &World, total_stages: usize) {
        self.compose_hud(w, total_stages);

        let cam = w.camera.clone();
        for vy in 0..cam.view_h {
            for vx in 0..cam.view_w {
                let (wx, wy) = (cam.x + vx as i32, cam.y + vy as i32);
                let glyph = if w.grid.in_bounds(wx, wy) {
                    tile_glyph(w, wx, wy)
                } else {
                    Glyph::new([' ', ' '], BASE_BG, Some(BASE_BG))
                };
                self.paint_tile(vx * self.tile_w, MAP_ROW + vy * self.tile_h, glyph, 0.0);
            }
        }

        let scale = w.ctx.tile_size;

        // Trail
        for img in w.player.trail() {
            let fg = mix(FLOOR_BG, (120, 180, 255), img.strength());
            let glyph = Glyph::new(['·', '·'], fg, None);
            self.paint_at(w, (img.pos.0 * scale.0, img.pos.1 * scale.1), glyph, 0.0);
        }

        // Objects, dying ones fading toward the floor
        for obj in w.visible_objects() {
            let mut pos = obj.body.scaled_render_pos(scale);
            if let ObjectKind::Collectible(kind) = obj.kind {
                if obj.exists() && kind.animation_mode() == AnimationMode::Float {
                    pos.1 += obj.float_offset() * FLOAT_AMPLITUDE * scale.1;
                }
            }
            let fade = if obj.exists() { 0.0 } else { obj.body.death_progress() };
            self.paint_at(w, pos, object_glyph(obj), fade);
        }

        // Player, with a pulsing outline color
        let pulse = w.player.outline_phase().sin() * 0.5 + 0.5;
        let glyph = Glyph::new(
            player_glyph(w.player.facing),
            mix((220, 240, 255), (120, 200, 255), pulse),
            Some((40, 60, 110)),
        );
        self.paint_at(w, w.player.body.scaled_render_pos(scale), glyph, 0.0);

        // Message bar
        let msg_row = MAP_ROW + cam.view_h * self.tile_h + 1;
        if !w.message.is_empty() && msg_row < self.front.height {
            self.front.fill_row(msg_row, rgb(MSG_BG));
            let msg = format!(" ◈ {} ", w.message);
            self.front.put_str(0, msg_row, &msg, Color::Black, rgb(MSG_BG));
        }

        // Help bar
        let help_row = msg_row + 2;
        if help_row < self.front.height {
            let help = " Arrows/WASD:Move  R:Reset  Enter:Pause  Esc/Q:Quit";
            self.front.put_str(0, help_row, help, Color::DarkGrey, rgb(BASE_BG));
        }
    }

    fn compose_hud(&mut self, w: &World, total_stages: usize) {
        let s = &w.status;
        let keys = if s.key_appearance() > 0.0 && s.previous_key_count() != s.key_count {
            format!("{}→{}", s.previous_key_count(), s.key_count)
        } else {
            s.key_count.to_string()
        };
        let hud = format!(
            " Stage {}/{}  {}  │  Turn {}/{}  │  Keys {}  Hammers {}  Emeralds {} ",
            s.stage_index + 1, total_stages, s.stage_name,
            s.turn, s.turn_limit, keys, s.hammer_count, s.emeralds_remaining,
        );
        let fg = if s.over_limit() { rgb((255, 120, 120)) } else { Color::White };
        self.front.fill_row(HUD_ROW, rgb(HUD_BG));
        self.front.put_str(0, HUD_ROW, &hud, fg, rgb(HUD_BG));
    }

    /// Paint a glyph at a stage position in cells (fractional while moving).
    fn paint_at(&mut self, w: &World, pos: (f32, f32), glyph: Glyph, fade: f32) {
        let cx = pos.0.round() as i32 - w.camera.x * self.tile_w as i32;
        let cy = pos.1.round() as i32 - w.camera.y * self.tile_h as i32;
        let max_x = (w.camera.view_w * self.tile_w) as i32;
        let max_y = (w.camera.view_h * self.tile_h) as i32;
        if cx < 0 || cy < 0 || cx + self.tile_w as i32 > max_x || cy + self.tile_h as i32 > max_y {
            return;
        }
        self.paint_tile(cx as usize, MAP_ROW + cy as usize, glyph, fade);
    }

    /// Fill one tile's cells. A glyph without its own background keeps
    /// whatever is already drawn there.
    fn paint_tile(&mut self, col: usize, row: usize, glyph: Glyph, fade: f32) {
        for dy in 0..self.tile_h {
            for dx in 0..self.tile_w {
                let (x, y) = (col + dx, row + dy);
                let under = self.front.get(x, y);
                let bg = match glyph.bg {
                    Some(bg) => {
                        let under_rgb = color_rgb(under.bg).unwrap_or(FLOOR_BG);
                        rgb(mix(bg, under_rgb, fade))
                    }
                    None => under.bg,
                };
                let under_rgb = color_rgb(bg).unwrap_or(FLOOR_BG);
                let fg = rgb(mix(glyph.fg, under_rgb, fade));
                let ch = if fade > 0.6 { '·' } else { glyph.chars[dx % 2] };
                self.front.set(x, y, Cell::new(ch, fg, bg));
            }
        }
    }

    // ── Overlays ──

    fn compose_box(&mut self, w: &World, lines: &[(&str, Color)], frame: Color) {
        let dim = rgb((40, 40, 40));
        let view_cols = w.camera.view_w * self.tile_w;
        let view_rows = w.camera.view_h * self.tile_h;
        let inner = lines.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0) + 4;
        let box_w = (inner + 2).min(self.front.width);
        if box_w < 3 { return; }
        let box_h = lines.len() + 2;
        let box_x = view_cols.max(box_w).saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + view_rows.saturating_sub(box_h) / 2;

        let horiz = "═".repeat(box_w.saturating_sub(2));
        self.front.put_str(box_x, box_y, &format!("╔{horiz}╗"), frame, dim);
        for (i, (line, color)) in lines.iter().enumerate() {
            let y = box_y + 1 + i;
            let pad = inner.saturating_sub(line.chars().count());
            let text = format!("{}{}{}", " ".repeat(pad / 2), line, " ".repeat(pad - pad / 2));
            self.front.put_str(box_x, y, "║", frame, dim);
            self.front.put_str(box_x + 1, y, &text, *color, dim);
            self.front.put_str(box_x + box_w - 1, y, "║", frame, dim);
        }
        self.front.put_str(box_x, box_y + box_h - 1, &format!("╚{horiz}╝"), frame, dim);
    }

    fn compose_pause_overlay(&mut self, w: &World) {
        let hdr = rgb((255, 220, 50));
        let key_c = rgb((100, 200, 255));
        let blink = (self.frame / 16) % 2 == 0;
        let title = if blink { "▶  PAUSED  ◀" } else { "   PAUSED   " };
        self.compose_box(w, &[
            (title, hdr),
            ("", key_c),
            ("Enter  Resume", key_c),
            ("R      Restart Stage", key_c),
            ("Esc    Quit", key_c),
        ], hdr);
    }

    fn compose_clear_overlay(&mut self, w: &World, golden: bool, total_stages: usize) {
        let (title, color) = if golden {
            ("★ STAGE CLEAR ★", rgb((255, 215, 0)))
        } else {
            ("☆ STAGE CLEAR ☆", rgb((170, 170, 170)))
        };
        let turns = format!("Turns {} / {}", w.status.turn, w.status.turn_limit);
        let next = if w.stage_index + 1 < total_stages {
            "Enter  Next Stage"
        } else {
            "Enter  Finish"
        };
        let key_c = rgb((100, 200, 255));
        self.compose_box(w, &[
            (title, color),
            ("", key_c),
            (turns.as_str(), Color::White),
            ("", key_c),
            (next, key_c),
            ("R      Replay", key_c),
        ], color);
    }
}

fn color_rgb(c: Color) -> Option<Rgb> {
    match c {
        Color::Rgb { r, g, b } => Some((r, g, b)),
        _ => None,
    }
}
