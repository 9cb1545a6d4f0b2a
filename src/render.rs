//! Software renderer for an RGBA frame buffer. Reads a [`Snapshot`], writes pixels, nothing else.

use crate::game::{Dir, Pos, Snapshot};

/// Pixel edge of one grid cell.
pub const CELL: u32 = 20;

pub fn frame_size(width: i32, height: i32) -> (u32, u32) {
    (width.max(1) as u32 * CELL, height.max(1) as u32 * CELL)
}

type Rgba = (u8, u8, u8, u8);

const BACKGROUND: Rgba = (20, 20, 30, 255);
const GRID: Rgba = (40, 40, 55, 255);
const FOOD: Rgba = (220, 50, 50, 255);
const HAZARD: Rgba = (230, 200, 40, 255);
const HEAD: Rgba = (100, 255, 100, 255);
const TEXT: Rgba = (230, 230, 230, 255);
const ALERT: Rgba = (255, 100, 100, 255);

pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        Self { frame, width, height }
    }

    pub fn clear(&mut self, (r, g, b, a): Rgba) {
        for px in self.frame.chunks_exact_mut(4) {
            px.copy_from_slice(&[r, g, b, a]);
        }
    }

    fn blend_pixel(&mut self, x: u32, y: u32, (r, g, b, a): Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        let Some(px) = self.frame.get_mut(idx..idx + 4) else {
            return;
        };
        let (a, ia) = (a as u16, 255 - a as u16);
        px[0] = ((r as u16 * a + px[0] as u16 * ia) / 255) as u8;
        px[1] = ((g as u16 * a + px[1] as u16 * ia) / 255) as u8;
        px[2] = ((b as u16 * a + px[2] as u16 * ia) / 255) as u8;
        px[3] = 255;
    }

    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, col: Rgba) {
        let x2 = (x + w).min(self.width);
        let y2 = (y + h).min(self.height);
        for py in y..y2 {
            for px in x..x2 {
                self.blend_pixel(px, py, col);
            }
        }
    }

    fn fill_cell(&mut self, p: Pos, col: Rgba) {
        if p.x < 0 || p.y < 0 {
            return;
        }
        self.fill_rect(p.x as u32 * CELL, p.y as u32 * CELL, CELL, CELL, col);
    }

    fn draw_char(&mut self, ch: char, x: u32, y: u32, scale: u32, col: Rgba) -> u32 {
        if let Some(rows) = glyph(ch) {
            for (ry, row) in rows.iter().enumerate() {
                for rx in 0..GLYPH_W {
                    if row & (0b100 >> rx) != 0 {
                        self.fill_rect(x + rx * scale, y + ry as u32 * scale, scale, scale, col);
                    }
                }
            }
        }
        ADVANCE * scale
    }

    pub fn draw_text(&mut self, text: &str, x: u32, y: u32, scale: u32, col: Rgba) {
        let mut cx = x;
        for ch in text.chars() {
            cx += self.draw_char(ch, cx, y, scale, col);
        }
    }

    fn text_width(text: &str, scale: u32) -> u32 {
        text.chars().count() as u32 * ADVANCE * scale
    }

    fn draw_centered(&mut self, text: &str, y: u32, scale: u32, col: Rgba) {
        let x = self.width.saturating_sub(Self::text_width(text, scale)) / 2;
        self.draw_text(text, x, y, scale, col);
    }
}

/// Paints the board, then `hud` lines in the top-left corner.
pub fn draw(frame: &mut [u8], snap: &Snapshot<'_>, hud: &[String]) {
    let (width, height) = frame_size(snap.width, snap.height);
    let mut canvas = Canvas::new(frame, width, height);
    canvas.clear(BACKGROUND);

    if let Some(food) = snap.food {
        canvas.fill_cell(food, FOOD);
    }
    for &h in snap.hazards.iter() {
        canvas.fill_cell(h, HAZARD);
    }
    for (i, &p) in snap.snake.iter().enumerate() {
        if i == 0 {
            canvas.fill_cell(p, HEAD);
            draw_eyes(&mut canvas, p, snap.direction);
        } else {
            let shade = 200 - (i * 10).min(100) as u8;
            canvas.fill_cell(p, (50, shade, 50, 255));
        }
    }

    for gx in 0..snap.width.max(0) as u32 {
        canvas.fill_rect(gx * CELL, 0, 1, height, GRID);
    }
    for gy in 0..snap.height.max(0) as u32 {
        canvas.fill_rect(0, gy * CELL, width, 1, GRID);
    }

    if !hud.is_empty() {
        let panel_h = hud.len() as u32 * 20 + 8;
        let panel_w = hud.iter().map(|l| Canvas::text_width(l, 3)).max().unwrap_or(0) + 16;
        canvas.fill_rect(4, 4, panel_w, panel_h, (0, 0, 0, 140));
        for (i, line) in hud.iter().enumerate() {
            canvas.draw_text(line, 12, 10 + i as u32 * 20, 3, TEXT);
        }
    }

    if let Some(reason) = snap.outcome {
        let mid = height / 2;
        canvas.fill_rect(0, mid.saturating_sub(30), width, 60, (0, 0, 0, 160));
        canvas.draw_centered(&reason.to_string(), mid.saturating_sub(10), 4, ALERT);
    }
}

fn draw_eyes(canvas: &mut Canvas<'_>, head: Pos, dir: Dir) {
    let bx = head.x.max(0) as u32 * CELL;
    let by = head.y.max(0) as u32 * CELL;
    let (x1, y1, x2, y2) = match dir {
        Dir::Right => (bx + 12, by + 5, bx + 12, by + 12),
        Dir::Left => (bx + 5, by + 5, bx + 5, by + 12),
        Dir::Up => (bx + 5, by + 5, bx + 12, by + 5),
        Dir::Down => (bx + 5, by + 12, bx + 12, by + 12),
    };
    canvas.fill_rect(x1, y1, 3, 3, (0, 0, 0, 255));
    canvas.fill_rect(x2, y2, 3, 3, (0, 0, 0, 255));
}

const GLYPH_W: u32 = 3;
const ADVANCE: u32 = GLYPH_W + 1;

/// 3x5 pixel font, one 3-bit row per byte, leftmost pixel in bit 2.
fn glyph(ch: char) -> Option<[u8; 5]> {
    Some(match ch.to_ascii_uppercase() {
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b011, 0b100, 0b101, 0b101, 0b011],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b010],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'Q' => [0b010, 0b101, 0b101, 0b110, 0b011],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b110, 0b001, 0b010, 0b100, 0b111],
        '3' => [0b110, 0b001, 0b010, 0b001, 0b110],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b110, 0b001, 0b110],
        '6' => [0b011, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b110],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        _ => return None,
    })
}
