//! CPU compositing into a `0x00RRGGBB` softbuffer frame.

use image::RgbaImage;
use loupe_engine::coords::{Rect, Vec2};
use loupe_viewer::MinimapLayout;

pub const BACKGROUND: u32 = 0x1e1f22;
const MINIMAP_BACKDROP: u32 = 0x111214;
const INDICATOR: u32 = 0xf2f2f2;
const CHECKER_LIGHT: u32 = 0x3a3b3f;
const CHECKER_DARK: u32 = 0x2b2c30;
const CHECKER_CELL: u32 = 8;

/// Paints one frame.
///
/// `viewport` is the content-space rectangle mapped onto the whole buffer.
/// Sampling is nearest-neighbour; translucent pixels are blended over a
/// checkerboard.
pub fn paint(
    buffer: &mut [u32],
    width: u32,
    height: u32,
    image: &RgbaImage,
    viewport: Rect,
    minimap: Option<&MinimapLayout>,
) {
    let len = (width as usize) * (height as usize);
    if buffer.len() < len {
        log::warn!("frame buffer too small: {} < {len}", buffer.len());
        return;
    }

    if viewport.is_empty() || !viewport.is_finite() {
        buffer[..len].fill(BACKGROUND);
    } else {
        let step = viewport.size / Vec2::new(width as f32, height as f32);
        for y in 0..height {
            let cy = viewport.origin.y + (y as f32 + 0.5) * step.y;
            let row = &mut buffer[(y * width) as usize..((y + 1) * width) as usize];
            for (x, px) in row.iter_mut().enumerate() {
                let cx = viewport.origin.x + (x as f32 + 0.5) * step.x;
                *px = sample(image, Vec2::new(cx, cy), x as u32, y)
                    .unwrap_or(BACKGROUND);
            }
        }
    }

    if let Some(layout) = minimap {
        paint_minimap(buffer, width, height, image, layout);
    }
}

fn paint_minimap(buffer: &mut [u32], width: u32, height: u32, image: &RgbaImage, layout: &MinimapLayout) {
    let thumb = layout.thumbnail;
    fill_rect(buffer, width, height, expand(thumb, 2.0), MINIMAP_BACKDROP);

    let Some((x0, y0, x1, y1)) = pixel_span(thumb, width, height) else {
        return;
    };
    for y in y0..y1 {
        for x in x0..x1 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            if let Some(c) = sample(image, layout.to_content(p), x, y) {
                buffer[(y * width + x) as usize] = c;
            }
        }
    }

    if let Some(indicator) = layout.indicator {
        stroke_rect(buffer, width, height, indicator, INDICATOR);
    }
}

/// Image colour at content point `p`, composited over the checker cell of
/// screen pixel (`sx`, `sy`). `None` outside the image.
fn sample(image: &RgbaImage, p: Vec2, sx: u32, sy: u32) -> Option<u32> {
    if p.x < 0.0 || p.y < 0.0 {
        return None;
    }
    let (ix, iy) = (p.x as u32, p.y as u32);
    if ix >= image.width() || iy >= image.height() {
        return None;
    }

    let [r, g, b, a] = image.get_pixel(ix, iy).0;
    let rgb = pack(r, g, b);
    match a {
        255 => Some(rgb),
        _ => Some(blend(rgb, checker(sx, sy), a)),
    }
}

fn checker(x: u32, y: u32) -> u32 {
    if ((x / CHECKER_CELL) + (y / CHECKER_CELL)) % 2 == 0 {
        CHECKER_LIGHT
    } else {
        CHECKER_DARK
    }
}

#[inline]
fn pack(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

fn blend(src: u32, dst: u32, alpha: u8) -> u32 {
    let a = alpha as u32;
    let mix = |shift: u32| {
        let s = (src >> shift) & 0xff;
        let d = (dst >> shift) & 0xff;
        ((s * a + d * (255 - a) + 127) / 255) << shift
    };
    mix(16) | mix(8) | mix(0)
}

fn expand(r: Rect, by: f32) -> Rect {
    Rect::from_origin_size(r.origin - Vec2::splat(by), r.size + Vec2::splat(2.0 * by))
}

/// Integer pixel range covered by `r`, clipped to the buffer.
fn pixel_span(r: Rect, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    if r.is_empty() || !r.is_finite() {
        return None;
    }
    let max = r.max();
    let x0 = r.origin.x.max(0.0).round() as u32;
    let y0 = r.origin.y.max(0.0).round() as u32;
    let x1 = (max.x.round().max(0.0) as u32).min(width);
    let y1 = (max.y.round().max(0.0) as u32).min(height);
    (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
}

fn fill_rect(buffer: &mut [u32], width: u32, height: u32, r: Rect, color: u32) {
    let Some((x0, y0, x1, y1)) = pixel_span(r, width, height) else {
        return;
    };
    for y in y0..y1 {
        buffer[(y * width + x0) as usize..(y * width + x1) as usize].fill(color);
    }
}

fn stroke_rect(buffer: &mut [u32], width: u32, height: u32, r: Rect, color: u32) {
    let Some((x0, y0, x1, y1)) = pixel_span(r, width, height) else {
        return;
    };
    for x in x0..x1 {
        buffer[(y0 * width + x) as usize] = color;
        buffer[((y1 - 1) * width + x) as usize] = color;
    }
    for y in y0..y1 {
        buffer[(y * width + x0) as usize] = color;
        buffer[(y * width + x1 - 1) as usize] = color;
    }
}
