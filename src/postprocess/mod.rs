pub mod export;

use image::{GrayImage, Luma, imageops};
use imageproc::drawing::{draw_hollow_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use ndarray::{Array2, ArrayView2, s};

use crate::canvas::Accumulator;
use crate::config::{CanonicalFrame, TrimWindow};
use crate::models::{Category, PixelPoint, Side};

const MARKER: Luma<u8> = Luma([255]);

impl TrimWindow {
    /// Crop a full canvas to this window.
    ///
    /// A grid that already has the trimmed size is returned as-is, so trimming twice
    /// gives the same result as trimming once.
    pub fn apply(&self, grid: ArrayView2<'_, u32>) -> Array2<u32> {
        if grid.dim() == (self.height, self.width) {
            return grid.to_owned();
        }
        grid.slice(s![
            self.top..self.top + self.height,
            self.left..self.left + self.width
        ])
        .to_owned()
    }

    pub fn apply_image(&self, image: &GrayImage) -> GrayImage {
        if image.dimensions() == (self.width as u32, self.height as u32) {
            return image.clone();
        }
        imageops::crop_imm(
            image,
            self.left as u32,
            self.top as u32,
            self.width as u32,
            self.height as u32,
        )
        .to_image()
    }
}

/// Raw-count view of one canvas after trimming
pub fn trimmed_counts(
    accumulator: &Accumulator,
    frame: &CanonicalFrame,
    side: Side,
    category: Category,
) -> Array2<u32> {
    frame.trim_window(side).apply(accumulator.grid(side, category))
}

/// Linear 0-255 rescale: `floor(raw * 255 / max(1, max(raw)))`
pub fn rescale_to_display(grid: ArrayView2<'_, u32>) -> GrayImage {
    let (rows, cols) = grid.dim();
    let max = grid.iter().copied().max().unwrap_or(0).max(1);
    let factor = 255.0 / max as f64;

    let mut image = GrayImage::new(cols as u32, rows as u32);
    for ((row, col), value) in grid.indexed_iter() {
        let scaled = (*value as f64 * factor).floor() as u8;
        image.put_pixel(col as u32, row as u32, Luma([scaled]));
    }
    image
}

fn draw_ring(image: &mut GrayImage, center: PixelPoint, radius: i32, thickness: i32) {
    let center = (center.x as i32, center.y as i32);
    for offset in 0..thickness.max(1) {
        draw_hollow_circle_mut(image, center, radius + offset, MARKER);
    }
}

fn draw_quadrants(image: &mut GrayImage, macula: PixelPoint, half: i32, thickness: i32) {
    let (mx, my) = (macula.x as f32, macula.y as f32);
    let h = half as f32;
    for offset in 0..thickness.max(1) {
        let o = offset as f32;
        draw_line_segment_mut(image, (mx - h, my + o), (mx + h, my + o), MARKER);
        draw_line_segment_mut(image, (mx + o, my - h), (mx + o, my + h), MARKER);
        let size = (2 * (half - offset)).max(1) as u32;
        let rect = Rect::at(macula.x as i32 - half + offset, macula.y as i32 - half + offset)
            .of_size(size, size);
        draw_hollow_rect_mut(image, rect, MARKER);
    }
}

/// Draw nerve and macula rings (and optional quadrant box) on an untrimmed display canvas
pub fn overlay_landmarks(image: &mut GrayImage, frame: &CanonicalFrame, side: Side) {
    let nerve = frame.anchor();
    for radius in &frame.nerve_ring_radii {
        draw_ring(image, nerve, *radius, frame.ring_thickness);
    }

    let macula = frame.canvas_macula(side);
    draw_ring(image, macula, frame.macula_ring_radius, frame.ring_thickness);

    if frame.draw_quadrants {
        draw_quadrants(image, macula, frame.quadrant_box, frame.ring_thickness);
    }
}

/// Rescaled, annotated and trimmed display view of one canvas
pub fn display_view(
    accumulator: &Accumulator,
    frame: &CanonicalFrame,
    side: Side,
    category: Category,
) -> GrayImage {
    let mut image = rescale_to_display(accumulator.grid(side, category));
    overlay_landmarks(&mut image, frame, side);
    frame.trim_window(side).apply_image(&image)
}

/// Place images left to right, top-aligned
pub fn hstack(images: &[GrayImage]) -> GrayImage {
    let width = images.iter().map(|i| i.width()).sum();
    let height = images.iter().map(|i| i.height()).max().unwrap_or(0);
    let mut out = GrayImage::new(width, height);
    let mut x = 0i64;
    for image in images {
        imageops::replace(&mut out, image, x, 0);
        x += image.width() as i64;
    }
    out
}

/// Place images top to bottom, left-aligned
pub fn vstack(images: &[GrayImage]) -> GrayImage {
    let width = images.iter().map(|i| i.width()).max().unwrap_or(0);
    let height = images.iter().map(|i| i.height()).sum();
    let mut out = GrayImage::new(width, height);
    let mut y = 0i64;
    for image in images {
        imageops::replace(&mut out, image, 0, y);
        y += image.height() as i64;
    }
    out
}

/// Right, left and composite display views side by side
pub fn category_strip(
    accumulator: &Accumulator,
    frame: &CanonicalFrame,
    category: Category,
) -> GrayImage {
    let views: Vec<GrayImage> = Side::ALL
        .iter()
        .map(|side| display_view(accumulator, frame, *side, category))
        .collect();
    hstack(&views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn rescale_of_empty_grid_is_black() {
        let grid = Array2::<u32>::zeros((4, 6));
        let image = rescale_to_display(grid.view());
        assert_eq!(image.dimensions(), (6, 4));
        assert!(image.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn rescale_maps_max_to_255_and_floors() {
        let grid = array![[0u32, 1, 2], [3, 4, 5]];
        let image = rescale_to_display(grid.view());
        let values: Vec<u8> = image.pixels().map(|p| p[0]).collect();
        assert_eq!(values, vec![0, 51, 102, 153, 204, 255]);

        let grid = array![[1u32, 2, 3]];
        let values: Vec<u8> = rescale_to_display(grid.view())
            .pixels()
            .map(|p| p[0])
            .collect();
        assert_eq!(values, vec![85, 170, 255]);
    }

    #[test]
    fn trim_is_idempotent() {
        let window = TrimWindow {
            left: 2,
            top: 1,
            width: 3,
            height: 2,
        };
        let grid = Array2::from_shape_fn((6, 8), |(r, c)| (r * 8 + c) as u32);
        let once = window.apply(grid.view());
        assert_eq!(once, array![[10u32, 11, 12], [18, 19, 20]]);
        assert_eq!(window.apply(once.view()), once);
    }

    #[test]
    fn stacks_concatenate() {
        let a = GrayImage::from_pixel(2, 3, Luma([1]));
        let b = GrayImage::from_pixel(4, 3, Luma([2]));
        let row = hstack(&[a.clone(), b.clone()]);
        assert_eq!(row.dimensions(), (6, 3));
        assert_eq!(row.get_pixel(1, 0)[0], 1);
        assert_eq!(row.get_pixel(2, 2)[0], 2);

        let column = vstack(&[row.clone(), row]);
        assert_eq!(column.dimensions(), (6, 6));
        assert_eq!(column.get_pixel(5, 5)[0], 2);
    }
}
