use image::GrayImage;
use ndarray::{Array2, ArrayView2, s};

use crate::config::CanonicalFrame;
use crate::error::{HeatmapError, Result};
use crate::models::{Category, CategorySet, Eye, PixelPoint, Side};

/// Where a transformed mask lands on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x_from: i64,
    pub y_from: i64,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    /// Put the mask's nerve pixel on `anchor`.
    pub fn direct(anchor: PixelPoint, nerve: PixelPoint, width: u32, height: u32) -> Self {
        Self {
            x_from: anchor.x - nerve.x,
            y_from: anchor.y - nerve.y,
            width,
            height,
        }
    }

    /// Placement of the horizontally flipped mask.
    pub fn mirrored(anchor: PixelPoint, nerve: PixelPoint, width: u32, height: u32) -> Self {
        Self {
            x_from: anchor.x - width as i64 + nerve.x,
            ..Self::direct(anchor, nerve, width, height)
        }
    }

    /// Own-side and composite placements of a mask from an `eye` photograph.
    pub fn for_eye(
        anchor: PixelPoint,
        eye: Eye,
        nerve: PixelPoint,
        width: u32,
        height: u32,
    ) -> (Self, Self) {
        let direct = Self::direct(anchor, nerve, width, height);
        let composite = match eye {
            Eye::Right => direct,
            Eye::Left => Self::mirrored(anchor, nerve, width, height),
        };
        (direct, composite)
    }

    fn fits(&self, canvas_side: usize) -> bool {
        let side = canvas_side as i64;
        self.x_from >= 0
            && self.y_from >= 0
            && self.x_from + self.width as i64 <= side
            && self.y_from + self.height as i64 <= side
    }

    pub fn check(&self, canvas_side: usize) -> Result<()> {
        if self.fits(canvas_side) {
            Ok(())
        } else {
            Err(HeatmapError::OutOfBoundsPlacement {
                x_from: self.x_from,
                y_from: self.y_from,
                width: self.width,
                height: self.height,
                canvas_side,
            })
        }
    }
}

/// Validate a `width` x `height` mask against both canvases it would be added to.
///
/// Only the size is needed, so oversized masks can be rejected before they are built.
pub fn check_fits(
    frame: &CanonicalFrame,
    eye: Eye,
    nerve: PixelPoint,
    width: u32,
    height: u32,
) -> Result<(Placement, Placement)> {
    check_placements(frame.anchor(), frame.canvas_side, eye, nerve, width, height)
}

fn check_placements(
    anchor: PixelPoint,
    canvas_side: usize,
    eye: Eye,
    nerve: PixelPoint,
    width: u32,
    height: u32,
) -> Result<(Placement, Placement)> {
    let (direct, composite) = Placement::for_eye(anchor, eye, nerve, width, height);
    direct.check(canvas_side)?;
    composite.check(canvas_side)?;
    Ok((direct, composite))
}

/// Count canvases for every (side, category) pair.
///
/// Counts only ever grow; a rejected placement leaves every grid untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    categories: CategorySet,
    anchor: PixelPoint,
    canvas_side: usize,
    grids: Vec<Array2<u32>>,
}

impl Accumulator {
    pub fn new(frame: &CanonicalFrame, categories: &CategorySet) -> Self {
        let grids = (0..Side::ALL.len() * categories.count())
            .map(|_| Array2::zeros((frame.canvas_side, frame.canvas_side)))
            .collect();

        Self {
            categories: categories.clone(),
            anchor: frame.anchor(),
            canvas_side: frame.canvas_side,
            grids,
        }
    }

    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }

    fn index(&self, side: Side, category: Category) -> usize {
        side.slot() * self.categories.count() + self.categories.slot(category)
    }

    pub fn grid(&self, side: Side, category: Category) -> ArrayView2<'_, u32> {
        self.grids[self.index(side, category)].view()
    }

    /// Add one transformed 0/1 mask of `condition` for an `eye` photograph.
    ///
    /// The mask goes into the eye's own canvas, its `All` canvas and both composite
    /// canvases (flipped first for left eyes). Every placement is checked before any
    /// count changes.
    pub fn commit(
        &mut self,
        eye: Eye,
        condition: usize,
        mask: &GrayImage,
        nerve: PixelPoint,
    ) -> Result<()> {
        let (width, height) = mask.dimensions();
        let (direct, composite) =
            check_placements(self.anchor, self.canvas_side, eye, nerve, width, height)?;

        let category = Category::Condition(condition);
        let side = Side::from(eye);
        let mirror = eye == Eye::Left;

        for (target, placement, flip) in [
            (self.index(side, category), direct, false),
            (self.index(side, Category::All), direct, false),
            (self.index(Side::Composite, category), composite, mirror),
            (self.index(Side::Composite, Category::All), composite, mirror),
        ] {
            add_window(&mut self.grids[target], mask, &placement, flip);
        }
        Ok(())
    }

    /// Total count over one grid
    pub fn total(&self, side: Side, category: Category) -> u64 {
        self.grid(side, category).iter().map(|v| *v as u64).sum()
    }
}

fn add_window(grid: &mut Array2<u32>, mask: &GrayImage, placement: &Placement, flip: bool) {
    let x = placement.x_from as usize;
    let y = placement.y_from as usize;
    let (w, h) = (placement.width as usize, placement.height as usize);

    let mut window = grid.slice_mut(s![y..y + h, x..x + w]);
    for ((row, col), cell) in window.indexed_iter_mut() {
        let src_col = if flip { w - 1 - col } else { col };
        *cell += mask.get_pixel(src_col as u32, row as u32)[0] as u32;
    }
}
