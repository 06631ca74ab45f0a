//! Placement geometry for watermark layers.
//!
//! Text watermarks are centered once; logo watermarks are tiled on a fixed
//! grid with one copy centered in every cell.

/// Dimensions of the target image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Dimensions of the watermark to be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkDimensions {
    pub width: u32,
    pub height: u32,
}

/// Top-left corner of a single placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementPosition {
    pub x: i32,
    pub y: i32,
}

impl PlacementPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Center the watermark on the image.
///
/// Coordinates may be negative when the watermark is larger than the image;
/// the compositor clips what falls outside.
pub fn calculate_centered_position(
    image: &ImageDimensions,
    watermark: &WatermarkDimensions,
) -> PlacementPosition {
    PlacementPosition::new(
        (image.width as i32 - watermark.width as i32) / 2,
        (image.height as i32 - watermark.height as i32) / 2,
    )
}

/// One placement centered in each cell of a `columns` x `rows` grid.
///
/// `x = col * cell_width + (cell_width - wm_width) / 2`, likewise for `y`,
/// clamped to non-negative coordinates. Positions are returned row by row.
pub fn calculate_grid_positions(
    image: &ImageDimensions,
    watermark: &WatermarkDimensions,
    columns: u32,
    rows: u32,
) -> Vec<PlacementPosition> {
    if columns == 0 || rows == 0 {
        return Vec::new();
    }

    let cell_w = (image.width / columns) as i32;
    let cell_h = (image.height / rows) as i32;
    let wm_w = watermark.width as i32;
    let wm_h = watermark.height as i32;

    let mut positions = Vec::with_capacity((columns * rows) as usize);
    for row in 0..rows as i32 {
        for col in 0..columns as i32 {
            let x = col * cell_w + (cell_w - wm_w) / 2;
            let y = row * cell_h + (cell_h - wm_h) / 2;
            positions.push(PlacementPosition::new(x.max(0), y.max(0)));
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_positions_centered_in_cells() {
        let image = ImageDimensions {
            width: 1000,
            height: 1000,
        };
        let logo = WatermarkDimensions {
            width: 100,
            height: 100,
        };

        let positions = calculate_grid_positions(&image, &logo, 5, 5);
        assert_eq!(positions.len(), 25);

        for (i, pos) in positions.iter().enumerate() {
            let col = (i % 5) as i32;
            let row = (i / 5) as i32;
            assert_eq!(*pos, PlacementPosition::new(col * 200 + 50, row * 200 + 50));

            // Fully inside its own cell
            assert!(pos.x >= col * 200 && pos.x + 100 <= (col + 1) * 200);
            assert!(pos.y >= row * 200 && pos.y + 100 <= (row + 1) * 200);
        }
    }

    #[test]
    fn test_grid_positions_clamped_when_logo_exceeds_cell() {
        let image = ImageDimensions {
            width: 500,
            height: 250,
        };
        let logo = WatermarkDimensions {
            width: 160,
            height: 60,
        };

        let positions = calculate_grid_positions(&image, &logo, 5, 5);
        // Cells are 100x50, so the first row and column clamp to zero
        assert_eq!(positions[0], PlacementPosition::new(0, 0));
        assert_eq!(positions[1], PlacementPosition::new(70, 0));
        assert_eq!(positions[5], PlacementPosition::new(0, 45));
        assert!(positions.iter().all(|p| p.x >= 0 && p.y >= 0));
    }

    #[test]
    fn test_grid_positions_empty_grid() {
        let image = ImageDimensions {
            width: 100,
            height: 100,
        };
        let logo = WatermarkDimensions {
            width: 10,
            height: 10,
        };
        assert!(calculate_grid_positions(&image, &logo, 0, 5).is_empty());
    }

    #[test]
    fn test_centered_position() {
        let image = ImageDimensions {
            width: 800,
            height: 600,
        };
        let wm = WatermarkDimensions {
            width: 200,
            height: 50,
        };
        assert_eq!(
            calculate_centered_position(&image, &wm),
            PlacementPosition::new(300, 275)
        );

        let big = WatermarkDimensions {
            width: 1000,
            height: 700,
        };
        assert_eq!(
            calculate_centered_position(&image, &big),
            PlacementPosition::new(-100, -50)
        );
    }
}
