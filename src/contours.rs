//! Outer-boundary tracing over a binary mask.
//!
//! Each 8-connected foreground component contributes exactly one contour:
//! its outer boundary, traced clockwise with Moore neighbourhood search so
//! the points come out in boundary order (the shoelace area downstream
//! depends on that ordering). Holes inside a component are never traced.

use image::GrayImage;

const FOREGROUND: u8 = 127; // strictly above counts as foreground

/// Closed polygon boundary of a connected foreground region, in trace order.
/// May contain duplicate or collinear points.
#[derive(Debug, Clone, Default)]
pub struct Contour {
    pub points: Vec<(i32, i32)>,
}

impl Contour {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Traces the outer boundaries of all foreground components.
///
/// An image without foreground pixels yields an empty set; that is not an
/// error at this stage.
pub fn find_contours(binary: &GrayImage) -> Vec<Contour> {
    let (width, height) = binary.dimensions();
    let w = width as i32;
    let h = height as i32;

    let mut visited = vec![false; (width * height) as usize];
    let mut contours = Vec::new();

    for y in 0..h {
        for x in 0..w {
            if visited[(y * w + x) as usize] || !is_foreground(binary, x, y) {
                continue;
            }

            // Raster order makes (x, y) the topmost-leftmost pixel of a new
            // component, a valid boundary start.
            let contour = trace_boundary(binary, x, y, w, h);
            flood_fill_visited(binary, &mut visited, x, y, w, h);

            if contour.len() >= 3 {
                contours.push(contour);
            }
        }
    }

    contours
}

fn is_foreground(img: &GrayImage, x: i32, y: i32) -> bool {
    img.get_pixel(x as u32, y as u32)[0] > FOREGROUND
}

/// Moore-neighbour boundary trace, clockwise.
fn trace_boundary(img: &GrayImage, start_x: i32, start_y: i32, w: i32, h: i32) -> Contour {
    // Clockwise from East.
    const DIR: [(i32, i32); 8] = [
        (1, 0),   // E
        (1, 1),   // SE
        (0, 1),   // S
        (-1, 1),  // SW
        (-1, 0),  // W
        (-1, -1), // NW
        (0, -1),  // N
        (1, -1),  // NE
    ];

    let mut contour = Contour::new();
    let mut cx = start_x;
    let mut cy = start_y;
    // The start pixel has only background above and to its left, so a search
    // beginning East cannot escape the component.
    let mut dir = 0usize;

    let max_steps = (w as usize) * (h as usize) * 2;

    loop {
        contour.points.push((cx, cy));
        if contour.points.len() > max_steps {
            break; // safety against pathological masks
        }

        let mut advanced = false;
        for i in 0..8 {
            let check = (dir + i) % 8;
            let nx = cx + DIR[check].0;
            let ny = cy + DIR[check].1;
            if nx < 0 || nx >= w || ny < 0 || ny >= h {
                continue;
            }
            if is_foreground(img, nx, ny) {
                cx = nx;
                cy = ny;
                // Back the search up two steps so the next scan starts just
                // past the pixel we came from.
                dir = (check + 6) % 8;
                advanced = true;
                break;
            }
        }

        if !advanced {
            break; // isolated pixel
        }
        if cx == start_x && cy == start_y {
            break; // boundary closed
        }
    }

    contour
}

/// Marks every pixel of the component containing (x, y) as visited.
fn flood_fill_visited(
    img: &GrayImage,
    visited: &mut [bool],
    start_x: i32,
    start_y: i32,
    w: i32,
    h: i32,
) {
    let mut stack = vec![(start_x, start_y)];

    while let Some((x, y)) = stack.pop() {
        if x < 0 || x >= w || y < 0 || y >= h {
            continue;
        }
        let idx = (y * w + x) as usize;
        if visited[idx] || !is_foreground(img, x, y) {
            continue;
        }
        visited[idx] = true;

        stack.push((x + 1, y));
        stack.push((x - 1, y));
        stack.push((x, y + 1));
        stack.push((x, y - 1));
        stack.push((x + 1, y + 1));
        stack.push((x - 1, y - 1));
        stack.push((x + 1, y - 1));
        stack.push((x - 1, y + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn mask_with_rect(w: u32, h: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> GrayImage {
        let mut img = GrayImage::new(w, h);
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        img
    }

    #[test]
    fn empty_mask_yields_no_contours() {
        let img = GrayImage::new(32, 32);
        assert!(find_contours(&img).is_empty());
    }

    #[test]
    fn filled_rectangle_yields_one_outer_contour() {
        let img = mask_with_rect(20, 20, 4, 5, 15, 12);
        let contours = find_contours(&img);
        assert_eq!(contours.len(), 1);

        // Boundary only: every traced point sits on the rectangle edge.
        for &(x, y) in &contours[0].points {
            let on_edge = x == 4 || x == 14 || y == 5 || y == 11;
            assert!(on_edge, "({}, {}) is interior", x, y);
        }
    }

    #[test]
    fn two_components_yield_two_contours() {
        let mut img = mask_with_rect(40, 20, 2, 2, 10, 10);
        for y in 4..16 {
            for x in 20..35 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        assert_eq!(find_contours(&img).len(), 2);
    }

    #[test]
    fn hole_does_not_produce_extra_contour() {
        let mut img = mask_with_rect(30, 30, 2, 2, 28, 28);
        // Punch a hole; the interior boundary must not be traced.
        for y in 10..20 {
            for x in 10..20 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
        assert_eq!(find_contours(&img).len(), 1);
    }

    #[test]
    fn trace_order_is_a_connected_path() {
        let img = mask_with_rect(20, 20, 3, 3, 12, 12);
        let contour = find_contours(&img).remove(0);
        for pair in contour.points.windows(2) {
            let dx = (pair[1].0 - pair[0].0).abs();
            let dy = (pair[1].1 - pair[0].1).abs();
            assert!(dx <= 1 && dy <= 1, "trace jumps from {:?} to {:?}", pair[0], pair[1]);
        }
    }
}
