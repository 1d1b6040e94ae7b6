use std::fmt;

/// A board coordinate packed into a single byte
///
/// The x coordinate occupies the high nibble and y the low nibble, so
/// comparing the packed bytes orders points by x and then by y. Both
/// coordinates must be in `0..16`.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point(u8);

impl Point {
    /// Packs `(x, y)` into a `Point`
    pub const fn new(x: usize, y: usize) -> Self {
        debug_assert!(x < 16 && y < 16);
        Self(((x << 4) | y) as u8)
    }

    pub const fn x(self) -> usize {
        (self.0 >> 4) as usize
    }

    pub const fn y(self) -> usize {
        (self.0 & 0x0f) as usize
    }

    /// The raw packed representation
    pub const fn byte(self) -> u8 {
        self.0
    }

    /// Returns the point offset by `(dx, dy)`, or `None` if it leaves the 16x16 range
    pub fn offset(self, dx: i32, dy: i32) -> Option<Self> {
        let x = self.x() as i32 + dx;
        let y = self.y() as i32 + dy;
        if (0..16).contains(&x) && (0..16).contains(&y) {
            Some(Self::new(x as usize, y as usize))
        } else {
            None
        }
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x(), self.y())
    }
}

#[cfg(test)]
mod test {
    use super::Point;

    #[test]
    fn packs_coordinates() {
        let mut p = Point::new(3, 2);
        assert_eq!((p.x(), p.y()), (3, 2));

        p = Point::new(0, 15);
        assert_eq!((p.x(), p.y()), (0, 15));
        assert_eq!(Point::new(15, 0).byte(), 0xf0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic]
    fn rejects_wide_coordinates() {
        Point::new(16, 0);
    }

    #[test]
    fn orders_by_x_then_y() {
        let mut points = vec![
            Point::new(3, 2),
            Point::new(6, 1),
            Point::new(15, 7),
            Point::new(15, 4),
            Point::new(4, 8),
        ];
        points.sort();
        assert!(points
            .windows(2)
            .all(|w| (w[0].x(), w[0].y()) < (w[1].x(), w[1].y())));
    }

    #[test]
    fn default_is_origin() {
        assert_eq!(Point::default(), Point::new(0, 0));
        assert_eq!(Point::new(4, 5).offset(-5, 0), None);
        assert_eq!(Point::new(4, 5).offset(1, -1), Some(Point::new(5, 4)));
    }
}
