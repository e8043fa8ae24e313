use serde::Serialize;

/// 相对桌面外接框的矩形，四个分量都在 0.0–1.0 之间。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RelativeRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// 整帧像素坐标下的矩形，`x2`/`y2` 为开区间端点。
///
/// 不变式：`x1 <= x2`、`y1 <= y2`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct PixelRect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl PixelRect {
    /// 构造矩形，顺序颠倒的端点会被交换以维持不变式。
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }

    /// 矩形中心（整数除法，与像素网格对齐）。
    pub fn center(&self) -> (u32, u32) {
        (self.x1 + self.width() / 2, self.y1 + self.height() / 2)
    }

    /// 与另一矩形的交集面积；仅接触边界时为 0。
    pub fn intersection_area(&self, other: &PixelRect) -> u64 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        if ix2 <= ix1 || iy2 <= iy1 {
            return 0;
        }
        (ix2 - ix1) as u64 * (iy2 - iy1) as u64
    }

    /// 交集面积 / 两者中较小的面积。
    ///
    /// - 嵌套矩形返回 1.0，IoU 在这种情况下会明显偏低
    /// - 任一矩形面积为 0 时返回 0.0
    pub fn overlap_over_min(&self, other: &PixelRect) -> f64 {
        let min_area = self.area().min(other.area());
        if min_area == 0 {
            return 0.0;
        }
        self.intersection_area(other) as f64 / min_area as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalizes_swapped_corners() {
        let r = PixelRect::new(10, 20, 4, 8);
        assert_eq!(r, PixelRect { x1: 4, y1: 8, x2: 10, y2: 20 });
        assert_eq!((r.width(), r.height(), r.area()), (6, 12, 72));
    }

    #[test]
    fn nested_rect_counts_as_full_overlap() {
        let outer = PixelRect::new(0, 0, 100, 100);
        let inner = PixelRect::new(10, 10, 30, 30);
        assert_eq!(outer.overlap_over_min(&inner), 1.0);
        assert_eq!(inner.overlap_over_min(&outer), 1.0);
    }

    #[test]
    fn touching_and_disjoint_rects_do_not_overlap() {
        let a = PixelRect::new(0, 0, 10, 10);
        let touching = PixelRect::new(10, 0, 20, 10);
        let far = PixelRect::new(50, 50, 60, 60);
        assert_eq!(a.intersection_area(&touching), 0);
        assert_eq!(a.overlap_over_min(&touching), 0.0);
        assert_eq!(a.overlap_over_min(&far), 0.0);
    }

    #[test]
    fn partial_overlap_uses_smaller_area() {
        let a = PixelRect::new(0, 0, 10, 10);
        let b = PixelRect::new(5, 0, 25, 10);
        // 交集 50，较小面积 100
        assert!((a.overlap_over_min(&b) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn empty_rect_never_overlaps() {
        let a = PixelRect::new(0, 0, 10, 10);
        let empty = PixelRect::new(5, 5, 5, 9);
        assert!(empty.is_empty());
        assert_eq!(a.overlap_over_min(&empty), 0.0);
    }
}
