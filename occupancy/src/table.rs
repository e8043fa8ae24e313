//! 桌面区域：外部桌面定位模型给出的矩形，只用作相对坐标到像素坐标的换算基准。

use image::{RgbImage, imageops};
use serde::Serialize;

use crate::geometry::{PixelRect, RelativeRect};

/// 整帧像素坐标下的桌面外接框，可能部分或全部落在帧外。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TableRegion {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    /// 定位模型的置信度；座位检测本身忽略该值。
    pub confidence: f32,
}

impl TableRegion {
    /// 置信度默认为 1.0。
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence: 1.0,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// 覆盖整帧的桌面区域，常用于截图已经对齐到桌面的场景。
    pub fn full_frame(width: u32, height: u32) -> Self {
        Self::new(0, 0, width.min(i32::MAX as u32) as i32, height.min(i32::MAX as u32) as i32)
    }

    /// 宽度，端点颠倒时为 0。
    pub fn width(&self) -> i64 {
        (self.x2 as i64 - self.x1 as i64).max(0)
    }

    /// 高度，端点颠倒时为 0。
    pub fn height(&self) -> i64 {
        (self.y2 as i64 - self.y1 as i64).max(0)
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// 将相对矩形换算为未裁剪的像素坐标 `(x1, y1, x2, y2)`。
    ///
    /// 偏移与尺寸分别向零取整后再相加，结果可能为负或超出帧范围。
    pub fn roi_from_rel(&self, rel: &RelativeRect) -> (i64, i64, i64, i64) {
        let (w, h) = (self.width() as f64, self.height() as f64);
        let x = (self.x1 as f64 + rel.x * w) as i64;
        let y = (self.y1 as f64 + rel.y * h) as i64;
        let rw = (rel.width * w) as i64;
        let rh = (rel.height * h) as i64;
        (x, y, x + rw, y + rh)
    }

    /// 换算并裁剪到 `[0, frame_width] × [0, frame_height]`。
    pub fn seat_rect(
        &self,
        rel: &RelativeRect,
        frame_width: u32,
        frame_height: u32,
    ) -> PixelRect {
        clamp_to_frame(self.roi_from_rel(rel), frame_width, frame_height)
    }

    /// 从帧中裁出桌面区域（超出部分被截断）。
    pub fn crop(&self, frame: &RgbImage) -> RgbImage {
        let rect = clamp_to_frame(
            (
                self.x1 as i64,
                self.y1 as i64,
                self.x2 as i64,
                self.y2 as i64,
            ),
            frame.width(),
            frame.height(),
        );
        imageops::crop_imm(frame, rect.x1, rect.y1, rect.width(), rect.height()).to_image()
    }
}

/// 将任意整数坐标逐分量裁剪到帧范围内。
///
/// 颠倒的端点经 [`PixelRect::new`] 归一化，保证 `x1 <= x2`、`y1 <= y2`。
pub fn clamp_to_frame(raw: (i64, i64, i64, i64), frame_width: u32, frame_height: u32) -> PixelRect {
    let (x1, y1, x2, y2) = raw;
    let cx = |v: i64| v.clamp(0, frame_width as i64) as u32;
    let cy = |v: i64| v.clamp(0, frame_height as i64) as u32;
    PixelRect::new(cx(x1), cy(y1), cx(x2), cy(y2))
}

/// 外部桌面定位器：给定一帧，返回检测到的桌面区域。
///
/// 模型推理不在本 crate 内实现；调用方实现该 trait 并交给
/// [`crate::SeatDetector::detect_with_locator`]。
pub trait TableLocator: Send + Sync {
    fn locate(&self, frame: &RgbImage) -> Vec<TableRegion>;
}

/// 始终返回固定区域的定位器，适合已知窗口布局或测试。
#[derive(Debug, Clone, Default)]
pub struct FixedTableLocator {
    regions: Vec<TableRegion>,
}

impl FixedTableLocator {
    pub fn new(regions: Vec<TableRegion>) -> Self {
        Self { regions }
    }

    pub fn single(region: TableRegion) -> Self {
        Self::new(vec![region])
    }
}

impl TableLocator for FixedTableLocator {
    fn locate(&self, _frame: &RgbImage) -> Vec<TableRegion> {
        self.regions.clone()
    }
}

/// 过滤低置信度桌面，并按从上到下、从左到右排序。
pub fn order_tables(mut tables: Vec<TableRegion>, min_confidence: f32) -> Vec<TableRegion> {
    tables.retain(|t| t.confidence >= min_confidence);
    tables.sort_by_key(|t| (t.y1, t.x1));
    tables
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn projects_relative_rect_onto_table() {
        let table = TableRegion::new(0, 0, 800, 600);
        let raw = table.roi_from_rel(&RelativeRect::new(0.1, 0.1, 0.2, 0.2));
        assert_eq!(raw, (80, 60, 240, 180));
    }

    #[test]
    fn projection_respects_table_offset() {
        let table = TableRegion::new(100, 50, 300, 250);
        let rect = table.seat_rect(&RelativeRect::new(0.5, 0.5, 0.25, 0.25), 1000, 1000);
        assert_eq!(rect, PixelRect::new(200, 150, 250, 200));
    }

    #[test]
    fn clamps_rect_partially_outside_frame() {
        let table = TableRegion::new(-100, -100, 700, 500);
        let rect = table.seat_rect(&RelativeRect::new(0.0, 0.0, 1.0, 1.0), 640, 480);
        assert_eq!(rect, PixelRect::new(0, 0, 640, 480));
    }

    #[test]
    fn rect_fully_outside_frame_collapses() {
        let table = TableRegion::new(1000, 1000, 1200, 1200);
        let rect = table.seat_rect(&RelativeRect::new(0.1, 0.1, 0.5, 0.5), 640, 480);
        assert!(rect.is_empty());
        assert!(rect.x2 <= 640 && rect.y2 <= 480);
    }

    #[test]
    fn inverted_table_is_degenerate() {
        let table = TableRegion::new(300, 300, 100, 100);
        assert!(table.is_degenerate());
        let rect = table.seat_rect(&RelativeRect::new(0.2, 0.2, 0.5, 0.5), 640, 480);
        assert!(rect.is_empty());
    }

    #[test]
    fn crop_is_truncated_to_frame() {
        let frame = RgbImage::from_pixel(50, 40, Rgb([1, 2, 3]));
        let table = TableRegion::new(30, 20, 80, 90);
        assert_eq!(table.crop(&frame).dimensions(), (20, 20));
    }

    #[test]
    fn order_tables_filters_and_sorts() {
        let tables = vec![
            TableRegion::new(500, 0, 900, 300).with_confidence(0.9),
            TableRegion::new(0, 400, 400, 700).with_confidence(0.8),
            TableRegion::new(0, 0, 400, 300).with_confidence(0.95),
            TableRegion::new(0, 0, 10, 10).with_confidence(0.1),
        ];
        let ordered = order_tables(tables, 0.35);
        let origins: Vec<_> = ordered.iter().map(|t| (t.x1, t.y1)).collect();
        assert_eq!(origins, vec![(0, 0), (500, 0), (0, 400)]);
    }
}
