//! 座位检测编排：逐座位提取特征并分类，随后依次执行互斥组裁决与重叠抑制。
//!
//! 单次调用只处理一帧，不保存任何跨帧状态；布局在调用开始时取一次快照，
//! 因此 [`SeatDetector::reload`] 可以与检测并发执行。

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Result;
use image::{GrayImage, RgbImage, imageops};
use image_proc::{FeatureParams, extract_region};
use tracing::{debug, info};

use crate::classify::classify;
use crate::config::{SeatLayout, SeatRegionSpec, load_layout};
use crate::exclusion::resolve;
use crate::report::{SeatCandidate, SeatReport};
use crate::suppress::suppress;
use crate::table::{TableLocator, TableRegion, order_tables};

/// 持有可热更新的座位布局，对外提供逐帧检测。
pub struct SeatDetector {
    layout: RwLock<Arc<SeatLayout>>,
}

impl SeatDetector {
    pub fn new(layout: SeatLayout) -> Self {
        Self {
            layout: RwLock::new(Arc::new(layout)),
        }
    }

    /// 从 JSON 布局文件构建。
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(load_layout(path)?))
    }

    /// 当前布局快照。
    pub fn layout(&self) -> Arc<SeatLayout> {
        self.layout
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 替换布局；正在进行的检测继续使用旧快照。
    pub fn reload(&self, layout: SeatLayout) {
        info!(
            seats = layout.seats().len(),
            groups = layout.groups().len(),
            "座位布局已替换"
        );
        *self.layout.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(layout);
    }

    /// 对一帧、一个桌面区域执行完整检测。
    pub fn detect(&self, frame: &RgbImage, table: &TableRegion) -> SeatReport {
        let layout = self.layout();
        detect_seats(frame, table, &layout)
    }

    /// 同一帧中多个桌面依次检测，灰度化只做一次。
    pub fn detect_tables(&self, frame: &RgbImage, tables: &[TableRegion]) -> Vec<SeatReport> {
        let layout = self.layout();
        let gray = imageops::grayscale(frame);
        tables
            .iter()
            .map(|table| detect_seats_gray(&gray, table, &layout))
            .collect()
    }

    /// 调用外部定位器找到桌面，过滤低置信度并排序后逐桌检测。
    pub fn detect_with_locator(
        &self,
        frame: &RgbImage,
        locator: &dyn TableLocator,
        min_confidence: f32,
    ) -> Vec<(TableRegion, SeatReport)> {
        let tables = order_tables(locator.locate(frame), min_confidence);
        let reports = self.detect_tables(frame, &tables);
        tables.into_iter().zip(reports).collect()
    }
}

/// 纯函数形式的检测入口：帧 + 桌面区域 + 布局 -> 报告。
///
/// 1. 每个座位的相对矩形换算到像素坐标并裁剪到帧内
/// 2. 提取边缘密度与 Laplacian 方差，双阈值分类
/// 3. 有人候选先经互斥组裁决，再做重叠抑制
/// 4. 被淘汰的座位以无人身份并回，整体按座位 id 升序返回
pub fn detect_seats(frame: &RgbImage, table: &TableRegion, layout: &SeatLayout) -> SeatReport {
    let gray = imageops::grayscale(frame);
    detect_seats_gray(&gray, table, layout)
}

/// 与 [`detect_seats`] 相同，但输入已是灰度帧。
pub fn detect_seats_gray(gray: &GrayImage, table: &TableRegion, layout: &SeatLayout) -> SeatReport {
    let thresholds = layout.thresholds();
    let params = thresholds.feature_params();

    let (occupied, mut unoccupied): (Vec<_>, Vec<_>) = layout
        .seats()
        .iter()
        .map(|spec| measure_seat(gray, table, spec, layout, &params))
        .partition(|c| c.occupied);

    let resolution = resolve(occupied, layout.groups());
    let suppression = suppress(resolution.kept, thresholds.overlap);

    unoccupied.extend(resolution.dropped);
    unoccupied.extend(suppression.dropped);

    let mut seats = suppression.kept;
    seats.extend(unoccupied);
    SeatReport::from_candidates(seats)
}

fn measure_seat(
    gray: &GrayImage,
    table: &TableRegion,
    spec: &SeatRegionSpec,
    layout: &SeatLayout,
    params: &FeatureParams,
) -> SeatCandidate {
    let rect = table.seat_rect(&spec.rect, gray.width(), gray.height());
    let features = extract_region(gray, rect.x1, rect.y1, rect.width(), rect.height(), params);
    let class = classify(
        features.edge_density,
        features.contrast_variance,
        layout.thresholds(),
    );
    debug!(
        seat = %spec.name,
        id = spec.id,
        x1 = rect.x1,
        y1 = rect.y1,
        x2 = rect.x2,
        y2 = rect.y2,
        edge_density = features.edge_density,
        contrast_variance = features.contrast_variance,
        confidence = class.confidence,
        occupied = class.occupied,
        "座位分类"
    );
    SeatCandidate {
        seat_id: spec.id,
        name: spec.name.clone(),
        rect,
        edge_density: features.edge_density,
        contrast_variance: features.contrast_variance,
        confidence: class.confidence,
        occupied: class.occupied,
        demotion: None,
    }
}
