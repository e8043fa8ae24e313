//! 牌桌座位占用检测。
//!
//! 给定一帧截图和外部定位得到的桌面区域，对配置中的每个座位区域判断是否有玩家：
//! 边缘密度 + Laplacian 方差双阈值分类，互斥组裁决，再做“交集 / 较小面积”重叠抑制。
//! 截图、桌面定位、牌面识别与可视化都在本 crate 之外。
//!
//! ```no_run
//! use seat_occupancy::{SeatDetector, TableRegion};
//!
//! let detector = SeatDetector::from_path("assets/seat_layout.json").unwrap();
//! let frame = image::open("frame.png").unwrap().to_rgb8();
//! let report = detector.detect(&frame, &TableRegion::full_frame(frame.width(), frame.height()));
//! for (name, id) in report.occupied_seats() {
//!     println!("{id}: {name}");
//! }
//! ```

mod classify;
mod config;
mod detector;
mod exclusion;
mod geometry;
mod report;
mod suppress;
mod table;

pub use classify::{Classification, classify, confidence_score};
pub use config::{
    ConfigError, DEFAULT_CONTRAST_VARIANCE_THRESHOLD, DEFAULT_EDGE_DENSITY_THRESHOLD,
    DEFAULT_EDGE_NORM, DEFAULT_OVERLAP_THRESHOLD, DEFAULT_VARIANCE_NORM, DetectionThresholds,
    ExclusionGroup, LayoutFile, SeatEntry, SeatLayout, SeatRegionSpec, load_layout,
};
pub use detector::{SeatDetector, detect_seats, detect_seats_gray};
pub use exclusion::{Resolution, resolve};
pub use geometry::{PixelRect, RelativeRect};
pub use report::{Demotion, SeatCandidate, SeatReport};
pub use suppress::{Suppression, suppress};
pub use table::{FixedTableLocator, TableLocator, TableRegion, clamp_to_frame, order_tables};
