//! 座位区域的像素特征：区域裁剪、Canny 边缘密度与 Laplacian 方差。
//!
//! 所有函数都是纯计算，不持有状态；零面积输入统一返回 [`RegionFeatures::ZERO`]，
//! 调用方无需处理错误分支。

use image::{GrayImage, imageops};
use imageproc::edges::canny;
use imageproc::filter::laplacian_filter;
use tracing::trace;

/// Canny 默认低阈值（梯度幅值）。
pub const DEFAULT_CANNY_LOW: f32 = 50.0;
/// Canny 默认高阈值（梯度幅值）。
pub const DEFAULT_CANNY_HIGH: f32 = 150.0;

/// 特征提取参数：Canny 双阈值。
///
/// `canny_low` 必须不大于 `canny_high`，否则 `imageproc::edges::canny` 会直接 panic；
/// 配置层在加载阶段负责校验。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureParams {
    /// 低于该梯度的像素一定不是边缘。
    pub canny_low: f32,
    /// 高于该梯度的像素一定是边缘，介于两者之间的按连通性判定。
    pub canny_high: f32,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            canny_low: DEFAULT_CANNY_LOW,
            canny_high: DEFAULT_CANNY_HIGH,
        }
    }
}

/// 单个区域的两项独立信号。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RegionFeatures {
    /// 边缘像素占比，范围 0.0–1.0。
    pub edge_density: f64,
    /// Laplacian 响应的总体方差，>= 0。
    pub contrast_variance: f64,
}

impl RegionFeatures {
    /// 零面积或完全越界区域对应的特征。
    pub const ZERO: RegionFeatures = RegionFeatures {
        edge_density: 0.0,
        contrast_variance: 0.0,
    };
}

/// 从灰度帧中裁出 `(x, y, width, height)` 子图。
///
/// - 超出帧范围的部分由 `imageops::crop_imm` 截断
/// - 返回拷贝后的独立图像，便于后续滤波
pub fn crop_gray(frame: &GrayImage, x: u32, y: u32, width: u32, height: u32) -> GrayImage {
    imageops::crop_imm(frame, x, y, width, height).to_image()
}

/// 计算边缘密度：Canny 双阈值边缘像素数 / 总像素数。
///
/// # 参数
/// - `gray`: 单通道子图。
/// - `params`: Canny 高低阈值。
///
/// # 返回
/// - 0.0–1.0 的比例；零面积返回 0.0。
pub fn edge_density(gray: &GrayImage, params: &FeatureParams) -> f64 {
    let total = gray.width() as u64 * gray.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let edges = canny(gray, params.canny_low, params.canny_high);
    let edge_pixels = edges.pixels().filter(|p| p.0[0] != 0).count() as u64;
    edge_pixels as f64 / total as f64
}

/// 计算 Laplacian 响应的总体方差（除以 N，而非 N-1）。
///
/// 平坦色块或模糊区域接近 0；头像、文字等细节区域显著升高。
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let total = gray.width() as u64 * gray.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let response = laplacian_filter(gray);
    let n = total as f64;
    let mean = response.pixels().map(|p| p.0[0] as f64).sum::<f64>() / n;
    response
        .pixels()
        .map(|p| {
            let d = p.0[0] as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n
}

/// 对灰度子图同时计算两项信号。
///
/// - 宽或高为 0 时直接返回 [`RegionFeatures::ZERO`]
/// - 两项信号相互独立，任一为 0 不影响另一项
pub fn extract(gray: &GrayImage, params: &FeatureParams) -> RegionFeatures {
    if gray.width() == 0 || gray.height() == 0 {
        return RegionFeatures::ZERO;
    }
    let features = RegionFeatures {
        edge_density: edge_density(gray, params),
        contrast_variance: laplacian_variance(gray),
    };
    trace!(
        width = gray.width(),
        height = gray.height(),
        edge_density = features.edge_density,
        contrast_variance = features.contrast_variance,
        "区域特征"
    );
    features
}

/// 在灰度帧的指定区域内提取特征。
///
/// # 参数
/// - `frame`: 整帧灰度图。
/// - `x`, `y`, `width`, `height`: 区域左上角与尺寸（像素）。
/// - `params`: Canny 参数。
///
/// # 返回
/// - 区域面积为 0（包括完全越界）时返回 [`RegionFeatures::ZERO`]。
pub fn extract_region(
    frame: &GrayImage,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    params: &FeatureParams,
) -> RegionFeatures {
    if width == 0 || height == 0 || x >= frame.width() || y >= frame.height() {
        return RegionFeatures::ZERO;
    }
    extract(&crop_gray(frame, x, y, width, height), params)
}
