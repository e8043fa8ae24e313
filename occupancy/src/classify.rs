use crate::config::DetectionThresholds;

/// 占用判定结果。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub occupied: bool,
    /// 0.0–1.0，无论是否有人都会给出。
    pub confidence: f64,
}

/// 两项信号各自归一化到 [0, 1] 后取平均。
///
/// `edge_norm` 即 E_MAX，`variance_norm` 即 V_MAX，均须为正。
pub fn confidence_score(
    edge_density: f64,
    contrast_variance: f64,
    edge_norm: f64,
    variance_norm: f64,
) -> f64 {
    let edge_score = (edge_density / edge_norm).clamp(0.0, 1.0);
    let variance_score = (contrast_variance / variance_norm).clamp(0.0, 1.0);
    (edge_score + variance_score) / 2.0
}

/// 双阈值判定：两项信号都严格超过阈值才算有人。
///
/// 置信度只影响后续互斥组与重叠抑制中的排序，不会作为第二道门槛。
pub fn classify(
    edge_density: f64,
    contrast_variance: f64,
    thresholds: &DetectionThresholds,
) -> Classification {
    Classification {
        occupied: edge_density > thresholds.edge_density
            && contrast_variance > thresholds.contrast_variance,
        confidence: confidence_score(
            edge_density,
            contrast_variance,
            thresholds.edge_norm,
            thresholds.variance_norm,
        ),
    }
}
