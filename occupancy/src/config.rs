//! 座位布局配置：JSON 文件结构、默认阈值以及加载期校验。
//!
//! 配置在进程启动时加载一次并校验，校验失败立即返回错误，
//! 不会把非法数值带进逐帧检测流程。

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use image_proc::{DEFAULT_CANNY_HIGH, DEFAULT_CANNY_LOW, FeatureParams};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::geometry::RelativeRect;

/// 布局校验错误。
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("第 {index} 个座位名称为空")]
    EmptySeatName { index: usize },

    #[error("座位名称重复：{0}")]
    DuplicateSeat(String),

    #[error("座位 {seat} 的 {field} 超出 [0, 1]：{value}")]
    FractionOutOfRange {
        seat: String,
        field: &'static str,
        value: f64,
    },

    #[error("第 {0} 个互斥组为空")]
    EmptyGroup(usize),

    #[error("第 {group} 个互斥组引用了不存在的座位 {seat}")]
    UnknownGroupMember { group: usize, seat: String },

    #[error("阈值 {name} 非法：{value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("Canny 低阈值 {low} 大于高阈值 {high}")]
    CannyOrder { low: f32, high: f32 },
}

/// 边缘密度默认阈值。
pub const DEFAULT_EDGE_DENSITY_THRESHOLD: f64 = 0.1;
/// Laplacian 方差默认阈值。
pub const DEFAULT_CONTRAST_VARIANCE_THRESHOLD: f64 = 100.0;
/// 重叠抑制默认阈值（交集 / 较小面积）。
pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.6;
/// 边缘密度归一化上限 E_MAX：密度达到该值即记满分。
pub const DEFAULT_EDGE_NORM: f64 = 0.3;
/// Laplacian 方差归一化上限 V_MAX：方差达到该值即记满分。
pub const DEFAULT_VARIANCE_NORM: f64 = 500.0;

/// 检测阈值与置信度归一化常数。
///
/// 所有字段在 JSON 中均可省略，省略时使用上面的默认常量。
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DetectionThresholds {
    /// 边缘密度必须严格大于该值才可能判定为有人。
    #[serde(default = "default_edge_density")]
    pub edge_density: f64,
    /// Laplacian 方差必须严格大于该值才可能判定为有人。
    #[serde(default = "default_contrast_variance")]
    pub contrast_variance: f64,
    /// 两个有人座位的重叠度超过该值时，只保留置信度更高的一个。
    #[serde(default = "default_overlap")]
    pub overlap: f64,
    /// E_MAX。
    #[serde(default = "default_edge_norm")]
    pub edge_norm: f64,
    /// V_MAX。
    #[serde(default = "default_variance_norm")]
    pub variance_norm: f64,
    #[serde(default = "default_canny_low")]
    pub canny_low: f32,
    #[serde(default = "default_canny_high")]
    pub canny_high: f32,
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            edge_density: DEFAULT_EDGE_DENSITY_THRESHOLD,
            contrast_variance: DEFAULT_CONTRAST_VARIANCE_THRESHOLD,
            overlap: DEFAULT_OVERLAP_THRESHOLD,
            edge_norm: DEFAULT_EDGE_NORM,
            variance_norm: DEFAULT_VARIANCE_NORM,
            canny_low: DEFAULT_CANNY_LOW,
            canny_high: DEFAULT_CANNY_HIGH,
        }
    }
}

impl DetectionThresholds {
    /// 特征提取所需的 Canny 参数。
    pub fn feature_params(&self) -> FeatureParams {
        FeatureParams {
            canny_low: self.canny_low,
            canny_high: self.canny_high,
        }
    }

    /// 校验阈值：有限非负、重叠阈值在 [0, 1]、归一化常数为正、Canny 高低有序。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("edge_density", self.edge_density),
            ("contrast_variance", self.contrast_variance),
            ("canny_low", self.canny_low as f64),
            ("canny_high", self.canny_high as f64),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        if !(0.0..=1.0).contains(&self.overlap) {
            return Err(ConfigError::InvalidThreshold {
                name: "overlap",
                value: self.overlap,
            });
        }
        for (name, value) in [
            ("edge_norm", self.edge_norm),
            ("variance_norm", self.variance_norm),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        if self.canny_low > self.canny_high {
            return Err(ConfigError::CannyOrder {
                low: self.canny_low,
                high: self.canny_high,
            });
        }
        Ok(())
    }
}

fn default_edge_density() -> f64 {
    DEFAULT_EDGE_DENSITY_THRESHOLD
}

fn default_contrast_variance() -> f64 {
    DEFAULT_CONTRAST_VARIANCE_THRESHOLD
}

fn default_overlap() -> f64 {
    DEFAULT_OVERLAP_THRESHOLD
}

fn default_edge_norm() -> f64 {
    DEFAULT_EDGE_NORM
}

fn default_variance_norm() -> f64 {
    DEFAULT_VARIANCE_NORM
}

fn default_canny_low() -> f32 {
    DEFAULT_CANNY_LOW
}

fn default_canny_high() -> f32 {
    DEFAULT_CANNY_HIGH
}

/// 布局 JSON 的原始结构（未校验）。
#[derive(Debug, Clone, Deserialize)]
pub struct LayoutFile {
    pub seats: Vec<SeatEntry>,
    /// 缺省视为没有互斥组。
    #[serde(default)]
    pub exclusion_groups: Vec<Vec<String>>,
    #[serde(default)]
    pub thresholds: DetectionThresholds,
}

/// 单个座位条目：名称 + 相对桌面外接框的矩形。
#[derive(Debug, Clone, Deserialize)]
pub struct SeatEntry {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// 已校验的座位区域。`id` 为其在配置中的位置，也是报告的排序键。
#[derive(Debug, Clone, PartialEq)]
pub struct SeatRegionSpec {
    pub id: usize,
    pub name: String,
    pub rect: RelativeRect,
}

/// 互斥组：同一物理座位在不同桌型下的别名，最多只能有一个被判定有人。
///
/// 成员顺序有意义：置信度相同时，先声明的成员胜出。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionGroup {
    members: Vec<String>,
}

impl ExclusionGroup {
    pub fn members(&self) -> &[String] {
        &self.members
    }
}

/// 已校验的完整布局，加载后只读。
#[derive(Debug, Clone, PartialEq)]
pub struct SeatLayout {
    seats: Vec<SeatRegionSpec>,
    groups: Vec<ExclusionGroup>,
    thresholds: DetectionThresholds,
}

impl SeatLayout {
    /// 由 `(名称, 相对矩形)` 列表、互斥组和阈值构建布局并校验。
    ///
    /// - 座位 id 按传入顺序从 0 开始分配
    /// - 名称必须非空且唯一；矩形各分量必须是 [0, 1] 内的有限数
    /// - 互斥组不能为空，成员必须是已声明的座位
    pub fn new(
        seats: Vec<(String, RelativeRect)>,
        groups: Vec<Vec<String>>,
        thresholds: DetectionThresholds,
    ) -> Result<Self, ConfigError> {
        thresholds.validate()?;

        let mut names = HashSet::new();
        let mut specs = Vec::with_capacity(seats.len());
        for (id, (name, rect)) in seats.into_iter().enumerate() {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptySeatName { index: id });
            }
            if !names.insert(name.clone()) {
                return Err(ConfigError::DuplicateSeat(name));
            }
            for (field, value) in [
                ("x", rect.x),
                ("y", rect.y),
                ("width", rect.width),
                ("height", rect.height),
            ] {
                if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                    return Err(ConfigError::FractionOutOfRange {
                        seat: name,
                        field,
                        value,
                    });
                }
            }
            specs.push(SeatRegionSpec { id, name, rect });
        }

        let mut exclusion = Vec::with_capacity(groups.len());
        for (index, members) in groups.into_iter().enumerate() {
            if members.is_empty() {
                return Err(ConfigError::EmptyGroup(index));
            }
            if let Some(unknown) = members.iter().find(|m| !names.contains(m.as_str())) {
                return Err(ConfigError::UnknownGroupMember {
                    group: index,
                    seat: unknown.clone(),
                });
            }
            exclusion.push(ExclusionGroup { members });
        }

        Ok(Self {
            seats: specs,
            groups: exclusion,
            thresholds,
        })
    }

    /// 从原始 JSON 结构构建。
    pub fn from_file_model(file: LayoutFile) -> Result<Self, ConfigError> {
        let seats = file
            .seats
            .into_iter()
            .map(|s| (s.name, RelativeRect::new(s.x, s.y, s.width, s.height)))
            .collect();
        Self::new(seats, file.exclusion_groups, file.thresholds)
    }

    /// 解析并校验 JSON 文本。
    pub fn from_json_str(text: &str) -> Result<Self> {
        let file: LayoutFile = serde_json::from_str(text).context("解析座位布局 JSON 失败")?;
        Ok(Self::from_file_model(file)?)
    }

    pub fn seats(&self) -> &[SeatRegionSpec] {
        &self.seats
    }

    pub fn groups(&self) -> &[ExclusionGroup] {
        &self.groups
    }

    pub fn thresholds(&self) -> &DetectionThresholds {
        &self.thresholds
    }
}

/// 从 JSON 文件读取并校验座位布局。
pub fn load_layout(path: impl AsRef<Path>) -> Result<SeatLayout> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("无法读取座位布局：{}", path.display()))?;
    let layout = SeatLayout::from_json_str(&text)
        .with_context(|| format!("座位布局非法：{}", path.display()))?;
    info!(
        path = %path.display(),
        seats = layout.seats().len(),
        groups = layout.groups().len(),
        "已加载座位布局"
    );
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn seat(name: &str, x: f64) -> (String, RelativeRect) {
        (name.to_string(), RelativeRect::new(x, 0.1, 0.1, 0.1))
    }

    #[test]
    fn assigns_ids_in_declaration_order() -> Result<()> {
        let layout = SeatLayout::new(
            vec![seat("s_b", 0.5), seat("s_a", 0.1)],
            vec![],
            DetectionThresholds::default(),
        )?;
        let ids: Vec<_> = layout.seats().iter().map(|s| (s.id, s.name.as_str())).collect();
        assert_eq!(ids, vec![(0, "s_b"), (1, "s_a")]);
        Ok(())
    }

    #[test]
    fn rejects_fraction_outside_unit_range() {
        let err = SeatLayout::new(
            vec![("s1".into(), RelativeRect::new(0.1, 0.1, 1.2, 0.1))],
            vec![],
            DetectionThresholds::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::FractionOutOfRange {
                seat: "s1".into(),
                field: "width",
                value: 1.2
            }
        );
    }

    #[test]
    fn rejects_nan_fraction() {
        let err = SeatLayout::new(
            vec![("s1".into(), RelativeRect::new(f64::NAN, 0.1, 0.1, 0.1))],
            vec![],
            DetectionThresholds::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::FractionOutOfRange { field: "x", .. }));
    }

    #[test]
    fn rejects_empty_and_duplicate_names() {
        let empty = SeatLayout::new(vec![seat(" ", 0.1)], vec![], DetectionThresholds::default());
        assert_eq!(empty.unwrap_err(), ConfigError::EmptySeatName { index: 0 });

        let dup = SeatLayout::new(
            vec![seat("s1", 0.1), seat("s1", 0.2)],
            vec![],
            DetectionThresholds::default(),
        );
        assert_eq!(dup.unwrap_err(), ConfigError::DuplicateSeat("s1".into()));
    }

    #[test]
    fn rejects_unknown_or_empty_group() {
        let unknown = SeatLayout::new(
            vec![seat("s1", 0.1)],
            vec![vec!["s1".into(), "ghost".into()]],
            DetectionThresholds::default(),
        );
        assert_eq!(
            unknown.unwrap_err(),
            ConfigError::UnknownGroupMember {
                group: 0,
                seat: "ghost".into()
            }
        );

        let empty = SeatLayout::new(
            vec![seat("s1", 0.1)],
            vec![vec![]],
            DetectionThresholds::default(),
        );
        assert_eq!(empty.unwrap_err(), ConfigError::EmptyGroup(0));
    }

    #[test]
    fn rejects_bad_thresholds() {
        let mut t = DetectionThresholds::default();
        t.overlap = 1.5;
        assert!(matches!(
            t.validate(),
            Err(ConfigError::InvalidThreshold { name: "overlap", .. })
        ));

        let mut t = DetectionThresholds::default();
        t.variance_norm = 0.0;
        assert!(matches!(
            t.validate(),
            Err(ConfigError::InvalidThreshold { name: "variance_norm", .. })
        ));

        let mut t = DetectionThresholds::default();
        t.canny_low = 200.0;
        assert_eq!(
            t.validate(),
            Err(ConfigError::CannyOrder {
                low: 200.0,
                high: 150.0
            })
        );
    }

    #[test]
    fn json_defaults_fill_missing_sections() -> Result<()> {
        let layout = SeatLayout::from_json_str(
            r#"{ "seats": [ { "name": "s1", "x": 0.1, "y": 0.2, "width": 0.1, "height": 0.1 } ] }"#,
        )?;
        assert!(layout.groups().is_empty());
        assert_eq!(*layout.thresholds(), DetectionThresholds::default());
        Ok(())
    }

    #[test]
    fn json_partial_thresholds_keep_other_defaults() -> Result<()> {
        let layout = SeatLayout::from_json_str(
            r#"{
                "seats": [
                    { "name": "s1", "x": 0.1, "y": 0.2, "width": 0.1, "height": 0.1 },
                    { "name": "s2", "x": 0.1, "y": 0.2, "width": 0.2, "height": 0.2 }
                ],
                "exclusion_groups": [["s2", "s1"]],
                "thresholds": { "overlap": 0.4 }
            }"#,
        )?;
        assert_eq!(layout.thresholds().overlap, 0.4);
        assert_eq!(layout.thresholds().edge_norm, DEFAULT_EDGE_NORM);
        assert_eq!(layout.groups()[0].members(), ["s2", "s1"]);
        Ok(())
    }

    #[test]
    fn load_layout_reports_path_on_failure() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, r#"{{ "seats": [ {{ "name": "", "x": 0, "y": 0, "width": 0.1, "height": 0.1 }} ] }}"#)?;
        let err = load_layout(file.path()).unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("座位布局非法"), "{chain}");
        assert!(chain.contains("座位名称为空"), "{chain}");
        Ok(())
    }

    #[test]
    fn load_layout_reads_valid_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{ "seats": [ {{ "name": "s1", "x": 0.1, "y": 0.1, "width": 0.2, "height": 0.2 }} ] }}"#
        )?;
        let layout = load_layout(file.path())?;
        assert_eq!(layout.seats().len(), 1);
        Ok(())
    }
}
