use serde::Serialize;

use crate::geometry::PixelRect;

/// 座位被从“有人”降级为“无人”的原因。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Demotion {
    /// 同一互斥组中存在置信度更高（或同分但声明更靠前）的座位。
    ExclusionGroup { winner: String },
    /// 与置信度更高的座位重叠度超过阈值。
    Overlap { winner: String, overlap: f64 },
}

/// 单帧内单个座位的检测结果。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeatCandidate {
    /// 座位在配置中的位置，报告按其升序排列。
    pub seat_id: usize,
    pub name: String,
    /// 已裁剪到帧范围的像素矩形。
    pub rect: PixelRect,
    pub edge_density: f64,
    pub contrast_variance: f64,
    /// 0.0–1.0，仅用于排序，不参与有人/无人判定。
    pub confidence: f64,
    pub occupied: bool,
    /// 分类为有人、但在互斥组或重叠抑制阶段被清除时记录原因。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demotion: Option<Demotion>,
}

impl SeatCandidate {
    pub fn center(&self) -> (u32, u32) {
        self.rect.center()
    }

    pub fn area(&self) -> u64 {
        self.rect.area()
    }

    /// 清除有人标记并记录原因，原始指标保持不变。
    pub(crate) fn demote(&mut self, reason: Demotion) {
        self.occupied = false;
        self.demotion = Some(reason);
    }
}

/// 一次检测的完整输出：每个配置座位恰好一条，按 `seat_id` 升序。
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct SeatReport {
    seats: Vec<SeatCandidate>,
}

impl SeatReport {
    /// 由任意顺序的候选构建报告，内部按 `seat_id` 排序。
    pub fn from_candidates(mut seats: Vec<SeatCandidate>) -> Self {
        seats.sort_by_key(|s| s.seat_id);
        Self { seats }
    }

    pub fn seats(&self) -> &[SeatCandidate] {
        &self.seats
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeatCandidate> {
        self.seats.iter()
    }

    /// 仅有人座位。
    pub fn occupied(&self) -> impl Iterator<Item = &SeatCandidate> {
        self.seats.iter().filter(|s| s.occupied)
    }

    /// 有人座位的 `(名称, id)` 列表。
    pub fn occupied_seats(&self) -> Vec<(&str, usize)> {
        self.occupied().map(|s| (s.name.as_str(), s.seat_id)).collect()
    }

    /// 按名称查找座位。
    pub fn get(&self, name: &str) -> Option<&SeatCandidate> {
        self.seats.iter().find(|s| s.name == name)
    }

    pub fn into_vec(self) -> Vec<SeatCandidate> {
        self.seats
    }
}

impl<'a> IntoIterator for &'a SeatReport {
    type Item = &'a SeatCandidate;
    type IntoIter = std::slice::Iter<'a, SeatCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.seats.iter()
    }
}
