//! 重叠抑制：多个桌型的座位矩形叠加在同一坐标系上，同一位置的重复命中只保留一个。

use tracing::debug;

use crate::report::{Demotion, SeatCandidate};

/// 抑制结果。`kept` 按置信度降序，调用方需自行按 id 重新排序。
#[derive(Debug, Default)]
pub struct Suppression {
    pub kept: Vec<SeatCandidate>,
    pub dropped: Vec<SeatCandidate>,
}

/// 贪心非极大值抑制，重叠度使用“交集 / 较小面积”。
///
/// - 按置信度稳定降序排序，同分保持输入顺序
/// - 依次保留当前最高者，并永久移除与其重叠度 **超过** `overlap_threshold` 的候选
/// - 被移除的候选降级为无人，记录胜出者与重叠度
pub fn suppress(mut candidates: Vec<SeatCandidate>, overlap_threshold: f64) -> Suppression {
    if candidates.len() <= 1 {
        return Suppression {
            kept: candidates,
            dropped: Vec::new(),
        };
    }

    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut removed: Vec<Option<(usize, f64)>> = vec![None; candidates.len()];
    for i in 0..candidates.len() {
        if removed[i].is_some() {
            continue;
        }
        for j in (i + 1)..candidates.len() {
            if removed[j].is_some() {
                continue;
            }
            let overlap = candidates[i].rect.overlap_over_min(&candidates[j].rect);
            if overlap > overlap_threshold {
                removed[j] = Some((i, overlap));
            }
        }
    }

    let winners: Vec<Option<(String, f64)>> = removed
        .iter()
        .map(|r| r.map(|(i, overlap)| (candidates[i].name.clone(), overlap)))
        .collect();

    let mut out = Suppression::default();
    for (mut candidate, winner) in candidates.into_iter().zip(winners) {
        match winner {
            Some((winner, overlap)) => {
                debug!(seat = %candidate.name, winner = %winner, overlap, "重叠抑制");
                candidate.demote(Demotion::Overlap { winner, overlap });
                out.dropped.push(candidate);
            }
            None => out.kept.push(candidate),
        }
    }
    out
}
