//! 互斥组裁决：同一物理座位在不同桌型布局下的多个别名，最多保留一个有人。

use std::collections::HashMap;

use tracing::debug;

use crate::config::ExclusionGroup;
use crate::report::{Demotion, SeatCandidate};

/// 裁决结果：保留的候选（保持输入顺序）与被降级为无人的候选。
#[derive(Debug, Default)]
pub struct Resolution {
    pub kept: Vec<SeatCandidate>,
    pub dropped: Vec<SeatCandidate>,
}

/// 在每个互斥组内只保留置信度最高的有人座位。
///
/// - 每个组都针对同一份输入独立裁决，组与组之间互不影响
/// - 置信度相同时，组内声明靠前的成员胜出
/// - 不属于任何组的座位原样保留
/// - 被淘汰的候选 `occupied` 置为 false，并记录胜出者
pub fn resolve(occupied: Vec<SeatCandidate>, groups: &[ExclusionGroup]) -> Resolution {
    if groups.is_empty() || occupied.len() <= 1 {
        return Resolution {
            kept: occupied,
            dropped: Vec::new(),
        };
    }

    let by_name: HashMap<&str, usize> = occupied
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name.as_str(), i))
        .collect();

    // 被淘汰的下标 -> 首个淘汰它的组的胜出者
    let mut losers: HashMap<usize, String> = HashMap::new();
    for group in groups {
        let present: Vec<usize> = group
            .members()
            .iter()
            .filter_map(|m| by_name.get(m.as_str()).copied())
            .collect();
        if present.len() <= 1 {
            continue;
        }

        let mut best = present[0];
        for &idx in &present[1..] {
            if occupied[idx].confidence > occupied[best].confidence {
                best = idx;
            }
        }
        for &idx in &present {
            if idx != best {
                losers
                    .entry(idx)
                    .or_insert_with(|| occupied[best].name.clone());
            }
        }
    }

    let mut resolution = Resolution::default();
    for (idx, mut candidate) in occupied.into_iter().enumerate() {
        match losers.remove(&idx) {
            Some(winner) => {
                debug!(seat = %candidate.name, winner = %winner, "互斥组淘汰");
                candidate.demote(Demotion::ExclusionGroup { winner });
                resolution.dropped.push(candidate);
            }
            None => resolution.kept.push(candidate),
        }
    }
    resolution
}
