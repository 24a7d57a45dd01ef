//! パーティション計画
//!
//! 論理インデックス空間 `[0, total)` をキューごとの連続した区間に分割します。
//! 区間は互いに素で、オフセット順に並び、和集合はちょうど `[0, total)` になります。

use crate::backend::Queue;
use crate::error::{Result, VexError};
use std::fmt;
use std::ops::Range;

/// 一つのデバイス（キュー）が担当する区間
#[derive(Clone)]
pub struct Partition<Q> {
    /// 呼び出し側が渡したキューリスト内での位置
    pub device_index: usize,
    pub queue: Q,
    pub offset: usize,
    pub count: usize,
}

impl<Q> Partition<Q> {
    /// 論理インデックス空間での区間
    pub fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }

    pub fn end(&self) -> usize {
        self.offset + self.count
    }
}

impl<Q: Queue> Partition<Q> {
    /// 同じキュー・同じ区間を担当しているか
    pub fn same_layout(&self, other: &Partition<Q>) -> bool {
        self.offset == other.offset
            && self.count == other.count
            && self.queue.queue_id() == other.queue.queue_id()
    }
}

impl<Q: Queue> fmt::Debug for Partition<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partition")
            .field("device_index", &self.device_index)
            .field("queue_id", &self.queue.queue_id())
            .field("offset", &self.offset)
            .field("count", &self.count)
            .finish()
    }
}

/// 要素数の分割方針
pub trait PartitionPlanner {
    /// `total`要素を`nqueues`個に分けた各要素数を返す（合計は`total`）
    fn split(&self, total: usize, nqueues: usize) -> Vec<usize>;
}

/// 均等分割
///
/// 余りは先頭のパーティションから1要素ずつ割り当てます。
#[derive(Debug, Clone, Copy, Default)]
pub struct EvenPlanner;

impl PartitionPlanner for EvenPlanner {
    fn split(&self, total: usize, nqueues: usize) -> Vec<usize> {
        if nqueues == 0 {
            return Vec::new();
        }
        let base = total / nqueues;
        let rem = total % nqueues;
        (0..nqueues)
            .map(|d| base + usize::from(d < rem))
            .collect()
    }
}

/// 均等分割でパーティションを計画
pub fn plan<Q: Queue>(total: usize, queues: &[Q]) -> Result<Vec<Partition<Q>>> {
    plan_with(&EvenPlanner, total, queues)
}

/// 任意の分割方針でパーティションを計画
///
/// 要素数0のパーティションは作りません（デバイスメモリを持たないため）。
pub fn plan_with<Q: Queue>(
    planner: &dyn PartitionPlanner,
    total: usize,
    queues: &[Q],
) -> Result<Vec<Partition<Q>>> {
    if total == 0 {
        return Ok(Vec::new());
    }
    if queues.is_empty() {
        return Err(VexError::InvalidSize(format!(
            "cannot place {} elements on an empty queue list",
            total
        )));
    }

    let counts = planner.split(total, queues.len());
    if counts.len() != queues.len() || counts.iter().sum::<usize>() != total {
        return Err(VexError::InvalidSize(format!(
            "partition planner produced {:?} for {} elements on {} queues",
            counts,
            total,
            queues.len()
        )));
    }

    let mut partitions = Vec::with_capacity(queues.len());
    let mut offset = 0;
    for (device_index, (queue, count)) in queues.iter().zip(counts).enumerate() {
        if count == 0 {
            continue;
        }
        partitions.push(Partition {
            device_index,
            queue: queue.clone(),
            offset,
            count,
        });
        offset += count;
    }

    log::trace!(
        "planned {} elements over {} partitions",
        total,
        partitions.len()
    );
    Ok(partitions)
}

/// 論理インデックス`index`を含むパーティションの位置
pub fn find<Q>(partitions: &[Partition<Q>], index: usize) -> Option<usize> {
    let pos = partitions.partition_point(|p| p.end() <= index);
    (pos < partitions.len() && partitions[pos].offset <= index).then_some(pos)
}
