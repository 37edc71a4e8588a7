//! 输入流处理器指标模块
//!
//! 记录就绪判定、sync set 触发与耗尽、一致性故障，并在内存中聚合统计。

use std::collections::BTreeMap;

use contracts::{NodeReadiness, Timestamp};
use metrics::{counter, gauge};

/// 记录一次就绪判定结果
pub fn record_readiness(node: &str, readiness: &NodeReadiness) {
    counter!(
        "syncset_readiness_total",
        "node" => node.to_string(),
        "state" => readiness.label()
    )
    .increment(1);
}

/// 记录 sync set 触发 (一次 fill)
///
/// `sync_set` 为分组时的原始序号，不随耗尽移除而变化。
pub fn record_invocation(node: &str, sync_set: usize, packets: usize) {
    counter!(
        "syncset_invocations_total",
        "node" => node.to_string(),
        "sync_set" => sync_set.to_string()
    )
    .increment(1);
    counter!("syncset_packets_delivered_total", "node" => node.to_string())
        .increment(packets as u64);
}

/// 记录 sync set 耗尽移除
pub fn record_sync_set_exhausted(node: &str, sync_set: usize) {
    counter!(
        "syncset_sync_sets_exhausted_total",
        "node" => node.to_string(),
        "sync_set" => sync_set.to_string()
    )
    .increment(1);
}

/// 记录存活 sync set 数量
pub fn record_live_sync_sets(node: &str, live: usize) {
    gauge!("syncset_live_sync_sets", "node" => node.to_string()).set(live as f64);
}

/// 记录一致性故障
pub fn record_consistency_fault(node: &str) {
    counter!("syncset_consistency_faults_total", "node" => node.to_string()).increment(1);
}

/// 记录输入队列深度
pub fn record_queue_depth(channel: &str, depth: usize) {
    gauge!("syncset_queue_depth", "channel" => channel.to_string()).set(depth as f64);
}

/// 单个 sync set 的统计
#[derive(Debug, Clone, Default)]
struct SyncSetStats {
    invocations: u64,
    /// 相邻两次触发的时间戳间隔
    gaps: RunningStats,
    last_value: Option<i64>,
}

/// Sync set 指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct SyncSetMetricsAggregator {
    /// 总触发次数
    pub total_invocations: u64,

    /// 交付的数据包总数
    pub packets_delivered: u64,

    /// 没有数据包的槽位总数
    pub empty_slots: u64,

    /// 是否已收到 close
    pub closed: bool,

    per_set: BTreeMap<usize, SyncSetStats>,
}

impl SyncSetMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    ///
    /// `slots` 为该 sync set 的通道数，`packets` 为其中实际有数据包的数量。
    pub fn record_invocation(
        &mut self,
        sync_set: usize,
        timestamp: Timestamp,
        packets: usize,
        slots: usize,
    ) {
        self.total_invocations += 1;
        self.packets_delivered += packets as u64;
        self.empty_slots += slots.saturating_sub(packets) as u64;

        let stats = self.per_set.entry(sync_set).or_default();
        stats.invocations += 1;
        if let Some(value) = timestamp.value() {
            if let Some(last) = stats.last_value {
                stats.gaps.push(value.saturating_sub(last) as f64);
            }
            stats.last_value = Some(value);
        }
    }

    /// 记录 close
    pub fn record_close(&mut self) {
        self.closed = true;
    }

    /// 某个 sync set 的触发次数
    pub fn invocations_of(&self, sync_set: usize) -> u64 {
        self.per_set.get(&sync_set).map_or(0, |s| s.invocations)
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_invocations: self.total_invocations,
            packets_delivered: self.packets_delivered,
            empty_slots: self.empty_slots,
            closed: self.closed,
            per_set: self
                .per_set
                .iter()
                .map(|(index, stats)| {
                    (*index, (stats.invocations, StatsSummary::from(&stats.gaps)))
                })
                .collect(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_invocations: u64,
    pub packets_delivered: u64,
    pub empty_slots: u64,
    pub closed: bool,
    /// sync set 序号 -> (触发次数, 时间戳间隔统计)
    pub per_set: BTreeMap<usize, (u64, StatsSummary)>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Sync Set Summary ===")?;
        writeln!(f, "Total invocations: {}", self.total_invocations)?;
        writeln!(f, "Packets delivered: {}", self.packets_delivered)?;
        writeln!(f, "Empty slots: {}", self.empty_slots)?;
        writeln!(f, "Closed: {}", self.closed)?;

        for (index, (invocations, gaps)) in &self.per_set {
            writeln!(
                f,
                "  sync set {}: {} invocations, gaps: {}",
                index, invocations, gaps
            )?;
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.2}, std={:.2} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}
