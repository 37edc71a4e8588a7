//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置 -> 处理器 的跨 crate 测试
//! - 多线程生产者 + 调度线程测试
//! - tokio 端到端回放测试

#[cfg(test)]
mod support {
    use std::sync::{Arc, Mutex};

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{InputChannel, NodeConfig, TagMap};
    use stream_handler::{
        HandlerRegistry, InputStreamHandler, Invocation, PacketQueue, RunCallbacks,
    };

    pub struct Node {
        pub tag_map: TagMap,
        pub queues: Vec<Arc<PacketQueue>>,
        pub handler: Box<dyn InputStreamHandler>,
        pub invocations: Arc<Mutex<Vec<Invocation>>>,
    }

    impl Node {
        pub fn queue(&self, name: &str) -> &PacketQueue {
            let id = self.tag_map.id_by_name(name).unwrap();
            &self.queues[id.index()]
        }

        pub fn take_invocations(&self) -> Vec<Invocation> {
            std::mem::take(&mut *self.invocations.lock().unwrap())
        }
    }

    pub fn load(toml: &str) -> NodeConfig {
        ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap()
    }

    /// Build queues and handler for `config` and prepare a run.
    pub fn start(config: &NodeConfig) -> Node {
        let tag_map = TagMap::from_streams(&config.input_streams).unwrap();
        let queues = PacketQueue::for_tag_map(&tag_map, config.queue_capacity);
        let channels: Vec<Arc<dyn InputChannel>> = queues
            .iter()
            .map(|q| q.clone() as Arc<dyn InputChannel>)
            .collect();
        let handler = HandlerRegistry::with_builtin()
            .build(config, channels)
            .unwrap();

        let invocations = Arc::new(Mutex::new(Vec::new()));
        let sink = invocations.clone();
        handler
            .prepare_for_run(RunCallbacks {
                schedule: Arc::new(move |inv: Invocation| sink.lock().unwrap().push(inv)),
                ..RunCallbacks::noop()
            })
            .unwrap();

        Node {
            tag_map,
            queues,
            handler,
            invocations,
        }
    }
}

#[cfg(test)]
mod contract_tests {
    use contracts::{NodeReadiness, Packet, Timestamp};
    use stream_handler::Invocation;

    use crate::support::{load, start};

    const FOUR_INPUTS: &str = r#"
name = "quad"
input_streams = ["A:a", "B:b", "C:c", "D:d"]

[[options.sync_sets]]
tag_index = ["A", "B"]

[[options.sync_sets]]
tag_index = ["C"]
"#;

    #[test]
    fn test_partition_from_config() {
        let config = load(FOUR_INPUTS);
        let tag_map = contracts::TagMap::from_streams(&config.input_streams).unwrap();
        let sets = stream_handler::partition_sync_sets(&config.options, &tag_map).unwrap();

        let names: Vec<Vec<&str>> = sets
            .iter()
            .map(|s| s.ids().iter().map(|id| tag_map.name(*id).unwrap()).collect())
            .collect();
        assert_eq!(names, vec![vec!["a", "b"], vec!["c"], vec!["d"]]);
    }

    #[test]
    fn test_queued_minimum_required() {
        let node = start(&load(FOUR_INPUTS));
        node.queue("a")
            .add_packet(Packet::empty(Timestamp::Value(5)))
            .unwrap();
        node.queue("b").set_next_timestamp_bound(Timestamp::Value(3));
        assert_eq!(node.handler.node_readiness().unwrap(), NodeReadiness::NotReady);
    }

    #[test]
    fn test_all_finished_closes() {
        let node = start(&load(
            r#"
name = "single"
input_streams = ["a", "b"]
"#,
        ));
        node.queues.iter().for_each(|q| q.close());
        assert_eq!(
            node.handler.node_readiness().unwrap(),
            NodeReadiness::ReadyForClose
        );
        assert_eq!(node.handler.schedule_invocations(10).unwrap(), 1);
        assert_eq!(node.take_invocations(), vec![Invocation::Close]);

        // Close is scheduled once per run.
        assert_eq!(node.handler.schedule_invocations(10).unwrap(), 0);
    }

    #[test]
    fn test_fill_timestamp_mismatch_keeps_cursor() {
        let node = start(&load(FOUR_INPUTS));
        node.queue("c")
            .add_packet(Packet::empty(Timestamp::Value(7)))
            .unwrap();
        assert_eq!(
            node.handler.node_readiness().unwrap(),
            NodeReadiness::ReadyForProcess(Timestamp::Value(7))
        );

        let mut inputs = contracts::InputSet::new(4);
        let err = node
            .handler
            .fill_input_set(Timestamp::Value(8), &mut inputs)
            .unwrap_err();
        assert!(err.is_consistency());
        assert_eq!(inputs.packet_count(), 0);

        node.handler
            .fill_input_set(Timestamp::Value(7), &mut inputs)
            .unwrap();
        assert_eq!(inputs.packet_count(), 1);
    }

    #[test]
    fn test_invalid_sync_set_rejected_at_run_start() {
        // Bypass the loader so the handler sees the bad options itself.
        let mut config = load(FOUR_INPUTS);
        config.options.sync_sets[1] = contracts::SyncSetSpec::new(["A:1"]);

        let tag_map = contracts::TagMap::from_streams(&config.input_streams).unwrap();
        let queues = stream_handler::PacketQueue::for_tag_map(&tag_map, 4);
        let channels = queues
            .iter()
            .map(|q| q.clone() as std::sync::Arc<dyn contracts::InputChannel>)
            .collect();
        let handler = stream_handler::HandlerRegistry::with_builtin()
            .build(&config, channels)
            .unwrap();
        let err = handler
            .prepare_for_run(stream_handler::RunCallbacks::noop())
            .unwrap_err();
        assert!(err.is_config());
    }
}

#[cfg(test)]
mod concurrency_tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    use contracts::{ChannelId, Packet, Timestamp};
    use stream_handler::Invocation;

    use crate::support::{load, start};

    const PACKETS_PER_STREAM: i64 = 200;

    /// Producers push on their own threads while one scheduler thread polls.
    #[test]
    fn test_concurrent_producers_single_scheduler() {
        let node = start(&load(
            r#"
name = "fanin"
input_streams = ["A:a", "B:b", "C:c", "D:d"]
queue_capacity = 512

[[options.sync_sets]]
tag_index = ["A", "B"]

[[options.sync_sets]]
tag_index = ["C"]
"#,
        ));
        let done = AtomicBool::new(false);
        let mut delivered: BTreeMap<ChannelId, Vec<i64>> = BTreeMap::new();
        let mut per_set_last: BTreeMap<Vec<ChannelId>, Timestamp> = BTreeMap::new();

        std::thread::scope(|scope| {
            for name in ["a", "b", "c", "d"] {
                let queue = node.queue(name);
                scope.spawn(move || {
                    // Even timestamps on b and d so sets see gaps.
                    let step = if name == "b" || name == "d" { 2 } else { 1 };
                    let mut t = 0;
                    while t < PACKETS_PER_STREAM {
                        queue.add_packet(Packet::empty(Timestamp::Value(t))).unwrap();
                        t += step;
                    }
                    queue.close();
                });
            }

            scope.spawn(|| {
                let deadline = Instant::now() + Duration::from_secs(30);
                while !done.load(Ordering::SeqCst) {
                    assert!(Instant::now() < deadline, "scheduler timed out");
                    node.handler.schedule_invocations(16).unwrap();
                    for invocation in node.take_invocations() {
                        match invocation {
                            Invocation::Process {
                                timestamp, inputs, ..
                            } => {
                                let set: Vec<ChannelId> = inputs.filled_ids().collect();
                                if let Some(last) = per_set_last.insert(set.clone(), timestamp) {
                                    assert!(last < timestamp, "{set:?}: {last} then {timestamp}");
                                }
                                for id in set {
                                    if let Some(packet) = &inputs.get(id).unwrap().packet {
                                        delivered
                                            .entry(id)
                                            .or_default()
                                            .push(packet.timestamp.value().unwrap());
                                    }
                                }
                            }
                            Invocation::Close => done.store(true, Ordering::SeqCst),
                        }
                    }
                    std::thread::yield_now();
                }
            });
        });

        for (name, step) in [("a", 1), ("b", 2), ("c", 1), ("d", 2)] {
            let id = node.tag_map.id_by_name(name).unwrap();
            let expected: Vec<i64> = (0..PACKETS_PER_STREAM).step_by(step).collect();
            assert_eq!(delivered.get(&id), Some(&expected), "stream {name}");
            assert_eq!(node.queue(name).dropped_count(), 0);
        }
        assert_eq!(per_set_last.len(), 3);
    }

    /// Several executor threads race on `schedule_invocations` of one node.
    #[test]
    fn test_parallel_schedulers_share_one_node() {
        const PACKETS: i64 = 50;

        for _ in 0..100 {
            let node = start(&load(
                r#"
name = "pair"
input_streams = ["a", "b"]
"#,
            ));
            for t in 0..PACKETS {
                node.queue("a").add_packet(Packet::empty(Timestamp::Value(t))).unwrap();
                node.queue("b").add_packet(Packet::empty(Timestamp::Value(t))).unwrap();
            }
            node.queues.iter().for_each(|q| q.close());

            std::thread::scope(|scope| {
                for _ in 0..4 {
                    scope.spawn(|| {
                        // Zero once close has been scheduled by some thread.
                        while node.handler.schedule_invocations(1).unwrap() > 0 {}
                    });
                }
            });

            let invocations = node.take_invocations();
            assert_eq!(invocations.len() as i64, PACKETS + 1);
            assert_eq!(invocations.last(), Some(&Invocation::Close));
            for (t, invocation) in (0..PACKETS).zip(&invocations) {
                match invocation {
                    Invocation::Process {
                        timestamp,
                        sync_set,
                        inputs,
                    } => {
                        assert_eq!(*timestamp, Timestamp::Value(t));
                        assert_eq!(*sync_set, 0);
                        assert_eq!(inputs.packet_count(), 2);
                    }
                    Invocation::Close => panic!("close before packet {t}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;

    use contracts::{Packet, Timestamp};
    use observability::SyncSetMetricsAggregator;
    use stream_handler::Invocation;
    use tokio::sync::mpsc;

    use crate::support::{load, start};

    enum Event {
        Packet(&'static str, i64),
        Bound(&'static str, i64),
        Close(&'static str),
    }

    /// End-to-end test: tokio producers -> mpsc -> scheduler -> invocations
    ///
    /// 验证完整的数据流：
    /// 1. 两个生产者任务各自发送音频/视频事件
    /// 2. 调度任务将事件写入队列并调用 schedule_invocations
    /// 3. 每个 sync set 独立推进，最后只触发一次 close
    #[tokio::test]
    async fn test_e2e_audio_video_replay() {
        let config = load(
            r#"
name = "av"
input_streams = ["AUDIO:0:left", "AUDIO:1:right", "VIDEO:cam"]

[[options.sync_sets]]
tag_index = ["AUDIO:0", "AUDIO:1"]
"#,
        );
        let node = Arc::new(start(&config));
        let (tx, mut rx) = mpsc::channel::<Event>(8);

        let audio_tx = tx.clone();
        let audio = tokio::spawn(async move {
            for t in 0..10 {
                audio_tx.send(Event::Packet("left", t * 10)).await.unwrap();
                audio_tx.send(Event::Packet("right", t * 10)).await.unwrap();
            }
            audio_tx.send(Event::Close("left")).await.unwrap();
            audio_tx.send(Event::Close("right")).await.unwrap();
        });

        let video_tx = tx;
        let video = tokio::spawn(async move {
            for t in 0..4 {
                video_tx.send(Event::Packet("cam", t * 33)).await.unwrap();
            }
            video_tx.send(Event::Bound("cam", 1000)).await.unwrap();
            video_tx.send(Event::Close("cam")).await.unwrap();
        });

        let scheduler_node = node.clone();
        let scheduler = tokio::spawn(async move {
            let node = scheduler_node;
            let mut stats = SyncSetMetricsAggregator::new();
            let mut audio_slots = Vec::new();

            while let Some(event) = rx.recv().await {
                match event {
                    Event::Packet(name, t) => node
                        .queue(name)
                        .add_packet(Packet::empty(Timestamp::Value(t)))
                        .unwrap(),
                    Event::Bound(name, t) => {
                        node.queue(name).set_next_timestamp_bound(Timestamp::Value(t))
                    }
                    Event::Close(name) => node.queue(name).close(),
                }
                node.handler.core().notify();
                node.handler.schedule_invocations(usize::MAX).unwrap();

                for invocation in node.take_invocations() {
                    match invocation {
                        Invocation::Process {
                            timestamp,
                            sync_set,
                            inputs,
                        } => {
                            let filled: Vec<_> = inputs.filled_ids().collect();
                            if sync_set == 0 {
                                audio_slots.push(inputs.packet_count());
                            }
                            stats.record_invocation(
                                sync_set,
                                timestamp,
                                inputs.packet_count(),
                                filled.len(),
                            );
                        }
                        Invocation::Close => stats.record_close(),
                    }
                }
            }
            (stats, audio_slots)
        });

        audio.await.unwrap();
        video.await.unwrap();
        let (stats, audio_slots) = scheduler.await.unwrap();

        assert!(stats.closed);
        assert_eq!(stats.invocations_of(0), 10);
        assert_eq!(stats.invocations_of(1), 4);
        // Audio packets arrive pairwise and are always delivered together.
        assert!(audio_slots.iter().all(|&n| n == 2));
        assert_eq!(stats.empty_slots, 0);
    }
}
