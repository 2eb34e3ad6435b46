//! End-to-end pipeline runs.

use gpss_blocks::{
    Advance, Aggregate, Assign, Bifacility, Check, Facility, Generator, Queue, Sink, Split,
};
use gpss_core::{Block, BlockStats, CheckStats, FacilityStats, GeneratorStats, SinkStats};
use gpss_simulation::{
    Pipeline, PipelineBuilder, PipelineReport, SimulationConfig, SimulationError, TickMode,
};
use gpss_types::{BlockId, Parameter, Tick, TransactionId};
use std::sync::Arc;
use std::time::Duration;

fn builder(name: &str, mode: TickMode) -> PipelineBuilder {
    PipelineBuilder::new(name).with_config(SimulationConfig::new(7).with_mode(mode))
}

fn sink_stats(report: &PipelineReport, name: &str) -> SinkStats {
    match report.block(name).map(|b| &b.stats) {
        Some(BlockStats::Sink(stats)) => stats.clone(),
        other => panic!("{name}: unexpected stats {other:?}"),
    }
}

fn facility_stats(report: &PipelineReport, name: &str) -> FacilityStats {
    match report.block(name).map(|b| &b.stats) {
        Some(BlockStats::Facility(stats)) => stats.clone(),
        other => panic!("{name}: unexpected stats {other:?}"),
    }
}

fn generator_stats(report: &PipelineReport, name: &str) -> GeneratorStats {
    match report.block(name).map(|b| &b.stats) {
        Some(BlockStats::Generator(stats)) => stats.clone(),
        other => panic!("{name}: unexpected stats {other:?}"),
    }
}

fn sink(pipeline: &Pipeline, id: BlockId) -> &Sink {
    pipeline.block_as::<Sink>(id).expect("sink")
}

#[test]
fn test_fixed_interval_births() {
    for mode in [TickMode::Sequential, TickMode::Parallel] {
        let mut b = builder("births", mode);
        b.then(Generator::new("clients", 10, 0).with_count(3)).unwrap();
        let out = b.then(Sink::new("out")).unwrap();
        let pipeline = b.build().unwrap();

        let report = pipeline.run(50).unwrap();
        let terminated = sink(&pipeline, out).terminated();
        let births: Vec<Tick> = terminated.iter().map(|t| t.born()).collect();
        assert_eq!(births, vec![10, 20, 30]);
        assert!(terminated.iter().all(|t| t.life() == Some(0)));

        let stats = generator_stats(&report, "clients");
        assert_eq!(stats.generated, 3);
        assert_eq!(stats.next_birth, None);
        assert_eq!(sink_stats(&report, "out").killed, 3);
    }
}

#[test]
fn test_conservation_through_service() {
    let mut b = builder("conservation", TickMode::Parallel);
    b.then(Generator::new("clients", 3, 2).with_count(20)).unwrap();
    b.then(Queue::new("line")).unwrap();
    b.then(Facility::new("desk", 2, 1)).unwrap();
    b.then(Sink::new("out")).unwrap();
    let report = b.build().unwrap().run(500).unwrap();

    let generated = generator_stats(&report, "clients").generated;
    assert_eq!(generated, 20);
    assert_eq!(sink_stats(&report, "out").killed, generated);
    assert_eq!(report.transactions, 20);
}

#[test]
fn test_saturated_facility_utilization() {
    let mut b = builder("saturated", TickMode::Sequential);
    b.then(Generator::new("clients", 1, 0)).unwrap();
    b.then(Queue::new("line")).unwrap();
    b.then(Facility::new("barber", 5, 0)).unwrap();
    b.then(Sink::new("out")).unwrap();
    let report = b.build().unwrap().run(100).unwrap();

    let stats = facility_stats(&report, "barber");
    assert_eq!(stats.average_service, Some(5.0));
    let utilization = stats.utilization_percent.unwrap();
    assert!((95.0..=100.0).contains(&utilization), "{utilization}");
}

#[test]
fn test_queue_serves_in_arrival_order() {
    let mut b = builder("fifo", TickMode::Sequential);
    b.then(Generator::new("clients", 1, 0).with_count(10)).unwrap();
    b.then(Queue::new("line")).unwrap();
    b.then(Facility::new("barber", 3, 0)).unwrap();
    let out = b.then(Sink::new("out")).unwrap();
    let pipeline = b.build().unwrap();
    pipeline.run(100).unwrap();

    let ids: Vec<TransactionId> = sink(&pipeline, out)
        .terminated()
        .iter()
        .map(|t| t.id())
        .collect();
    assert_eq!(ids, (1..=10).map(TransactionId).collect::<Vec<_>>());
}

#[test]
fn test_contended_facility_admits_one_at_a_time() {
    let mut b = builder("contended", TickMode::Parallel);
    let generators = b
        .stage((0..5).map(|i| {
            Box::new(Generator::new(format!("g{i}"), 1, 0)) as Box<dyn Block>
        }))
        .unwrap();
    let desk = b.then(Facility::new("desk", 2, 0)).unwrap();
    b.then(Sink::new("out")).unwrap();
    let pipeline = b.build().unwrap();
    let report = pipeline.run(100).unwrap();

    let mut generated = 0;
    for i in 0..generators.len() {
        let stats = generator_stats(&report, &format!("g{i}"));
        // Births on ticks 1..=99, each either placed or lost
        assert_eq!(stats.generated + stats.lost, 99);
        generated += stats.generated;
    }
    let facility = facility_stats(&report, "desk");
    assert_eq!(facility.entries, generated);
    let held = pipeline.block(desk).unwrap().held() as u64;
    assert!(held <= 1);
    assert_eq!(sink_stats(&report, "out").killed + held, facility.entries);
}

#[test]
fn test_split_aggregate_round_trip() {
    let mut b = builder("cafe", TickMode::Parallel);
    b.then(Generator::new("orders", 5, 0).with_count(4)).unwrap();
    b.then(Split::new("kitchen", 3, 0)).unwrap();
    b.stage([
        Box::new(Advance::new("drink", 2, 0)) as Box<dyn Block>,
        Box::new(Advance::new("salad", 4, 0)),
        Box::new(Advance::new("steak", 7, 0)),
    ])
    .unwrap();
    let join = b.then(Aggregate::new("tray")).unwrap();
    let out = b.then(Sink::new("out")).unwrap();
    let pipeline = b.build().unwrap();
    let report = pipeline.run(60).unwrap();

    let served = sink(&pipeline, out).terminated();
    assert_eq!(served.len(), 4);
    assert!(served.iter().all(|t| t.advance() == 7 && t.parts().is_none()));
    assert_eq!(sink_stats(&report, "out").average_advance, Some(7.0));
    assert!(pipeline.block(join).unwrap().is_empty());
    // Four parents and twelve fragments
    assert_eq!(report.transactions, 16);
}

#[test]
fn test_cycle_through_check_fallback() {
    let mut b = builder("laps", TickMode::Sequential);
    b.then(Generator::new("runners", 2, 0).with_count(5)).unwrap();
    let line = b.then(Queue::new("line")).unwrap();
    b.then(Advance::new("lap", 1, 0)).unwrap();
    let check = b
        .then(Check::new("finished", vec![Parameter::set("laps", "done")]))
        .unwrap();
    b.then(Sink::new("out")).unwrap();
    let again = b
        .add(Assign::new("mark", vec![Parameter::set("laps", "done")]))
        .unwrap();
    b.set_fallback(check, again).unwrap();
    b.connect(again, &[line]).unwrap();
    let report = b.build().unwrap().run(100).unwrap();

    let out = sink_stats(&report, "out");
    assert_eq!(out.killed, 5);
    assert_eq!(out.average_advance, Some(2.0));
    match &report.block("finished").unwrap().stats {
        BlockStats::Check(CheckStats {
            true_outcomes,
            false_outcomes,
            ..
        }) => {
            assert_eq!(*true_outcomes, 5);
            assert_eq!(*false_outcomes, 5);
        }
        other => panic!("unexpected stats {other:?}"),
    }
}

#[test]
fn test_bifacility_barbershop_holds_one_client() {
    let mut b = builder("barbershop", TickMode::Parallel);
    b.then(Generator::new("clients", 18, 6)).unwrap();
    let chairs = b.then(Queue::new("chairs")).unwrap();
    let (master_in, master_out) = Bifacility::new("master");
    let master = b.then(master_in).unwrap();
    let work = b.then(Advance::new("work", 16, 4)).unwrap();
    b.then(master_out).unwrap();
    b.then(Sink::new("out")).unwrap();
    let pipeline = b.build().unwrap();
    let report = pipeline.run(480).unwrap();

    let held = |id: BlockId| pipeline.block(id).unwrap().held() as u64;
    let generated = generator_stats(&report, "clients").generated;
    let killed = sink_stats(&report, "out").killed;
    assert!(held(master) <= 1);
    assert!(held(work) <= 1);
    assert_eq!(killed + held(chairs) + held(work), generated);
    assert!(killed > 0);
}

#[test]
fn test_sequential_runs_are_reproducible() {
    let run = || {
        let mut b = builder("repro", TickMode::Sequential);
        b.then(Generator::new("clients", 4, 3)).unwrap();
        b.then(Queue::new("line")).unwrap();
        b.then(Facility::new("desk", 3, 2)).unwrap();
        b.then(Sink::new("out")).unwrap();
        b.build().unwrap().run(300).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_sink_kills_once() {
    let mut b = builder("kill", TickMode::Sequential);
    let out = b.add(Sink::new("out")).unwrap();
    let pipeline = b.build().unwrap();

    let t = pipeline.new_transaction();
    assert!(pipeline.inject(out, &t).unwrap());
    assert!(pipeline.inject(out, &t).unwrap());
    let mut dead = pipeline.new_transaction();
    assert!(dead.kill(0));
    assert!(pipeline.inject(out, &dead).unwrap());

    assert_eq!(sink(&pipeline, out).killed(), 1);
    let rip = sink(&pipeline, out).terminated()[0].rip();
    assert_eq!(rip, Some(0));
}

#[tokio::test]
async fn test_background_run_stops_at_tick_boundary() {
    let mut b = builder("endless", TickMode::Parallel);
    b.then(Generator::new("clients", 1, 0)).unwrap();
    b.then(Sink::new("out")).unwrap();
    let pipeline = Arc::new(b.build().unwrap());

    let mut handle = pipeline.start(Tick::MAX).unwrap();
    let mut done = handle.done();
    assert!(!*done.borrow());
    while handle.pipeline().now() < 10 {
        tokio::task::yield_now().await;
    }
    handle.stop();
    handle.finished().await;
    assert!(*done.borrow_and_update());

    let report = handle.wait().unwrap();
    assert!(report.stopped);
    assert!(report.ticks >= 10);
    let killed = sink_stats(&report, "out").killed;
    assert_eq!(killed, generator_stats(&report, "clients").generated);
    assert!(pipeline.start(10).is_err());
}

#[tokio::test]
async fn test_panicking_block_finishes_with_error() {
    let mut b = builder("faulty", TickMode::Sequential);
    b.then(Generator::new("clients", 1, 0)).unwrap();
    b.then(Check::with_predicate("broken", |_, _| panic!("malformed parameter")))
        .unwrap();
    b.then(Sink::new("out")).unwrap();
    let pipeline = Arc::new(b.build().unwrap());

    let mut handle = pipeline.start(100).unwrap();
    let finished = tokio::time::timeout(Duration::from_secs(5), handle.finished()).await;
    assert!(finished.is_ok());
    assert!(handle.is_done());
    assert!(matches!(handle.wait(), Err(SimulationError::WorkerPanicked)));
}
