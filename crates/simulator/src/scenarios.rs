//! Built-in demonstration topologies.
//!
//! Times are in minutes of a working day.

use gpss_blocks::{
    Advance, Aggregate, Assign, Bifacility, Check, Facility, GenerationPolicy, Generator, Queue,
    Sink, Split, FACILITY_PARAM,
};
use gpss_core::Block;
use gpss_simulation::{BuildError, Pipeline, PipelineBuilder, SimulationConfig};
use gpss_types::{Parameter, Tick};
use std::fmt;

/// A topology the simulator can run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Scenario {
    /// One barber serving a waiting room.
    Barbershop,
    /// The barbershop with the barber's work modelled between the two halves
    /// of a bifacility.
    BarbershopBifacility,
    /// Orders split between a barista and a cook, then served together.
    Cafe,
    /// Ten office workers cycling through two toilets.
    WaterCloset,
    /// Hostesses, 24 tables, 8 waiters, a kitchen and a bar.
    Restaurant,
}

impl Scenario {
    pub const ALL: [Scenario; 5] = [
        Scenario::Barbershop,
        Scenario::BarbershopBifacility,
        Scenario::Cafe,
        Scenario::WaterCloset,
        Scenario::Restaurant,
    ];

    /// Length of the simulated working day.
    pub fn default_ticks(&self) -> Tick {
        match self {
            Scenario::WaterCloset => 540,
            _ => 480,
        }
    }

    /// Wire the scenario's blocks into a pipeline.
    pub fn build(&self, config: SimulationConfig) -> Result<Pipeline, BuildError> {
        match self {
            Scenario::Barbershop => barbershop(config),
            Scenario::BarbershopBifacility => barbershop_bifacility(config),
            Scenario::Cafe => cafe(config),
            Scenario::WaterCloset => water_closet(config),
            Scenario::Restaurant => restaurant(config),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scenario::Barbershop => "Barbershop",
            Scenario::BarbershopBifacility => "Barbershop (bifacility)",
            Scenario::Cafe => "Cafe",
            Scenario::WaterCloset => "Water closet",
            Scenario::Restaurant => "Restaurant",
        };
        f.write_str(name)
    }
}

fn boxed(block: impl Block) -> Box<dyn Block> {
    Box::new(block)
}

fn barbershop(config: SimulationConfig) -> Result<Pipeline, BuildError> {
    let mut b = PipelineBuilder::new("Barbershop").with_config(config);
    b.then(Generator::new("Clients", 18, 6))?;
    b.then(Queue::new("Chairs"))?;
    b.then(Facility::new("Master", 16, 4))?;
    b.then(Sink::new("Out"))?;
    b.build()
}

fn barbershop_bifacility(config: SimulationConfig) -> Result<Pipeline, BuildError> {
    let (master_in, master_out) = Bifacility::new("Master");
    let mut b = PipelineBuilder::new("Barbershop").with_config(config);
    b.then(Generator::new("Clients", 18, 6))?;
    b.then(Queue::new("Chairs"))?;
    b.then(master_in)?;
    b.then(Advance::new("Master work", 16, 4))?;
    b.then(master_out)?;
    b.then(Sink::new("Out"))?;
    b.build()
}

fn cafe(config: SimulationConfig) -> Result<Pipeline, BuildError> {
    let mut b = PipelineBuilder::new("Cafe").with_config(config);
    b.then(Generator::new("Visitors", 18, 6))?;
    b.then(Queue::new("Visitors queue"))?;
    b.then(Facility::new("Order acceptance", 5, 3))?;
    b.then(Split::new("Split orders", 1, 1))?;
    b.stage([
        boxed(Queue::new("Queue of orders to barista")),
        boxed(Queue::new("Queue of orders to cook")),
    ])?;
    let barista = b.add(Facility::new("Barista", 5, 2))?;
    let cook = b.add(Facility::new("Cook", 10, 5))?;
    let join = b.add(Aggregate::new("Aggregate orders"))?;
    let out = b.add(Sink::new("Out"))?;
    b.connect_by_name("Queue of orders to barista", &["Barista"])?;
    b.connect_by_name("Queue of orders to cook", &["Cook"])?;
    b.connect(barista, &[join])?;
    b.connect(cook, &[join])?;
    b.connect(join, &[out])?;
    b.build()
}

fn water_closet(config: SimulationConfig) -> Result<Pipeline, BuildError> {
    let mut b = PipelineBuilder::new("Water closet").with_config(config);
    b.then(
        Generator::new("Office", 0, 0)
            .with_count(10)
            .with_policy(GenerationPolicy::Burst { size: 10 }),
    )?;
    let wanted = b.then(Advance::new("Wanted to use the toilet", 90, 60))?;
    b.then(Advance::new("Path to WC", 5, 3))?;
    b.then(Queue::new("Queue to the WC"))?;
    b.stage([
        boxed(Facility::new("WC1", 15, 10)),
        boxed(Facility::new("WC2", 15, 10)),
    ])?;
    b.then(Advance::new("Path from WC", 5, 3))?;
    b.loop_to(wanted)?;
    b.build()
}

const TABLES: usize = 24;
const WAITERS: usize = 8;
const TABLES_PER_WAITER: usize = TABLES / WAITERS;
const MAX_WAITING: usize = 6;
const DISH_STATE: &str = "state";
const AFTER_KITCHEN: &str = "after kitchen";

fn table_name(table: usize) -> String {
    format!("Table {table}")
}

fn restaurant(config: SimulationConfig) -> Result<Pipeline, BuildError> {
    let mut b = PipelineBuilder::new("Restaurant").with_config(config);

    let visitors = b.add(Generator::new("Visitors", 10, 5))?;
    let out = b.add(Sink::new("Out"))?;
    let room = b.add(Check::with_predicate("Room in visitors queue", |_, ctx| {
        ctx.block_by_name("Visitors queue")
            .is_some_and(|queue| queue.held() < MAX_WAITING)
    }))?;
    let line = b.add(Queue::new("Visitors queue"))?;
    let free_table = b.add(Check::with_predicate("Free table", |_, ctx| {
        (1..=TABLES).any(|table| {
            ctx.block_by_name(&table_name(table))
                .is_some_and(|t| t.is_empty())
        })
    }))?;
    let hostesses = [
        b.add(Facility::new("Hostess 1", 5, 3))?,
        b.add(Facility::new("Hostess 2", 5, 3))?,
    ];

    let mut tables_in = Vec::with_capacity(TABLES);
    let mut tables_out = Vec::with_capacity(TABLES);
    for table in 1..=TABLES {
        let (table_in, table_out) = Bifacility::new(table_name(table));
        tables_in.push(b.add(table_in)?);
        tables_out.push(b.add(table_out)?);
    }

    let mut waiter_queues = Vec::with_capacity(WAITERS);
    let mut waiters = Vec::with_capacity(WAITERS);
    for waiter in 1..=WAITERS {
        waiter_queues.push(b.add(Queue::new(format!("Queue waiter {waiter}")))?);
        waiters.push(b.add(Facility::new(format!("Waiter {waiter}"), 5, 3))?);
    }

    let cooked = b.add(Check::new(
        "After kitchen?",
        vec![Parameter::set(DISH_STATE, AFTER_KITCHEN)],
    ))?;
    let dishes = b.add(Split::new("Selected dishes", 3, 2))?;
    let plated = b.add(Assign::new(
        "After kitchen",
        vec![Parameter::set(DISH_STATE, AFTER_KITCHEN)],
    ))?;

    let stations: [(&str, &[(&str, Tick, Tick)]); 5] = [
        (
            "Queue of orders to cook 1 (meat dishes)",
            &[("Cook 1 (meat dishes)", 15, 5)],
        ),
        (
            "Queue of orders to cook 2 (fish dishes)",
            &[("Cook 2 (sushi)", 7, 3)],
        ),
        (
            "Queue of orders to cook 3 (salads)",
            &[("Cook 3 (salads)", 10, 4)],
        ),
        (
            "Queue of orders to cook 4 (dessert)",
            &[("Cook 4 (dessert)", 20, 5)],
        ),
        (
            "Queue of orders to bar",
            &[("Barman 1", 4, 2), ("Barman 2", 4, 2)],
        ),
    ];
    let mut station_queues = Vec::with_capacity(stations.len());
    for (queue_name, cooks) in stations {
        let queue = b.add(Queue::new(queue_name))?;
        for &(name, interval, half_range) in cooks {
            let cook = b.add(Facility::new(name, interval, half_range))?;
            b.connect(queue, &[cook])?;
            b.connect(cook, &[plated])?;
        }
        station_queues.push(queue);
    }

    // Each waiter serves three consecutive tables
    let mut table_checks = Vec::with_capacity(WAITERS);
    for waiter in 0..WAITERS {
        let first = waiter * TABLES_PER_WAITER + 1;
        let served: Vec<String> = (first..first + TABLES_PER_WAITER).map(table_name).collect();
        let check = Check::with_predicate(
            format!("Is it order for table {}?", served.join(", ").replace("Table ", "")),
            move |t, _| {
                t.str_param(FACILITY_PARAM)
                    .is_some_and(|table| served.iter().any(|s| s == table))
            },
        );
        table_checks.push(b.add(check)?);
    }

    let eating = b.add(Advance::new("Visitors eating", 45, 10))?;
    let join = b.add(Aggregate::new("Aggregate dishes"))?;
    let pays = b.add(Advance::new("Visitors pays", 5, 2))?;

    b.connect(visitors, &[room])?;
    b.connect(room, &[line])?;
    b.set_fallback(room, out)?;
    b.connect(line, &[free_table])?;
    b.connect(free_table, &hostesses)?;
    for &hostess in &hostesses {
        b.connect(hostess, &tables_in)?;
    }
    for (i, &table) in tables_in.iter().enumerate() {
        b.connect(table, &[waiter_queues[i / TABLES_PER_WAITER]])?;
    }
    for (&queue, &waiter) in waiter_queues.iter().zip(&waiters) {
        b.connect(queue, &[waiter])?;
        b.connect(waiter, &[cooked])?;
    }
    b.connect(cooked, &[eating])?;
    b.set_fallback(cooked, dishes)?;
    b.connect(dishes, &station_queues)?;
    b.connect(plated, &table_checks)?;
    for (&check, &queue) in table_checks.iter().zip(&waiter_queues) {
        b.connect(check, &[queue])?;
    }
    b.connect(eating, &[join])?;
    b.connect(join, &[pays])?;
    b.connect(pays, &tables_out)?;
    for &table in &tables_out {
        b.connect(table, &[out])?;
    }
    b.build()
}
