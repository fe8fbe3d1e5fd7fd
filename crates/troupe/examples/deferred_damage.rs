//! Deferred Damage — queued events drained once per tick.
//!
//! Three hits are queued before the first tick. Armor splits heavy hits into
//! a follow-up hit of the same type, which is still delivered within the same
//! tick. A faulty listener fails on every hit without stopping the others.
//!
//! Run with: `cargo run -p troupe --example deferred_damage`

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use troupe::prelude::*;

#[derive(Debug, Clone, Copy)]
struct Damage {
    amount: u32,
}

#[derive(Debug)]
struct Broken;

impl std::fmt::Display for Broken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("damage meter is broken")
    }
}

impl std::error::Error for Broken {}

fn main() {
    let config = RuntimeConfig {
        log_filter: Some("info".into()),
        ..RuntimeConfig::default()
    };
    init_logger(&config);
    let stage = Stage::new(config);
    let health = Rc::new(Observable::new("health", 100_i32));
    let _bar = health.subscribe(|hp| log::info!("health bar: {hp}"));

    let bus = Rc::downgrade(stage.events());
    stage.events().on(move |hit: &Damage| -> HandlerResult {
        if hit.amount > 20 {
            if let Some(bus) = bus.upgrade() {
                log::info!("armor splits {} into two hits", hit.amount);
                bus.publish(Damage { amount: hit.amount / 2 });
            }
        }
        Ok(())
    });

    let hp = health.clone();
    stage.events().on(move |hit: &Damage| -> HandlerResult {
        if hit.amount <= 20 {
            hp.set(hp.get() - hit.amount as i32);
        }
        Ok(())
    });

    let attempts = Rc::new(Cell::new(0));
    let a = attempts.clone();
    stage.events().on(move |_: &Damage| -> HandlerResult {
        a.set(a.get() + 1);
        Err(Broken.into())
    });

    for amount in [5, 40, 10] {
        stage.events().publish(Damage { amount });
    }

    let report = stage.tick(Duration::from_millis(16));
    log::info!(
        "tick 1: {} events, {} failures, meter tried {} times",
        report.delivered,
        report.failures,
        attempts.get()
    );

    let report = stage.tick(Duration::from_millis(16));
    log::info!("tick 2: {} events, health {}", report.delivered, health.get());
}
