//! Vehicle — ownership chains and possession transfer.
//!
//! A player climbs into a tank that carries a turret. The turret never changes
//! its own owner, yet it hears about every change above it. When the player
//! climbs out, the tank goes back to the depot it came from.
//!
//! Run with: `RUST_LOG=debug cargo run -p troupe --example vehicle`

use std::rc::Rc;

use troupe::prelude::*;

trait Engine {
    fn horsepower(&self) -> u32;
}

struct DieselEngine;

impl Engine for DieselEngine {
    fn horsepower(&self) -> u32 {
        750
    }
}

impl Component for DieselEngine {
    fn expose(this: &Rc<Self>, caps: &mut Capabilities<'_>) {
        caps.provide::<dyn Engine>(this.clone());
    }
}

/// Needs an engine, optionally drives a horn.
#[derive(Default)]
struct Drivetrain {
    engine: Inject<dyn Engine>,
    horn: Inject<Horn>,
}

struct Horn;

impl Component for Horn {}

impl Injectable for Drivetrain {
    fn bindings(&self) -> Vec<Binding<'_>> {
        vec![Binding::required(&self.engine), Binding::optional(&self.horn)]
    }
}

impl Component for Drivetrain {
    fn start(&self, actor: &Rc<Actor>) {
        let report = DependencyInjector::inject(self, actor);
        if let Some(engine) = self.engine.get() {
            log::info!(
                "{} drivetrain ready: {} hp, horn: {}",
                actor.uuid(),
                engine.horsepower(),
                self.horn.is_bound()
            );
        }
        log::debug!("{report:?}");
    }
}

fn watch(actor: &Actor) {
    let name = actor.uuid();
    actor.events().on(move |event: &Owned| -> HandlerResult {
        log::info!("{name}: owned (direct owner {})", event.owner);
        Ok(())
    });
    let name = actor.uuid();
    actor.events().on(move |_: &Unowned| -> HandlerResult {
        log::info!("{name}: unowned");
        Ok(())
    });
    let name = actor.uuid();
    actor.events().on(move |event: &AnyOwnerChanged| -> HandlerResult {
        log::info!("{name}: chain changed at {}", event.origin);
        Ok(())
    });
}

fn main() -> Result<(), RuntimeError> {
    let config = RuntimeConfig {
        log_filter: Some("info".into()),
        ..RuntimeConfig::default()
    };
    init_logger(&config);
    let stage = Stage::new(config);

    let depot = stage.spawn("depot").build();
    let possession = Rc::new(PossessionTransfer::new());
    let tank = stage
        .spawn("tank")
        .with(DieselEngine)
        .with(Drivetrain::default())
        .with_shared(possession.clone())
        .at(Transform::from_xyz(10.0, 0.0, -4.0))
        .build();
    let turret = stage.spawn("turret").build();
    let player = stage.spawn("player").build();

    turret.set_owner(&tank)?;
    tank.set_owner(&depot)?;
    watch(&tank);
    watch(&turret);

    log::info!("-- player climbs in");
    possession.transfer_to(&player)?;
    log::info!("turret chain: {:?}", names(&turret.owner_chain()));

    log::info!("-- player climbs out");
    tank.give_back_ownership()?;
    log::info!("turret chain: {:?}", names(&turret.owner_chain()));

    let items = stage.items();
    items.register_item("Tank", tank.clone());
    log::info!("items: {:?}", items.ids());
    Ok(())
}

fn names(actors: &[Rc<Actor>]) -> Vec<String> {
    actors.iter().map(|actor| actor.uuid()).collect()
}
