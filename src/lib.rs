mod config;
pub mod entities;
pub mod persistence;
pub mod telemetry;
pub mod world;

pub use config::{AppConfig, Command};
pub use persistence::store::{SqliteStore, StoreError, WorldStore};
pub use world::state::WorldState;

use persistence::autosave::{autosave_world, AutosaveConfig, AutosaveReport, AutosaveState};
use persistence::house_info::load_house_info;
use persistence::map_serialize::load_house_items;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use world::access_list::CachedNameResolver;

const DECAY_TICK: Duration = Duration::from_secs(1);

pub fn run(args: &[String]) -> Result<(), String> {
    let config = AppConfig::from_args(args)?;
    telemetry::logging::init(&config.root)?;
    let mut world = WorldState::load(&config.root)?;
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|err| format!("save directory create failed: {}", err))?;
    }
    let mut store = SqliteStore::open(&config.db_path)
        .map_err(|err| format!("open {} failed: {}", config.db_path.display(), err))?;

    let info = {
        let mut resolver = CachedNameResolver::new(store.name_resolver());
        let info = load_house_info(&store, &mut world.houses, &mut resolver)
            .map_err(|err| format!("house info load failed: {}", err))?;
        let stats = resolver.stats();
        telemetry::logging::log_game(&format!(
            "name lookups: hits={}, misses={}",
            stats.hits, stats.misses
        ));
        info
    };
    let items = load_house_items(&store, &mut world)
        .map_err(|err| format!("house item load failed: {}", err))?;

    println!("tibia: house store");
    println!("- root: {}", config.root.display());
    println!("- database: {}", config.db_path.display());
    println!("- item types: {}", world.item_types.len());
    println!("- map '{}': tiles={}", world.map.name, world.map.tile_count());
    println!(
        "- houses: {} (stored={}, lists={}, unknown={})",
        world.houses.len(),
        info.houses,
        info.lists,
        info.unknown_houses
    );
    println!(
        "- house items: rows={}, skipped={}, failed={}, created={}, matched={}, discarded={}",
        items.rows,
        items.skipped_rows,
        items.failed_rows,
        items.items.created,
        items.matched,
        items.items.discarded
    );
    println!("- bed sleepers: {}", world.sleeper_count());
    println!("- decaying items: {}", world.decaying_count());

    match config.command {
        Command::Check => Ok(()),
        Command::Resave => report_save(&autosave_world(&world, &mut store)),
        Command::Serve => serve(
            &mut world,
            &mut store,
            AutosaveConfig {
                interval_seconds: config.autosave_seconds,
            },
        ),
    }
}

/// Ticks decay and autosaves until stdin reaches end of file or reads `quit`,
/// then saves one last time.
fn serve(
    world: &mut WorldState,
    store: &mut dyn WorldStore,
    autosave: AutosaveConfig,
) -> Result<(), String> {
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
    std::thread::spawn(move || {
        let mut line = String::new();
        loop {
            line.clear();
            match std::io::stdin().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) if line.trim() == "quit" => break,
                Ok(_) => {}
            }
        }
        let _ = shutdown_tx.send(());
    });

    println!("tibia: serving; type 'quit' or close stdin to stop");
    let mut state = AutosaveState::new(autosave, Instant::now());
    let mut last_tick = Instant::now();
    loop {
        let wait = state
            .until_due(Instant::now())
            .map_or(DECAY_TICK, |left| left.min(DECAY_TICK));
        match shutdown_rx.recv_timeout(wait) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
        }

        let now = Instant::now();
        let elapsed = now.duration_since(last_tick);
        last_tick = now;
        let finished = world.process_decay(elapsed.as_millis() as i64);
        if finished > 0 {
            telemetry::logging::log_game(&format!("{} item(s) finished decaying", finished));
        }
        if state.due(now) {
            if let Err(err) = report_save(&autosave_world(world, store)) {
                eprintln!("tibia: {}", err);
            }
            state.mark_saved(now);
        }
    }

    println!("tibia: shutting down");
    report_save(&autosave_world(world, store))
}

fn report_save(report: &AutosaveReport) -> Result<(), String> {
    match &report.house_info {
        Ok(info) => println!("- saved houses: {}, lists: {}", info.houses, info.lists),
        Err(err) => eprintln!("tibia: house info save failed: {}", err),
    }
    match &report.house_items {
        Ok(items) => println!(
            "- saved house tiles: {}, items: {}, bytes: {}",
            items.tiles, items.items, items.bytes
        ),
        Err(err) => eprintln!("tibia: house item save failed: {}", err),
    }
    if report.is_ok() {
        Ok(())
    } else {
        telemetry::logging::log_error("save finished with errors");
        Err("save failed".to_string())
    }
}
