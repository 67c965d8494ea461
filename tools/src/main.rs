//! outpost-runner: headless session runner for Outpost.
//!
//! Usage:
//!   outpost-runner --seed 12345 --seconds 120 --db saves.db
//!   outpost-runner --seed 12345 --seconds 30 --realtime
//!   outpost-runner --seed 12345 --ipc-mode
//!
//! Batch mode steps a manual wall clock at a fixed frame rate, or the
//! host clock with --realtime. IPC mode
//! reads one JSON command per line from stdin and answers each with a
//! state line on stdout.

use anyhow::Result;
use outpost_core::{
    command::{CommandOutcome, PlayerCommand},
    config::SessionConfig,
    error::SimResult,
    event::SimEvent,
    inventory::ResourceAmounts,
    production::{ProductionState, UnitTemplate},
    services::{
        EntityFactory, ManualWallClock, MessageKind, Services, SystemWallClock, UiService,
        ViewService, WallClock,
    },
    session::SessionController,
    store::{Retention, SqliteSavegameStore},
    types::{EntityId, Tick, TilePos},
};
use std::env;
use std::io::{self, BufRead, Write};
use std::time::Duration;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcRequest {
    GetState,
    /// Advance the wall clock by `seconds` and run the frame.
    Frame { seconds: f64 },
    Command { command: PlayerCommand },
    Quit,
}

#[derive(serde::Serialize)]
struct FacilityState {
    id:          String,
    inventory:   ResourceAmounts,
    productions: Vec<LineState>,
}

#[derive(serde::Serialize)]
struct LineState {
    id:       String,
    state:    ProductionState,
    progress: f64,
}

#[derive(serde::Serialize)]
struct UiState {
    tick:             Tick,
    ticks_per_second: u32,
    paused:           bool,
    units:            usize,
    facilities:       Vec<FacilityState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome:          Option<CommandOutcome>,
    events:           Vec<SimEvent>,
}

// ── Headless services ──────────────────────────────────────────

struct LogUi;

impl UiService for LogUi {
    fn post_message(&mut self, kind: MessageKind) {
        log::info!("ui: message {kind:?}");
    }
    fn show_error_popup(&mut self, headline: &str, description: &str, advice: &str) {
        log::error!("ui: {headline} {description} {advice}");
    }
    fn show_popup(&mut self, headline: &str, message: &str) {
        log::warn!("ui: {headline}: {message}");
    }
    fn prompt_savegame_name(&mut self) -> Option<String> {
        // Nobody to ask; IPC callers pass a name with the save command.
        None
    }
    fn close_transient(&mut self) {}
    fn display_speed(&mut self, ticks_per_second: u32) {
        log::debug!("ui: speed {ticks_per_second}");
    }
}

struct LogView;

impl ViewService for LogView {
    fn set_time_multiplier(&mut self, multiplier: f64) {
        log::debug!("view: time multiplier {multiplier:.2}");
    }
}

/// Units only exist in the roster; there is no scene to place them in.
struct RosterOnly;

impl EntityFactory for RosterOnly {
    fn create(&mut self, id: &EntityId, template: &UnitTemplate, at: TilePos) -> SimResult<()> {
        log::debug!("entities: {id} ({}) at {},{}", template.template_id, at.x, at.y);
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = args
        .windows(2)
        .find(|w| w[0] == "--seed")
        .and_then(|w| w[1].parse::<u64>().ok());
    let seconds = parse_arg(&args, "--seconds", 60.0f64);
    let fps = parse_arg(&args, "--fps", 30u32).max(1);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let realtime = !ipc_mode && args.iter().any(|a| a == "--realtime");
    let db = str_arg(&args, "--db", ":memory:");
    let data_dir = str_arg(&args, "--data-dir", "./data");

    let mut config = SessionConfig::load(data_dir)?;
    if seed.is_some() {
        config.settings.seed = seed;
    }

    if !ipc_mode {
        println!("Outpost: outpost-runner");
        println!("  seed:      {}", config.settings.seed.map_or("default".into(), |s| s.to_string()));
        println!("  seconds:   {seconds}");
        println!("  fps:       {fps}");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let retention = Retention::from(&config.settings);
    let store = if db == ":memory:" {
        SqliteSavegameStore::in_memory(retention)?
    } else {
        SqliteSavegameStore::open(db, retention)?
    };

    let wall = ManualWallClock::new(0.0);
    let host_clock: Box<dyn WallClock> = if realtime {
        Box::new(SystemWallClock::new())
    } else {
        Box::new(wall.clone())
    };
    let services = Services {
        savegames: Box::new(store),
        ui:        Box::new(LogUi),
        view:      Box::new(LogView),
        entities:  Box::new(RosterOnly),
        wall:      host_clock,
    };
    let mut session = SessionController::new_game(config, services)?;

    if ipc_mode {
        run_ipc_loop(&mut session, &wall)?;
    } else {
        let frame = 1.0 / f64::from(fps);
        let frames = (seconds * f64::from(fps)).ceil() as u64;
        for _ in 0..frames {
            if realtime {
                std::thread::sleep(Duration::from_secs_f64(frame));
            } else {
                wall.advance(frame);
            }
            session.frame()?;
        }
        print_summary(&session, seconds);
    }

    Ok(())
}

fn run_ipc_loop(session: &mut SessionController, wall: &ManualWallClock) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let request: IpcRequest = match serde_json::from_str(&buffer) {
            Ok(r) => r,
            Err(e) => {
                reply_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };

        let state = match request {
            IpcRequest::Quit => break,
            IpcRequest::GetState => build_ui_state(session, None, Vec::new()),
            IpcRequest::Frame { seconds } => {
                wall.advance(seconds.max(0.0));
                let events = session.frame()?;
                build_ui_state(session, None, events)
            }
            IpcRequest::Command { command } => {
                let first = session.event_log().len();
                match session.apply(&command) {
                    Ok(outcome) => {
                        let events = session.event_log()[first..].to_vec();
                        build_ui_state(session, Some(outcome), events)
                    }
                    Err(e) => {
                        log::warn!("ipc: {command:?} rejected: {e}");
                        reply_error(&mut stdout, &e.to_string())?;
                        continue;
                    }
                }
            }
        };
        writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn reply_error(stdout: &mut io::Stdout, message: &str) -> Result<()> {
    let err_json = serde_json::json!({ "error": message });
    writeln!(stdout, "{err_json}")?;
    stdout.flush()?;
    Ok(())
}

fn build_ui_state(
    session: &SessionController,
    outcome: Option<CommandOutcome>,
    events: Vec<SimEvent>,
) -> UiState {
    let facilities = session
        .world()
        .facilities()
        .iter()
        .map(|f| FacilityState {
            id:        f.id().to_string(),
            inventory: f.inventory().amounts().clone(),
            productions: f
                .productions()
                .iter()
                .map(|p| LineState {
                    id:       p.id().to_string(),
                    state:    p.state(),
                    progress: p.progress(),
                })
                .collect(),
        })
        .collect();

    UiState {
        tick:             session.current_tick(),
        ticks_per_second: session.clock().ticks_per_second(),
        paused:           session.speed_is_paused(),
        units:            session.world().roster().len(),
        facilities,
        outcome,
        events,
    }
}

fn print_summary(session: &SessionController, seconds: f64) {
    let log = session.event_log();
    let count = |kind: &str| log.iter().filter(|e| e.kind() == kind).count();

    println!("=== RUN SUMMARY ===");
    println!("  run_id:          {}", session.run_id());
    println!("  seconds run:     {seconds}");
    println!("  final tick:      {}", session.current_tick());
    println!("  completions:     {}", count("production_completed"));
    println!("  failed delivery: {}", count("delivery_failed"));
    println!("  units spawned:   {}", session.world().roster().len());
    println!("  saves:           {}", count("game_saved"));

    println!();
    println!("=== FACILITIES ===");
    for facility in session.world().facilities() {
        let stock: Vec<String> = facility
            .inventory()
            .amounts()
            .iter()
            .map(|(res, qty)| format!("{res}={qty}"))
            .collect();
        println!("  {:<12} | {}", facility.id(), stock.join(", "));
        for unit in facility.productions() {
            println!(
                "    {:<10} {:?} ({:.0}%, {} done)",
                unit.id(),
                unit.state(),
                unit.progress() * 100.0,
                unit.completions()
            );
        }
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn str_arg<'a>(args: &'a [String], flag: &str, default: &'a str) -> &'a str {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .unwrap_or(default)
}
