//! The single-player session controller.
//!
//! Owns the clock, the RNG and the world for the lifetime of a session,
//! and is the only place speed changes and checkpoints happen.
//!
//! RULES:
//!   - Speed changes, saves and loads run between frames, never inside
//!     the tick loop.
//!   - The controller never edits production state. It only pushes ticks
//!     into the world.
//!   - Loading replaces clock, RNG and world wholesale.
//!   - Autosave failures are logged and swallowed. Quicksave and save
//!     failures are shown to the player. Neither stops the simulation.

use crate::{
    clock::{ClockSnapshot, SimulationClock},
    command::{CommandOutcome, PlayerCommand},
    config::SessionConfig,
    error::{SimError, SimResult},
    event::SimEvent,
    rng::SessionRng,
    services::{MessageKind, SavegameKind, Services},
    snapshot::{SessionSnapshot, SAVEGAME_VERSION},
    types::{RunId, Tick, WallTime},
    world::World,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuickloadOutcome {
    NoQuicksaves,
    Reloaded { path: String },
}

pub struct SessionController {
    config:        SessionConfig,
    services:      Services,
    run_id:        RunId,
    clock:         SimulationClock,
    rng:           SessionRng,
    world:         World,
    /// Speed to return to when unpausing.
    paused_speed:  u32,
    next_autosave: Option<WallTime>,
    event_log:     Vec<SimEvent>,
}

impl SessionController {
    /// Build a fresh session from config and start it right away.
    pub fn new_game(config: SessionConfig, services: Services) -> SimResult<Self> {
        config.validate()?;
        let settings = &config.settings;
        let rng = SessionRng::from_seed_or_default(settings.seed);
        let run_id = format!("session-{:x}", rng.seed());
        let clock = SimulationClock::new(
            settings.initial_ticks_per_second,
            settings.freeze_protection,
        );
        let paused_speed = settings.base_ticks_per_second;
        let world = World::from_config(&config.facilities)?;

        let mut session = Self {
            config,
            services,
            run_id,
            clock,
            rng,
            world,
            paused_speed,
            next_autosave: None,
            event_log: Vec::new(),
        };
        session.emit(SimEvent::SessionStarted {
            run_id: session.run_id.clone(),
            seed:   session.rng.seed(),
            tick:   session.clock.current_tick(),
        });
        session.start();
        log::info!("session: new game {} (seed {})", session.run_id, session.rng.seed());
        Ok(session)
    }

    pub fn run_id(&self) -> &str               { &self.run_id }
    pub fn clock(&self) -> &SimulationClock    { &self.clock }
    pub fn rng(&self) -> &SessionRng           { &self.rng }
    pub fn world(&self) -> &World              { &self.world }
    pub fn config(&self) -> &SessionConfig     { &self.config }
    pub fn services(&self) -> &Services        { &self.services }
    pub fn event_log(&self) -> &[SimEvent]     { &self.event_log }
    pub fn current_tick(&self) -> Tick         { self.clock.current_tick() }

    /// Host access to the world between frames (deliveries, production
    /// pause/resume).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Run one real-time frame: every tick that came due is applied in
    /// order, then the autosave schedule is checked. Returns the events
    /// of this frame.
    pub fn frame(&mut self) -> SimResult<Vec<SimEvent>> {
        let first = self.event_log.len();
        let now = self.services.wall.now();

        for tick in self.clock.poll(now) {
            let events = self.world.tick(tick, &mut self.rng, self.services.entities.as_mut())?;
            for event in events {
                log::debug!("tick={tick} {}", event.kind());
                self.event_log.push(event);
            }
        }

        if let Some(due) = self.next_autosave {
            if now >= due {
                self.autosave();
                self.next_autosave = Some(now + self.config.settings.autosave_interval_secs);
            }
        }

        Ok(self.event_log[first..].to_vec())
    }

    // ── Speed ──────────────────────────────────────────────────

    /// Set the game speed in ticks per second. 0 pauses.
    pub fn set_speed(&mut self, ticks: i64) -> SimResult<()> {
        let rate = u32::try_from(ticks).map_err(|_| SimError::InvalidSpeed { ticks })?;
        let now = self.services.wall.now();
        let change = self.clock.set_rate(rate, now);

        let base = self.config.settings.base_ticks_per_second;
        self.services.view.set_time_multiplier(f64::from(rate) / f64::from(base));
        self.services.ui.display_speed(rate);
        self.emit(SimEvent::SpeedChanged {
            tick: self.clock.current_tick(),
            old:  change.old,
            new:  change.new,
        });
        log::info!("session: speed {} -> {}", change.old, change.new);
        Ok(())
    }

    pub fn speed_is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    pub fn speed_pause(&mut self) -> SimResult<()> {
        if !self.speed_is_paused() {
            self.paused_speed = self.clock.ticks_per_second();
            self.set_speed(0)?;
        }
        Ok(())
    }

    pub fn speed_unpause(&mut self) -> SimResult<()> {
        if self.speed_is_paused() {
            self.set_speed(i64::from(self.paused_speed))?;
        }
        Ok(())
    }

    pub fn speed_toggle_pause(&mut self) -> SimResult<()> {
        if self.speed_is_paused() {
            self.speed_unpause()
        } else {
            self.speed_pause()
        }
    }

    /// Next faster preset. False when paused or already fastest.
    pub fn speed_up(&mut self) -> SimResult<bool> {
        if self.speed_is_paused() {
            return Ok(false);
        }
        let current = self.clock.ticks_per_second();
        let next = self.config.settings.tick_rates.iter().copied().find(|r| *r > current);
        match next {
            Some(rate) => self.set_speed(i64::from(rate)).map(|_| true),
            None => Ok(false),
        }
    }

    /// Next slower preset. False when paused or already slowest.
    pub fn speed_down(&mut self) -> SimResult<bool> {
        if self.speed_is_paused() {
            return Ok(false);
        }
        let current = self.clock.ticks_per_second();
        let next = self.config.settings.tick_rates.iter().rev().copied().find(|r| *r < current);
        match next {
            Some(rate) => self.set_speed(i64::from(rate)).map(|_| true),
            None => Ok(false),
        }
    }

    // ── Checkpoints ────────────────────────────────────────────

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            version: SAVEGAME_VERSION,
            run_id:  self.run_id.clone(),
            clock:   self.clock.snapshot(),
            rng:     self.rng.clone(),
            world:   self.world.clone(),
        }
    }

    /// Called on the autosave interval. Failures never reach the player.
    pub fn autosave(&mut self) -> bool {
        log::debug!("session: autosaving");
        let path = self.services.savegames.create_autosave_filename();
        if !self.do_save(&path, SavegameKind::Autosave) {
            return false;
        }
        self.cleanup(SavegameKind::Autosave);
        self.services.ui.post_message(MessageKind::Autosave);
        true
    }

    /// Called on the quicksave hotkey.
    pub fn quicksave(&mut self) -> bool {
        log::debug!("session: quicksaving");
        let path = self.services.savegames.create_quicksave_filename();
        if !self.do_save(&path, SavegameKind::Quicksave) {
            self.services.ui.show_error_popup(
                "Failed to quicksave.",
                "An error happened during quicksave. Your game has not been saved.",
                "If this error happens again, please report it together with your log file.",
            );
            return false;
        }
        self.cleanup(SavegameKind::Quicksave);
        self.services.ui.post_message(MessageKind::Quicksave);
        true
    }

    /// Reload the newest quicksave, if there is one.
    pub fn quickload(&mut self) -> SimResult<QuickloadOutcome> {
        let files = self.services.savegames.get_quicksaves()?;
        let Some(newest) = files.into_iter().next() else {
            self.services.ui.show_popup(
                "No quicksaves found",
                "You need to quicksave before you can quickload.",
            );
            return Ok(QuickloadOutcome::NoQuicksaves);
        };
        self.services.ui.close_transient();
        self.load(&newest)?;
        Ok(QuickloadOutcome::Reloaded { path: newest })
    }

    /// Save under `name`, or ask the player for one. Returns whether no
    /// error happened; an aborted name prompt counts as success.
    pub fn save(&mut self, name: Option<&str>) -> bool {
        let name = match name {
            Some(name) => name.to_string(),
            None => match self.services.ui.prompt_savegame_name() {
                Some(name) => name,
                None => return true,
            },
        };
        let path = self.services.savegames.create_filename(&name);

        if !self.do_save(&path, SavegameKind::Regular) {
            self.services.ui.show_error_popup(
                "Failed to save.",
                "An error happened while saving. Your game has not been saved.",
                "Try another savegame name or free some disk space.",
            );
            return false;
        }
        self.services.ui.post_message(MessageKind::SavedGame);
        true
    }

    /// Replace the whole session with the checkpoint at `path`. A loaded
    /// single-player game resumes right away.
    pub fn load(&mut self, path: &str) -> SimResult<()> {
        let snapshot = self.services.savegames.read_savegame(path)?;
        let settings = &self.config.settings;

        let mut clock_state: ClockSnapshot = snapshot.clock;
        if clock_state.ticks_per_second == 0 {
            // A session configured to open paused still resumes on load.
            clock_state.ticks_per_second = match settings.initial_ticks_per_second {
                0 => settings.base_ticks_per_second,
                rate => rate,
            };
        }
        self.run_id = snapshot.run_id;
        self.clock = SimulationClock::restore(&clock_state, settings.freeze_protection);
        self.rng = snapshot.rng;
        self.world = snapshot.world;
        self.paused_speed = settings.base_ticks_per_second;

        self.emit(SimEvent::GameLoaded {
            tick: self.clock.current_tick(),
            path: path.to_string(),
        });
        log::info!("session: loaded {path} at tick {}", self.clock.current_tick());
        self.start();
        Ok(())
    }

    /// Dispatch a player command.
    pub fn apply(&mut self, command: &PlayerCommand) -> SimResult<CommandOutcome> {
        let changed = |ok: bool| if ok { CommandOutcome::Done } else { CommandOutcome::Unchanged };
        let saved = |ok: bool| if ok { CommandOutcome::Done } else { CommandOutcome::SaveFailed };

        Ok(match command {
            PlayerCommand::Pause              => { self.speed_pause()?; CommandOutcome::Done }
            PlayerCommand::Resume             => { self.speed_unpause()?; CommandOutcome::Done }
            PlayerCommand::TogglePause        => { self.speed_toggle_pause()?; CommandOutcome::Done }
            PlayerCommand::SetSpeed { ticks } => { self.set_speed(*ticks)?; CommandOutcome::Done }
            PlayerCommand::SpeedUp            => changed(self.speed_up()?),
            PlayerCommand::SpeedDown          => changed(self.speed_down()?),
            PlayerCommand::Autosave           => saved(self.autosave()),
            PlayerCommand::Quicksave          => saved(self.quicksave()),
            PlayerCommand::Save { name }      => saved(self.save(name.as_deref())),
            PlayerCommand::Quickload => match self.quickload()? {
                QuickloadOutcome::NoQuicksaves      => CommandOutcome::NoQuicksaves,
                QuickloadOutcome::Reloaded { path } => CommandOutcome::Loaded { path },
            },
            PlayerCommand::Load { path } => {
                self.load(path)?;
                CommandOutcome::Loaded { path: path.clone() }
            }
        })
    }

    // ── Internals ──────────────────────────────────────────────

    /// Start the clock and the autosave schedule at the current time.
    fn start(&mut self) {
        let now = self.services.wall.now();
        self.clock.start(now);
        let interval = self.config.settings.autosave_interval_secs;
        self.next_autosave = (interval > 0.0).then_some(now + interval);

        let rate = self.clock.ticks_per_second();
        let base = self.config.settings.base_ticks_per_second;
        self.services.view.set_time_multiplier(f64::from(rate) / f64::from(base));
        self.services.ui.display_speed(rate);
    }

    fn do_save(&mut self, path: &str, kind: SavegameKind) -> bool {
        let snapshot = self.snapshot();
        match self.services.savegames.write_savegame(path, &snapshot) {
            Ok(()) => {
                log::info!("session: saved {path} at tick {}", snapshot.clock.current_tick);
                self.emit(SimEvent::GameSaved {
                    tick: snapshot.clock.current_tick,
                    kind,
                    path: path.to_string(),
                });
                true
            }
            Err(e) => {
                log::error!("session: saving {path} failed: {e}");
                false
            }
        }
    }

    fn cleanup(&mut self, kind: SavegameKind) {
        if let Err(e) = self.services.savegames.delete_dispensable_savegames(kind) {
            log::warn!("session: could not rotate {} savegames: {e}", kind.as_str());
        }
    }

    fn emit(&mut self, event: SimEvent) {
        self.event_log.push(event);
    }
}
