//! Shared harness for the session integration tests.
//!
//! The session owns its services as trait objects, so every double here
//! keeps its record behind an Rc that the test holds on to as well.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use outpost_core::{
    config::SessionConfig,
    error::{SimError, SimResult},
    event::SimEvent,
    production::UnitTemplate,
    services::{
        EntityFactory, ManualWallClock, MessageKind, SavegameKind, SavegameService, Services,
        UiService, ViewService,
    },
    session::SessionController,
    snapshot::SessionSnapshot,
    store::{Retention, SqliteSavegameStore},
    types::{EntityId, TilePos},
};

#[derive(Debug, Default)]
pub struct UiLog {
    pub messages:      Vec<MessageKind>,
    pub error_popups:  Vec<String>,
    pub popups:        Vec<String>,
    pub closed:        u32,
    pub speeds:        Vec<u32>,
    /// What the next name prompt answers. None = player aborts.
    pub prompt_answer: Option<String>,
}

pub struct RecordingUi(pub Rc<RefCell<UiLog>>);

impl UiService for RecordingUi {
    fn post_message(&mut self, kind: MessageKind) {
        self.0.borrow_mut().messages.push(kind);
    }
    fn show_error_popup(&mut self, headline: &str, _description: &str, _advice: &str) {
        self.0.borrow_mut().error_popups.push(headline.to_string());
    }
    fn show_popup(&mut self, headline: &str, _message: &str) {
        self.0.borrow_mut().popups.push(headline.to_string());
    }
    fn prompt_savegame_name(&mut self) -> Option<String> {
        self.0.borrow().prompt_answer.clone()
    }
    fn close_transient(&mut self) {
        self.0.borrow_mut().closed += 1;
    }
    fn display_speed(&mut self, ticks_per_second: u32) {
        self.0.borrow_mut().speeds.push(ticks_per_second);
    }
}

pub struct RecordingView(pub Rc<RefCell<Vec<f64>>>);

impl ViewService for RecordingView {
    fn set_time_multiplier(&mut self, multiplier: f64) {
        self.0.borrow_mut().push(multiplier);
    }
}

#[derive(Debug, Default)]
pub struct FactoryLog {
    pub created: Vec<(EntityId, String, TilePos)>,
    pub fail:    bool,
}

pub struct RecordingFactory(pub Rc<RefCell<FactoryLog>>);

impl EntityFactory for RecordingFactory {
    fn create(&mut self, id: &EntityId, template: &UnitTemplate, at: TilePos) -> SimResult<()> {
        let mut log = self.0.borrow_mut();
        if log.fail {
            return Err(SimError::EntitySpawn {
                template: template.template_id.clone(),
                reason:   "no free tile".into(),
            });
        }
        log.created.push((id.clone(), template.template_id.clone(), at));
        Ok(())
    }
}

/// The real SQLite store, with a switch that makes every write fail.
pub struct SharedSavegames {
    pub store:       Rc<RefCell<SqliteSavegameStore>>,
    pub fail_writes: Rc<Cell<bool>>,
}

impl SavegameService for SharedSavegames {
    fn create_autosave_filename(&mut self) -> String {
        self.store.borrow_mut().create_autosave_filename()
    }
    fn create_quicksave_filename(&mut self) -> String {
        self.store.borrow_mut().create_quicksave_filename()
    }
    fn create_filename(&mut self, name: &str) -> String {
        self.store.borrow_mut().create_filename(name)
    }
    fn delete_dispensable_savegames(&mut self, kind: SavegameKind) -> SimResult<()> {
        self.store.borrow_mut().delete_dispensable_savegames(kind)
    }
    fn get_quicksaves(&self) -> SimResult<Vec<String>> {
        self.store.borrow().get_quicksaves()
    }
    fn write_savegame(&mut self, path: &str, snapshot: &SessionSnapshot) -> SimResult<()> {
        if self.fail_writes.get() {
            return Err(anyhow::anyhow!("disk full").into());
        }
        self.store.borrow_mut().write_savegame(path, snapshot)
    }
    fn read_savegame(&self, path: &str) -> SimResult<SessionSnapshot> {
        self.store.borrow().read_savegame(path)
    }
}

pub struct Harness {
    pub session:     SessionController,
    pub wall:        ManualWallClock,
    pub ui:          Rc<RefCell<UiLog>>,
    pub view:        Rc<RefCell<Vec<f64>>>,
    pub factory:     Rc<RefCell<FactoryLog>>,
    pub store:       Rc<RefCell<SqliteSavegameStore>>,
    pub fail_writes: Rc<Cell<bool>>,
}

impl Harness {
    pub fn new(config: SessionConfig) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let wall = ManualWallClock::new(0.0);
        let ui = Rc::new(RefCell::new(UiLog::default()));
        let view = Rc::new(RefCell::new(Vec::new()));
        let factory = Rc::new(RefCell::new(FactoryLog::default()));
        let store = Rc::new(RefCell::new(
            SqliteSavegameStore::in_memory(Retention::from(&config.settings))
                .expect("in-memory store"),
        ));
        let fail_writes = Rc::new(Cell::new(false));

        let services = Services {
            savegames: Box::new(SharedSavegames {
                store:       store.clone(),
                fail_writes: fail_writes.clone(),
            }),
            ui:       Box::new(RecordingUi(ui.clone())),
            view:     Box::new(RecordingView(view.clone())),
            entities: Box::new(RecordingFactory(factory.clone())),
            wall:     Box::new(wall.clone()),
        };
        let session = SessionController::new_game(config, services).expect("new game");

        Self { session, wall, ui, view, factory, store, fail_writes }
    }

    pub fn default_test() -> Self {
        Self::new(SessionConfig::default_test())
    }

    /// Advance the wall clock one frame and run it.
    pub fn frame(&mut self, seconds: f64) -> Vec<SimEvent> {
        self.wall.advance(seconds);
        self.session.frame().expect("frame")
    }

    /// Run frames of one tick interval each until `tick` was reached.
    pub fn run_until_tick(&mut self, tick: u64) -> Vec<SimEvent> {
        let mut events = Vec::new();
        let mut guard = 0;
        while self.session.current_tick() < tick {
            let rate = self.session.clock().ticks_per_second();
            assert!(rate > 0, "run_until_tick on a paused session");
            events.extend(self.frame(1.0 / f64::from(rate)));
            guard += 1;
            assert!(guard < 1_000_000, "clock is not producing ticks");
        }
        events
    }
}
