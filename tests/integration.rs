//! Integration tests for the shutterbox concurrency core.
//!
//! Async paths run on the host via `embassy_futures::block_on` with the
//! `embassy-time/std` driver, so lock timeouts and screen timeouts elapse
//! in (shrunk) wall-clock time.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use embassy_futures::block_on;
use embassy_futures::join::join;
use embassy_futures::yield_now;
use embassy_time::{Duration, Timer};

use shutterbox::arbiter::Arbiter;
use shutterbox::battery::BatteryReading;
use shutterbox::button::{ButtonEvent, ButtonService, EventChannel, ShutterPin};
use shutterbox::error::{BatteryError, SaveError};
use shutterbox::program::logic::ProgramState;
use shutterbox::program::{Lamp, Panel, Program, Timings, Workers};
use shutterbox::tasks::battery::{run_battery_read, BatterySense};
use shutterbox::tasks::save::{run_image_save, Camera, StorageCard};
use shutterbox::tasks::{BatteryResultChannel, OpFlag, SaveResultChannel};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

// ═══════════════════════════════════════════════════════════════════════════
// Arbiter
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn arbiter_grants_uncontended_lines() {
    let arbiter = Arbiter::new();

    assert!(block_on(arbiter.lock_display(ms(20))).is_some());
    assert!(block_on(arbiter.lock_battery(ms(20))).is_some());
    assert!(block_on(arbiter.lock_radio(ms(20))).is_some());
    assert!(block_on(arbiter.lock_storage(ms(20))).is_some());
}

#[test]
fn storage_composite_excludes_display_and_sense() {
    let arbiter = Arbiter::new();

    let storage = block_on(arbiter.lock_storage(ms(20)));
    assert!(storage.is_some());

    assert!(block_on(arbiter.lock_display(ms(20))).is_none());
    assert!(block_on(arbiter.lock_battery(ms(20))).is_none());
    // the radio rail is independent of the composite
    assert!(block_on(arbiter.lock_radio(ms(20))).is_some());

    drop(storage);
    assert!(block_on(arbiter.lock_display(ms(20))).is_some());
    assert!(block_on(arbiter.lock_battery(ms(20))).is_some());
}

#[test]
fn failed_composite_leaves_no_line_held() {
    let arbiter = Arbiter::new();

    // hold the sense rail so the composite times out on its second lock
    let sense = block_on(arbiter.lock_battery(ms(20)));
    assert!(sense.is_some());

    assert!(block_on(arbiter.lock_storage(ms(30))).is_none());

    // the display lines must have been released by the failed composite
    assert!(block_on(arbiter.lock_display(ms(20))).is_some());

    drop(sense);
    assert!(block_on(arbiter.lock_storage(ms(30))).is_some());
}

// ═══════════════════════════════════════════════════════════════════════════
// Save worker
// ═══════════════════════════════════════════════════════════════════════════

struct MockCamera {
    frame: &'static [u8],
    fail: bool,
    captured: Cell<u32>,
    released: Cell<u32>,
}

impl MockCamera {
    fn new(frame: &'static [u8]) -> Self {
        Self {
            frame,
            fail: false,
            captured: Cell::new(0),
            released: Cell::new(0),
        }
    }
}

impl Camera for MockCamera {
    fn capture(&mut self) -> Result<&[u8], SaveError> {
        self.captured.set(self.captured.get() + 1);
        if self.fail {
            Err(SaveError::Capture)
        } else {
            Ok(self.frame)
        }
    }

    fn release_frame(&mut self) {
        self.released.set(self.released.get() + 1);
    }
}

#[derive(Default)]
struct MockCard {
    fail_mount: Option<SaveError>,
    fail_write: Option<SaveError>,
    mounts: u32,
    unmounts: u32,
    written: Vec<u8>,
    written_name: String,
}

impl StorageCard for MockCard {
    fn mount(&mut self) -> Result<(), SaveError> {
        self.mounts += 1;
        match self.fail_mount {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn write_jpeg(&mut self, name: &str, data: &[u8]) -> Result<(), SaveError> {
        if let Some(e) = self.fail_write {
            return Err(e);
        }
        self.written_name = name.to_string();
        self.written = data.to_vec();
        Ok(())
    }

    fn unmount(&mut self) {
        self.unmounts += 1;
    }
}

const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x42, 0xFF, 0xD9];

#[test]
fn save_worker_writes_frame_and_reports_success() {
    let arbiter = Arbiter::new();
    let flag = OpFlag::new();
    let results = SaveResultChannel::new();
    let mut camera = MockCamera::new(JPEG);
    let mut card = MockCard::default();

    assert!(flag.try_begin());
    let outcome = block_on(run_image_save(
        &arbiter,
        &mut camera,
        &mut card,
        &flag,
        &results,
        ms(50),
    ));

    assert_eq!(outcome, Ok(()));
    assert_eq!(results.try_receive().ok(), Some(Ok(())));
    assert!(!flag.is_set());

    assert_eq!(card.mounts, 1);
    assert_eq!(card.unmounts, 1);
    assert_eq!(card.written, JPEG);
    assert_eq!(card.written_name, "PICTURE.JPG");
    assert_eq!(camera.released.get(), 1);

    // every line is free again after the worker
    assert!(block_on(arbiter.lock_storage(ms(20))).is_some());
}

#[test]
fn save_worker_releases_frame_and_card_on_capture_failure() {
    let arbiter = Arbiter::new();
    let flag = OpFlag::new();
    let results = SaveResultChannel::new();
    let mut camera = MockCamera::new(JPEG);
    camera.fail = true;
    let mut card = MockCard::default();

    assert!(flag.try_begin());
    let outcome = block_on(run_image_save(
        &arbiter,
        &mut camera,
        &mut card,
        &flag,
        &results,
        ms(50),
    ));

    assert_eq!(outcome, Err(SaveError::Capture));
    assert_eq!(results.try_receive().ok(), Some(Err(SaveError::Capture)));
    assert!(!flag.is_set());

    // partial side effects are cleaned up before the report
    assert_eq!(camera.released.get(), 1);
    assert_eq!(card.unmounts, 1);
    assert!(card.written.is_empty());
}

#[test]
fn save_worker_skips_camera_when_mount_fails() {
    let arbiter = Arbiter::new();
    let flag = OpFlag::new();
    let results = SaveResultChannel::new();
    let mut camera = MockCamera::new(JPEG);
    let mut card = MockCard {
        fail_mount: Some(SaveError::CardMount),
        ..Default::default()
    };

    assert!(flag.try_begin());
    let outcome = block_on(run_image_save(
        &arbiter,
        &mut camera,
        &mut card,
        &flag,
        &results,
        ms(50),
    ));

    assert_eq!(outcome, Err(SaveError::CardMount));
    assert_eq!(camera.captured.get(), 0);
    assert!(!flag.is_set());
}

#[test]
fn save_worker_aborts_cleanly_on_line_timeout() {
    let arbiter = Arbiter::new();
    let flag = OpFlag::new();
    let results = SaveResultChannel::new();
    let mut camera = MockCamera::new(JPEG);
    let mut card = MockCard::default();

    // someone else owns the display lines; the composite cannot complete
    let display = block_on(arbiter.lock_display(ms(20)));
    assert!(display.is_some());

    assert!(flag.try_begin());
    let outcome = block_on(run_image_save(
        &arbiter,
        &mut camera,
        &mut card,
        &flag,
        &results,
        ms(30),
    ));

    assert_eq!(outcome, Err(SaveError::BusTimeout));
    assert_eq!(card.mounts, 0);
    assert_eq!(camera.captured.get(), 0);
    assert!(!flag.is_set());

    // the failed composite left the sense rail untouched
    assert!(block_on(arbiter.lock_battery(ms(20))).is_some());
}

#[test]
fn second_save_request_is_rejected_while_first_runs() {
    let flag = OpFlag::new();

    // first caller claims the operation
    assert!(flag.try_begin());
    // second caller is turned away without spawning anything
    assert!(!flag.try_begin());

    let arbiter = Arbiter::new();
    let results = SaveResultChannel::new();
    let mut camera = MockCamera::new(JPEG);
    let mut card = MockCard::default();

    let outcome = block_on(run_image_save(
        &arbiter,
        &mut camera,
        &mut card,
        &flag,
        &results,
        ms(50),
    ));
    assert_eq!(outcome, Ok(()));

    // the first worker finished: its result is out and the flag is clear
    assert_eq!(results.try_receive().ok(), Some(Ok(())));
    assert!(flag.try_begin());
}

// ═══════════════════════════════════════════════════════════════════════════
// Battery worker
// ═══════════════════════════════════════════════════════════════════════════

struct MockSense {
    raw: u16,
    fail: bool,
}

impl BatterySense for MockSense {
    async fn sample_raw(&mut self) -> Result<u16, BatteryError> {
        if self.fail {
            Err(BatteryError::Adc)
        } else {
            Ok(self.raw)
        }
    }
}

#[test]
fn battery_worker_delivers_one_reading() {
    let arbiter = Arbiter::new();
    let flag = OpFlag::new();
    let results = BatteryResultChannel::new();
    let mut sense = MockSense {
        raw: 2048,
        fail: false,
    };

    assert!(flag.try_begin());
    let outcome = block_on(run_battery_read(&arbiter, &mut sense, &flag, &results, ms(50)));

    let expected = BatteryReading::from_raw(2048);
    assert_eq!(outcome, Ok(expected));
    assert_eq!(results.try_receive().ok(), Some(Ok(expected)));
    assert!(results.try_receive().is_err());
    assert!(!flag.is_set());
}

#[test]
fn battery_worker_reports_adc_failure() {
    let arbiter = Arbiter::new();
    let flag = OpFlag::new();
    let results = BatteryResultChannel::new();
    let mut sense = MockSense {
        raw: 0,
        fail: true,
    };

    assert!(flag.try_begin());
    let outcome = block_on(run_battery_read(&arbiter, &mut sense, &flag, &results, ms(50)));

    assert_eq!(outcome, Err(BatteryError::Adc));
    assert!(!flag.is_set());
}

#[test]
fn battery_worker_aborts_on_sense_line_timeout() {
    let arbiter = Arbiter::new();
    let flag = OpFlag::new();
    let results = BatteryResultChannel::new();
    let mut sense = MockSense {
        raw: 1000,
        fail: false,
    };

    let line = block_on(arbiter.lock_battery(ms(20)));
    assert!(line.is_some());

    assert!(flag.try_begin());
    let outcome = block_on(run_battery_read(&arbiter, &mut sense, &flag, &results, ms(30)));

    assert_eq!(outcome, Err(BatteryError::LineTimeout));
    assert!(!flag.is_set());
}

// ═══════════════════════════════════════════════════════════════════════════
// Program runner
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Home,
    TakingPicture,
    Flash,
    FilmDownload,
}

#[derive(Clone, Default)]
struct PanelLog {
    frames: Rc<RefCell<Vec<Frame>>>,
    battery_seen: Rc<RefCell<Vec<Option<BatteryReading>>>>,
    flash_seen: Rc<RefCell<Vec<bool>>>,
}

impl Panel for PanelLog {
    fn home(&mut self, battery: Option<BatteryReading>, flash_on: bool) {
        self.frames.borrow_mut().push(Frame::Home);
        self.battery_seen.borrow_mut().push(battery);
        self.flash_seen.borrow_mut().push(flash_on);
    }

    fn taking_picture(&mut self) {
        self.frames.borrow_mut().push(Frame::TakingPicture);
    }

    fn flash(&mut self, flash_on: bool) {
        self.frames.borrow_mut().push(Frame::Flash);
        self.flash_seen.borrow_mut().push(flash_on);
    }

    fn film_download(&mut self) {
        self.frames.borrow_mut().push(Frame::FilmDownload);
    }
}

#[derive(Clone, Default)]
struct LampLog(Rc<RefCell<Vec<bool>>>);

impl Lamp for LampLog {
    fn set(&mut self, on: bool) {
        self.0.borrow_mut().push(on);
    }
}

/// Worker stand-in: `start_save` injects a scripted outcome straight into
/// the result channel the program blocks on.
struct ScriptedWorkers {
    in_progress: bool,
    save_results: &'static SaveResultChannel,
    save_outcome: Result<(), SaveError>,
    save_starts: Rc<Cell<u32>>,
    battery_kicks: Rc<Cell<u32>>,
    film_triggers: Rc<Cell<u32>>,
}

impl ScriptedWorkers {
    fn new(save_results: &'static SaveResultChannel) -> Self {
        Self {
            in_progress: false,
            save_results,
            save_outcome: Ok(()),
            save_starts: Rc::new(Cell::new(0)),
            battery_kicks: Rc::new(Cell::new(0)),
            film_triggers: Rc::new(Cell::new(0)),
        }
    }
}

impl Workers for ScriptedWorkers {
    fn save_in_progress(&self) -> bool {
        self.in_progress
    }

    fn start_save(&mut self) -> bool {
        self.save_starts.set(self.save_starts.get() + 1);
        let _ = self.save_results.try_send(self.save_outcome);
        true
    }

    fn start_battery_read(&mut self) -> bool {
        self.battery_kicks.set(self.battery_kicks.get() + 1);
        true
    }

    fn start_film_download(&mut self) -> bool {
        self.film_triggers.set(self.film_triggers.get() + 1);
        false
    }
}

fn short_timings() -> Timings {
    Timings {
        home: ms(40),
        flash: ms(40),
        film_download: ms(40),
        press_cancel: ms(40),
        display_take: ms(20),
    }
}

macro_rules! program_fixture {
    () => {{
        static ARBITER: Arbiter = Arbiter::new();
        static EVENTS: EventChannel = EventChannel::new();
        static SAVE_RESULTS: SaveResultChannel = SaveResultChannel::new();
        static BATTERY_RESULTS: BatteryResultChannel = BatteryResultChannel::new();
        (&ARBITER, &EVENTS, &SAVE_RESULTS, &BATTERY_RESULTS)
    }};
}

#[test]
fn home_short_press_takes_picture_and_returns_home() {
    let (arbiter, events, save_results, battery_results) = program_fixture!();

    let panel = PanelLog::default();
    let frames = panel.frames.clone();
    let workers = ScriptedWorkers::new(save_results);
    let starts = workers.save_starts.clone();

    events.try_send(ButtonEvent::Pressed).unwrap();
    events.try_send(ButtonEvent::Released).unwrap();

    let mut program = Program::new(
        arbiter,
        events,
        save_results,
        battery_results,
        panel,
        LampLog::default(),
        workers,
    )
    .with_timings(short_timings());

    let next = block_on(program.step(ProgramState::Home));

    assert_eq!(next, ProgramState::Home);
    assert_eq!(starts.get(), 1);
    assert_eq!(*frames.borrow(), vec![Frame::Home, Frame::TakingPicture]);
    // the worker's slot was consumed by the wait
    assert!(save_results.try_receive().is_err());
}

#[test]
fn home_long_press_enters_flash_screen() {
    let (arbiter, events, save_results, battery_results) = program_fixture!();

    events.try_send(ButtonEvent::Pressed).unwrap();
    events.try_send(ButtonEvent::LongPressed).unwrap();

    let mut program = Program::new(
        arbiter,
        events,
        save_results,
        battery_results,
        PanelLog::default(),
        LampLog::default(),
        ScriptedWorkers::new(save_results),
    )
    .with_timings(short_timings());

    assert_eq!(block_on(program.step(ProgramState::Home)), ProgramState::Flash);
}

#[test]
fn flash_long_press_toggles_and_short_press_moves_on() {
    let (arbiter, events, save_results, battery_results) = program_fixture!();

    let panel = PanelLog::default();
    let flash_seen = panel.flash_seen.clone();

    let mut program = Program::new(
        arbiter,
        events,
        save_results,
        battery_results,
        panel,
        LampLog::default(),
        ScriptedWorkers::new(save_results),
    )
    .with_timings(short_timings());

    events.try_send(ButtonEvent::Pressed).unwrap();
    events.try_send(ButtonEvent::LongPressed).unwrap();
    assert_eq!(block_on(program.step(ProgramState::Flash)), ProgramState::Flash);
    assert!(program.flash_enabled());

    events.try_send(ButtonEvent::Pressed).unwrap();
    events.try_send(ButtonEvent::Released).unwrap();
    assert_eq!(
        block_on(program.step(ProgramState::Flash)),
        ProgramState::FilmDownload
    );

    // the second Flash render saw the toggled state
    assert_eq!(*flash_seen.borrow(), vec![false, true]);
}

#[test]
fn flash_screen_times_out_to_home() {
    let (arbiter, events, save_results, battery_results) = program_fixture!();

    let mut program = Program::new(
        arbiter,
        events,
        save_results,
        battery_results,
        PanelLog::default(),
        LampLog::default(),
        ScriptedWorkers::new(save_results),
    )
    .with_timings(short_timings());

    // no input at all: the 40 ms screen timeout elapses for real
    assert_eq!(block_on(program.step(ProgramState::Flash)), ProgramState::Home);
}

#[test]
fn home_timeout_rerenders_and_starts_battery_read() {
    let (arbiter, events, save_results, battery_results) = program_fixture!();

    let workers = ScriptedWorkers::new(save_results);
    let kicks = workers.battery_kicks.clone();

    let mut program = Program::new(
        arbiter,
        events,
        save_results,
        battery_results,
        PanelLog::default(),
        LampLog::default(),
        workers,
    )
    .with_timings(short_timings());

    assert_eq!(block_on(program.step(ProgramState::Home)), ProgramState::Home);
    assert_eq!(kicks.get(), 1);
}

#[test]
fn short_press_is_ignored_while_save_in_progress() {
    let (arbiter, events, save_results, battery_results) = program_fixture!();

    let panel = PanelLog::default();
    let frames = panel.frames.clone();
    let mut workers = ScriptedWorkers::new(save_results);
    workers.in_progress = true;
    let starts = workers.save_starts.clone();

    events.try_send(ButtonEvent::Pressed).unwrap();
    events.try_send(ButtonEvent::Released).unwrap();

    let mut program = Program::new(
        arbiter,
        events,
        save_results,
        battery_results,
        panel,
        LampLog::default(),
        workers,
    )
    .with_timings(short_timings());

    assert_eq!(block_on(program.step(ProgramState::Home)), ProgramState::Home);
    assert_eq!(starts.get(), 0);
    assert_eq!(*frames.borrow(), vec![Frame::Home]);
}

#[test]
fn flash_lamp_wraps_the_capture_when_enabled() {
    let (arbiter, events, save_results, battery_results) = program_fixture!();

    let lamp = LampLog::default();
    let lamp_log = lamp.0.clone();

    let mut program = Program::new(
        arbiter,
        events,
        save_results,
        battery_results,
        PanelLog::default(),
        lamp,
        ScriptedWorkers::new(save_results),
    )
    .with_timings(short_timings());

    // turn the flash on via the Flash screen
    events.try_send(ButtonEvent::Pressed).unwrap();
    events.try_send(ButtonEvent::LongPressed).unwrap();
    assert_eq!(block_on(program.step(ProgramState::Flash)), ProgramState::Flash);

    // then take a picture from Home
    events.try_send(ButtonEvent::Pressed).unwrap();
    events.try_send(ButtonEvent::Released).unwrap();
    assert_eq!(block_on(program.step(ProgramState::Home)), ProgramState::Home);

    assert_eq!(*lamp_log.borrow(), vec![true, false]);
}

#[test]
fn film_download_long_press_triggers_stub_and_returns_home() {
    let (arbiter, events, save_results, battery_results) = program_fixture!();

    let workers = ScriptedWorkers::new(save_results);
    let triggers = workers.film_triggers.clone();

    events.try_send(ButtonEvent::Pressed).unwrap();
    events.try_send(ButtonEvent::LongPressed).unwrap();

    let mut program = Program::new(
        arbiter,
        events,
        save_results,
        battery_results,
        PanelLog::default(),
        LampLog::default(),
        workers,
    )
    .with_timings(short_timings());

    assert_eq!(
        block_on(program.step(ProgramState::FilmDownload)),
        ProgramState::Home
    );
    assert_eq!(triggers.get(), 1);
}

#[test]
fn finished_battery_read_shows_up_on_the_next_render() {
    let (arbiter, events, save_results, battery_results) = program_fixture!();

    let panel = PanelLog::default();
    let battery_seen = panel.battery_seen.clone();

    let reading = BatteryReading::from_raw(4000);
    battery_results.try_send(Ok(reading)).unwrap();

    events.try_send(ButtonEvent::Pressed).unwrap();
    events.try_send(ButtonEvent::LongPressed).unwrap();

    let mut program = Program::new(
        arbiter,
        events,
        save_results,
        battery_results,
        panel,
        LampLog::default(),
        ScriptedWorkers::new(save_results),
    )
    .with_timings(short_timings());

    assert_eq!(block_on(program.step(ProgramState::Home)), ProgramState::Flash);
    assert_eq!(*battery_seen.borrow(), vec![Some(reading)]);
    assert_eq!(program.last_battery(), Some(reading));
}

// ═══════════════════════════════════════════════════════════════════════════
// Button pipeline end-to-end
// ═══════════════════════════════════════════════════════════════════════════

/// Host stand-in for the shutter pin: the level is a shared cell and every
/// wait returns after a yield, which the pipeline treats as a spurious wake
/// and simply re-samples.
struct FakePin {
    level: Rc<Cell<bool>>,
}

impl ShutterPin for FakePin {
    async fn wait_for_edge(&mut self) {
        yield_now().await;
    }

    fn is_pressed(&mut self) -> bool {
        self.level.get()
    }
}

#[test]
fn pipeline_delivers_debounced_press_and_release() {
    static SERVICE: ButtonService = ButtonService::new();
    static SUB: EventChannel = EventChannel::new();

    SERVICE.subscribe(&SUB).unwrap();

    let level = Rc::new(Cell::new(false));
    let mut pin = FakePin {
        level: level.clone(),
    };

    let script = async {
        // let the filter's initial window pass before the press
        Timer::after(ms(60)).await;
        level.set(true);
        Timer::after(ms(100)).await;
        level.set(false);
        Timer::after(ms(100)).await;
        SERVICE.end();
    };

    block_on(join(SERVICE.process(&mut pin), script));

    assert_eq!(SUB.try_receive().ok(), Some(ButtonEvent::Pressed));
    assert_eq!(SUB.try_receive().ok(), Some(ButtonEvent::Released));
    assert!(SUB.try_receive().is_err());
}

#[test]
fn pipeline_emits_single_long_press_per_hold() {
    static SERVICE: ButtonService = ButtonService::new();
    static SUB: EventChannel = EventChannel::new();

    SERVICE.subscribe(&SUB).unwrap();

    let level = Rc::new(Cell::new(false));
    let mut pin = FakePin {
        level: level.clone(),
    };

    let script = async {
        Timer::after(ms(60)).await;
        level.set(true);
        // hold well past the long-press threshold
        Timer::after(ms(1_300)).await;
        level.set(false);
        Timer::after(ms(100)).await;
        SERVICE.end();
    };

    block_on(join(SERVICE.process(&mut pin), script));

    assert_eq!(SUB.try_receive().ok(), Some(ButtonEvent::Pressed));
    assert_eq!(SUB.try_receive().ok(), Some(ButtonEvent::LongPressed));
    assert_eq!(SUB.try_receive().ok(), Some(ButtonEvent::Released));
    assert!(SUB.try_receive().is_err());
}
