//! Program task: screen sequencing over button events and worker results.
//!
//! One state is active at a time. Each pass renders the current screen
//! (display lines taken and released around the draw, never held across a
//! wait), collapses raw button events into a [`StateInput`], consults the
//! transition table, and executes the effect. The transient taking-picture
//! action blocks on the save worker's single-slot result channel and
//! restores the lamp whatever the outcome; a save failure is logged at the
//! worker's spawn site and the program simply returns to Home.

pub mod logic;

use embassy_time::{with_deadline, with_timeout, Duration, Instant};

use crate::arbiter::Arbiter;
use crate::battery::BatteryReading;
use crate::button::{ButtonEvent, EventChannel};
use crate::config::{
    DISPLAY_TAKE_MS, FILM_SCREEN_TIMEOUT_MS, FLASH_SCREEN_TIMEOUT_MS, HOME_SCREEN_TIMEOUT_MS,
    PRESS_CANCEL_TIMEOUT_MS,
};
use crate::tasks::{BatteryResultChannel, SaveResultChannel};

use self::logic::{dispatch, Effect, ProgramState, StateInput};

/// Screen renderer boundary (implemented by [`crate::ui::Screens`]).
pub trait Panel {
    fn home(&mut self, battery: Option<BatteryReading>, flash_on: bool);
    fn taking_picture(&mut self);
    fn flash(&mut self, flash_on: bool);
    fn film_download(&mut self);
}

/// Illumination output.
pub trait Lamp {
    fn set(&mut self, on: bool);
}

/// Hooks into the worker layer. The embedded implementation spawns tasks;
/// tests substitute recorders.
pub trait Workers {
    fn save_in_progress(&self) -> bool;

    /// Claim the save flag and start the capture worker. False when a save
    /// is already running or the task could not be spawned.
    fn start_save(&mut self) -> bool;

    fn start_battery_read(&mut self) -> bool;

    /// Film transfer is not implemented yet; implementations report
    /// whether a transfer actually started.
    fn start_film_download(&mut self) -> bool {
        false
    }
}

/// The timeouts the runner lives by. Defaults come from `config`; tests
/// shrink them to keep wall-clock time short.
#[derive(Debug, Clone, Copy)]
pub struct Timings {
    pub home: Duration,
    pub flash: Duration,
    pub film_download: Duration,
    pub press_cancel: Duration,
    pub display_take: Duration,
}

impl Timings {
    fn for_state(&self, state: ProgramState) -> Duration {
        match state {
            ProgramState::Home => self.home,
            ProgramState::Flash => self.flash,
            ProgramState::FilmDownload => self.film_download,
        }
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            home: Duration::from_millis(HOME_SCREEN_TIMEOUT_MS),
            flash: Duration::from_millis(FLASH_SCREEN_TIMEOUT_MS),
            film_download: Duration::from_millis(FILM_SCREEN_TIMEOUT_MS),
            press_cancel: Duration::from_millis(PRESS_CANCEL_TIMEOUT_MS),
            display_take: Duration::from_millis(DISPLAY_TAKE_MS),
        }
    }
}

/// The cooperative screen controller.
pub struct Program<P: Panel, L: Lamp, W: Workers> {
    arbiter: &'static Arbiter,
    events: &'static EventChannel,
    save_results: &'static SaveResultChannel,
    battery_results: &'static BatteryResultChannel,
    panel: P,
    lamp: L,
    workers: W,
    timings: Timings,
    flash_on: bool,
    last_battery: Option<BatteryReading>,
}

impl<P: Panel, L: Lamp, W: Workers> Program<P, L, W> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        arbiter: &'static Arbiter,
        events: &'static EventChannel,
        save_results: &'static SaveResultChannel,
        battery_results: &'static BatteryResultChannel,
        panel: P,
        lamp: L,
        workers: W,
    ) -> Self {
        Self {
            arbiter,
            events,
            save_results,
            battery_results,
            panel,
            lamp,
            workers,
            timings: Timings::default(),
            flash_on: false,
            last_battery: None,
        }
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    pub fn flash_enabled(&self) -> bool {
        self.flash_on
    }

    pub fn last_battery(&self) -> Option<BatteryReading> {
        self.last_battery
    }

    pub async fn run(mut self) -> ! {
        let mut state = ProgramState::Home;
        loop {
            state = self.step(state).await;
        }
    }

    /// One full pass: render, wait, dispatch, effect. Public so tests can
    /// drive single transitions.
    pub async fn step(&mut self, state: ProgramState) -> ProgramState {
        // pick up a gauge reading the battery worker finished meanwhile;
        // a failed read keeps the stale value on screen
        if let Ok(outcome) = self.battery_results.try_receive() {
            if let Ok(reading) = outcome {
                self.last_battery = Some(reading);
            }
        }

        self.render(state).await;

        let input = self.wait_input(self.timings.for_state(state)).await;
        let step = dispatch(state, input, self.workers.save_in_progress());

        match step.effect {
            Effect::None => {}
            Effect::StartCapture => self.take_picture().await,
            Effect::ToggleFlash => self.flash_on = !self.flash_on,
            Effect::KickBatteryRead => {
                let _ = self.workers.start_battery_read();
            }
            Effect::TriggerFilmDownload => {
                let _ = self.workers.start_film_download();
            }
        }

        step.next
    }

    /// Draw the screen for `state`. The display lines are held only for
    /// the duration of the draw; if they cannot be taken in time the frame
    /// is skipped rather than stalling the program.
    async fn render(&mut self, state: ProgramState) {
        let Some(_lines) = self.arbiter.lock_display(self.timings.display_take).await else {
            return;
        };
        match state {
            ProgramState::Home => self.panel.home(self.last_battery, self.flash_on),
            ProgramState::Flash => self.panel.flash(self.flash_on),
            ProgramState::FilmDownload => self.panel.film_download(),
        }
    }

    /// Collapse raw events into one interaction, bounded by the screen's
    /// idle timeout.
    async fn wait_input(&mut self, state_timeout: Duration) -> StateInput {
        let deadline = Instant::now() + state_timeout;
        loop {
            let Ok(event) = with_deadline(deadline, self.events.receive()).await else {
                return StateInput::Timeout;
            };
            if event != ButtonEvent::Pressed {
                // stale release or long-press left over from a previous
                // interaction
                continue;
            }
            match with_timeout(self.timings.press_cancel, self.events.receive()).await {
                Ok(ButtonEvent::Released) => return StateInput::ShortPress,
                Ok(ButtonEvent::LongPressed) => return StateInput::LongPress,
                Ok(ButtonEvent::Pressed) => continue,
                // dangling press: abandon the interaction
                Err(_) => return StateInput::Timeout,
            }
        }
    }

    /// The transient taking-picture action entered from Home.
    async fn take_picture(&mut self) {
        if self.flash_on {
            self.lamp.set(true);
        }

        // draw the feedback frame before the worker claims the shared
        // lines, so the two never race for the display
        if let Some(_lines) = self.arbiter.lock_display(self.timings.display_take).await {
            self.panel.taking_picture();
        }

        // drop a stale outcome so the wait below sees this capture's
        while self.save_results.try_receive().is_ok() {}

        if self.workers.start_save() {
            // block until the worker reports; failures are logged at the
            // spawn site and we return to Home either way
            let _ = self.save_results.receive().await;
        }

        if self.flash_on {
            self.lamp.set(false);
        }
    }
}
