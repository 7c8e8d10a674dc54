//! Screen transition table.
//!
//! Pure dispatch: (state, collapsed input, save-in-progress) to the next
//! state plus at most one side effect. The runner owns the clock, the
//! channels and the hardware; this table owns the decisions, so it is
//! unit-tested without spinning any of that up.

/// Active screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProgramState {
    Home,
    Flash,
    FilmDownload,
}

/// A full interaction on the current screen, collapsed from raw button
/// events: a press followed by a release within the cancel window
/// (`ShortPress`), a press held to the long threshold (`LongPress`), or
/// the screen's idle timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StateInput {
    ShortPress,
    LongPress,
    Timeout,
}

/// What the runner must do alongside the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Effect {
    None,
    /// Run the transient taking-picture action (lamp, save worker, wait).
    StartCapture,
    ToggleFlash,
    KickBatteryRead,
    /// Hand off to the film-transfer collaborator (stub).
    TriggerFilmDownload,
}

/// One decision of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub next: ProgramState,
    pub effect: Effect,
}

pub fn dispatch(state: ProgramState, input: StateInput, save_in_progress: bool) -> Step {
    use Effect::*;
    use ProgramState::*;
    use StateInput::*;

    let (next, effect) = match (state, input) {
        (Home, ShortPress) if !save_in_progress => (Home, StartCapture),
        // a save is still running; ignore the press
        (Home, ShortPress) => (Home, None),
        (Home, LongPress) => (Flash, None),
        (Home, Timeout) => (Home, KickBatteryRead),

        (Flash, ShortPress) => (FilmDownload, None),
        (Flash, LongPress) => (Flash, ToggleFlash),
        (Flash, Timeout) => (Home, None),

        (FilmDownload, ShortPress) => (Home, None),
        (FilmDownload, LongPress) => (Home, TriggerFilmDownload),
        (FilmDownload, Timeout) => (Home, None),
    };

    Step { next, effect }
}
