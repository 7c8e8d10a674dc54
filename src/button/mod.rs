//! Shutter button event pipeline.
//!
//! Two stages, mirroring the hardware split: the GPIO interrupt inside the
//! HAL does nothing but wake the processing task (`ShutterPin::
//! wait_for_edge`); the task re-samples the pin, runs the debounce filter,
//! and fans accepted events out to every subscriber channel. Fan-out never
//! blocks - a subscriber whose queue is full loses that event rather than
//! stalling the source.

pub mod debounce;

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::channel::Channel;
use embassy_time::{with_timeout, Duration, Instant};
use heapless::Vec;

use crate::config::{EVENT_QUEUE_DEPTH, MAX_SUBSCRIBERS, PERIODIC_CHECK_MS};
use crate::error::SubscribeError;

use self::debounce::Debouncer;

/// A debounced shutter transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonEvent {
    Pressed,
    Released,
    LongPressed,
}

/// Queue a subscriber hands to [`EventBus::subscribe`].
///
/// Owned by the subscriber and registered by reference; the same reference
/// passed to `unsubscribe` identifies the registration.
pub type EventChannel = Channel<CriticalSectionRawMutex, ButtonEvent, EVENT_QUEUE_DEPTH>;

type Registry = Vec<&'static EventChannel, MAX_SUBSCRIBERS>;

/// Fixed-capacity subscriber registry with non-blocking fan-out.
pub struct EventBus {
    subs: BlockingMutex<CriticalSectionRawMutex, RefCell<Registry>>,
}

impl EventBus {
    pub const fn new() -> Self {
        Self {
            subs: BlockingMutex::new(RefCell::new(Vec::new())),
        }
    }

    /// Register a subscriber queue; fails once the compile-time capacity is
    /// reached.
    pub fn subscribe(&self, channel: &'static EventChannel) -> Result<(), SubscribeError> {
        self.subs.lock(|subs| {
            subs.borrow_mut()
                .push(channel)
                .map_err(|_| SubscribeError::Full)
        })
    }

    /// Remove a subscriber queue; no-op if it was never registered.
    pub fn unsubscribe(&self, channel: &'static EventChannel) {
        self.subs.lock(|subs| {
            let mut subs = subs.borrow_mut();
            if let Some(pos) = subs.iter().position(|s| core::ptr::eq(*s, channel)) {
                subs.remove(pos);
            }
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subs.lock(|subs| subs.borrow().len())
    }

    /// Deliver one event to every subscriber without blocking the pipeline.
    pub fn publish(&self, event: ButtonEvent) {
        self.subs.lock(|subs| {
            for sub in subs.borrow().iter() {
                // a slow subscriber loses the event rather than exerting
                // backpressure on the source
                let _ = sub.try_send(event);
            }
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Pin-level view of the shutter, narrow enough to fake on the host.
pub trait ShutterPin {
    /// Resolve when the line sees any edge; spurious wakes are fine.
    async fn wait_for_edge(&mut self);

    /// Sample the current logical level (true = pressed).
    fn is_pressed(&mut self) -> bool;
}

/// Shutter event source: owns the subscriber bus and the stop flag for its
/// processing task.
pub struct ButtonService {
    bus: EventBus,
    stop: AtomicBool,
}

impl ButtonService {
    pub const fn new() -> Self {
        Self {
            bus: EventBus::new(),
            stop: AtomicBool::new(false),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn subscribe(&self, channel: &'static EventChannel) -> Result<(), SubscribeError> {
        self.bus.subscribe(channel)
    }

    pub fn unsubscribe(&self, channel: &'static EventChannel) {
        self.bus.unsubscribe(channel)
    }

    /// Ask the processing loop to wind down. It exits on its next wake,
    /// within one periodic tick.
    pub fn end(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Drive the pipeline until [`ButtonService::end`] is called.
    ///
    /// Each wake - an edge or the periodic tick - re-samples the pin and
    /// pushes the level through the debounce filter; accepted transitions
    /// fan out to the subscribers. All of this runs in task context; the
    /// interrupt side only wakes us.
    pub async fn process(&self, pin: &mut impl ShutterPin) {
        let mut filter = Debouncer::new();
        let tick = Duration::from_millis(PERIODIC_CHECK_MS);

        while !self.stop.load(Ordering::Relaxed) {
            let _ = with_timeout(tick, pin.wait_for_edge()).await;
            let now = Instant::now().as_millis();
            if let Some(event) = filter.sample(pin.is_pressed(), now) {
                self.bus.publish(event);
            }
        }
    }
}
