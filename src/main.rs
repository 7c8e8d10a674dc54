//! Embedded entry point: wiring and task spawns for the nRF52840 build.
//!
//! Boot creates the arbiter and service singletons, brings up the display
//! I²C, the camera and card SPI buses, the SAADC battery sense and the
//! shutter pin (GPIOTE), then starts the button pipeline and the program
//! task. Workers are spawned per request out of [`FwWorkers`]; their
//! hardware lives in async-mutexed singletons so a finished worker task
//! can be respawned for the next request.
//!
//! Initialisation failures are logged and the device keeps running in a
//! degraded state; there is no graceful shutdown beyond `end()` on the
//! button service.

#![no_std]
#![no_main]

use defmt::{info, warn};
use defmt_rtt as _;
use panic_probe as _;

use embassy_executor::Spawner;
use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pull};
use embassy_nrf::saadc::{self, ChannelConfig, Saadc};
use embassy_nrf::spim::{self, Spim};
use embassy_nrf::twim::{self, Twim};
use embassy_nrf::{bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Delay, Duration};
use embedded_hal_bus::spi::ExclusiveDevice;
use static_cell::StaticCell;

use shutterbox::arbiter::Arbiter;
use shutterbox::button::{ButtonService, EventChannel};
use shutterbox::config::{BATTERY_TAKE_MS, STORAGE_TAKE_MS};
use shutterbox::hw::camera::SpiCamera;
use shutterbox::hw::sdcard::SdStorage;
use shutterbox::hw::sense::AdcBatterySense;
use shutterbox::hw::shutter::ShutterButton;
use shutterbox::program::{Program, Workers};
use shutterbox::tasks::battery::run_battery_read;
use shutterbox::tasks::save::run_image_save;
use shutterbox::tasks::{BatteryResultChannel, OpFlag, SaveResultChannel};
use shutterbox::ui::Screens;

bind_interrupts!(struct Irqs {
    SPIM0_SPIS0_TWIM0_TWIS0_SPI0_TWI0 => twim::InterruptHandler<peripherals::TWISPI0>;
    SPIM2_SPIS2_SPI2 => spim::InterruptHandler<peripherals::SPI2>;
    SPIM3 => spim::InterruptHandler<peripherals::SPI3>;
    SAADC => saadc::InterruptHandler;
});

type DisplayI2c = Twim<'static, peripherals::TWISPI0>;
type CameraSpi = ExclusiveDevice<Spim<'static, peripherals::SPI2>, Output<'static>, Delay>;
type CardSpi = ExclusiveDevice<Spim<'static, peripherals::SPI3>, Output<'static>, Delay>;

type Cam = SpiCamera<CameraSpi>;
type Card = SdStorage<CardSpi, Delay>;

/// The capture worker's peripherals, parked between invocations.
struct SaveHardware {
    camera: Cam,
    card: Card,
}

static ARBITER: Arbiter = Arbiter::new();
static SHUTTER: ButtonService = ButtonService::new();

static PROGRAM_EVENTS: EventChannel = EventChannel::new();
static SAVE_RESULTS: SaveResultChannel = SaveResultChannel::new();
static BATTERY_RESULTS: BatteryResultChannel = BatteryResultChannel::new();

static SAVE_FLAG: OpFlag = OpFlag::new();
static BATTERY_FLAG: OpFlag = OpFlag::new();

static SAVE_HW: StaticCell<Mutex<CriticalSectionRawMutex, SaveHardware>> = StaticCell::new();
static SENSE: StaticCell<Mutex<CriticalSectionRawMutex, AdcBatterySense>> = StaticCell::new();

/// Worker layer wired to real task spawns.
struct FwWorkers {
    spawner: Spawner,
    save_hw: &'static Mutex<CriticalSectionRawMutex, SaveHardware>,
    sense: &'static Mutex<CriticalSectionRawMutex, AdcBatterySense>,
}

impl Workers for FwWorkers {
    fn save_in_progress(&self) -> bool {
        SAVE_FLAG.is_set()
    }

    fn start_save(&mut self) -> bool {
        if !SAVE_FLAG.try_begin() {
            return false;
        }
        if self.spawner.spawn(image_save_task(self.save_hw)).is_err() {
            warn!("could not spawn image save task");
            SAVE_FLAG.clear();
            return false;
        }
        true
    }

    fn start_battery_read(&mut self) -> bool {
        if !BATTERY_FLAG.try_begin() {
            return false;
        }
        if self.spawner.spawn(battery_read_task(self.sense)).is_err() {
            warn!("could not spawn battery read task");
            BATTERY_FLAG.clear();
            return false;
        }
        true
    }

    fn start_film_download(&mut self) -> bool {
        // film transfer is a stub collaborator; nothing to start yet
        warn!("film transfer requested but not implemented");
        false
    }
}

#[embassy_executor::task]
async fn shutter_task(mut pin: ShutterButton) {
    SHUTTER.process(&mut pin).await;
    info!("shutter pipeline stopped");
}

#[embassy_executor::task]
async fn program_task(
    program: Program<Screens<DisplayI2c>, Output<'static>, FwWorkers>,
) -> ! {
    program.run().await
}

#[embassy_executor::task]
async fn image_save_task(hw: &'static Mutex<CriticalSectionRawMutex, SaveHardware>) {
    let mut hw = hw.lock().await;
    let hw = &mut *hw;
    let outcome = run_image_save(
        &ARBITER,
        &mut hw.camera,
        &mut hw.card,
        &SAVE_FLAG,
        &SAVE_RESULTS,
        Duration::from_millis(STORAGE_TAKE_MS),
    )
    .await;

    match outcome {
        Ok(()) => info!("capture saved"),
        Err(e) => warn!("capture failed: code {} ({})", e.code(), e.message()),
    }
}

#[embassy_executor::task]
async fn battery_read_task(sense: &'static Mutex<CriticalSectionRawMutex, AdcBatterySense>) {
    let mut sense = sense.lock().await;
    let outcome = run_battery_read(
        &ARBITER,
        &mut *sense,
        &BATTERY_FLAG,
        &BATTERY_RESULTS,
        Duration::from_millis(BATTERY_TAKE_MS),
    )
    .await;

    match outcome {
        Ok(r) => info!("battery: {} mV ({}%)", r.millivolts, r.percent),
        Err(e) => warn!("battery read failed: {}", e.message()),
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    info!("booting...");

    // Display: SSD1306 over TWI
    let i2c = Twim::new(p.TWISPI0, Irqs, p.P0_26, p.P0_27, twim::Config::default());
    let screens = Screens::new(i2c);

    // Camera: SPI module behind its own chip select
    let mut cam_config = spim::Config::default();
    cam_config.frequency = spim::Frequency::M8;
    let cam_spi = Spim::new(p.SPI2, Irqs, p.P0_19, p.P0_21, p.P0_22, cam_config);
    let cam_cs = Output::new(p.P0_17, Level::High, OutputDrive::Standard);
    let camera = SpiCamera::new(ExclusiveDevice::new(cam_spi, cam_cs, Delay).unwrap());

    // Removable card: second SPI bus
    let mut sd_config = spim::Config::default();
    sd_config.frequency = spim::Frequency::M8;
    let sd_spi = Spim::new(p.SPI3, Irqs, p.P0_14, p.P0_15, p.P0_16, sd_config);
    let sd_cs = Output::new(p.P0_20, Level::High, OutputDrive::Standard);
    let card = SdStorage::new(ExclusiveDevice::new(sd_spi, sd_cs, Delay).unwrap(), Delay);

    // Battery sense: gated divider into AIN0
    let channel = ChannelConfig::single_ended(p.P0_02);
    let adc = Saadc::new(p.SAADC, Irqs, saadc::Config::default(), [channel]);
    let gate = Output::new(p.P0_31, Level::Low, OutputDrive::Standard);
    let sense = AdcBatterySense::new(adc, gate);

    // Lamp and shutter button
    let lamp = Output::new(p.P0_13, Level::Low, OutputDrive::Standard);
    let shutter_pin = Input::new(p.P0_11, Pull::Up);
    let shutter = ShutterButton::new(shutter_pin, Level::Low);
    info!("hardware initialized.");

    let save_hw = SAVE_HW.init(Mutex::new(SaveHardware { camera, card }));
    let sense = SENSE.init(Mutex::new(sense));

    if SHUTTER.subscribe(&PROGRAM_EVENTS).is_err() {
        warn!("subscriber registry full; program will see no input");
    }

    let workers = FwWorkers {
        spawner,
        save_hw,
        sense,
    };
    let program = Program::new(
        &ARBITER,
        &PROGRAM_EVENTS,
        &SAVE_RESULTS,
        &BATTERY_RESULTS,
        screens,
        lamp,
        workers,
    );

    // arm the pipeline, then hand the screens to the program loop
    if spawner.spawn(shutter_task(shutter)).is_err() {
        warn!("failed to start shutter pipeline");
    }
    if spawner.spawn(program_task(program)).is_err() {
        warn!("failed to start program task");
    }

    info!("ready.");
}
