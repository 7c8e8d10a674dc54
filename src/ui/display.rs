//! SSD1306 OLED screens.

use core::fmt::Write;

use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_9X15};
use embedded_graphics::mono_font::MonoTextStyleBuilder;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::Text;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::I2CDisplayInterface;
use ssd1306::Ssd1306;

use crate::battery::BatteryReading;
use crate::program::Panel;

/// Type alias for the concrete display driver.
///
/// Generic over the I²C implementation so callers pass in their HAL's
/// I²C peripheral.
pub type Display<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

/// Owns the display driver and renders the program screens.
///
/// The card shares wiring with the display, so every draw re-initialises
/// the controller first; a storage burst between frames may have disturbed
/// its configuration.
pub struct Screens<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    display: Display<I2C>,
}

impl<I2C> Screens<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    pub fn new(i2c: I2C) -> Self {
        let interface = I2CDisplayInterface::new(i2c);
        let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        let _ = display.init();
        display.clear_buffer();
        let _ = display.flush();
        Self { display }
    }

    fn begin_frame(&mut self) {
        let _ = self.display.init();
        self.display.clear_buffer();
    }

    fn end_frame(&mut self) {
        let _ = self.display.flush();
    }

    /// Battery gauge in the top-left corner: outline, terminal nub, one
    /// segment per started 20 %. A missing reading draws a `?` instead.
    fn draw_battery(&mut self, reading: Option<BatteryReading>) {
        let outline = PrimitiveStyle::with_stroke(BinaryColor::On, 1);
        let filled = PrimitiveStyle::with_fill(BinaryColor::On);

        let _ = Rectangle::new(Point::new(2, 2), Size::new(24, 12))
            .into_styled(outline)
            .draw(&mut self.display);
        let _ = Rectangle::new(Point::new(26, 5), Size::new(2, 6))
            .into_styled(filled)
            .draw(&mut self.display);

        match reading {
            Some(r) => {
                let segments = (r.percent / 20).min(5);
                for i in 0..segments {
                    let x = 4 + i as i32 * 4;
                    let _ = Rectangle::new(Point::new(x, 4), Size::new(3, 8))
                        .into_styled(filled)
                        .draw(&mut self.display);
                }

                let mut label: heapless::String<8> = heapless::String::new();
                let _ = write!(label, "{}%", r.percent);
                let _ =
                    Text::new(label.as_str(), Point::new(32, 12), text_style()).draw(&mut self.display);
            }
            None => {
                let _ = Text::new("?", Point::new(10, 12), text_style()).draw(&mut self.display);
            }
        }
    }

    /// Flash marker in the top-right corner.
    fn draw_flash_marker(&mut self, flash_on: bool) {
        let marker = if flash_on { "F+" } else { "F-" };
        let _ = Text::new(marker, Point::new(112, 12), text_style()).draw(&mut self.display);
    }
}

fn text_style() -> embedded_graphics::mono_font::MonoTextStyle<'static, BinaryColor> {
    MonoTextStyleBuilder::new()
        .font(&FONT_6X10)
        .text_color(BinaryColor::On)
        .build()
}

fn title_style() -> embedded_graphics::mono_font::MonoTextStyle<'static, BinaryColor> {
    MonoTextStyleBuilder::new()
        .font(&FONT_9X15)
        .text_color(BinaryColor::On)
        .build()
}

impl<I2C> Panel for Screens<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    fn home(&mut self, battery: Option<BatteryReading>, flash_on: bool) {
        self.begin_frame();

        self.draw_battery(battery);
        self.draw_flash_marker(flash_on);

        let _ = Text::new("Home", Point::new(0, 40), title_style()).draw(&mut self.display);
        let _ = Text::new("Press to shoot", Point::new(0, 56), text_style()).draw(&mut self.display);

        self.end_frame();
    }

    fn taking_picture(&mut self) {
        self.begin_frame();

        let _ = Text::new("Taking picture...", Point::new(0, 24), text_style())
            .draw(&mut self.display);

        self.end_frame();
    }

    fn flash(&mut self, flash_on: bool) {
        self.begin_frame();

        let _ = Text::new("Flash", Point::new(0, 14), title_style()).draw(&mut self.display);
        let status = if flash_on { "Flash: On" } else { "Flash: Off" };
        let _ = Text::new(status, Point::new(0, 34), text_style()).draw(&mut self.display);
        let _ = Text::new("Hold to toggle", Point::new(0, 48), text_style()).draw(&mut self.display);

        self.end_frame();
    }

    fn film_download(&mut self) {
        self.begin_frame();

        let _ = Text::new("Film download", Point::new(0, 14), title_style()).draw(&mut self.display);
        let _ = Text::new("Hold to send film", Point::new(0, 34), text_style())
            .draw(&mut self.display);

        self.end_frame();
    }
}
