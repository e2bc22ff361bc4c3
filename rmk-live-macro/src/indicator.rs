//! LED feedback for the live macro keys.
//!
//! Idle: the record key breathes, occupied slot keys are green.
//! While recording: the record key blinks red, free slot keys are green and occupied ones red.
//! The overwrite target blinks yellow until the overwrite is confirmed or dropped.
use embassy_time::Instant;

use crate::event::KeyAddr;
use crate::live_macro::LiveMacro;
use crate::live_macro::state::LiveMacroState;
use crate::storage::eeprom::Eeprom;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Rgb = Rgb::new(0, 0, 0);
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const GREEN: Rgb = Rgb::new(149, 255, 0);
    pub const YELLOW: Rgb = Rgb::new(209, 220, 27);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert a color in 8-bit HSV, where the hue wraps at 256
    pub const fn from_hsv(h: u8, s: u8, v: u8) -> Self {
        if s == 0 {
            return Self::new(v, v, v);
        }
        let (h, s, v) = (h as u16, s as u16, v as u16);
        let region = (h * 6) >> 8;
        let fpart = h * 6 - (region << 8);
        let p = ((v * (255 - s)) >> 8) as u8;
        let q = ((v * (255 - ((s * fpart) >> 8))) >> 8) as u8;
        let t = ((v * (255 - ((s * (255 - fpart)) >> 8))) >> 8) as u8;
        let v = v as u8;
        match region {
            0 => Self::new(v, t, p),
            1 => Self::new(q, v, p),
            2 => Self::new(p, v, t),
            3 => Self::new(p, q, v),
            4 => Self::new(t, p, v),
            _ => Self::new(v, p, q),
        }
    }
}

/// Hue of the breathing record key
const BREATH_HUE: u8 = 170;
/// Half period of the record key blinking while recording
const RECORD_BLINK_MS: u64 = 100;
/// Half period of the overwrite target blinking
const OVERWRITE_BLINK_MS: u64 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedCommand {
    /// Set the LED of the key
    Set(KeyAddr, Rgb),
    /// Give the LED of the key back to the default LED effect
    Refresh(KeyAddr),
}

/// Receiver of the LED updates, usually the per-key LED driver
pub trait LedSink {
    fn apply(&mut self, command: LedCommand);
}

impl<F: FnMut(LedCommand)> LedSink for F {
    fn apply(&mut self, command: LedCommand) {
        self(command)
    }
}

/// Render the live macro keys, call it on every LED frame
pub fn render<E: Eeprom>(engine: &mut LiveMacro<E>, now: Instant, sink: &mut impl LedSink) {
    let key_map = engine.key_map().clone();
    let Some(record_addr) = key_map.record_addr() else {
        // Without the record key on the active layer the keys are left to the default effect
        for (_, addr) in key_map.slot_addrs() {
            sink.apply(LedCommand::Refresh(addr));
        }
        return;
    };
    let ms = now.as_millis();

    match engine.state() {
        LiveMacroState::Idle => {
            sink.apply(LedCommand::Set(record_addr, breath(ms)));
            for (slot, addr) in key_map.slot_addrs() {
                let color = if engine.is_slot_occupied(slot) { Rgb::GREEN } else { Rgb::OFF };
                sink.apply(LedCommand::Set(addr, color));
            }
        }
        LiveMacroState::Recording | LiveMacroState::CaptureFull | LiveMacroState::AwaitingOverwriteConfirm { .. } => {
            sink.apply(LedCommand::Set(record_addr, blink(ms, RECORD_BLINK_MS, Rgb::RED)));
            let target = engine.overwrite_target();
            for (slot, addr) in key_map.slot_addrs() {
                let color = if target == Some(slot) {
                    blink(ms, OVERWRITE_BLINK_MS, Rgb::YELLOW)
                } else if engine.is_slot_occupied(slot) {
                    Rgb::RED
                } else {
                    Rgb::GREEN
                };
                sink.apply(LedCommand::Set(addr, color));
            }
        }
    }
}

fn blink(ms: u64, half_period: u64, color: Rgb) -> Rgb {
    if (ms / half_period) % 2 == 0 { color } else { Rgb::OFF }
}

/// Breathing effect with a period of about 4 seconds, smoothed with a cubic ease curve
fn breath(ms: u64) -> Rgb {
    let mut i = (ms >> 4) as u8 as u16;
    if i & 0x80 != 0 {
        i = 255 - i;
    }
    i <<= 1;
    let ii = (i * i) >> 8;
    let iii = (ii * i) >> 8;
    let value = (3 * ii - 2 * iii) / 2 + 80;
    Rgb::from_hsv(BREATH_HUE, 255, value.min(255) as u8)
}
