//! Registry of supported microcontroller boards.
//!
//! Boards are identified by the USB vendor id their serial bridge reports.
//! A board may ship with more than one bridge chip, so each entry owns a set
//! of vendor ids.

use std::fmt::Write as _;

/// A supported microcontroller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mcu {
    /// USB vendor ids this board may enumerate with.
    pub vendor_ids: &'static [u16],

    /// Human-readable board name.
    pub name: &'static str,

    /// Short name used in messages.
    pub nickname: &'static str,

    /// Nickname with its article, e.g. "an ESP32".
    pub nickname_determiner: &'static str,
}

impl Mcu {
    /// Whether a port reporting `vid` belongs to this board.
    pub fn matches(&self, vid: u16) -> bool {
        self.vendor_ids.contains(&vid)
    }
}

/// Supported boards, in the order they are offered to the user.
pub const VALID_MCUS: &[Mcu] = &[
    Mcu {
        vendor_ids: &[5824],
        name: "Teensy 3.2",
        nickname: "Teensy",
        nickname_determiner: "a Teensy",
    },
    Mcu {
        vendor_ids: &[10755, 9025],
        name: "Arduino Uno (FTDI chipset)",
        nickname: "Arduino Uno",
        nickname_determiner: "an Uno",
    },
    Mcu {
        vendor_ids: &[6790],
        name: "ESP8266 D1 Mini Pro (with CH340 Adapter)",
        nickname: "ESP8266",
        nickname_determiner: "an ESP8266",
    },
    Mcu {
        vendor_ids: &[4292, 12346],
        name: "ESP32 Dev Module",
        nickname: "ESP32",
        nickname_determiner: "an ESP32",
    },
    Mcu {
        vendor_ids: &[11914],
        name: "Raspberry Pi Pico",
        nickname: "Raspberry Pi Pico",
        nickname_determiner: "a Pico",
    },
];

/// Index selected when nothing else is configured (Arduino Uno).
pub const DEFAULT_DEVICE_INDEX: usize = 1;

/// Look up a board by its position in the registry.
pub fn by_index(index: usize) -> Option<&'static Mcu> {
    VALID_MCUS.get(index)
}

/// Look up the first board owning a vendor id.
pub fn by_vendor_id(vid: u16) -> Option<&'static Mcu> {
    VALID_MCUS.iter().find(|mcu| mcu.matches(vid))
}

/// Position of a board in the registry.
pub fn index_of(mcu: &Mcu) -> Option<usize> {
    VALID_MCUS.iter().position(|m| m == mcu)
}

/// One `(i): name` line per board, for help text and prompts.
pub fn device_list() -> String {
    let mut out = String::new();
    for (i, mcu) in VALID_MCUS.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(out, "({}): {}", i, mcu.name);
    }
    out
}
