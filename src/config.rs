//! Command-line configuration. Parsed by hand from `std::env::args` since
//! nothing else in this lineage reaches for an argument-parsing crate.

use std::env;

pub struct Config {
    pub bios_path: String,
    pub trace: bool,
}

impl Config {
    /// Usage errors (missing BIOS path) are a CLI-surface concern, not an
    /// `EmuError` -- those are reserved for failures once emulation has
    /// actually started.
    pub fn from_args() -> Result<Self, String> {
        let mut bios_path = None;
        let mut trace = false;

        for arg in env::args().skip(1) {
            match arg.as_str() {
                "--trace" => trace = true,
                other => bios_path = Some(other.to_string()),
            }
        }

        let bios_path = bios_path.ok_or("usage: rpsx [--trace] <bios-path>")?;

        Ok(Config { bios_path, trace })
    }
}
