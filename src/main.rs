use std::fs;
use std::process::ExitCode;

use log::error;

use rpsx::bios::Bios;
use rpsx::config::Config;
use rpsx::Emulator;

fn main() -> ExitCode {
    let config = match Config::from_args() {
        Ok(config) => config,
        Err(usage) => {
            eprintln!("{usage}");
            return ExitCode::FAILURE;
        }
    };

    let mut builder = env_logger::Builder::from_default_env();
    if config.trace {
        builder.filter_level(log::LevelFilter::Trace);
    }
    builder.init();

    let data = match fs::read(&config.bios_path) {
        Ok(data) => data,
        Err(e) => {
            error!("reading {}: {e}", config.bios_path);
            return ExitCode::FAILURE;
        }
    };

    let bios = match Bios::new(data) {
        Ok(bios) => bios,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut emu = Emulator::new(bios);

    loop {
        if let Err(e) = emu.step() {
            error!("{e}");
            return ExitCode::FAILURE;
        }

        if config.trace {
            log::trace!("pc={:08x} retired={}", emu.cpu().pc(), emu.cpu().retired());
        }
    }
}
