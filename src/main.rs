// Hides the console window on Windows in release builds.
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::process::ExitCode;

use log::{error, info};

fn main() -> ExitCode {
    env_logger::init();
    info!("starting marquis_runner");
    match marquis_runner::launcher::run() {
        Ok(role) => {
            info!("exiting after {role:?} launch");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
