#![windows_subsystem = "windows"]

use std::process::ExitCode;

use eframe::egui;
use maskpaint::app::MaskPaintApp;
use maskpaint::{cli, logger};

fn main() -> ExitCode {
    // -- CLI / headless mode --------------------------------------------------
    if cli::CliArgs::is_cli_mode() {
        use clap::Parser;
        let args = cli::CliArgs::parse();
        return cli::run(args);
    }

    // -- GUI mode -------------------------------------------------------------

    // Session log is truncated at each launch.
    logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title("maskpaint"),
        ..Default::default()
    };

    match eframe::run_native(
        "maskpaint",
        options,
        Box::new(|cc| Box::new(MaskPaintApp::new(cc))),
    ) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("maskpaint: failed to start the UI: {}", e);
            ExitCode::FAILURE
        }
    }
}
