use anyhow::{anyhow, Context};
use link::{SimConfig, SimVehicle, TelloConfig, TelloLink};
use log::{error, info, warn};
use teleop::{ControlLoop, InputEvent, Rotation, TeleopError, VehicleLink};

use app::{TeleopApp, WINDOW_TITLE};
use config::{Config, LinkKind};

mod app;
mod config;
mod display;

fn build_link(config: &Config) -> anyhow::Result<Box<dyn VehicleLink + Send>> {
    Ok(match config.link {
        LinkKind::Sim => Box::new(SimVehicle::new(SimConfig::default())),
        LinkKind::Tello => {
            let addr = config
                .tello_addr
                .parse()
                .with_context(|| format!("Invalid TELLO_ADDR `{}`", config.tello_addr))?;
            Box::new(TelloLink::new(TelloConfig::new(addr)))
        }
    })
}

fn print_battery(battery_percent: Option<u8>) {
    match battery_percent {
        Some(percent) => println!("Battery: {}%", percent),
        None => println!("Battery: unknown"),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    info!("Configuration: {:?}", config);

    let link = build_link(&config)?;
    let (display, handle) = display::channel_display(Rotation::Deg270);
    let teleop_config = config.teleop();
    let repaint_every = teleop_config.cycle_period();

    let mut control = ControlLoop::new(link, display, teleop_config)?;
    control.start().context("Failed to connect to vehicle")?;

    let quit = handle.clone();
    let control_thread = std::thread::spawn(move || control.run());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window_width, config.window_height])
            .with_title(WINDOW_TITLE),
        ..Default::default()
    };
    let window = eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(move |_cc| Ok(Box::new(TeleopApp::new(handle, repaint_every)))),
    );
    if let Err(e) = &window {
        error!("Window failed: {}", e);
    }

    // no-op if the window already asked the loop to quit
    quit.send(InputEvent::Quit);
    let outcome = control_thread
        .join()
        .map_err(|_| anyhow!("Control loop panicked"))?;
    let report = match outcome {
        Ok(report) => report,
        Err(e) => {
            if let TeleopError::Link {
                battery_percent, ..
            } = &e
            {
                print_battery(*battery_percent);
            }
            return Err(e).context("Teleoperation aborted");
        }
    };

    if !report.grounded {
        warn!("Vehicle could not be landed");
    }
    print_battery(report.battery_percent);

    window.map_err(|e| anyhow!("Window failed: {}", e))
}
