use std::{env, thread, time::Duration};

use eload_sdk::{Mode, Session, SessionConfig};
use inquire::Select;
use tracing_subscriber::EnvFilter;

// Configuration constants - adjust these for your setup
const BAUD_RATE: u32 = 115200;
const SETTLE_DELAY_MS: u64 = 2000;
const CC_STEPS_MA: [u32; 5] = [100, 200, 300, 400, 500];
const CV_SETPOINT_MV: u32 = 5000;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("eload_sdk=info")),
        )
        .with_target(false)
        .init();

    // Get serial port from command line arg or interactive selection
    let port_name = match env::args().nth(1) {
        Some(port) => port,
        None => {
            let ports = serialport::available_ports()?;
            if ports.is_empty() {
                eprintln!("No serial ports found!");
                std::process::exit(1);
            }
            let port_names: Vec<String> = ports.iter().map(|p| p.port_name.clone()).collect();
            Select::new("Select a serial port:", port_names).prompt()?
        }
    };

    println!("Using port: {}", port_name);

    let load = Session::serial(SessionConfig::new(port_name).with_baud_rate(BAUD_RATE));
    load.connect()?;
    thread::sleep(Duration::from_millis(SETTLE_DELAY_MS));

    load.enable_load();

    for current_ma in CC_STEPS_MA {
        load.set_mode(Mode::Cc, current_ma);
        println!("Set to CC mode, {} mA", current_ma);
        println!("{:?}", load.get_measurements());
        thread::sleep(Duration::from_millis(SETTLE_DELAY_MS));
    }

    for _ in 0..5 {
        let m = load.get_measurements();
        println!(
            "Measured: {:.3} A, {:.3} V, {:.3} Ω, {:.3} W, {:.1} °C",
            m.current_a(),
            m.voltage_v(),
            m.resistance_ohm(),
            m.power_w(),
            m.temperature_c()
        );
        thread::sleep(Duration::from_secs(1));
    }

    load.set_cv(CV_SETPOINT_MV);
    println!("Set to CV mode, {}V", CV_SETPOINT_MV as f32 / 1000.0);

    thread::sleep(Duration::from_secs(3));
    println!("Measurements in CV mode: {:#?}", load.get_measurements());

    load.disable_load();
    load.disconnect()?;
    Ok(())
}
