use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use clap::Parser;
use corsair_void::{
    config::Config, BatteryProperties, Headset, HidTransport, PowerState, PowerSupply,
    PowerSupplyDescriptor, BATTERY_REPORT_ID, FIRMWARE_REPORT_ID,
};

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// print connection, battery and firmware changes until the receiver is removed
    Monitor,
    /// print battery, microphone and firmware information
    Status,
    /// play an alert tone on the headset
    Alert {
        /// the alert to play, 0 or 1
        id: u8,
    },
    /// set the sidetone level
    Sidetone {
        /// the level, between 0 and 55
        level: u8,
    },
}

#[derive(clap::Parser, Debug)]
struct Args {
    /// how verbose the program should be
    #[clap(short, long, parse(from_occurrences))]
    verbose: usize,
    /// whether the program should be silent
    #[clap(short, long)]
    silent: bool,
    /// how many seconds to wait for the receiver to report the headset state
    #[clap(short, long, default_value = "2")]
    wait: u64,
    /// the action to perform
    #[clap(subcommand)]
    command: Command,
}

/// Publishes the battery to the log.
#[derive(Debug)]
struct LogPowerSupply;

impl PowerSupply for LogPowerSupply {
    type Handle = BatteryProperties;

    fn register(&self, descriptor: &PowerSupplyDescriptor) -> anyhow::Result<Self::Handle> {
        log::info!(
            "power supply {} appeared ({} by {}, scope {:?})",
            descriptor.name,
            descriptor.model_name,
            descriptor.manufacturer,
            descriptor.scope
        );

        Ok(descriptor.properties.clone())
    }

    fn unregister(&self, _: Self::Handle) {
        log::info!("power supply disappeared");
    }

    fn changed(&self, handle: &Self::Handle) {
        log::debug!("power supply changed: {}", handle.battery());
    }
}

type VoidHeadset = Headset<Arc<HidTransport>, LogPowerSupply>;

/// Hands reports to the headset until `done` returns `true` or the timeout passes.
///
/// Returns whether `done` was satisfied.
fn pump(
    headset: &VoidHeadset,
    transport: &HidTransport,
    timeout: Option<Duration>,
    mut done: impl FnMut(&VoidHeadset, &[u8]) -> bool,
) -> anyhow::Result<bool> {
    let start = Instant::now();

    loop {
        let report = transport.read_report(100)?;

        if let Some(&report_id) = report.first() {
            headset.deliver_report(report_id.into(), &report);
        }

        if done(headset, &report) {
            return Ok(true);
        }

        if timeout.map_or(false, |timeout| start.elapsed() > timeout) {
            return Ok(false);
        }
    }
}

fn format_version(version: Option<(u8, u8)>) -> String {
    match version {
        Some((major, minor)) => format!("{major}.{minor}"),
        None => String::from("unknown"),
    }
}

fn main() {
    let args = Args::parse();

    {
        let level_filter = match (args.silent, args.verbose) {
            (true, _) => LevelFilter::Off,
            (false, 0) => LevelFilter::Warn,
            (false, 1) => LevelFilter::Info,
            (false, 2) => LevelFilter::Debug,
            (false, _) => LevelFilter::Trace,
        };

        use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};
        if let Err(err) = TermLogger::init(
            level_filter,
            simplelog::Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ) {
            eprintln!("could not set up logging: {err}");
        }
    }

    let transport = match HidTransport::open() {
        Ok(transport) => Arc::new(transport),
        Err(err) => {
            log::error!("could not open the receiver: {err}");
            std::process::exit(1);
        }
    };

    let mut config = Config::default();
    config.set_model_name(transport.model_name());
    if let Some(serial) = transport.serial_number() {
        config.set_instance_name(serial);
    }

    if let Command::Monitor = args.command {
        config.set_power_state_change_handler(Some(Box::new(|power_state| match power_state {
            PowerState::Connected => println!("headset connected"),
            PowerState::Disconnected => println!("headset disconnected"),
        })));
        config.set_battery_change_handler(Some(Box::new(|battery| {
            println!("battery {battery}");
        })));
    }

    let headset = match Headset::attach(Arc::clone(&transport), LogPowerSupply, config) {
        Ok(headset) => headset,
        Err(err) => {
            log::error!("could not attach to the receiver: {err}");
            std::process::exit(1);
        }
    };

    let wait = Duration::from_secs(args.wait);
    let mut seen_battery = false;
    let mut seen_firmware = false;
    let mut seen = |report: &[u8]| {
        match report.first() {
            Some(&BATTERY_REPORT_ID) => seen_battery = true,
            Some(&FIRMWARE_REPORT_ID) => seen_firmware = true,
            _ => (),
        }

        (seen_battery, seen_firmware)
    };

    let result = match args.command {
        Command::Monitor => {
            let mut firmware = (None, None);

            pump(&headset, &transport, None, |headset, _| {
                let current = (
                    headset.firmware_version_receiver(),
                    headset.firmware_version_headset(),
                );

                if current != firmware {
                    firmware = current;
                    println!(
                        "firmware receiver {} headset {}",
                        format_version(current.0),
                        format_version(current.1)
                    );
                }

                false
            })
            .map(drop)
        }
        Command::Status => {
            pump(&headset, &transport, Some(wait), |_, report| seen(report) == (true, true))
                .map(|complete| {
                    if !complete {
                        log::warn!("receiver did not answer all requests in time");
                    }

                    let battery = headset.battery();
                    let microphone = match headset.microphone_up() {
                        Ok(true) => "up",
                        Ok(false) => "down",
                        Err(_) => "unknown",
                    };

                    println!("connected: {}", headset.is_connected());
                    println!("battery: {battery}");
                    println!("microphone: {microphone}");
                    println!(
                        "firmware: receiver {} headset {}",
                        format_version(headset.firmware_version_receiver()),
                        format_version(headset.firmware_version_headset())
                    );
                })
        }
        Command::Alert { id } => {
            pump(&headset, &transport, Some(wait), |_, report| seen(report).0).and_then(|_| {
                headset.send_alert(id)?;
                Ok(())
            })
        }
        Command::Sidetone { level } => {
            pump(&headset, &transport, Some(wait), |_, report| seen(report).0).and_then(|_| {
                headset.set_sidetone(level)?;
                Ok(())
            })
        }
    };

    if let Err(err) = result {
        log::error!("{err}");
        drop(headset);
        std::process::exit(1);
    }
}
