//! Load `pcicalc` against a simulated PCI bus and feed it stdin.
//!
//! ```text
//! pcicalc-sim [--log LEVEL] [--id VENDOR:DEVICE] [--fail STEP]...
//! ```
//!
//! Every input line (newline included) is one `write()`; the reply is the
//! following `read()` from offset 0. `STEP` is one of `request-region`,
//! `map-bar`, `alloc-dma`, `read-command`, `write-command` and makes that
//! platform call fail once during probe.

mod logger;

use crate::logger::StderrLogger;
use kernel_pci::sim::{SimFault, SimPlatform};
use kernel_pci::{PciDeviceId, PciLocation};
use log::{LevelFilter, info, warn};
use pcicalc::{CharDevRegistry, ChrdevError, ModuleConfig, PciCalcModule, ProbeOutcome};
use std::io::{self, BufRead, Write};
use std::{env, process::ExitCode};

#[derive(Debug, thiserror::Error)]
enum ArgsError {
    #[error("unknown argument {0:?}")]
    Unknown(String),
    #[error("{0} needs a value")]
    MissingValue(&'static str),
    #[error("bad log level {0:?}")]
    Level(String),
    #[error("bad device id {0:?}, expected VENDOR:DEVICE in hex")]
    Id(String),
    #[error("unknown fault {0:?}")]
    Fault(String),
}

struct Options {
    level: LevelFilter,
    id: PciDeviceId,
    faults: Vec<SimFault>,
}

impl Options {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut options = Self {
            level: LevelFilter::Info,
            id: ModuleConfig::DEFAULT.ids[0],
            faults: Vec::new(),
        };
        while let Some(arg) = args.next() {
            let flag = match arg.as_str() {
                "--log" => "--log",
                "--id" => "--id",
                "--fail" => "--fail",
                _ => return Err(ArgsError::Unknown(arg)),
            };
            let value = args.next().ok_or(ArgsError::MissingValue(flag))?;
            match flag {
                "--log" => options.level = value.parse().map_err(|_| ArgsError::Level(value))?,
                "--id" => options.id = parse_id(&value).ok_or(ArgsError::Id(value))?,
                _ => options.faults.push(parse_fault(&value).ok_or(ArgsError::Fault(value))?),
            }
        }
        Ok(options)
    }
}

fn parse_id(text: &str) -> Option<PciDeviceId> {
    let (vendor, device) = text.split_once(':')?;
    Some(PciDeviceId::new(
        u16::from_str_radix(vendor, 16).ok()?,
        u16::from_str_radix(device, 16).ok()?,
    ))
}

fn parse_fault(text: &str) -> Option<SimFault> {
    Some(match text {
        "request-region" => SimFault::RequestRegion,
        "map-bar" => SimFault::MapBar,
        "alloc-dma" => SimFault::AllocDma,
        "read-command" => SimFault::ReadCommand,
        "write-command" => SimFault::WriteCommand,
        _ => return None,
    })
}

/// Accepts every major number and logs the calls.
struct LoggingRegistry;

impl CharDevRegistry for LoggingRegistry {
    fn register(&self, major: u32, name: &'static str) -> Result<(), ChrdevError> {
        info!("register_chrdev({major}, {name:?})");
        Ok(())
    }

    fn unregister(&self, major: u32, name: &'static str) {
        info!("unregister_chrdev({major}, {name:?})");
    }
}

fn main() -> ExitCode {
    let options = match Options::parse(env::args().skip(1)) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("pcicalc-sim: {e}");
            return ExitCode::from(2);
        }
    };
    if StderrLogger::new(options.level).init().is_err() {
        eprintln!("pcicalc-sim: logger already installed");
    }

    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pcicalc-sim: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(options: &Options) -> Result<(), Box<dyn std::error::Error>> {
    let platform = SimPlatform::new();
    let registry = LoggingRegistry;
    let func = platform.add_device(PciLocation::new(0, 3, 0), options.id);
    for fault in &options.faults {
        platform.inject(*fault);
    }

    let module = PciCalcModule::init(ModuleConfig::DEFAULT, &platform, &registry)?;
    let driver = module.driver();
    match driver.probe(&func) {
        Ok(ProbeOutcome::Bound) => info!(
            "register 0 of {func} = {:#x}",
            platform.read_register(&func, 0, 0).unwrap_or_default()
        ),
        Ok(ProbeOutcome::Declined) => warn!("{func} declined, running without hardware"),
        Err(e) => warn!("probe failed ({}): {e}", e.errno()),
    }

    let session = driver.open();
    let mut stdout = io::stdout().lock();
    for line in io::stdin().lock().lines() {
        let mut request = line?.into_bytes();
        request.push(b'\n');
        match session.write(&mut request.as_slice()) {
            Ok(_) => {
                let mut reply = [0u8; 64];
                let mut offset = 0;
                let n = session.read(&mut &mut reply[..], &mut offset)?;
                stdout.write_all(&reply[..n])?;
            }
            Err(e) => writeln!(stdout, "error {}: {e}", e.errno())?,
        }
    }
    session.release();
    module.exit();

    let left = platform.outstanding();
    if !left.is_empty() {
        warn!("resources leaked: {left:?}");
    }
    Ok(())
}
