//! Build script for liquidus-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates oven.toml and turns it into board constants

use std::env;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// GPIOs usable as SCK / MISO on each SPI block
const SPI0_SCK: &[i64] = &[2, 6, 18, 22];
const SPI0_MISO: &[i64] = &[0, 4, 16, 20];
const SPI1_SCK: &[i64] = &[10, 14, 26];
const SPI1_MISO: &[i64] = &[8, 12, 28];

const EEPROM_SIZES: &[(i64, &str)] = &[
    (32, "Bytes32"),
    (64, "Bytes64"),
    (128, "Bytes128"),
    (256, "Bytes256"),
    (512, "Bytes512"),
    (1024, "Kib1"),
    (2048, "Kib2"),
];

/// Backing flash must be this many times the window
const BACKING_RATIO: i64 = 16;

fn main() {
    setup_linker();
    let board = validate_config();
    write_board(&board);
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validated board settings
struct Board {
    eeprom_size: &'static str,
    partition_split: &'static str,
    spi: &'static str,
    sck: i64,
    miso: i64,
    frequency_hz: i64,
    cs: Vec<i64>,
    heater: i64,
    heater_active_low: bool,
    fan: i64,
    fan_active_low: bool,
    zero_cross: i64,
    case_fan: i64,
    buzzer: i64,
}

/// Validate oven.toml at compile time
fn validate_config() -> Board {
    println!("cargo:rerun-if-changed=oven.toml");

    let config_path = Path::new("oven.toml");
    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read oven.toml", &[e.to_string()]),
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => fail(
            "Invalid TOML syntax in oven.toml",
            &e.to_string().lines().map(str::to_string).collect::<Vec<_>>(),
        ),
    };

    let mut errors = Vec::new();
    let mut int = |section: &str, key: &str| -> i64 {
        match config.get(section).and_then(|s| s.get(key)) {
            Some(toml::Value::Integer(v)) => *v,
            Some(_) => {
                errors.push(format!("[{}] {} must be an integer", section, key));
                0
            }
            None => {
                errors.push(format!("[{}] missing '{}'", section, key));
                0
            }
        }
    };

    let eeprom_bytes = int("storage", "eeprom_bytes");
    let sck = int("thermocouples", "sck");
    let miso = int("thermocouples", "miso");
    let frequency_hz = int("thermocouples", "frequency_hz");
    let heater = int("outputs", "heater");
    let fan = int("outputs", "fan");
    let zero_cross = int("outputs", "zero_cross");
    let case_fan = int("outputs", "case_fan");
    let buzzer = int("outputs", "buzzer");

    let text = |section: &str, key: &str| -> Option<String> {
        config
            .get(section)
            .and_then(|s| s.get(key))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    };
    let flag = |section: &str, key: &str| -> bool {
        config
            .get(section)
            .and_then(|s| s.get(key))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    };

    let eeprom_size = EEPROM_SIZES
        .iter()
        .find(|(bytes, _)| *bytes == eeprom_bytes)
        .map(|(_, name)| *name);
    if eeprom_size.is_none() {
        errors.push(format!(
            "[storage] eeprom_bytes must be a power of two from 32 to 2048, got {}",
            eeprom_bytes
        ));
    }

    let (partition_split, backing) = match text("storage", "partition_split").as_deref() {
        Some("half") => ("Half", 32 * 1024),
        Some("backing_only") => ("BackingOnly", 64 * 1024),
        _ => {
            errors.push("[storage] partition_split must be 'half' or 'backing_only'".into());
            ("Half", 0)
        }
    };
    if backing > 0 && eeprom_bytes * BACKING_RATIO > backing {
        errors.push(format!(
            "[storage] {} byte window needs {} bytes of backing",
            eeprom_bytes,
            eeprom_bytes * BACKING_RATIO
        ));
    }

    let spi = match text("thermocouples", "spi").as_deref() {
        Some("spi0") => {
            check_pin_set(&mut errors, "sck", sck, SPI0_SCK);
            check_pin_set(&mut errors, "miso", miso, SPI0_MISO);
            "SPI0"
        }
        Some("spi1") => {
            check_pin_set(&mut errors, "sck", sck, SPI1_SCK);
            check_pin_set(&mut errors, "miso", miso, SPI1_MISO);
            "SPI1"
        }
        _ => {
            errors.push("[thermocouples] spi must be 'spi0' or 'spi1'".into());
            "SPI0"
        }
    };

    // MAX31855 tops out at 5 MHz
    if !(100_000..=5_000_000).contains(&frequency_hz) {
        errors.push("[thermocouples] frequency_hz must be 100000-5000000".into());
    }

    let cs: Vec<i64> = match config.get("thermocouples").and_then(|s| s.get("cs")) {
        Some(toml::Value::Array(pins)) => pins.iter().filter_map(|p| p.as_integer()).collect(),
        _ => Vec::new(),
    };
    if cs.len() != 4 {
        errors.push("[thermocouples] cs must list exactly 4 pins".into());
    }

    let mut used: Vec<i64> = vec![sck, miso, heater, fan, zero_cross, case_fan, buzzer];
    used.extend(&cs);
    for (i, pin) in used.iter().enumerate() {
        if !(0..=29).contains(pin) {
            errors.push(format!("GPIO {} does not exist (0-29)", pin));
        } else if used[..i].contains(pin) {
            errors.push(format!("GPIO {} assigned twice", pin));
        }
    }

    if !errors.is_empty() {
        fail("Invalid board configuration in oven.toml", &errors);
    }

    println!("cargo:warning=oven.toml validated successfully");

    Board {
        eeprom_size: eeprom_size.unwrap_or("Kib1"),
        partition_split,
        spi,
        sck,
        miso,
        frequency_hz,
        cs,
        heater,
        heater_active_low: flag("outputs", "heater_active_low"),
        fan,
        fan_active_low: flag("outputs", "fan_active_low"),
        zero_cross,
        case_fan,
        buzzer,
    }
}

fn check_pin_set(errors: &mut Vec<String>, name: &str, pin: i64, allowed: &[i64]) {
    if !allowed.contains(&pin) {
        errors.push(format!(
            "[thermocouples] {} = {} is not one of {:?}",
            name, pin, allowed
        ));
    }
}

/// Emit board.rs into OUT_DIR
fn write_board(board: &Board) {
    let mut out = String::new();
    let _ = writeln!(out, "// Generated from oven.toml by build.rs");
    let _ = writeln!(
        out,
        "pub const EEPROM_SIZE: liquidus_hal_rp2040::flash::EepromSize = \
         liquidus_hal_rp2040::flash::EepromSize::{};",
        board.eeprom_size
    );
    let _ = writeln!(
        out,
        "pub const PARTITION_SPLIT: liquidus_hal_rp2040::flash::PartitionSplit = \
         liquidus_hal_rp2040::flash::PartitionSplit::{};",
        board.partition_split
    );
    let _ = writeln!(out, "pub const SPI_FREQUENCY_HZ: u32 = {};", board.frequency_hz);
    let _ = writeln!(out, "pub const HEATER_ACTIVE_LOW: bool = {};", board.heater_active_low);
    let _ = writeln!(out, "pub const FAN_ACTIVE_LOW: bool = {};", board.fan_active_low);
    let _ = writeln!(
        out,
        "pub type ThermocoupleSpi = embassy_rp::peripherals::{};",
        board.spi
    );

    // PWM slice and channel follow from the GPIO number
    let slice = (board.case_fan / 2) % 8;
    let channel = if board.case_fan % 2 == 0 { "a" } else { "b" };

    let pin = |n: i64| format!("embassy_rp::Peri::<embassy_rp::gpio::AnyPin>::from($p.PIN_{})", n);
    let cs = board
        .cs
        .iter()
        .map(|&n| pin(n))
        .collect::<Vec<_>>()
        .join(",\n                ");

    let _ = writeln!(
        out,
        "
/// Take the board's peripherals out of `embassy_rp::Peripherals`
macro_rules! take_board {{
    ($p:ident) => {{
        $crate::board::Board {{
            spi: embassy_rp::spi::Spi::new_blocking_rxonly(
                $p.{spi},
                $p.PIN_{sck},
                $p.PIN_{miso},
                $crate::board::spi_config(),
            ),
            cs: [
                {cs},
            ],
            heater: {heater},
            fan: {fan},
            zero_cross: {zero_cross},
            buzzer: {buzzer},
            case_fan: embassy_rp::pwm::Pwm::new_output_{channel}(
                $p.PWM_SLICE{slice},
                $p.PIN_{case_fan},
                $crate::board::case_fan_config(0),
            ),
        }}
    }};
}}",
        spi = board.spi,
        sck = board.sck,
        miso = board.miso,
        cs = cs,
        heater = pin(board.heater),
        fan = pin(board.fan),
        zero_cross = pin(board.zero_cross),
        buzzer = pin(board.buzzer),
        channel = channel,
        slice = slice,
        case_fan = board.case_fan,
    );

    let _ = writeln!(
        out,
        "pub const CASE_FAN_CHANNEL_A: bool = {};",
        channel == "a"
    );

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("board.rs"), out).unwrap();
}

fn fail(title: &str, lines: &[String]) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        lines
            .iter()
            .map(|e| format!("║  • {:<62} ║", e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}
