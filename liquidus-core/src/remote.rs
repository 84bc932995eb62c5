//! Remote command execution
//!
//! Runs parsed protocol commands against the [`Oven`] and writes the reply.
//! Mutating commands (see [`Command::is_mutating`]) only run while this
//! side holds the [`InteractiveLock`]; if the local UI has it, the reply is
//! `Failed - Busy`.

use core::fmt::{self, Write};

use liquidus_hal::EepromController;
use liquidus_protocol::response::{write_identity, write_pid, write_plot_header, write_thermocouples};
use liquidus_protocol::{ChannelConfig, Command, ParseError, PlotRecord, ProfileRecord, Reply};

use crate::config::THERMOCOUPLE_OFFSET;
use crate::control::PidGains;
use crate::interactive::InteractiveLock;
use crate::oven::{Oven, OvenError};
use crate::profile::{Description, SolderProfile, FLAG_UNLOCKED};
use crate::sensor::CHANNEL_COUNT;
use crate::state::ControllerState;
use crate::traits::ThermocoupleProbe;

/// Parse and execute one line
pub fn handle_line<P, C, W>(
    lock: &InteractiveLock,
    oven: &mut Oven<'_, P, C>,
    line: &str,
    out: &mut W,
) -> fmt::Result
where
    P: ThermocoupleProbe,
    C: EepromController,
    W: Write,
{
    let command = match Command::parse(line) {
        Ok(command) => command,
        Err(ParseError::Unrecognized) => return Reply::Unrecognized.write_to(out),
        Err(ParseError::DataError) => return Reply::DataError.write_to(out),
    };

    if !command.is_mutating() {
        return execute(oven, command, out);
    }
    match lock.try_lock() {
        Some(_guard) => execute(oven, command, out),
        None => Reply::Busy.write_to(out),
    }
}

/// Execute a parsed command
///
/// Does not take the interactive lock; see [`handle_line`].
pub fn execute<P, C, W>(oven: &mut Oven<'_, P, C>, command: Command<'_>, out: &mut W) -> fmt::Result
where
    P: ThermocoupleProbe,
    C: EepromController,
    W: Write,
{
    #[cfg(feature = "defmt")]
    defmt::debug!("remote: {}", command);

    match command {
        Command::Identify => write_identity(out),
        Command::QueryThermocouples => {
            let mut channels = [ChannelConfig::default(); CHANNEL_COUNT];
            for (index, channel) in channels.iter_mut().enumerate() {
                channel.enabled = oven.is_channel_enabled(index).unwrap_or(false);
                channel.offset = oven.channel_offset(index).unwrap_or(0);
            }
            write_thermocouples(out, &channels)
        }
        Command::SetThermocouples(channels) => {
            let in_range = channels.iter().all(|c| {
                (THERMOCOUPLE_OFFSET.min..=THERMOCOUPLE_OFFSET.max).contains(&c.offset)
            });
            if !in_range {
                return Reply::DataError.write_to(out);
            }
            let result = channels.iter().enumerate().try_for_each(|(index, c)| {
                oven.enable_channel(index, c.enabled)?;
                oven.set_channel_offset(index, c.offset).map(|_| ())
            });
            reply(out, result)
        }
        Command::QueryPid => {
            let gains = oven.pid_gains();
            write_pid(out, gains.kp, gains.ki, gains.kd)
        }
        Command::SetPid { kp, ki, kd } => {
            let result = oven.set_pid_gains(PidGains { kp, ki, kd });
            reply(out, result.map(|_| ()))
        }
        Command::QueryProfile(index) => {
            let index = index.map_or(oven.current_profile_index(), usize::from);
            match oven.profile(index) {
                Ok(profile) => to_record(index as u8, &profile).write_to(out),
                Err(_) => Reply::DataError.write_to(out),
            }
        }
        Command::SelectProfile(index) => {
            let result = oven.select_profile(index as usize);
            reply(out, result)
        }
        Command::SetProfile(record) => {
            let index = record.index as usize;
            let profile = from_record(&record);
            let result = oven
                .set_profile(index, &profile)
                .and_then(|()| oven.select_profile(index));
            reply(out, result)
        }
        Command::QueryPlot => write_plot(oven, out),
        Command::Run => {
            let result = oven.start_current();
            reply(out, result)
        }
        Command::Abort => {
            oven.abort();
            Reply::Ok.write_to(out)
        }
        Command::QueryRun => {
            let status = match oven.current_state() {
                ControllerState::Complete => Reply::Ok,
                ControllerState::Fail | ControllerState::Off => Reply::Failed,
                _ => Reply::Running,
            };
            status.write_to(out)
        }
    }
}

fn reply<W: Write>(out: &mut W, result: Result<(), OvenError>) -> fmt::Result {
    let reply = match result {
        Ok(()) => Reply::Ok,
        Err(OvenError::Busy) => Reply::Busy,
        Err(
            OvenError::Profile(_) | OvenError::InvalidGains | OvenError::NoSuchChannel,
        ) => Reply::DataError,
        Err(_) => Reply::Failed,
    };
    reply.write_to(out)
}

fn write_plot<P, C, W>(oven: &Oven<'_, P, C>, out: &mut W) -> fmt::Result
where
    P: ThermocoupleProbe,
    C: EepromController,
    W: Write,
{
    let log = oven.log();
    write_plot_header(out, log.len())?;
    let last = log.last_index();
    for (second, point) in log.iter().enumerate() {
        let record = PlotRecord {
            state: point.state().name(),
            time: second as u32,
            target: point.target(),
            average: point.average_temperature(),
            heater: point.heater(),
            fan: point.fan(),
            temperatures: core::array::from_fn(|channel| point.temperature(channel)),
        };
        record.write_to(out, Some(second) == last)?;
    }
    Ok(())
}

fn to_record(index: u8, profile: &SolderProfile) -> ProfileRecord<'_> {
    ProfileRecord {
        index,
        description: profile.description.as_str(),
        flags: if profile.unlocked { FLAG_UNLOCKED } else { 0 },
        liquidus: profile.liquidus,
        preheat_time: profile.preheat_time,
        soak_temp1: profile.soak_temp1,
        soak_temp2: profile.soak_temp2,
        soak_time: profile.soak_time,
        ramp_up_slope: profile.ramp_up_slope,
        peak_temp: profile.peak_temp,
        peak_dwell: profile.peak_dwell,
        ramp_down_slope: profile.ramp_down_slope,
    }
}

fn from_record(record: &ProfileRecord<'_>) -> SolderProfile {
    SolderProfile {
        description: Description::new(record.description),
        unlocked: record.flags & FLAG_UNLOCKED != 0,
        liquidus: record.liquidus,
        preheat_time: record.preheat_time,
        soak_temp1: record.soak_temp1,
        soak_temp2: record.soak_temp2,
        soak_time: record.soak_time,
        ramp_up_slope: record.ramp_up_slope,
        peak_temp: record.peak_temp,
        peak_dwell: record.peak_dwell,
        ramp_down_slope: record.ramp_down_slope,
    }
}
