//! Reply formatting
//!
//! Everything is written through [`core::fmt::Write`] so a reply can go
//! straight into a transport buffer or, for short replies, into a
//! [`Response`] string.

use core::fmt::{self, Write};

use heapless::String;

use crate::command::{ChannelConfig, ProfileRecord};

/// Line ending of every reply
pub const TERMINATOR: &str = "\n\r";

/// Identification string
pub const IDN: &str = "SMT-Oven 1.0.0.0";

/// Longest single-line reply
pub const MAX_RESPONSE: usize = 128;

/// Buffer for one reply line
pub type Response = String<MAX_RESPONSE>;

/// Fixed replies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reply {
    Ok,
    Running,
    Failed,
    DataError,
    Unrecognized,
    /// Interactive lock held elsewhere
    Busy,
}

impl Reply {
    pub fn as_str(self) -> &'static str {
        match self {
            Reply::Ok => "OK",
            Reply::Running => "Running",
            Reply::Failed => "Failed",
            Reply::DataError => "Failed - Data error",
            Reply::Unrecognized => "Failed - unrecognized command",
            Reply::Busy => "Failed - Busy",
        }
    }

    pub fn write_to<W: Write>(self, out: &mut W) -> fmt::Result {
        out.write_str(self.as_str())?;
        out.write_str(TERMINATOR)
    }
}

/// `IDN?` reply
pub fn write_identity<W: Write>(out: &mut W) -> fmt::Result {
    out.write_str(IDN)?;
    out.write_str(TERMINATOR)
}

/// `THERM?` reply: `e,o,e,o,e,o,e,o;`
pub fn write_thermocouples<W: Write>(out: &mut W, channels: &[ChannelConfig]) -> fmt::Result {
    for (i, channel) in channels.iter().enumerate() {
        if i > 0 {
            out.write_char(',')?;
        }
        write!(out, "{},{}", channel.enabled as u8, channel.offset)?;
    }
    out.write_char(';')?;
    out.write_str(TERMINATOR)
}

/// `PID?` reply: `kp,ki,kd`
pub fn write_pid<W: Write>(out: &mut W, kp: f32, ki: f32, kd: f32) -> fmt::Result {
    write!(out, "{},{},{}", kp, ki, kd)?;
    out.write_str(TERMINATOR)
}

impl ProfileRecord<'_> {
    /// `PROF?` reply, the same field order `PROF` accepts
    pub fn write_to<W: Write>(&self, out: &mut W) -> fmt::Result {
        write!(
            out,
            "{},{},{:x},{},{},{},{},{},{},{},{},{}",
            self.index,
            self.description,
            self.flags,
            self.liquidus,
            self.preheat_time,
            self.soak_temp1,
            self.soak_temp2,
            self.soak_time,
            self.ramp_up_slope,
            self.peak_temp,
            self.peak_dwell,
            self.ramp_down_slope,
        )?;
        out.write_str(TERMINATOR)
    }
}

/// `PLOT?` header: number of records that follow
///
/// An empty log ends the transfer here.
pub fn write_plot_header<W: Write>(out: &mut W, count: usize) -> fmt::Result {
    write!(out, "{};", count)?;
    if count == 0 {
        out.write_str(TERMINATOR)?;
    }
    Ok(())
}

/// One logged second in a `PLOT?` transfer
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlotRecord<'a> {
    pub state: &'a str,
    pub time: u32,
    pub target: f32,
    /// NaN when no channel was usable
    pub average: f32,
    pub heater: u8,
    pub fan: u8,
    pub temperatures: [f32; 4],
}

impl PlotRecord<'_> {
    /// `state,time,target,avg,heater,fan,t1,t2,t3,t4;`
    ///
    /// The last record of a transfer carries the terminator.
    pub fn write_to<W: Write>(&self, out: &mut W, last: bool) -> fmt::Result {
        write!(
            out,
            "{},{},{:.1},{:.1},{},{}",
            self.state, self.time, self.target, self.average, self.heater, self.fan
        )?;
        for temperature in &self.temperatures {
            write!(out, ",{:.1}", temperature)?;
        }
        out.write_char(';')?;
        if last {
            out.write_str(TERMINATOR)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_replies() {
        let mut out = Response::new();
        Reply::DataError.write_to(&mut out).unwrap();
        assert_eq!(out.as_str(), "Failed - Data error\n\r");

        out.clear();
        write_identity(&mut out).unwrap();
        assert_eq!(out.as_str(), "SMT-Oven 1.0.0.0\n\r");
    }

    #[test]
    fn test_thermocouples() {
        let channels = [
            ChannelConfig {
                enabled: true,
                offset: 0,
            },
            ChannelConfig {
                enabled: false,
                offset: -3,
            },
            ChannelConfig {
                enabled: true,
                offset: 5,
            },
            ChannelConfig {
                enabled: true,
                offset: 0,
            },
        ];
        let mut out = Response::new();
        write_thermocouples(&mut out, &channels).unwrap();
        assert_eq!(out.as_str(), "1,0,0,-3,1,5,1,0;\n\r");
    }

    #[test]
    fn test_pid() {
        let mut out = Response::new();
        write_pid(&mut out, 40.0, 0.05, 62.5).unwrap();
        assert_eq!(out.as_str(), "40,0.05,62.5\n\r");
    }

    #[test]
    fn test_profile_reply_parses_back() {
        let record = ProfileRecord {
            index: 2,
            description: "NC-31 LOW-TEMP LF",
            flags: 0,
            liquidus: 140,
            preheat_time: 65,
            soak_temp1: 90,
            soak_temp2: 140,
            soak_time: 75,
            ramp_up_slope: 3.0,
            peak_temp: 160,
            peak_dwell: 15,
            ramp_down_slope: -3.0,
        };
        let mut out = Response::new();
        record.write_to(&mut out).unwrap();
        assert_eq!(
            out.as_str(),
            "2,NC-31 LOW-TEMP LF,0,140,65,90,140,75,3,160,15,-3\n\r"
        );

        let mut line = String::<MAX_RESPONSE>::new();
        write!(line, "PROF {}", out.trim_end()).unwrap();
        assert_eq!(
            crate::Command::parse(&line),
            Ok(crate::Command::SetProfile(record))
        );
    }

    #[test]
    fn test_plot() {
        let mut out = String::<256>::new();
        write_plot_header(&mut out, 0).unwrap();
        assert_eq!(out.as_str(), "0;\n\r");

        out.clear();
        let record = PlotRecord {
            state: "preheat",
            time: 12,
            target: 40.333,
            average: f32::NAN,
            heater: 55,
            fan: 30,
            temperatures: [40.5, f32::NAN, 41.0, 0.0],
        };
        record.write_to(&mut out, true).unwrap();
        assert_eq!(
            out.as_str(),
            "preheat,12,40.3,NaN,55,30,40.5,NaN,41.0,0.0;\n\r"
        );
    }
}
