//! Command parsing
//!
//! | Line                      | Command                      |
//! |---------------------------|------------------------------|
//! | `IDN?`                    | [`Command::Identify`]        |
//! | `THERM?`                  | [`Command::QueryThermocouples`] |
//! | `THERM e,o,e,o,e,o,e,o`   | [`Command::SetThermocouples`] |
//! | `PID?`                    | [`Command::QueryPid`]        |
//! | `PID kp,ki,kd`            | [`Command::SetPid`]          |
//! | `PROF?` / `PROF? n`       | [`Command::QueryProfile`]    |
//! | `PROF n`                  | [`Command::SelectProfile`]   |
//! | `PROF n,desc,flags,...`   | [`Command::SetProfile`]      |
//! | `PLOT?`                   | [`Command::QueryPlot`]       |
//! | `RUN` / `ABORT` / `RUN?`  | run control                  |

use core::str::FromStr;

/// Thermocouple channels addressed by `THERM`
pub const CHANNELS: usize = 4;

/// Errors from command parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Keyword not known
    Unrecognized,
    /// Keyword known, arguments malformed
    DataError,
}

/// Enable flag and calibration offset of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    pub enabled: bool,
    pub offset: i16,
}

/// A profile slot as it travels over the wire
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProfileRecord<'a> {
    pub index: u8,
    pub description: &'a str,
    /// Bit 0: unlocked
    pub flags: u8,
    pub liquidus: i16,
    pub preheat_time: u16,
    pub soak_temp1: i16,
    pub soak_temp2: i16,
    pub soak_time: u16,
    pub ramp_up_slope: f32,
    pub peak_temp: i16,
    pub peak_dwell: u16,
    pub ramp_down_slope: f32,
}

/// A parsed command line
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command<'a> {
    Identify,
    QueryThermocouples,
    SetThermocouples([ChannelConfig; CHANNELS]),
    QueryPid,
    SetPid { kp: f32, ki: f32, kd: f32 },
    /// Current profile, or slot `n`
    QueryProfile(Option<u8>),
    /// Make slot `n` current without editing it
    SelectProfile(u8),
    /// Overwrite a slot and make it current
    SetProfile(ProfileRecord<'a>),
    QueryPlot,
    Run,
    Abort,
    QueryRun,
}

impl<'a> Command<'a> {
    /// Parse one line, without its terminator
    pub fn parse(line: &'a str) -> Result<Self, ParseError> {
        let line = line.trim();
        let (keyword, args) = match line.split_once(' ') {
            Some((keyword, args)) => (keyword, Some(args.trim().trim_end_matches(';'))),
            None => (line.trim_end_matches(';'), None),
        };

        let is = |name: &str| keyword.eq_ignore_ascii_case(name);

        if is("IDN?") {
            no_args(args, Command::Identify)
        } else if is("THERM?") {
            no_args(args, Command::QueryThermocouples)
        } else if is("THERM") {
            parse_thermocouples(args.ok_or(ParseError::DataError)?)
        } else if is("PID?") {
            no_args(args, Command::QueryPid)
        } else if is("PID") {
            let mut fields = Fields::new(args.ok_or(ParseError::DataError)?);
            let command = Command::SetPid {
                kp: fields.next()?,
                ki: fields.next()?,
                kd: fields.next()?,
            };
            fields.finish(command)
        } else if is("PROF?") {
            match args {
                None => Ok(Command::QueryProfile(None)),
                Some(index) => Ok(Command::QueryProfile(Some(parse_field(index)?))),
            }
        } else if is("PROF") {
            parse_profile(args.ok_or(ParseError::DataError)?)
        } else if is("PLOT?") {
            no_args(args, Command::QueryPlot)
        } else if is("RUN") {
            no_args(args, Command::Run)
        } else if is("ABORT") {
            no_args(args, Command::Abort)
        } else if is("RUN?") {
            no_args(args, Command::QueryRun)
        } else {
            Err(ParseError::Unrecognized)
        }
    }

    /// Commands that change persisted settings or the run state
    ///
    /// These must run with the interactive lock held.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Command::SetThermocouples(_)
                | Command::SetPid { .. }
                | Command::SelectProfile(_)
                | Command::SetProfile(_)
                | Command::Run
                | Command::Abort
        )
    }
}

fn no_args<'a>(args: Option<&str>, command: Command<'a>) -> Result<Command<'a>, ParseError> {
    match args {
        None => Ok(command),
        Some(_) => Err(ParseError::DataError),
    }
}

fn parse_thermocouples(args: &str) -> Result<Command<'static>, ParseError> {
    let mut fields = Fields::new(args);
    let mut channels = [ChannelConfig::default(); CHANNELS];
    for channel in channels.iter_mut() {
        let enabled: i32 = fields.next()?;
        channel.enabled = enabled != 0;
        channel.offset = fields.next()?;
    }
    fields.finish(Command::SetThermocouples(channels))
}

fn parse_profile(args: &str) -> Result<Command<'_>, ParseError> {
    let mut fields = Fields::new(args);
    let index = fields.next()?;
    let Some(description) = fields.next_raw() else {
        return Ok(Command::SelectProfile(index));
    };

    let flags = u8::from_str_radix(fields.next_raw().ok_or(ParseError::DataError)?, 16)
        .map_err(|_| ParseError::DataError)?;
    let record = ProfileRecord {
        index,
        description,
        flags,
        liquidus: fields.next()?,
        preheat_time: fields.next()?,
        soak_temp1: fields.next()?,
        soak_temp2: fields.next()?,
        soak_time: fields.next()?,
        ramp_up_slope: fields.next()?,
        peak_temp: fields.next()?,
        peak_dwell: fields.next()?,
        ramp_down_slope: fields.next()?,
    };
    fields.finish(Command::SetProfile(record))
}

fn parse_field<T: FromStr>(text: &str) -> Result<T, ParseError> {
    text.trim().parse().map_err(|_| ParseError::DataError)
}

/// Comma separated argument list
struct Fields<'a> {
    inner: core::str::Split<'a, char>,
}

impl<'a> Fields<'a> {
    fn new(args: &'a str) -> Self {
        Self {
            inner: args.split(','),
        }
    }

    fn next_raw(&mut self) -> Option<&'a str> {
        self.inner.next().map(str::trim)
    }

    fn next<T: FromStr>(&mut self) -> Result<T, ParseError> {
        parse_field(self.next_raw().ok_or(ParseError::DataError)?)
    }

    /// Reject trailing fields
    fn finish<T>(mut self, value: T) -> Result<T, ParseError> {
        match self.inner.next() {
            None => Ok(value),
            Some(_) => Err(ParseError::DataError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_queries() {
        assert_eq!(Command::parse("IDN?"), Ok(Command::Identify));
        assert_eq!(Command::parse("idn?"), Ok(Command::Identify));
        assert_eq!(Command::parse("THERM?"), Ok(Command::QueryThermocouples));
        assert_eq!(Command::parse("PID?"), Ok(Command::QueryPid));
        assert_eq!(Command::parse("PROF?"), Ok(Command::QueryProfile(None)));
        assert_eq!(Command::parse("PROF? 3"), Ok(Command::QueryProfile(Some(3))));
        assert_eq!(Command::parse("PLOT?"), Ok(Command::QueryPlot));
        assert_eq!(Command::parse("run?"), Ok(Command::QueryRun));
    }

    #[test]
    fn test_run_control() {
        assert_eq!(Command::parse("RUN"), Ok(Command::Run));
        assert_eq!(Command::parse("Abort"), Ok(Command::Abort));
        assert_eq!(Command::parse("RUN now"), Err(ParseError::DataError));
    }

    #[test]
    fn test_set_pid() {
        assert_eq!(
            Command::parse("PID 40,0.05,62.5;"),
            Ok(Command::SetPid {
                kp: 40.0,
                ki: 0.05,
                kd: 62.5
            })
        );
        assert_eq!(Command::parse("PID 40,0.05"), Err(ParseError::DataError));
        assert_eq!(Command::parse("PID 40,x,1"), Err(ParseError::DataError));
        assert_eq!(Command::parse("PID"), Err(ParseError::DataError));
    }

    #[test]
    fn test_set_thermocouples() {
        let command = Command::parse("THERM 1,0,0,-3,1,5,1,0").unwrap();
        let Command::SetThermocouples(channels) = command else {
            panic!("wrong command");
        };
        assert!(channels[0].enabled);
        assert!(!channels[1].enabled);
        assert_eq!(channels[1].offset, -3);
        assert_eq!(channels[2].offset, 5);

        assert_eq!(
            Command::parse("THERM 1,0,0,-3,1,5"),
            Err(ParseError::DataError)
        );
        assert_eq!(
            Command::parse("THERM 1,0,0,-3,1,5,1,0,1"),
            Err(ParseError::DataError)
        );
    }

    #[test]
    fn test_set_profile() {
        let command =
            Command::parse("PROF 5,My paste,1,183,90,140,183,120,3.0,210,20,-3.0").unwrap();
        let Command::SetProfile(record) = command else {
            panic!("wrong command");
        };
        assert_eq!(record.index, 5);
        assert_eq!(record.description, "My paste");
        assert_eq!(record.flags, 1);
        assert_eq!(record.soak_time, 120);
        assert_eq!(record.ramp_down_slope, -3.0);
        assert!(command.is_mutating());
    }

    #[test]
    fn test_select_profile() {
        assert_eq!(Command::parse("PROF 2"), Ok(Command::SelectProfile(2)));
        assert_eq!(
            Command::parse("PROF 2,short,1,183"),
            Err(ParseError::DataError)
        );
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(Command::parse("HELLO"), Err(ParseError::Unrecognized));
        assert_eq!(Command::parse(""), Err(ParseError::Unrecognized));
        assert!(!Command::Identify.is_mutating());
    }

    proptest! {
        #[test]
        fn prop_parse_never_panics(line in "\\PC{0,120}") {
            let _ = Command::parse(&line);
        }

        #[test]
        fn prop_pid_gains_parse(kp in 0u16..1000, ki in 0u16..1000, kd in 0u16..1000) {
            let mut line = heapless::String::<64>::new();
            core::fmt::Write::write_fmt(&mut line, format_args!("PID {},{},{}", kp, ki, kd)).unwrap();
            prop_assert_eq!(
                Command::parse(&line),
                Ok(Command::SetPid { kp: kp as f32, ki: ki as f32, kd: kd as f32 })
            );
        }
    }
}
