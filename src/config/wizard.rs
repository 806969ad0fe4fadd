//! Interactive configuration wizard.
//!
//! Asks for the board, the WebSocket port and verbosity, one prompt each.
//! Works over any reader/writer pair so it can be driven from tests.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, DEFAULT_PORT, PORT_RANGE};
use crate::device::{self, DEFAULT_DEVICE_INDEX};
use std::io::{BufRead, Write};

/// Prompt-driven editor for a [`Config`].
pub struct Wizard<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Wizard<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Ask every question and return `base` with the answers applied.
    pub fn run(&mut self, base: &Config) -> ConfigResult<Config> {
        let mut config = base.clone();

        self.say("Welcome to the configuration wizard!")?;
        self.say(&device::device_list())?;
        config.device.index = self.ask(
            "Which device are you using?",
            DEFAULT_DEVICE_INDEX,
            |i| device::by_index(i).is_some(),
            "That's not one of the listed devices.",
        )?;

        config.server.port = self.ask(
            "Which WebSocket port should the browser connect to?",
            DEFAULT_PORT,
            |p| PORT_RANGE.contains(&p),
            "Ports must be between 6300 and 6400.",
        )?;

        let verbosity: u8 = self.ask(
            "Verbosity (0 quiet, 1 show traffic)?",
            0,
            |v| v <= 1,
            "Enter 0 or 1.",
        )?;
        config.bridge.verbose = verbosity == 1;

        Ok(config)
    }

    fn say(&mut self, line: &str) -> ConfigResult<()> {
        writeln!(self.output, "{}", line).map_err(ConfigError::Prompt)
    }

    /// Prompt until the answer parses and passes `valid`. Empty input takes
    /// `default`.
    fn ask<T>(
        &mut self,
        question: &str,
        default: T,
        valid: impl Fn(T) -> bool,
        complaint: &str,
    ) -> ConfigResult<T>
    where
        T: std::str::FromStr + std::fmt::Display + Copy,
    {
        loop {
            write!(self.output, "{} [{}]: ", question, default).map_err(ConfigError::Prompt)?;
            self.output.flush().map_err(ConfigError::Prompt)?;

            let mut line = String::new();
            let read = self.input.read_line(&mut line).map_err(ConfigError::Prompt)?;
            if read == 0 {
                return Err(ConfigError::MissingRequired(question.to_string()));
            }

            let answer = line.trim();
            if answer.is_empty() {
                return Ok(default);
            }
            match answer.parse::<T>() {
                Ok(value) if valid(value) => return Ok(value),
                _ => self.say(complaint)?,
            }
        }
    }
}
