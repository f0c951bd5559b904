//! Line-based command channel to the robot's dashboard server.
//!
//! Strictly request/response: write one newline-terminated command, block
//! for one line back. Replies are matched by prefix or substring, the way
//! the server words them.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;

use crate::error::CommandError;

/// Default dashboard server port.
pub const DEFAULT_PORT: u16 = 29999;

/// A connected dashboard session.
#[derive(Debug)]
pub struct CommandChannel<S = TcpStream> {
    stream: BufReader<S>,
}

impl CommandChannel<TcpStream> {
    /// Connect to `host:port` and consume the greeting.
    ///
    /// # Errors
    ///
    /// Connection failures, or the server closing before its greeting.
    pub fn connect(host: &str, port: u16) -> Result<Self, CommandError> {
        log::info!("connecting to dashboard at {host}:{port}");
        let stream = TcpStream::connect((host, port))?;
        Self::new(stream)
    }
}

impl<S: Read + Write> CommandChannel<S> {
    /// Wrap an open stream and consume the greeting line.
    ///
    /// # Errors
    ///
    /// [`CommandError::Closed`] when no greeting arrives.
    pub fn new(stream: S) -> Result<Self, CommandError> {
        let mut channel = Self {
            stream: BufReader::new(stream),
        };
        let greeting = channel.read_reply()?;
        log::info!("dashboard: {greeting}");
        Ok(channel)
    }

    fn read_reply(&mut self) -> Result<String, CommandError> {
        let mut line = String::new();
        if self.stream.read_line(&mut line)? == 0 {
            return Err(CommandError::Closed);
        }
        Ok(line.trim_end().to_owned())
    }

    /// Send one command and return the reply line.
    ///
    /// # Errors
    ///
    /// Socket errors, or [`CommandError::Closed`] when no reply arrives.
    pub fn request(&mut self, command: &str) -> Result<String, CommandError> {
        let writer = self.stream.get_mut();
        writer.write_all(command.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        let reply = self.read_reply()?;
        log::debug!("dashboard '{command}' -> '{reply}'");
        Ok(reply)
    }

    fn expect(&mut self, command: &str, prefix: &str) -> Result<String, CommandError> {
        let reply = self.request(command)?;
        if reply.starts_with(prefix) {
            Ok(reply)
        } else {
            Err(CommandError::Rejected {
                command: command.to_owned(),
                response: reply,
            })
        }
    }

    /// Whether the robot accepts remote commands. A reply mentioning
    /// `false` means the pendant holds local control.
    ///
    /// # Errors
    ///
    /// Transport failures.
    pub fn is_in_remote_control(&mut self) -> Result<bool, CommandError> {
        let reply = self.request("is in remote control")?;
        Ok(!reply.contains("false"))
    }

    /// Load a program stored on the controller.
    ///
    /// # Errors
    ///
    /// [`CommandError::Rejected`] unless the reply starts with
    /// `Loading program`.
    pub fn load(&mut self, program: &str) -> Result<String, CommandError> {
        self.expect(&format!("load {program}"), "Loading program")
    }

    /// Start the loaded program.
    ///
    /// # Errors
    ///
    /// [`CommandError::Rejected`] unless the reply starts with
    /// `Starting program`.
    pub fn play(&mut self) -> Result<String, CommandError> {
        self.expect("play", "Starting program")
    }

    /// Stop the running program.
    ///
    /// # Errors
    ///
    /// [`CommandError::Rejected`] unless the reply starts with `Stopped`.
    pub fn stop(&mut self) -> Result<String, CommandError> {
        self.expect("stop", "Stopped")
    }

    /// Say goodbye and drop the connection.
    ///
    /// # Errors
    ///
    /// Socket errors while writing `quit`.
    pub fn close(self) -> Result<(), CommandError> {
        let mut stream = self.stream.into_inner();
        stream.write_all(b"quit\n")?;
        stream.flush()?;
        log::debug!("dashboard connection closed");
        Ok(())
    }
}
