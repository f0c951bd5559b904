//! Client for the controller's real-time data exchange (RTDE) interface.
//!
//! # Wire format
//!
//! ```text
//! ┌────────────────┬───────────┬─────────────────────┐
//! │ size (u16, BE) │ type (u8) │ payload             │
//! │ header incl.   │ ASCII tag │ (size - 3 bytes)    │
//! └────────────────┴───────────┴─────────────────────┘
//! ```
//!
//! Setup happens once per connection: protocol version, one output
//! recipe (ready flag and achieved pose), two input recipes (target pose
//! and watchdog), then start. After that the controller pushes a data
//! package per cycle and the client writes its input recipes whenever it
//! likes. All numbers are big-endian.

use std::io::{self, Read, Write};
use std::iter;
use std::net::TcpStream;

use plume_pipeline::Waypoint;

use crate::error::LinkError;
use crate::link::RegisterLink;
use crate::state::{RegisterMap, RobotState};

/// Protocol version requested during the handshake.
pub const PROTOCOL_VERSION: u16 = 2;

/// Default RTDE port on the controller.
pub const DEFAULT_PORT: u16 = 30004;

const HEADER_LEN: usize = 3;

/// RTDE package types used by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageType {
    RequestProtocolVersion,
    TextMessage,
    DataPackage,
    SetupOutputs,
    SetupInputs,
    Start,
    Pause,
}

impl PackageType {
    /// Type byte on the wire.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::RequestProtocolVersion => b'V',
            Self::TextMessage => b'M',
            Self::DataPackage => b'U',
            Self::SetupOutputs => b'O',
            Self::SetupInputs => b'I',
            Self::Start => b'S',
            Self::Pause => b'P',
        }
    }

    /// Inverse of [`code`](Self::code).
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            b'V' => Some(Self::RequestProtocolVersion),
            b'M' => Some(Self::TextMessage),
            b'U' => Some(Self::DataPackage),
            b'O' => Some(Self::SetupOutputs),
            b'I' => Some(Self::SetupInputs),
            b'S' => Some(Self::Start),
            b'P' => Some(Self::Pause),
            _ => None,
        }
    }
}

/// Register types the recipes rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableType {
    Int32,
    Double,
}

impl VariableType {
    /// Name the controller uses in recipe replies.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int32 => "INT32",
            Self::Double => "DOUBLE",
        }
    }
}

/// One package as read off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: u8,
    pub payload: Vec<u8>,
}

/// Prefix `payload` with the package header.
///
/// # Errors
///
/// [`LinkError::FrameTooLarge`] when the package does not fit the size
/// field.
pub fn encode_frame(kind: PackageType, payload: &[u8]) -> Result<Vec<u8>, LinkError> {
    let size = HEADER_LEN + payload.len();
    let size_field = u16::try_from(size).map_err(|_| LinkError::FrameTooLarge(size))?;
    let mut buf = Vec::with_capacity(size);
    buf.extend_from_slice(&size_field.to_be_bytes());
    buf.push(kind.code());
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Read one package. `Ok(None)` when the stream ends.
///
/// # Errors
///
/// Socket errors, or a size field smaller than the header.
pub fn read_frame<R: Read + ?Sized>(reader: &mut R) -> Result<Option<Frame>, LinkError> {
    let mut header = [0u8; HEADER_LEN];
    if !read_or_eof(reader, &mut header)? {
        return Ok(None);
    }
    let size = usize::from(u16::from_be_bytes([header[0], header[1]]));
    if size < HEADER_LEN {
        return Err(LinkError::Protocol(format!(
            "package size {size} is smaller than its header"
        )));
    }
    let mut payload = vec![0; size - HEADER_LEN];
    if !read_or_eof(reader, &mut payload)? {
        return Ok(None);
    }
    Ok(Some(Frame {
        kind: header[2],
        payload,
    }))
}

fn read_or_eof<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<bool, LinkError> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Payload of an output recipe setup request.
#[must_use]
pub fn setup_outputs_payload(frequency_hz: f64, names: &[&str]) -> Vec<u8> {
    let mut payload = frequency_hz.to_be_bytes().to_vec();
    payload.extend_from_slice(names.join(",").as_bytes());
    payload
}

/// Payload of an input recipe setup request.
#[must_use]
pub fn setup_inputs_payload(names: &[&str]) -> Vec<u8> {
    names.join(",").into_bytes()
}

/// Validate a recipe setup reply and return the recipe id.
///
/// # Errors
///
/// [`LinkError::UnknownVariable`] for `NOT_FOUND`,
/// [`LinkError::VariableInUse`] for `IN_USE`,
/// [`LinkError::TypeMismatch`] for any other unexpected type, and
/// [`LinkError::Protocol`] when the reply is malformed.
pub fn parse_recipe(
    payload: &[u8],
    names: &[&str],
    expected: &[VariableType],
) -> Result<u8, LinkError> {
    let Some((&id, types)) = payload.split_first() else {
        return Err(LinkError::Protocol("empty recipe reply".into()));
    };
    let types = std::str::from_utf8(types)
        .map_err(|_| LinkError::Protocol("recipe types are not UTF-8".into()))?;
    let types: Vec<&str> = types.split(',').collect();
    if types.len() != names.len() {
        return Err(LinkError::Protocol(format!(
            "recipe reply lists {} types for {} registers",
            types.len(),
            names.len()
        )));
    }

    for ((name, actual), expected) in names.iter().zip(types).zip(expected) {
        match actual {
            "NOT_FOUND" => return Err(LinkError::UnknownVariable((*name).to_owned())),
            "IN_USE" => return Err(LinkError::VariableInUse((*name).to_owned())),
            t if t == expected.name() => {}
            t => {
                return Err(LinkError::TypeMismatch {
                    name: (*name).to_owned(),
                    expected: expected.name(),
                    actual: t.to_owned(),
                });
            }
        }
    }
    Ok(id)
}

/// Data package payload writing doubles into an input recipe.
#[must_use]
pub fn encode_doubles(recipe: u8, values: &[f64]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(1 + 8 * values.len());
    payload.push(recipe);
    for v in values {
        payload.extend_from_slice(&v.to_be_bytes());
    }
    payload
}

/// Data package payload writing one integer into an input recipe.
#[must_use]
pub fn encode_int32(recipe: u8, value: i32) -> Vec<u8> {
    let mut payload = vec![recipe];
    payload.extend_from_slice(&value.to_be_bytes());
    payload
}

/// Decode a data package of the state recipe.
///
/// # Errors
///
/// [`LinkError::Protocol`] for a different recipe id or a payload of the
/// wrong length.
pub fn decode_state(payload: &[u8], recipe: u8) -> Result<RobotState, LinkError> {
    let mut bytes = Bytes(payload);
    let [id] = bytes.take::<1>()?;
    if id != recipe {
        return Err(LinkError::Protocol(format!(
            "data package for recipe {id}, expected {recipe}"
        )));
    }
    let ready = i32::from_be_bytes(bytes.take()?);
    let mut achieved_pose = [0.0; 6];
    for v in &mut achieved_pose {
        *v = f64::from_be_bytes(bytes.take()?);
    }
    if !bytes.0.is_empty() {
        return Err(LinkError::Protocol(format!(
            "{} trailing bytes in data package",
            bytes.0.len()
        )));
    }
    Ok(RobotState {
        ready,
        achieved_pose,
    })
}

struct Bytes<'a>(&'a [u8]);

impl Bytes<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], LinkError> {
        let (head, rest) = self
            .0
            .split_first_chunk::<N>()
            .ok_or_else(|| LinkError::Protocol("truncated data package".into()))?;
        self.0 = rest;
        Ok(*head)
    }
}

/// A text message pushed by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotMessage {
    /// 0 exception, 1 error, 2 warning, 3 info.
    pub level: u8,
    pub source: String,
    pub text: String,
}

/// Decode a text message package.
#[must_use]
pub fn decode_message(payload: &[u8]) -> Option<RobotMessage> {
    let (&text_len, rest) = payload.split_first()?;
    let (text, rest) = rest.split_at_checked(usize::from(text_len))?;
    let (&source_len, rest) = rest.split_first()?;
    let (source, rest) = rest.split_at_checked(usize::from(source_len))?;
    let (&level, _) = rest.split_first()?;
    Some(RobotMessage {
        level,
        source: String::from_utf8_lossy(source).into_owned(),
        text: String::from_utf8_lossy(text).into_owned(),
    })
}

fn log_message(payload: &[u8]) {
    match decode_message(payload) {
        Some(m) if m.level <= 1 => log::error!("robot {}: {}", m.source, m.text),
        Some(m) if m.level == 2 => log::warn!("robot {}: {}", m.source, m.text),
        Some(m) => log::info!("robot {}: {}", m.source, m.text),
        None => log::warn!(
            "unreadable robot message: {}",
            String::from_utf8_lossy(payload)
        ),
    }
}

/// Send a request and wait for the reply of the same type.
fn request<S: Read + Write>(
    stream: &mut S,
    kind: PackageType,
    payload: &[u8],
) -> Result<Vec<u8>, LinkError> {
    stream.write_all(&encode_frame(kind, payload)?)?;
    stream.flush()?;
    loop {
        let frame = read_frame(stream)?.ok_or(LinkError::Closed)?;
        if frame.kind == kind.code() {
            return Ok(frame.payload);
        }
        if frame.kind == PackageType::TextMessage.code() {
            log_message(&frame.payload);
        } else {
            log::debug!(
                "skipping package '{}' while waiting for '{}'",
                char::from(frame.kind),
                char::from(kind.code())
            );
        }
    }
}

fn accepted(reply: &[u8]) -> bool {
    reply.first() == Some(&1)
}

/// RTDE register link over any byte stream, normally a [`TcpStream`].
#[derive(Debug)]
pub struct RtdeClient<S = TcpStream> {
    stream: Option<S>,
    state_recipe: u8,
    target_recipe: u8,
    watchdog_recipe: u8,
}

impl RtdeClient<TcpStream> {
    /// Connect to `host:port` and run the setup handshake.
    ///
    /// # Errors
    ///
    /// Connection failures and any handshake error, see
    /// [`handshake`](Self::handshake).
    pub fn connect(
        host: &str,
        port: u16,
        registers: &RegisterMap,
        frequency_hz: f64,
    ) -> Result<Self, LinkError> {
        log::info!("connecting to RTDE at {host}:{port}");
        let stream = TcpStream::connect((host, port))?;
        stream.set_nodelay(true)?;
        Self::handshake(stream, registers, frequency_hz)
    }
}

impl<S: Read + Write> RtdeClient<S> {
    /// Negotiate the protocol version, set up the recipes and start
    /// synchronization.
    ///
    /// # Errors
    ///
    /// Refused requests, recipes naming unknown, busy or mistyped
    /// registers, and transport failures.
    pub fn handshake(
        mut stream: S,
        registers: &RegisterMap,
        frequency_hz: f64,
    ) -> Result<Self, LinkError> {
        let reply = request(
            &mut stream,
            PackageType::RequestProtocolVersion,
            &PROTOCOL_VERSION.to_be_bytes(),
        )?;
        if !accepted(&reply) {
            return Err(LinkError::VersionRejected(PROTOCOL_VERSION));
        }

        let outputs = registers.state_recipe();
        let expected: Vec<VariableType> = iter::once(VariableType::Int32)
            .chain(iter::repeat_n(VariableType::Double, 6))
            .collect();
        let reply = request(
            &mut stream,
            PackageType::SetupOutputs,
            &setup_outputs_payload(frequency_hz, &outputs),
        )?;
        let state_recipe = parse_recipe(&reply, &outputs, &expected)?;

        let targets = registers.target_pose.each_ref().map(String::as_str);
        let reply = request(
            &mut stream,
            PackageType::SetupInputs,
            &setup_inputs_payload(&targets),
        )?;
        let target_recipe = parse_recipe(&reply, &targets, &[VariableType::Double; 6])?;

        let watchdog = [registers.watchdog.as_str()];
        let reply = request(
            &mut stream,
            PackageType::SetupInputs,
            &setup_inputs_payload(&watchdog),
        )?;
        let watchdog_recipe = parse_recipe(&reply, &watchdog, &[VariableType::Int32])?;

        if !accepted(&request(&mut stream, PackageType::Start, &[])?) {
            return Err(LinkError::Refused('S'));
        }
        log::info!(
            "RTDE synchronization started at {frequency_hz} Hz \
             (recipes: state {state_recipe}, target {target_recipe}, watchdog {watchdog_recipe})"
        );

        Ok(Self {
            stream: Some(stream),
            state_recipe,
            target_recipe,
            watchdog_recipe,
        })
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        let frame = encode_frame(PackageType::DataPackage, payload)?;
        let stream = self.stream.as_mut().ok_or(LinkError::Closed)?;
        stream.write_all(&frame)?;
        stream.flush()?;
        Ok(())
    }
}

impl<S: Read + Write> RegisterLink for RtdeClient<S> {
    fn receive(&mut self) -> Result<Option<RobotState>, LinkError> {
        let recipe = self.state_recipe;
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };
        loop {
            let Some(frame) = read_frame(stream)? else {
                log::warn!("RTDE connection closed by the controller");
                return Ok(None);
            };
            match PackageType::from_code(frame.kind) {
                Some(PackageType::DataPackage) if frame.payload.first() == Some(&recipe) => {
                    return decode_state(&frame.payload, recipe).map(Some);
                }
                Some(PackageType::TextMessage) => log_message(&frame.payload),
                _ => log::debug!("ignoring package '{}'", char::from(frame.kind)),
            }
        }
    }

    fn send_target(&mut self, target: &Waypoint) -> Result<(), LinkError> {
        let payload = encode_doubles(self.target_recipe, &target.to_array());
        self.send(&payload)
    }

    fn kick_watchdog(&mut self, value: i32) -> Result<(), LinkError> {
        let payload = encode_int32(self.watchdog_recipe, value);
        self.send(&payload)
    }

    fn shutdown(&mut self) -> Result<(), LinkError> {
        // Dropping the stream closes the connection.
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        if !accepted(&request(&mut stream, PackageType::Pause, &[])?) {
            return Err(LinkError::Refused('P'));
        }
        log::info!("RTDE synchronization paused");
        Ok(())
    }
}
