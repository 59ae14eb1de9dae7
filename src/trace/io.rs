// Copyright 2024 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use crate::lps::{Action, DataValue, MultiAction, State};
use crate::trace::Trace;
use smallvec::SmallVec;
use std::io::{Read, Write};

/// Marker which starts every binary trace file.
pub const TRACE_MARKER: &[u8; 10] = b"mCRL2Trace";
/// Version bytes following the marker.
pub const TRACE_VERSION: [u8; 2] = [0x01, 0x00];

const ELEMENT_STATE: u8 = 0x00;
const ELEMENT_TIMED_ACTION: u8 = 0x01;
const VALUE_TERM: u8 = 0x00;
const VALUE_FREE: u8 = 0x01;

/// Formats in which traces can be saved on disk.
///
/// The binary format is compact and carries states and time stamps. The plain
/// format is a human readable list of actions, one per line; states and times
/// are lost and loading synthesizes actions from the literal line text.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TraceFormat {
    Binary,
    Plain,
}

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("error accessing trace in {origin} ({err})")]
    Io {
        origin: String,
        err: std::io::Error,
    },
    #[error("{origin} does not contain a valid trace: {msg}")]
    Malformed { origin: String, msg: String },
}

impl Trace {
    /// Loads a trace from a file, auto-detecting the format: the first ten
    /// bytes are compared against the binary marker, anything else is treated
    /// as the plain format.
    pub fn load_file(path: &str) -> Result<Trace, TraceError> {
        let mut f = std::fs::File::open(path).map_err(|err| TraceError::Io {
            origin: path.to_string(),
            err,
        })?;
        Trace::load(&mut f, path)
    }

    pub fn load(reader: &mut impl Read, origin: &str) -> Result<Trace, TraceError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).map_err(|err| TraceError::Io {
            origin: origin.to_string(),
            err,
        })?;
        let trace = if bytes.starts_with(TRACE_MARKER) {
            load_binary(&bytes, origin)?
        } else {
            // not a binary trace: rewind and read as plain text
            load_plain(&bytes, origin)?
        };
        log::info!("loaded trace of length {} from {origin}", trace.len());
        Ok(trace)
    }

    pub fn save_file(&self, path: &str, format: TraceFormat) -> Result<(), TraceError> {
        let mut f = std::fs::File::create(path).map_err(|err| TraceError::Io {
            origin: path.to_string(),
            err,
        })?;
        self.save(&mut f, format, path)
    }

    pub fn save(
        &self,
        writer: &mut impl Write,
        format: TraceFormat,
        origin: &str,
    ) -> Result<(), TraceError> {
        let res = match format {
            TraceFormat::Binary => save_binary(self, writer),
            TraceFormat::Plain => save_plain(self, writer),
        };
        res.map_err(|err| TraceError::Io {
            origin: origin.to_string(),
            err,
        })
    }
}

// binary format

fn save_binary(trace: &Trace, writer: &mut impl Write) -> std::io::Result<()> {
    writer.write_all(TRACE_MARKER)?;
    writer.write_all(&TRACE_VERSION)?;

    // count the elements of the flattened list
    let mut count = 0u32;
    for ii in 0..=trace.len() {
        if trace.has_state_at(ii) {
            count += 1;
        }
        if ii < trace.len() {
            count += 1;
        }
    }
    writer.write_all(&count.to_le_bytes())?;

    // a state element, followed by one timed action element per step
    for ii in 0..=trace.len() {
        if let Some(state) = trace.state_at(ii) {
            writer.write_all(&[ELEMENT_STATE])?;
            encode_state(state, writer)?;
        }
        if ii < trace.len() {
            let action = trace.action_at(ii).expect("committed slots hold an action");
            writer.write_all(&[ELEMENT_TIMED_ACTION])?;
            encode_action(action, writer)?;
        }
    }
    Ok(())
}

fn encode_str(value: &str, writer: &mut impl Write) -> std::io::Result<()> {
    writer.write_all(&(value.len() as u32).to_le_bytes())?;
    writer.write_all(value.as_bytes())
}

fn encode_state(state: &State, writer: &mut impl Write) -> std::io::Result<()> {
    writer.write_all(&(state.0.len() as u32).to_le_bytes())?;
    for value in state.0.iter() {
        match value {
            DataValue::Term { value, sort } => {
                writer.write_all(&[VALUE_TERM])?;
                encode_str(value, writer)?;
                encode_str(sort, writer)?;
            }
            DataValue::Free { name, sort } => {
                writer.write_all(&[VALUE_FREE])?;
                encode_str(name, writer)?;
                encode_str(sort, writer)?;
            }
        }
    }
    Ok(())
}

fn encode_action(action: &MultiAction, writer: &mut impl Write) -> std::io::Result<()> {
    writer.write_all(&(action.actions.len() as u32).to_le_bytes())?;
    for a in action.actions.iter() {
        encode_str(&a.label, writer)?;
        writer.write_all(&(a.args.len() as u32).to_le_bytes())?;
        for arg in a.args.iter() {
            encode_str(arg, writer)?;
        }
    }
    match &action.time {
        None => writer.write_all(&[0u8]),
        Some(time) => {
            writer.write_all(&[1u8])?;
            encode_str(time, writer)
        }
    }
}

fn load_binary(bytes: &[u8], origin: &str) -> Result<Trace, TraceError> {
    let mut decoder = Decoder {
        bytes,
        pos: TRACE_MARKER.len(),
        origin,
    };
    let version = [decoder.u8()?, decoder.u8()?];
    if version != TRACE_VERSION {
        return Err(decoder.malformed(format!("unsupported version {version:?}")));
    }
    let mut trace = Trace::new();
    let count = decoder.u32()?;
    for _ in 0..count {
        match decoder.u8()? {
            ELEMENT_STATE => {
                let state = decoder.state()?;
                if !trace.set_state(state) {
                    return Err(
                        decoder.malformed("two consecutive state entries".to_string())
                    );
                }
            }
            ELEMENT_TIMED_ACTION => {
                let action = decoder.action()?;
                trace.add_action(action);
            }
            other => {
                return Err(decoder.malformed(format!("invalid element tag {other:#x}")));
            }
        }
    }
    if decoder.pos != bytes.len() {
        return Err(decoder.malformed("trailing data after the trace".to_string()));
    }
    trace.set_position(0);
    Ok(trace)
}

struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
    origin: &'a str,
}

impl<'a> Decoder<'a> {
    fn malformed(&self, msg: String) -> TraceError {
        TraceError::Malformed {
            origin: self.origin.to_string(),
            msg,
        }
    }

    fn u8(&mut self) -> Result<u8, TraceError> {
        match self.bytes.get(self.pos) {
            Some(b) => {
                self.pos += 1;
                Ok(*b)
            }
            None => Err(self.malformed("unexpected end of data".to_string())),
        }
    }

    fn u32(&mut self) -> Result<u32, TraceError> {
        if self.pos + 4 > self.bytes.len() {
            return Err(self.malformed("unexpected end of data".to_string()));
        }
        let value = u32::from_le_bytes(self.bytes[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        Ok(value)
    }

    fn str(&mut self) -> Result<String, TraceError> {
        let len = self.u32()? as usize;
        if self.pos + len > self.bytes.len() {
            return Err(self.malformed("string runs past the end of the data".to_string()));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        String::from_utf8(slice.to_vec())
            .map_err(|_| self.malformed("string is not valid utf8".to_string()))
    }

    fn state(&mut self) -> Result<State, TraceError> {
        let count = self.u32()? as usize;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            let tag = self.u8()?;
            let first = self.str()?;
            let sort = self.str()?;
            let value = match tag {
                VALUE_TERM => DataValue::Term { value: first, sort },
                VALUE_FREE => DataValue::Free { name: first, sort },
                other => {
                    return Err(self.malformed(format!("invalid value tag {other:#x}")));
                }
            };
            values.push(value);
        }
        Ok(State::new(values))
    }

    fn action(&mut self) -> Result<MultiAction, TraceError> {
        let count = self.u32()? as usize;
        let mut actions = SmallVec::new();
        for _ in 0..count {
            let label = self.str()?;
            let argc = self.u32()? as usize;
            let mut args = Vec::with_capacity(argc);
            for _ in 0..argc {
                args.push(self.str()?);
            }
            actions.push(Action { label, args });
        }
        let time = match self.u8()? {
            0 => None,
            1 => Some(self.str()?),
            other => {
                return Err(self.malformed(format!("invalid time tag {other:#x}")));
            }
        };
        Ok(MultiAction { actions, time })
    }
}

// plain format

fn save_plain(trace: &Trace, writer: &mut impl Write) -> std::io::Result<()> {
    for ii in 0..trace.len() {
        let action = trace.action_at(ii).expect("committed slots hold an action");
        writeln!(writer, "{action}")?;
    }
    Ok(())
}

fn load_plain(bytes: &[u8], origin: &str) -> Result<Trace, TraceError> {
    let text = std::str::from_utf8(bytes).map_err(|_| TraceError::Malformed {
        origin: origin.to_string(),
        msg: "not valid utf8 text".to_string(),
    })?;
    let mut trace = Trace::new();
    for line in text.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if !line.is_empty() {
            // synthesized directly from the line text, without validation
            // against any action alphabet
            trace.add_action(MultiAction::from_label(line));
        }
    }
    trace.set_position(0);
    Ok(trace)
}
