//! Hand-off of encoded payloads to a transport.

use std::{convert::Infallible, fmt::Debug, io};

use parking_lot::Mutex;
use tracing::debug;

use crate::{Batch, Error, LineProtocolEncoder, Precision, WriterOptions};

/// Sends encoded line protocol somewhere: an HTTP write endpoint, a UDP socket, a file.
///
/// The payload is opaque to the transport. `precision` is the unit the payload's timestamps are
/// written in, for transports that must advertise it (e.g. the `precision` query parameter of
/// the HTTP write API).
pub trait Transport: Debug {
    type Error: std::error::Error + Send + Sync + 'static;

    fn send(&self, payload: &str, precision: Precision) -> Result<(), Self::Error>;
}

/// Error returned by [`Writer::write`]
#[derive(Debug, thiserror::Error)]
pub enum WriteError<E>
where
    E: std::error::Error + 'static,
{
    #[error("failed to encode batch: {0}")]
    Encode(#[source] Error),

    #[error("failed to send payload: {0}")]
    Transport(#[source] E),
}

/// What a call to [`Writer::write`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Sent { lines: usize, bytes: usize },
    /// The batch had no points collection, nothing was sent
    NoOutput,
}

/// Encodes batches and passes the payloads to a [`Transport`].
///
/// Nothing is retried; retry policy belongs to the transport.
#[derive(Debug)]
pub struct Writer<T> {
    encoder: LineProtocolEncoder,
    transport: T,
}

impl<T> Writer<T>
where
    T: Transport,
{
    pub fn new(encoder: LineProtocolEncoder, transport: T) -> Self {
        Self { encoder, transport }
    }

    pub fn options(&self) -> &WriterOptions {
        self.encoder.options()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn write(&self, batch: &Batch) -> Result<WriteOutcome, WriteError<T::Error>> {
        let Some(payload) = self.encoder.encode(batch).map_err(WriteError::Encode)? else {
            return Ok(WriteOutcome::NoOutput);
        };

        let precision = self.options().precision();
        self.transport
            .send(&payload, precision)
            .map_err(WriteError::Transport)?;

        let outcome = WriteOutcome::Sent {
            lines: batch.len(),
            bytes: payload.len(),
        };
        debug!(?outcome, %precision, "sent batch");
        Ok(outcome)
    }
}

/// A [`Transport`] that keeps every payload in memory
#[derive(Debug, Default)]
pub struct MemoryTransport {
    payloads: Mutex<Vec<String>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// The payloads sent so far, oldest first
    pub fn payloads(&self) -> Vec<String> {
        self.payloads.lock().clone()
    }

    /// Remove and return the payloads sent so far
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.payloads.lock())
    }
}

impl Transport for MemoryTransport {
    type Error = Infallible;

    fn send(&self, payload: &str, _precision: Precision) -> Result<(), Self::Error> {
        self.payloads.lock().push(payload.to_string());
        Ok(())
    }
}

/// A [`Transport`] writing each payload, followed by a newline, to an [`io::Write`]
///
/// An empty payload, from a batch with an empty points list, writes nothing.
#[derive(Debug)]
pub struct IoTransport<W> {
    writer: Mutex<W>,
}

impl<W> IoTransport<W>
where
    W: io::Write + Debug,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W> Transport for IoTransport<W>
where
    W: io::Write + Debug,
{
    type Error = io::Error;

    fn send(&self, payload: &str, _precision: Precision) -> Result<(), Self::Error> {
        if payload.is_empty() {
            return Ok(());
        }
        let mut writer = self.writer.lock();
        writer.write_all(payload.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}
