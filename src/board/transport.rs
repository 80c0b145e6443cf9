// Byte channels that carry frames to the board
//
// Every exchange is full duplex: one fixed-length frame out, one reply of the
// same length back.

use std::io::{Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use embedded_hal::spi::SpiDevice;
use serialport::{self, SerialPort};
use tracing::{debug, info};

use super::error::TransportError;
use super::protocol::Frame;
use super::registers::LONGEST_SPI_TRANSFER;

/// Default serial configuration for a USB-serial bridge to the board
pub const DEFAULT_BAUDRATE: u32 = 500_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

/// Synchronous duplex byte channel
///
/// `transfer` takes `&mut self`: whoever holds the transport owns the bus for
/// the duration of one exchange.
pub trait Transport {
    fn transfer(&mut self, frame: &Frame) -> Result<Vec<u8>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn transfer(&mut self, frame: &Frame) -> Result<Vec<u8>, TransportError> {
        (**self).transfer(frame)
    }
}

/// Serial-port transport (USB bridge)
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open a new connection to the board
    pub fn open(port_name: &str) -> Result<Self, TransportError> {
        Self::open_with_baudrate(port_name, DEFAULT_BAUDRATE)
    }

    /// Open with custom baudrate
    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self, TransportError> {
        info!("Opening serial bus on {} at {} baud", port_name, baudrate);
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;

        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn transfer(&mut self, frame: &Frame) -> Result<Vec<u8>, TransportError> {
        self.port.write_all(frame.as_bytes())?;
        self.port.flush()?;

        let mut reply = vec![0u8; LONGEST_SPI_TRANSFER];
        self.port.read_exact(&mut reply)?;
        Ok(reply)
    }
}

/// SPI transport over any `embedded-hal` SPI device (e.g. a Linux spidev handle)
pub struct SpiTransport<D> {
    device: D,
}

impl<D: SpiDevice> SpiTransport<D> {
    pub fn new(device: D) -> Self {
        Self { device }
    }

    pub fn into_inner(self) -> D {
        self.device
    }
}

impl<D: SpiDevice> Transport for SpiTransport<D> {
    fn transfer(&mut self, frame: &Frame) -> Result<Vec<u8>, TransportError> {
        let mut buf = frame.as_bytes().to_vec();
        self.device
            .transfer_in_place(&mut buf)
            .map_err(|e| TransportError::Spi(format!("{:?}", e)))?;
        Ok(buf)
    }
}

/// A transport shared between several owners.
///
/// The lock is held for exactly one frame exchange, so callers interleave at
/// frame granularity and never block each other for a whole motion.
pub struct SharedTransport<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> SharedTransport<T> {
    pub fn new(transport: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(transport)),
        }
    }
}

impl<T> Clone for SharedTransport<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> Transport for SharedTransport<T> {
    fn transfer(&mut self, frame: &Frame) -> Result<Vec<u8>, TransportError> {
        let mut transport = self.inner.lock().map_err(|_| TransportError::Poisoned)?;
        debug!("Shared transfer: {:?}", frame.message_type());
        transport.transfer(frame)
    }
}
