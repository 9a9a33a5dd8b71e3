//! Typed data ports.
//!
//! An [`OutPort`] pushes marshalled samples into the ring buffer of every
//! connected [`InPort`]. Components own their typed ports; the [`PortAdmin`]
//! of the component keeps type-erased endpoints so the manager can wire
//! connections by name without knowing the payload types.
//!
//! Buffer policy:
//! - write on full buffer: the oldest frame is overwritten
//! - read on empty buffer: the last value read is returned again (readback)

use crate::consts::DEFAULT_BUFFER_LENGTH;
use crate::data::DataType;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};

/// Error types for port registration and connection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PortError {
    /// A port with this name is already registered on the component
    #[error("Duplicate port name: {0}")]
    DuplicatePort(String),

    /// No port with this name
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Port exists but has the wrong direction for the requested operation
    #[error("Port '{name}' is not an {expected:?} port")]
    WrongDirection {
        /// Port name
        name: String,
        /// Direction the operation needed
        expected: PortDirection,
    },

    /// Data types of the two ends differ
    #[error("Data type mismatch: {out_type} -> {in_type}")]
    TypeMismatch {
        /// OutPort data type
        out_type: String,
        /// InPort data type
        in_type: String,
    },

    /// The two ports are already connected
    #[error("Already connected: {0}")]
    AlreadyConnected(String),

    /// Sample could not be marshalled
    #[error("Marshalling failed: {0}")]
    Marshal(String),
}

/// Port direction as seen from the owning component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PortDirection {
    /// Data flows into the component
    In,
    /// Data flows out of the component
    Out,
}

/// Static description of a registered port.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortProfile {
    /// Port name, unique within the component
    pub name: String,
    /// Direction
    pub direction: PortDirection,
    /// `DataType::TYPE_NAME` of the payload
    pub data_type: &'static str,
}

/// Bounded FIFO of marshalled frames.
#[derive(Debug)]
struct RingBuffer {
    frames: VecDeque<Vec<u8>>,
    capacity: usize,
    overwritten: u64,
}

impl RingBuffer {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
            overwritten: 0,
        }
    }

    fn push(&mut self, frame: Vec<u8>) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
            self.overwritten += 1;
        }
        self.frames.push_back(frame);
    }
}

type FrameBuffer = Arc<Mutex<RingBuffer>>;

fn lock(buffer: &FrameBuffer) -> MutexGuard<'_, RingBuffer> {
    buffer.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
struct Subscriber {
    connector: String,
    buffer: FrameBuffer,
}

type SubscriberList = Arc<Mutex<Vec<Subscriber>>>;

fn lock_subscribers(list: &SubscriberList) -> MutexGuard<'_, Vec<Subscriber>> {
    list.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Typed input port.
#[derive(Debug)]
pub struct InPort<T: DataType> {
    name: String,
    buffer: FrameBuffer,
    last: Option<T>,
}

impl<T: DataType> InPort<T> {
    /// Create an InPort with the default buffer length.
    pub fn new(name: &str) -> Self {
        Self::with_buffer_length(name, DEFAULT_BUFFER_LENGTH)
    }

    /// Create an InPort with an explicit buffer length (at least 1).
    pub fn with_buffer_length(name: &str, length: usize) -> Self {
        Self {
            name: name.to_string(),
            buffer: Arc::new(Mutex::new(RingBuffer::new(length))),
            last: None,
        }
    }

    /// Port name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when at least one unread sample is buffered.
    pub fn is_new(&self) -> bool {
        !lock(&self.buffer).frames.is_empty()
    }

    /// Number of unread samples.
    pub fn pending(&self) -> usize {
        lock(&self.buffer).frames.len()
    }

    /// Number of frames lost because the buffer was full.
    pub fn overwritten(&self) -> u64 {
        lock(&self.buffer).overwritten
    }

    /// Read the oldest unread sample.
    ///
    /// Returns the last value read again when nothing new arrived, and
    /// `None` if no sample was ever received.
    pub fn read(&mut self) -> Option<T> {
        loop {
            let frame = lock(&self.buffer).frames.pop_front();
            let Some(frame) = frame else {
                return self.last.clone();
            };
            match bincode::deserialize::<T>(&frame) {
                Ok(value) => {
                    self.last = Some(value.clone());
                    return Some(value);
                }
                Err(e) => {
                    warn!("InPort '{}': dropping undecodable frame: {}", self.name, e);
                }
            }
        }
    }

    fn profile(&self) -> PortProfile {
        PortProfile {
            name: self.name.clone(),
            direction: PortDirection::In,
            data_type: T::TYPE_NAME,
        }
    }
}

/// Typed output port.
#[derive(Debug)]
pub struct OutPort<T: DataType> {
    name: String,
    subscribers: SubscriberList,
    _marker: std::marker::PhantomData<fn(T)>,
}

impl<T: DataType> OutPort<T> {
    /// Create an unconnected OutPort.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            _marker: std::marker::PhantomData,
        }
    }

    /// Port name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Marshal `value` once and push it to every connected InPort.
    ///
    /// Writing to an unconnected port succeeds and discards the sample.
    pub fn write(&self, value: &T) -> Result<(), PortError> {
        let frame = bincode::serialize(value).map_err(|e| PortError::Marshal(e.to_string()))?;
        let subscribers = lock_subscribers(&self.subscribers);
        for sub in subscribers.iter() {
            lock(&sub.buffer).push(frame.clone());
        }
        Ok(())
    }

    /// Number of connected InPorts.
    pub fn connection_count(&self) -> usize {
        lock_subscribers(&self.subscribers).len()
    }

    fn profile(&self) -> PortProfile {
        PortProfile {
            name: self.name.clone(),
            direction: PortDirection::Out,
            data_type: T::TYPE_NAME,
        }
    }
}

#[derive(Debug)]
enum Endpoint {
    Inbound(FrameBuffer),
    Outbound(SubscriberList),
}

#[derive(Debug)]
struct PortEntry {
    profile: PortProfile,
    endpoint: Endpoint,
}

/// Registry of the ports of one component.
#[derive(Debug, Default)]
pub struct PortAdmin {
    ports: Vec<PortEntry>,
}

impl PortAdmin {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an InPort.
    pub fn add_in_port<T: DataType>(&mut self, port: &InPort<T>) -> Result<(), PortError> {
        self.insert(port.profile(), Endpoint::Inbound(Arc::clone(&port.buffer)))
    }

    /// Register an OutPort.
    pub fn add_out_port<T: DataType>(&mut self, port: &OutPort<T>) -> Result<(), PortError> {
        self.insert(
            port.profile(),
            Endpoint::Outbound(Arc::clone(&port.subscribers)),
        )
    }

    fn insert(&mut self, profile: PortProfile, endpoint: Endpoint) -> Result<(), PortError> {
        if self.get(&profile.name).is_some() {
            return Err(PortError::DuplicatePort(profile.name));
        }
        debug!(
            "Registered {:?} port '{}' ({})",
            profile.direction, profile.name, profile.data_type
        );
        self.ports.push(PortEntry { profile, endpoint });
        Ok(())
    }

    fn get(&self, name: &str) -> Option<&PortEntry> {
        self.ports.iter().find(|p| p.profile.name == name)
    }

    /// Profile of a registered port.
    pub fn profile(&self, name: &str) -> Option<&PortProfile> {
        self.get(name).map(|p| &p.profile)
    }

    /// Profiles of all registered ports in registration order.
    pub fn profiles(&self) -> Vec<PortProfile> {
        self.ports.iter().map(|p| p.profile.clone()).collect()
    }

    /// Number of registered ports.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// True when no port is registered.
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Connect OutPort `out_name` of `self` to InPort `in_name` of `peer`.
    ///
    /// `self` and `peer` may be the same admin (loopback).
    pub fn connect(
        &self,
        out_name: &str,
        peer: &PortAdmin,
        in_name: &str,
        connector: &str,
    ) -> Result<(), PortError> {
        let out = self
            .get(out_name)
            .ok_or_else(|| PortError::PortNotFound(out_name.to_string()))?;
        let inp = peer
            .get(in_name)
            .ok_or_else(|| PortError::PortNotFound(in_name.to_string()))?;

        let Endpoint::Outbound(subscribers) = &out.endpoint else {
            return Err(PortError::WrongDirection {
                name: out_name.to_string(),
                expected: PortDirection::Out,
            });
        };
        let Endpoint::Inbound(buffer) = &inp.endpoint else {
            return Err(PortError::WrongDirection {
                name: in_name.to_string(),
                expected: PortDirection::In,
            });
        };
        if out.profile.data_type != inp.profile.data_type {
            return Err(PortError::TypeMismatch {
                out_type: out.profile.data_type.to_string(),
                in_type: inp.profile.data_type.to_string(),
            });
        }

        let mut subs = lock_subscribers(subscribers);
        if subs.iter().any(|s| Arc::ptr_eq(&s.buffer, buffer)) {
            return Err(PortError::AlreadyConnected(connector.to_string()));
        }
        subs.push(Subscriber {
            connector: connector.to_string(),
            buffer: Arc::clone(buffer),
        });
        debug!("Connected {}", connector);
        Ok(())
    }

    /// Drop every subscription from this admin's OutPorts into `peer`'s InPorts.
    ///
    /// Returns the number of connections removed.
    pub fn disconnect_from(&self, peer: &PortAdmin) -> usize {
        let inbound: Vec<&FrameBuffer> = peer
            .ports
            .iter()
            .filter_map(|p| match &p.endpoint {
                Endpoint::Inbound(b) => Some(b),
                Endpoint::Outbound(_) => None,
            })
            .collect();

        let mut removed = 0;
        for entry in &self.ports {
            if let Endpoint::Outbound(list) = &entry.endpoint {
                let mut subs = lock_subscribers(list);
                let before = subs.len();
                subs.retain(|s| {
                    let hit = inbound.iter().any(|b| Arc::ptr_eq(b, &s.buffer));
                    if hit {
                        debug!("Disconnected {}", s.connector);
                    }
                    !hit
                });
                removed += before - subs.len();
            }
        }
        removed
    }

    /// Drop every subscription of this admin's OutPorts.
    pub fn disconnect_all(&self) {
        for entry in &self.ports {
            if let Endpoint::Outbound(list) = &entry.endpoint {
                lock_subscribers(list).clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{TimedLong, TimedVelocity2D};

    fn long(v: i32) -> TimedLong {
        TimedLong {
            data: v,
            ..Default::default()
        }
    }

    fn wired() -> (OutPort<TimedLong>, InPort<TimedLong>) {
        let out = OutPort::<TimedLong>::new("x_out");
        let inp = InPort::<TimedLong>::with_buffer_length("x_in", 3);
        let mut src = PortAdmin::new();
        let mut dst = PortAdmin::new();
        src.add_out_port(&out).unwrap();
        dst.add_in_port(&inp).unwrap();
        src.connect("x_out", &dst, "x_in", "a.x_out -> b.x_in").unwrap();
        (out, inp)
    }

    #[test]
    fn test_write_then_read() {
        let (out, mut inp) = wired();
        assert!(!inp.is_new());
        out.write(&long(7)).unwrap();
        assert!(inp.is_new());
        assert_eq!(inp.read().unwrap().data, 7);
        assert!(!inp.is_new());
    }

    #[test]
    fn test_read_without_data_is_none() {
        let mut inp = InPort::<TimedLong>::new("idle");
        assert!(inp.read().is_none());
    }

    #[test]
    fn test_readback_on_empty_buffer() {
        let (out, mut inp) = wired();
        out.write(&long(3)).unwrap();
        assert_eq!(inp.read().unwrap().data, 3);
        assert_eq!(inp.read().unwrap().data, 3);
    }

    #[test]
    fn test_full_buffer_overwrites_oldest() {
        let (out, mut inp) = wired();
        for v in 1..=5 {
            out.write(&long(v)).unwrap();
        }
        assert_eq!(inp.pending(), 3);
        assert_eq!(inp.overwritten(), 2);
        assert_eq!(inp.read().unwrap().data, 3);
        assert_eq!(inp.read().unwrap().data, 4);
        assert_eq!(inp.read().unwrap().data, 5);
    }

    #[test]
    fn test_unconnected_write_is_ok() {
        let out = OutPort::<TimedLong>::new("lonely");
        assert!(out.write(&long(1)).is_ok());
        assert_eq!(out.connection_count(), 0);
    }

    #[test]
    fn test_fan_out() {
        let out = OutPort::<TimedLong>::new("o");
        let mut a = InPort::<TimedLong>::new("a");
        let mut b = InPort::<TimedLong>::new("b");
        let mut src = PortAdmin::new();
        let mut dst = PortAdmin::new();
        src.add_out_port(&out).unwrap();
        dst.add_in_port(&a).unwrap();
        dst.add_in_port(&b).unwrap();
        src.connect("o", &dst, "a", "o->a").unwrap();
        src.connect("o", &dst, "b", "o->b").unwrap();
        assert_eq!(out.connection_count(), 2);

        out.write(&long(9)).unwrap();
        assert_eq!(a.read().unwrap().data, 9);
        assert_eq!(b.read().unwrap().data, 9);
    }

    #[test]
    fn test_duplicate_port_rejected() {
        let mut admin = PortAdmin::new();
        admin.add_in_port(&InPort::<TimedLong>::new("p")).unwrap();
        let err = admin.add_out_port(&OutPort::<TimedLong>::new("p")).unwrap_err();
        assert_eq!(err, PortError::DuplicatePort("p".to_string()));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let out = OutPort::<TimedLong>::new("o");
        let inp = InPort::<TimedVelocity2D>::new("i");
        let mut src = PortAdmin::new();
        let mut dst = PortAdmin::new();
        src.add_out_port(&out).unwrap();
        dst.add_in_port(&inp).unwrap();
        let err = src.connect("o", &dst, "i", "o->i").unwrap_err();
        assert!(matches!(err, PortError::TypeMismatch { .. }));
    }

    #[test]
    fn test_wrong_direction_rejected() {
        let inp = InPort::<TimedLong>::new("i");
        let mut admin = PortAdmin::new();
        admin.add_in_port(&inp).unwrap();
        let err = admin.connect("i", &admin, "i", "i->i").unwrap_err();
        assert!(matches!(
            err,
            PortError::WrongDirection {
                expected: PortDirection::Out,
                ..
            }
        ));
    }

    #[test]
    fn test_double_connect_rejected() {
        let out = OutPort::<TimedLong>::new("o");
        let inp = InPort::<TimedLong>::new("i");
        let mut admin = PortAdmin::new();
        admin.add_out_port(&out).unwrap();
        admin.add_in_port(&inp).unwrap();
        admin.connect("o", &admin, "i", "loop").unwrap();
        let err = admin.connect("o", &admin, "i", "loop").unwrap_err();
        assert_eq!(err, PortError::AlreadyConnected("loop".to_string()));
    }

    #[test]
    fn test_unknown_port() {
        let admin = PortAdmin::new();
        let err = admin.connect("nope", &admin, "x", "c").unwrap_err();
        assert_eq!(err, PortError::PortNotFound("nope".to_string()));
    }

    #[test]
    fn test_disconnect_from_peer() {
        let out = OutPort::<TimedLong>::new("o");
        let inp = InPort::<TimedLong>::new("i");
        let mut src = PortAdmin::new();
        let mut dst = PortAdmin::new();
        src.add_out_port(&out).unwrap();
        dst.add_in_port(&inp).unwrap();
        src.connect("o", &dst, "i", "o->i").unwrap();

        assert_eq!(src.disconnect_from(&dst), 1);
        assert_eq!(out.connection_count(), 0);
        out.write(&long(1)).unwrap();
        assert!(!inp.is_new());
    }

    #[test]
    fn test_profiles_in_registration_order() {
        let mut admin = PortAdmin::new();
        admin.add_in_port(&InPort::<TimedVelocity2D>::new("out")).unwrap();
        admin.add_out_port(&OutPort::<TimedLong>::new("in")).unwrap();
        let names: Vec<_> = admin.profiles().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["out", "in"]);
        assert_eq!(admin.profile("out").unwrap().direction, PortDirection::In);
        assert_eq!(admin.len(), 2);
    }
}
