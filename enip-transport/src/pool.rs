//! Shared UDP socket pool
//!
//! A datagram socket can carry traffic for any number of peers, so every
//! I/O connection producing or consuming on the same local address shares
//! one socket. The pool hands out reference-counted handles and only closes
//! a socket when its last holder releases it.
//!
//! Slots live in an arena. A handle carries the slot index and the slot
//! generation at acquisition time; the generation is bumped whenever the
//! slot is emptied, so a handle kept past its final release is rejected.
//!
//! Every `acquire` must be paired with exactly one `release`.

use crate::udp::UdpBinder;
use enip_core::{EipError, EipResult};
use std::collections::HashMap;
use std::net::SocketAddr;

/// Handle to a pooled socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketHandle {
    index: u32,
    generation: u32,
}

impl SocketHandle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// A live socket with its holders count
#[derive(Debug)]
pub struct PooledSocket<S> {
    address: SocketAddr,
    socket: S,
    ref_count: usize,
}

impl<S> PooledSocket<S> {
    /// Address the socket is bound to
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }

    pub fn ref_count(&self) -> usize {
        self.ref_count
    }
}

#[derive(Debug)]
struct Slot<S> {
    generation: u32,
    live: Option<PooledSocket<S>>,
}

/// Outcome of a release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Other holders remain
    Shared { remaining: usize },
    /// Last holder gone, socket closed and slot recycled
    Closed,
}

/// Reference-counted pool of bound UDP sockets
pub struct SocketPool<B: UdpBinder> {
    binder: B,
    slots: Vec<Slot<B::Socket>>,
    by_address: HashMap<SocketAddr, usize>,
    free: Vec<usize>,
}

impl<B: UdpBinder> std::fmt::Debug for SocketPool<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketPool")
            .field("slots", &self.slots.len())
            .field("live", &self.by_address)
            .field("free", &self.free)
            .finish()
    }
}

impl<B: UdpBinder> SocketPool<B> {
    /// Create an empty pool
    pub fn new(binder: B) -> Self {
        Self {
            binder,
            slots: Vec::with_capacity(10),
            by_address: HashMap::new(),
            free: Vec::new(),
        }
    }

    /// Get a socket bound to `address`
    ///
    /// An already pooled socket is shared and its count incremented.
    /// Otherwise a new socket is bound, reusing a recycled slot when one is
    /// available. Bind failures are returned as is; nothing is retried.
    pub fn acquire(&mut self, address: SocketAddr) -> EipResult<SocketHandle> {
        if let Some(&index) = self.by_address.get(&address) {
            let slot = &mut self.slots[index];
            if let Some(live) = slot.live.as_mut() {
                live.ref_count += 1;
                log::trace!("UDP socket {} shared, {} holders", address, live.ref_count);
                return Ok(SocketHandle {
                    index: index as u32,
                    generation: slot.generation,
                });
            }
        }

        let socket = self.binder.bind(address)?;
        let live = PooledSocket {
            address,
            socket,
            ref_count: 1,
        };

        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index].live = Some(live);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    live: Some(live),
                });
                self.slots.len() - 1
            }
        };
        self.by_address.insert(address, index);
        log::debug!("UDP socket bound to {} in slot {}", address, index);

        Ok(SocketHandle {
            index: index as u32,
            generation: self.slots[index].generation,
        })
    }

    /// Give back one reference obtained from `acquire`
    ///
    /// Releasing a handle whose socket has already been closed is a usage
    /// error and leaves the pool unchanged.
    pub fn release(&mut self, handle: SocketHandle) -> EipResult<Release> {
        let index = handle.index as usize;
        let slot = self
            .slots
            .get_mut(index)
            .filter(|slot| slot.generation == handle.generation && slot.live.is_some())
            .ok_or_else(|| {
                log::warn!("Release of stale UDP socket handle {:?}", handle);
                EipError::StaleHandle(format!("{:?}", handle))
            })?;

        let remaining = match slot.live.as_mut() {
            Some(live) => {
                live.ref_count -= 1;
                live.ref_count
            }
            None => 0,
        };
        if remaining > 0 {
            return Ok(Release::Shared { remaining });
        }

        if let Some(live) = slot.live.take() {
            self.by_address.remove(&live.address);
            log::debug!("UDP socket {} closed, slot {} recycled", live.address, index);
        }
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        Ok(Release::Closed)
    }

    /// Live socket behind `handle`
    pub fn get(&self, handle: SocketHandle) -> Option<&PooledSocket<B::Socket>> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.live.as_ref())
    }

    /// Underlying socket behind `handle`
    pub fn socket(&self, handle: SocketHandle) -> Option<&B::Socket> {
        self.get(handle).map(PooledSocket::socket)
    }

    /// Live handle bound to `address`, without taking a reference
    pub fn find(&self, address: SocketAddr) -> Option<SocketHandle> {
        let index = *self.by_address.get(&address)?;
        Some(SocketHandle {
            index: index as u32,
            generation: self.slots[index].generation,
        })
    }

    /// Number of live sockets
    pub fn live_count(&self) -> usize {
        self.by_address.len()
    }

    /// Number of recycled slots waiting for reuse
    pub fn free_slots(&self) -> usize {
        self.free.len()
    }

    /// Iterate over live sockets
    pub fn iter(&self) -> impl Iterator<Item = (SocketHandle, &PooledSocket<B::Socket>)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.live.as_ref().map(|live| {
                (
                    SocketHandle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    live,
                )
            })
        })
    }

    /// Close every socket regardless of holders (shutdown only)
    pub fn close_all(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.live.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index);
            }
        }
        self.by_address.clear();
    }

    pub fn binder(&self) -> &B {
        &self.binder
    }

    pub fn binder_mut(&mut self) -> &mut B {
        &mut self.binder
    }
}
