// Copyright (C) 2025  Tom Waddington
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Manual-wait gate
//!
//! Holds at most one pending wait. Input sources call [`ManualGate::resume`]
//! from their own tasks; the player awaits [`ManualGate::wait`].

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("manual wait was replaced by a newer wait")]
    Superseded,
}

#[derive(Clone, Default)]
pub struct ManualGate {
    slot: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl ManualGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<oneshot::Sender<()>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a wait, replacing any wait already registered.
    pub fn wait(&self) -> ManualWait {
        let (tx, rx) = oneshot::channel();
        *self.slot() = Some(tx);
        ManualWait { rx }
    }

    /// Releases the registered wait. Returns false if nothing was waiting.
    pub fn resume(&self) -> bool {
        match self.slot().take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.slot().as_ref().is_some_and(|tx| !tx.is_closed())
    }
}

pub struct ManualWait {
    rx: oneshot::Receiver<()>,
}

impl Future for ManualWait {
    type Output = Result<(), GateError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.map_err(|_| GateError::Superseded))
    }
}
