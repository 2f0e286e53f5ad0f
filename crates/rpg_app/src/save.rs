//! Background saving.
//!
//! Between frames the tick loop captures a [`WorldSnapshot`], an owned copy of
//! every component record, and submits it to the [`SaveWorker`]. The worker
//! encodes snapshots with MessagePack on its own thread and hands the bytes to
//! a [`SaveSink`]. The simulation never waits on the sink.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use rpg_system::{CollisionData, FocusData, MovementData, Simulation};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("failed to decode snapshot: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("save worker has shut down")]
    Closed,

    #[error("failed to start save worker: {0}")]
    Spawn(#[source] io::Error),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Every component record of the simulation at the end of one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub frame: u64,
    pub movement: Vec<MovementData>,
    pub collision: Vec<CollisionData>,
    pub focus: Vec<FocusData>,
}

impl WorldSnapshot {
    #[must_use]
    pub fn capture(sim: &Simulation) -> Self {
        Self {
            frame: sim.frame(),
            movement: sim.movement().data().iter().map(|(_, data)| *data).collect(),
            collision: sim.collision().data().iter().map(|(_, data)| *data).collect(),
            focus: sim.focus().data().iter().map(|(_, data)| *data).collect(),
        }
    }

    /// # Errors
    ///
    /// Returns [`SaveError::Encode`] if serialisation fails.
    pub fn encode(&self) -> Result<Vec<u8>, SaveError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// # Errors
    ///
    /// Returns [`SaveError::Decode`] if `bytes` is not an encoded snapshot.
    #[allow(dead_code)]
    pub fn decode(bytes: &[u8]) -> Result<Self, SaveError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// Destination for encoded snapshots. Runs on the worker thread.
pub trait SaveSink: Send + 'static {
    /// # Errors
    ///
    /// Returns an error if the bytes could not be stored.
    fn write(&mut self, frame: u64, bytes: &[u8]) -> Result<(), SaveError>;
}

/// Writes one file per snapshot into a directory.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    /// # Errors
    ///
    /// Returns [`SaveError::Io`] if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SaveError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| SaveError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path_for(&self, frame: u64) -> PathBuf {
        self.dir.join(format!("frame-{frame:08}.msgpack"))
    }
}

impl SaveSink for FileSink {
    fn write(&mut self, frame: u64, bytes: &[u8]) -> Result<(), SaveError> {
        let path = self.path_for(frame);
        fs::write(&path, bytes).map_err(|source| SaveError::Io { path, source })
    }
}

/// Owns the save thread. Dropping the worker closes the queue and waits for
/// the snapshots already submitted.
#[derive(Debug)]
pub struct SaveWorker {
    sender: Option<Sender<WorldSnapshot>>,
    handle: Option<JoinHandle<usize>>,
}

impl SaveWorker {
    /// # Errors
    ///
    /// Returns [`SaveError::Spawn`] if the thread cannot be started.
    pub fn spawn(sink: impl SaveSink) -> Result<Self, SaveError> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let handle = thread::Builder::new()
            .name("save-worker".into())
            .spawn(move || run(&receiver, sink))
            .map_err(SaveError::Spawn)?;
        info!("save worker started");
        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Queue a snapshot for saving.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Closed`] if the worker thread has exited.
    pub fn submit(&self, snapshot: WorldSnapshot) -> Result<(), SaveError> {
        let sender = self.sender.as_ref().ok_or(SaveError::Closed)?;
        sender.send(snapshot).map_err(|_| SaveError::Closed)
    }

    /// Close the queue, wait for the pending snapshots and return how many
    /// were saved.
    pub fn shutdown(mut self) -> usize {
        self.join()
    }

    fn join(&mut self) -> usize {
        self.sender.take();
        let Some(handle) = self.handle.take() else {
            return 0;
        };
        match handle.join() {
            Ok(saved) => {
                info!(saved, "save worker stopped");
                saved
            }
            Err(_) => {
                error!("save worker panicked");
                0
            }
        }
    }
}

impl Drop for SaveWorker {
    fn drop(&mut self) {
        self.join();
    }
}

fn run(receiver: &Receiver<WorldSnapshot>, mut sink: impl SaveSink) -> usize {
    let mut saved = 0;
    for snapshot in receiver {
        let frame = snapshot.frame;
        match snapshot.encode().and_then(|bytes| sink.write(frame, &bytes)) {
            Ok(()) => {
                saved += 1;
                debug!(frame, "snapshot saved");
            }
            Err(err) => error!(frame, %err, "snapshot not saved"),
        }
    }
    saved
}
