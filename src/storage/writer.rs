use std::{
    sync::mpsc::{self, Receiver, Sender},
    thread::{self, JoinHandle},
};

use tracing::{debug, error};

use crate::{models::store::Store, storage::Storage};

/// Outcome of a durable-store operation, reported out of band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceEvent {
    Saved { clients: usize },
    SaveFailed { error: String },
    LoadFailed { error: String },
}

enum WriteCommand {
    Save(Store),
    Flush(Sender<()>),
}

/// Writes whole-list snapshots on a dedicated thread so mutations never wait
/// on disk. Writes are applied in submission order; dropping the writer drains
/// the queue before returning.
pub struct BackgroundWriter {
    commands: Option<Sender<WriteCommand>>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundWriter {
    pub fn spawn<S>(storage: S, events: Sender<PersistenceEvent>) -> Self
    where
        S: Storage + Send + 'static,
    {
        let (commands, queue) = mpsc::channel();
        let handle = thread::spawn(move || run(storage, queue, events));

        Self {
            commands: Some(commands),
            handle: Some(handle),
        }
    }

    /// Queues a snapshot and returns immediately.
    pub fn submit(&self, store: Store) {
        if let Some(commands) = &self.commands
            && commands.send(WriteCommand::Save(store)).is_err()
        {
            error!("persistence thread is gone, snapshot dropped");
        }
    }

    /// Blocks until every snapshot submitted so far has been written or has failed.
    pub fn flush(&self) {
        let Some(commands) = &self.commands else {
            return;
        };
        let (ack, done) = mpsc::channel();
        if commands.send(WriteCommand::Flush(ack)).is_ok() {
            let _ = done.recv();
        }
    }
}

impl Drop for BackgroundWriter {
    fn drop(&mut self) {
        // Closing the channel ends the loop once the queue is drained
        self.commands.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            error!("persistence thread panicked");
        }
    }
}

fn run<S: Storage>(storage: S, queue: Receiver<WriteCommand>, events: Sender<PersistenceEvent>) {
    for command in queue {
        match command {
            WriteCommand::Save(store) => {
                let event = match storage.save(&store) {
                    Ok(()) => {
                        debug!(clients = store.clients.len(), "client list persisted");
                        PersistenceEvent::Saved {
                            clients: store.clients.len(),
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "failed to persist client list");
                        PersistenceEvent::SaveFailed {
                            error: e.to_string(),
                        }
                    }
                };
                // Nobody listening is fine
                let _ = events.send(event);
            }
            WriteCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}
