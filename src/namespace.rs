// Tue Jan 13 2026 - Alex

//! Named single-threaded processes.
//!
//! Every session and forwarder is an OS thread draining a private mailbox.
//! The namespace maps process names to mailboxes and is the only state shared
//! between them. Registration is create-or-fail under the write lock, and a
//! process removes its own entry when its thread finishes.

use crate::error::{AckError, AckResult};
use crate::message::SessionMessage;
use ahash::AHashMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

#[derive(Clone)]
pub struct ActorRef {
    name: Arc<str>,
    mailbox: Sender<SessionMessage>,
}

impl ActorRef {
    /// A reference plus the receiving end of its mailbox, not registered
    /// anywhere. Useful for callers that drain the mailbox themselves.
    pub fn channel(name: &str) -> (ActorRef, Receiver<SessionMessage>) {
        let (mailbox, receiver) = channel();
        let actor = ActorRef {
            name: Arc::from(name),
            mailbox,
        };
        (actor, receiver)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns false when the process has already stopped.
    pub fn tell(&self, message: SessionMessage) -> bool {
        self.mailbox.send(message).is_ok()
    }
}

impl fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActorRef").field(&self.name).finish()
    }
}

#[derive(Default)]
pub struct ProcessNamespace {
    processes: RwLock<AHashMap<String, ActorRef>>,
}

impl ProcessNamespace {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers `name` and runs `body` on a dedicated thread with the
    /// process's mailbox and its own reference.
    pub fn spawn<F>(self: &Arc<Self>, name: &str, body: F) -> AckResult<ActorRef>
    where
        F: FnOnce(Receiver<SessionMessage>, ActorRef) + Send + 'static,
    {
        let (actor, mailbox) = ActorRef::channel(name);

        {
            let mut processes = self.processes.write();
            if processes.contains_key(name) {
                return Err(AckError::NameConflict(name.to_string()));
            }
            processes.insert(name.to_string(), actor.clone());
        }

        let registration = Registration {
            namespace: Arc::clone(self),
            name: name.to_string(),
        };
        let self_ref = actor.clone();

        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _registration = registration;
                body(mailbox, self_ref);
            })
            .map_err(AckError::Spawn)?;

        log::trace!("Spawned process {}", name);
        Ok(actor)
    }

    pub fn lookup(&self, name: &str) -> Option<ActorRef> {
        self.processes.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.processes.read().contains_key(name)
    }

    /// Delivers to a registered process; false when nothing by that name is
    /// alive.
    pub fn tell(&self, name: &str, message: SessionMessage) -> bool {
        match self.lookup(name) {
            Some(actor) => actor.tell(message),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.processes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.read().is_empty()
    }

    fn release(&self, name: &str) {
        if self.processes.write().remove(name).is_some() {
            log::trace!("Released process name {}", name);
        }
    }
}

/// Owned by the process thread; dropping it (normal exit, panic, or a failed
/// spawn discarding the closure) frees the name.
struct Registration {
    namespace: Arc<ProcessNamespace>,
    name: String,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.namespace.release(&self.name);
    }
}
