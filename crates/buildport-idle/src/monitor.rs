//! The idle monitor actor.
//!
//! Each monitor is a Tokio task that owns an [`IdleMachine`] and sleeps
//! until the machine's next deadline or the next command, whichever comes
//! first. The host talks to it through an [`IdleMonitorHandle`] and renders
//! the warning from the published [`IdleSnapshot`].
//!
//! Dropping every handle disposes the monitor, the same as unmounting the
//! component that owned it.

use std::future::Future;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant};

use crate::config::{IdleConfig, Interaction, LogoutReason};
use crate::error::IdleError;
use crate::machine::{IdleEvent, IdleMachine, IdleSnapshot};

const COMMAND_BUFFER: usize = 64;

/// Called when the monitor ends the session.
///
/// Invoked at most once per monitor, after the `Terminated` snapshot is
/// published and before the task exits.
pub trait LogoutHook: Send + Sync + 'static {
    fn on_logout(&self, reason: LogoutReason) -> impl Future<Output = ()> + Send;
}

/// Commands sent to the actor. The `reply` carries the snapshot after the
/// command took effect.
enum IdleCommand {
    Activity(Interaction),
    Stay {
        reply: oneshot::Sender<IdleSnapshot>,
    },
    ForceLogout {
        reply: oneshot::Sender<IdleSnapshot>,
    },
    Dispose {
        reply: oneshot::Sender<IdleSnapshot>,
    },
}

/// Handle to a running idle monitor. Cheap to clone.
#[derive(Clone)]
pub struct IdleMonitorHandle {
    sender: mpsc::Sender<IdleCommand>,
    snapshot: watch::Receiver<IdleSnapshot>,
}

impl IdleMonitorHandle {
    /// Reports a user interaction.
    pub async fn record_activity(&self, interaction: Interaction) -> Result<(), IdleError> {
        self.sender
            .send(IdleCommand::Activity(interaction))
            .await
            .map_err(|_| IdleError::Stopped)
    }

    /// Non-blocking [`record_activity`](Self::record_activity) for
    /// synchronous event listeners. A full buffer drops the interaction;
    /// the ones already queued reset the timer anyway.
    pub fn try_record_activity(&self, interaction: Interaction) -> Result<(), IdleError> {
        match self.sender.try_send(IdleCommand::Activity(interaction)) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(IdleError::Stopped),
        }
    }

    /// "Stay signed in".
    pub async fn stay(&self) -> Result<IdleSnapshot, IdleError> {
        self.request(|reply| IdleCommand::Stay { reply }).await
    }

    /// "Log out now". Resolves after the logout hook has finished.
    pub async fn force_logout(&self) -> Result<IdleSnapshot, IdleError> {
        self.request(|reply| IdleCommand::ForceLogout { reply }).await
    }

    /// Stops the monitor without logging out. Once this resolves no timer
    /// is left running.
    pub async fn dispose(&self) -> Result<IdleSnapshot, IdleError> {
        self.request(|reply| IdleCommand::Dispose { reply }).await
    }

    /// The most recently published state.
    pub fn snapshot(&self) -> IdleSnapshot {
        *self.snapshot.borrow()
    }

    /// A receiver that sees every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<IdleSnapshot> {
        self.snapshot.clone()
    }

    /// Waits until a published snapshot satisfies `predicate`.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&IdleSnapshot) -> bool,
    ) -> Result<IdleSnapshot, IdleError> {
        let mut rx = self.snapshot.clone();
        let snapshot = rx
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| IdleError::Stopped)?;
        Ok(*snapshot)
    }

    /// Whether the actor task is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }

    async fn request(
        &self,
        command: impl FnOnce(oneshot::Sender<IdleSnapshot>) -> IdleCommand,
    ) -> Result<IdleSnapshot, IdleError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| IdleError::Stopped)?;
        reply_rx.await.map_err(|_| IdleError::Stopped)
    }
}

/// Spawns idle monitors.
pub struct IdleMonitor;

impl IdleMonitor {
    /// Starts a monitor on the current Tokio runtime.
    ///
    /// The inactivity timer is armed as soon as the task first runs.
    pub fn start<H: LogoutHook>(config: IdleConfig, hook: H) -> IdleMonitorHandle {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let machine = IdleMachine::new(config);
        let (snapshot_tx, snapshot_rx) = watch::channel(machine.snapshot());

        let actor = IdleActor {
            machine,
            hook,
            receiver: rx,
            snapshot: snapshot_tx,
        };
        tokio::spawn(actor.run());

        IdleMonitorHandle {
            sender: tx,
            snapshot: snapshot_rx,
        }
    }
}

struct IdleActor<H: LogoutHook> {
    machine: IdleMachine,
    hook: H,
    receiver: mpsc::Receiver<IdleCommand>,
    snapshot: watch::Sender<IdleSnapshot>,
}

impl<H: LogoutHook> IdleActor<H> {
    async fn run(mut self) {
        tracing::debug!("idle monitor actor started");

        let started = self.machine.start(Instant::now());
        if self.settle(started, None).await {
            return;
        }

        loop {
            let deadline = self.machine.next_deadline();
            let (event, reply) = tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => (self.machine.dispose(), None),
                },
                () = sleep_until(deadline) => (self.machine.on_timer(Instant::now()), None),
            };

            if self.settle(event, reply).await {
                break;
            }
        }

        tracing::debug!(state = %self.machine.state(), "idle monitor actor stopped");
    }

    fn handle(
        &mut self,
        cmd: IdleCommand,
    ) -> (Option<IdleEvent>, Option<oneshot::Sender<IdleSnapshot>>) {
        let now = Instant::now();
        match cmd {
            IdleCommand::Activity(interaction) => {
                self.machine.record_activity(interaction, now);
                (None, None)
            }
            IdleCommand::Stay { reply } => (self.machine.stay(now), Some(reply)),
            IdleCommand::ForceLogout { reply } => (self.machine.force_logout(), Some(reply)),
            IdleCommand::Dispose { reply } => (self.machine.dispose(), Some(reply)),
        }
    }

    /// Publishes the new state, runs the logout hook on termination and
    /// answers the caller. Returns `true` once the machine is final.
    async fn settle(
        &mut self,
        event: Option<IdleEvent>,
        reply: Option<oneshot::Sender<IdleSnapshot>>,
    ) -> bool {
        if event.is_some() {
            self.snapshot.send_replace(self.machine.snapshot());
        }

        if let Some(IdleEvent::Terminated(reason)) = event {
            // Commands sent while the hook runs fail with `Stopped`.
            self.receiver.close();
            self.hook.on_logout(reason).await;
        }

        if let Some(reply) = reply {
            let _ = reply.send(self.machine.snapshot());
        }

        self.machine.state().is_final()
    }
}

/// Sleeps until `deadline`, or forever when nothing is armed.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
