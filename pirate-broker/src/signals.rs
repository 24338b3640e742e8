//! Translates OS signals into flags the broker loop checks once per iteration.
//!
//! Handlers only ever touch atomics — never locks, never allocation — so they stay
//! async-signal-safe; [`SignalDispatcher::drain`] does the real work back on the broker's own
//! stack.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use signal_hook::consts::signal::{
    SIGCHLD, SIGHUP, SIGINT, SIGPIPE, SIGQUIT, SIGTERM, SIGTTIN, SIGTTOU,
};
use signal_hook::flag;

use crate::error::BrokerResult;

/// Signal-driven actions the broker loop must take this iteration. `grow_by`/`shrink_by` count
/// every TTIN/TTOU delivered since the last [`SignalDispatcher::drain`] call, not just whether
/// one arrived — a burst of five TTINs must move `max_servers` by five, not one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SignalActions {
    /// INT or TERM received: begin graceful shutdown.
    pub shutdown: bool,
    /// QUIT received: same as `shutdown`, tagged for observability.
    pub quit: bool,
    /// HUP received: restart every live child.
    pub restart: bool,
    /// CHLD received since the last drain: a child may be reapable.
    pub child_exited: bool,
    /// Number of TTIN signals since the last drain.
    pub grow_by: usize,
    /// Number of TTOU signals since the last drain.
    pub shrink_by: usize,
}

pub struct SignalDispatcher {
    term: Arc<AtomicBool>,
    quit: Arc<AtomicBool>,
    hup: Arc<AtomicBool>,
    chld: Arc<AtomicBool>,
    ttin: Arc<AtomicUsize>,
    ttou: Arc<AtomicUsize>,
}

impl SignalDispatcher {
    /// Registers handlers for INT, TERM, QUIT, HUP, CHLD, TTIN and TTOU. PIPE is registered
    /// with a no-op handler so a write to a half-closed socket never takes down the process by
    /// default disposition.
    pub fn install() -> BrokerResult<Self> {
        let term = Arc::new(AtomicBool::new(false));
        let quit = Arc::new(AtomicBool::new(false));
        let hup = Arc::new(AtomicBool::new(false));
        let chld = Arc::new(AtomicBool::new(false));
        let ttin = Arc::new(AtomicUsize::new(0));
        let ttou = Arc::new(AtomicUsize::new(0));

        flag::register(SIGINT, Arc::clone(&term))?;
        flag::register(SIGTERM, Arc::clone(&term))?;
        flag::register(SIGQUIT, Arc::clone(&quit))?;
        flag::register(SIGHUP, Arc::clone(&hup))?;
        flag::register(SIGCHLD, Arc::clone(&chld))?;

        let ttin_counter = Arc::clone(&ttin);
        let ttou_counter = Arc::clone(&ttou);
        unsafe {
            signal_hook::low_level::register(SIGTTIN, move || {
                ttin_counter.fetch_add(1, Ordering::Relaxed);
            })?;
            signal_hook::low_level::register(SIGTTOU, move || {
                ttou_counter.fetch_add(1, Ordering::Relaxed);
            })?;
            signal_hook::low_level::register(SIGPIPE, || {})?;
        }

        Ok(Self {
            term,
            quit,
            hup,
            chld,
            ttin,
            ttou,
        })
    }

    /// Consumes every flag set since the last call and reports this iteration's actions.
    pub fn drain(&self) -> SignalActions {
        SignalActions {
            shutdown: self.term.swap(false, Ordering::AcqRel),
            quit: self.quit.swap(false, Ordering::AcqRel),
            restart: self.hup.swap(false, Ordering::AcqRel),
            child_exited: self.chld.swap(false, Ordering::AcqRel),
            grow_by: self.ttin.swap(0, Ordering::AcqRel),
            shrink_by: self.ttou.swap(0, Ordering::AcqRel),
        }
    }
}
