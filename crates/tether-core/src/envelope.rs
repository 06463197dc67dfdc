//! The tagged unit travelling through the work queue.

use std::fmt;

use crate::work::WorkItem;

/// One entry in the work queue.
///
/// The queue owns an envelope between push and pop. Dropping an envelope
/// drops any work item inside it, which is how undelivered work is
/// disposed during shutdown draining.
pub enum Envelope {
    /// A work item to execute on the owner thread.
    Work(Box<dyn WorkItem>),
    /// One timer period elapsed.
    Tick,
    /// Terminal marker: stop the ticker, drain, and exit.
    Shutdown,
}

/// Payload-free discriminant of an [`Envelope`], for logging and counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    /// [`Envelope::Work`].
    Work,
    /// [`Envelope::Tick`].
    Tick,
    /// [`Envelope::Shutdown`].
    Shutdown,
}

impl Envelope {
    /// Wrap a work item.
    pub fn work<W: WorkItem>(item: W) -> Self {
        Self::Work(Box::new(item))
    }

    /// The envelope's kind.
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Self::Work(_) => EnvelopeKind::Work,
            Self::Tick => EnvelopeKind::Tick,
            Self::Shutdown => EnvelopeKind::Shutdown,
        }
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Work(_) => f.write_str("Work(..)"),
            Self::Tick => f.write_str("Tick"),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Work => write!(f, "work"),
            Self::Tick => write!(f, "tick"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}
