//! Bounded wait for a subordinate's response.
//!
//! After a relayed command has been sent and receive is armed, [`collect`]
//! polls the bus until one of three things happens:
//!
//! - the last received byte is a CR ([`WaitOutcome::Terminated`])
//! - characters started arriving and then stopped for [`QUIET_TIME`] polls
//!   ([`WaitOutcome::Quiet`])
//! - the persisted timeout elapsed ([`WaitOutcome::TimedOut`])
//!
//! The poll count at which the wait ended is recorded in [`TimingStats`].

use crate::bus::BusLink;
use crate::timer::QUIET_TIME;

/// Why the wait for a response ended.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum WaitOutcome {
    /// A CR-terminated response arrived.
    Terminated,
    /// The response stalled after it had started.
    Quiet,
    /// Nothing conclusive arrived within the timeout.
    TimedOut,
}

/// Observed round-trip delays, in polls.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct TimingStats {
    /// Delay of the most recent relay.
    pub last: u32,
    /// Largest delay since the maximum was last read.
    pub max: u32,
}

impl TimingStats {
    /// Records a completed wait.
    pub fn record(&mut self, polls: u32) {
        self.last = polls;
        self.max = self.max.max(polls);
    }

    /// Returns the maximum and resets it to zero.
    pub fn take_max(&mut self) -> u32 {
        core::mem::take(&mut self.max)
    }
}

/// Waits for the response to a relayed command.
///
/// # Arguments
/// - `bus`: the bus, already listening
/// - `timeout`: maximum number of polls
/// - `stats`: updated with the poll count at which the wait ended
pub fn collect<B: BusLink>(bus: &mut B, timeout: u32, stats: &mut TimingStats) -> WaitOutcome {
    let mut polls: u32 = 0;
    let mut seen = 0;
    let mut quiet = QUIET_TIME;

    let outcome = loop {
        if polls >= timeout {
            break WaitOutcome::TimedOut;
        }
        polls += 1;

        let progress = bus.progress();
        if progress.terminated {
            break WaitOutcome::Terminated;
        }
        if progress.len > seen {
            seen = progress.len;
            quiet = QUIET_TIME;
        } else if seen > 0 {
            quiet -= 1;
            if quiet == 0 {
                break WaitOutcome::Quiet;
            }
        }
    };

    stats.record(polls);
    trace!("response wait ended after {} polls", polls);
    outcome
}
