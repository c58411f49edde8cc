//! Reconciliation of duplicated subordinate responses.
//!
//! A subordinate with redundant output sends its payload twice, framed by
//! the [`SENTINEL`] byte:
//!
//! ```text
//! ID SC p1 .. pn SC p1 .. pn SC CR
//! ```
//!
//! [`reconcile`] checks the three sentinel positions and the two copies
//! against each other and rewrites the frame in place to `ID p1 .. pn CR`,
//! or to `ID ERROR CR` on any mismatch. A response without a sentinel is
//! left alone. A payload that itself contains the sentinel byte cannot be
//! told apart from this framing.

use crate::consts::{CR, REPLY_ERROR, SENTINEL};
use crate::frame::ResponseFrame;

/// Result of [`reconcile`].
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Verdict {
    /// No sentinel present; the frame is unchanged.
    Plain,
    /// The copies agreed and the frame now holds one of them.
    Deduplicated,
    /// Structure or copies disagreed; the payload is now `ERROR`.
    Corrupt,
}

/// Validates and folds a duplicated response in place.
pub fn reconcile(response: &mut ResponseFrame) -> Verdict {
    if !response.contains(&SENTINEL) {
        return Verdict::Plain;
    }

    let len = response.len();
    // ID SC SC SC CR is the shortest duplicated frame.
    if len < 5 {
        return corrupt(response);
    }
    let last = len - 1;
    let middle = last >> 1;

    let frame = response.as_mut_slice();
    let mut intact =
        frame[1] == SENTINEL && frame[middle] == SENTINEL && frame[last - 1] == SENTINEL;
    for i in 1..middle {
        if frame[i + 1] == frame[i + middle] {
            frame[i] = frame[i + middle];
        } else {
            intact = false;
        }
    }
    if !intact {
        return corrupt(response);
    }

    frame[middle - 1] = CR;
    response.truncate(middle);
    Verdict::Deduplicated
}

fn corrupt(response: &mut ResponseFrame) -> Verdict {
    response.truncate(1);
    let _ = response.extend_from_slice(REPLY_ERROR);
    let _ = response.push(CR);
    Verdict::Corrupt
}
