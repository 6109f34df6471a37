use std::collections::HashMap;

use log::trace;

use crate::{
    error::{Error, Result},
    imap::{SendCommand, SeqNum, Session, Uid},
};

/// Translates one batch of UIDs of the selected folder into current sequence numbers, in the
/// order the UIDs were given.
///
/// Sequence numbers are only valid until the next expunge, so every batch is resolved right
/// before it is used. A count mismatch means another client changed the folder and fails the
/// batch before anything is copied.
pub async fn resolve_sequence_numbers<C: SendCommand>(
    session: &mut Session<C>,
    batch: usize,
    uids: &[Uid],
) -> Result<Vec<(Uid, SeqNum)>> {
    if uids.is_empty() {
        return Ok(Vec::new());
    }

    let mut positions: HashMap<Uid, SeqNum> = HashMap::with_capacity(uids.len());
    for (uid, seq) in session.uid_fetch_sequence_numbers(uids).await? {
        positions.insert(uid, seq);
    }

    let mut resolved = Vec::with_capacity(uids.len());
    for uid in uids {
        if let Some(seq) = positions.remove(uid) {
            resolved.push((*uid, seq));
        }
    }
    if !positions.is_empty() {
        trace!("ignored {} unsolicited FETCH responses", positions.len());
    }

    if resolved.len() == uids.len() {
        Ok(resolved)
    } else {
        Err(Error::ResolutionMismatch {
            batch,
            requested: uids.len(),
            resolved: resolved.len(),
        })
    }
}
