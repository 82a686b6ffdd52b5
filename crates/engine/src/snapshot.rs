//! Stake reduction: fold the delegation event log into the current stake
//! per delegator.

use hivesplit_types::{DelegationEvent, StakeEntry, StakeSnapshot};

/// Last-writer-wins reduction over block number.
///
/// Single pass: per delegator, keep the event with the highest `block_num`
/// seen so far. An equal block number replaces the retained entry, so ties
/// resolve last-seen-wins in stream order (block numbers are assumed unique
/// per delegator update in the source log). Delegators whose retained stake
/// is zero VESTS (a full withdrawal) are dropped afterwards. O(n); no
/// sorting. Self-delegation is not filtered here, that is the allocator's
/// call.
pub fn latest_stakes(events: &[DelegationEvent]) -> StakeSnapshot {
    let mut snapshot = StakeSnapshot::new();
    for event in events {
        match snapshot.get(&event.delegator) {
            Some(current) if current.block_num > event.block_num => {}
            _ => {
                snapshot.insert(event.delegator.clone(), StakeEntry::from_event(event));
            }
        }
    }
    snapshot.retain(|_, entry| entry.vests > 0.0);
    snapshot
}
