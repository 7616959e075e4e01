// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! Hierarchical timing wheel: one near wheel of 256 ticks plus four 64-slot cascades
//! covering progressively coarser time, ticking every 10 ms (§3, §4.4).
//!
//! Grounded directly on `skynet_timer.c`'s `TIME_NEAR_SHIFT`/`TIME_LEVEL_SHIFT`
//! constants and its cascade-carry algorithm: each tick executes the near wheel's
//! current bucket, then advances the clock; if advancing causes a cascade's low bits to
//! roll over to zero, that cascade's current bucket is re-bucketed (via the same
//! bucket-selection rule) into lower levels.

use hive_core::{Handle, Session};
use std::collections::VecDeque;

const TIME_NEAR_SHIFT: u32 = 8;
const TIME_NEAR: usize = 1 << TIME_NEAR_SHIFT; // 256
const TIME_NEAR_MASK: u32 = (TIME_NEAR as u32) - 1;
const TIME_LEVEL_SHIFT: u32 = 6;
const TIME_LEVEL: usize = 1 << TIME_LEVEL_SHIFT; // 64
const TIME_LEVEL_MASK: u32 = (TIME_LEVEL as u32) - 1;
const CASCADE_COUNT: usize = 4;

/// One scheduled wake-up: deliver a `Response`-type message to `handle` carrying
/// `session`, once `expire_tick` arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerNode {
    pub expire_tick: u64,
    pub handle: Handle,
    pub session: Session,
}

/// A fired timer ready for delivery by the caller (the wheel itself doesn't know how to
/// reach a mailbox - that's `hive-dispatch`'s job).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub handle: Handle,
    pub session: Session,
}

/// The wheel itself. Not thread-safe on its own; callers (the timer thread in
/// `hive-dispatch`) wrap it in `hive_core::Spinlock`, matching the spec's "one spinlock,
/// held only for one tick's worth of work at a time" (§4.4, §5).
#[derive(Debug)]
pub struct TimingWheel {
    current_tick: u64,
    near: Vec<VecDeque<TimerNode>>,
    cascades: [Vec<VecDeque<TimerNode>>; CASCADE_COUNT],
}

impl Default for TimingWheel {
    fn default() -> Self { Self::new() }
}

impl TimingWheel {
    #[must_use]
    pub fn new() -> Self {
        TimingWheel {
            current_tick: 0,
            near: (0..TIME_NEAR).map(|_| VecDeque::new()).collect(),
            cascades: std::array::from_fn(|_| (0..TIME_LEVEL).map(|_| VecDeque::new()).collect()),
        }
    }

    pub fn current_tick(&self) -> u64 { self.current_tick }

    /// Schedules `{handle, session}` to fire after `ticks` ticks. `ticks <= 0` is the
    /// caller's cue to deliver immediately instead of calling this (§4.4 `timeout`);
    /// this method always schedules (the immediate case is handled one layer up, in
    /// `hive-dispatch`, since firing "now" means pushing straight to a mailbox rather
    /// than touching the wheel at all).
    pub fn schedule(&mut self, handle: Handle, session: Session, ticks: u64) {
        let expire = self.current_tick + ticks.max(1);
        self.insert(TimerNode { expire_tick: expire, handle, session });
    }

    fn insert(&mut self, node: TimerNode) {
        let bucket = self.bucket_for(node.expire_tick, self.current_tick);
        match bucket {
            Bucket::Near(slot) => self.near[slot].push_back(node),
            Bucket::Cascade(level, slot) => self.cascades[level][slot].push_back(node),
        }
    }

    /// Bucket-selection rule (§4.4): if `expire` and `current` agree on every bit above
    /// the near wheel's range, the node belongs in the near wheel at
    /// `expire & TIME_NEAR_MASK`. Otherwise it belongs in the coarsest cascade whose
    /// range it still fits within, found by testing each level in turn.
    fn bucket_for(&self, expire: u64, current: u64) -> Bucket {
        let diff = expire ^ current;
        if (diff >> TIME_NEAR_SHIFT) == 0 {
            return Bucket::Near((expire & u64::from(TIME_NEAR_MASK)) as usize);
        }
        for level in 0..CASCADE_COUNT {
            let shift = TIME_NEAR_SHIFT + TIME_LEVEL_SHIFT * (level as u32 + 1);
            if (diff >> shift) == 0 || level == CASCADE_COUNT - 1 {
                let slot_shift = TIME_NEAR_SHIFT + TIME_LEVEL_SHIFT * level as u32;
                let slot = ((expire >> slot_shift) & u64::from(TIME_LEVEL_MASK)) as usize;
                return Bucket::Cascade(level, slot);
            }
        }
        unreachable!("loop above always returns by the last iteration")
    }

    /// Advances the wheel by one tick (10 ms), returning every timer that fired. Drains
    /// the near wheel's current bucket first, then advances the clock and cascades any
    /// bucket whose low bits just rolled over to zero back into lower levels.
    pub fn tick(&mut self) -> Vec<Fired> {
        let slot = (self.current_tick & u64::from(TIME_NEAR_MASK)) as usize;
        let fired: Vec<Fired> = self.near[slot]
            .drain(..)
            .map(|n| Fired { handle: n.handle, session: n.session })
            .collect();

        self.current_tick += 1;
        self.cascade();
        fired
    }

    /// After advancing the clock, re-buckets any cascade slot whose low bits just
    /// became zero - i.e. whose entire coarser-grained bucket is now due to be spread
    /// back into finer-grained buckets. Mirrors `skynet_timer.c`'s `move_list`/
    /// `timer_shift` walk: it keeps moving one level down as long as the *next* level's
    /// low bits are also zero, which happens when multiple wheel levels roll over on
    /// the same tick (e.g. every `TIME_NEAR * TIME_LEVEL` ticks).
    fn cascade(&mut self) {
        let mut mask = u64::from(TIME_NEAR_MASK);
        let mut level = 0;
        loop {
            if self.current_tick & mask != 0 {
                break;
            }
            let level_shift = TIME_NEAR_SHIFT + TIME_LEVEL_SHIFT * level as u32;
            let slot = ((self.current_tick >> level_shift) & u64::from(TIME_LEVEL_MASK)) as usize;
            let nodes: Vec<TimerNode> = self.cascades[level][slot].drain(..).collect();
            for node in nodes {
                self.insert(node);
            }
            level += 1;
            if level >= CASCADE_COUNT {
                break;
            }
            mask = (1u64 << (TIME_NEAR_SHIFT + TIME_LEVEL_SHIFT * level as u32)) - 1;
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Bucket {
    Near(usize),
    Cascade(usize, usize),
}
