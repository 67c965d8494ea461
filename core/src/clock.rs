//! Simulation clock: turns wall-clock time into ticks.
//!
//! The clock is polled once per real-time frame and answers with the
//! ticks that have become due since the last poll. Speed is a tick rate;
//! a rate of 0 is the paused state.
//!
//! RULE: the clock never references simulation state. Whoever polls it
//! pushes the due ticks into the world, one tick at a time.

use std::ops::Range;

use crate::types::{Tick, WallTime};
use serde::{Deserialize, Serialize};

/// How many tick intervals the deadline may lag behind the wall clock
/// before freeze protection drops the missed ticks.
pub const ACCEPTABLE_TICK_DELAY: f64 = 2.0;

/// Scheduling state. Replaces an optional deadline plus an optional
/// pause remainder, which could be set in contradictory combinations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockState {
    /// Nothing scheduled and nothing accrued toward the next tick.
    Stopped,
    /// The next tick fires once the wall clock reaches `next_tick`.
    Running { next_tick: WallTime },
    /// Paused part-way through an interval. `remainder` is the time that
    /// was still missing to the next tick, in ticks of the old rate.
    Paused { remainder: f64 },
}

/// Emitted on every rate change so views can reflect the new speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateChange {
    pub old: u32,
    pub new: u32,
}

#[derive(Debug, Clone)]
pub struct SimulationClock {
    ticks_per_second:  u32,
    state:             ClockState,
    freeze_protection: bool,
    current_tick:      Tick,
}

impl SimulationClock {
    pub fn new(ticks_per_second: u32, freeze_protection: bool) -> Self {
        Self {
            ticks_per_second,
            state: ClockState::Stopped,
            freeze_protection,
            current_tick: 0,
        }
    }

    /// Rebuild a clock from a savegame. Wall-clock deadlines are
    /// meaningless across sessions, so the restored clock is stopped.
    pub fn restore(snapshot: &ClockSnapshot, freeze_protection: bool) -> Self {
        Self {
            ticks_per_second: snapshot.ticks_per_second,
            state: ClockState::Stopped,
            freeze_protection,
            current_tick: snapshot.current_tick,
        }
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        ClockSnapshot {
            current_tick:     self.current_tick,
            ticks_per_second: self.ticks_per_second,
        }
    }

    pub fn ticks_per_second(&self) -> u32 { self.ticks_per_second }
    pub fn current_tick(&self) -> Tick    { self.current_tick }
    pub fn state(&self) -> ClockState     { self.state }
    pub fn is_paused(&self) -> bool       { self.ticks_per_second == 0 }

    pub fn next_tick_time(&self) -> Option<WallTime> {
        match self.state {
            ClockState::Running { next_tick } => Some(next_tick),
            _ => None,
        }
    }

    pub fn paused_remainder(&self) -> Option<f64> {
        match self.state {
            ClockState::Paused { remainder } => Some(remainder),
            _ => None,
        }
    }

    /// Schedule the first tick. Only a stopped clock with a non-zero rate
    /// starts; anything else is left alone.
    pub fn start(&mut self, now: WallTime) {
        if self.state == ClockState::Stopped && self.ticks_per_second > 0 {
            self.state = ClockState::Running { next_tick: now };
        }
    }

    /// Change the tick rate. 0 pauses.
    pub fn set_rate(&mut self, new_rate: u32, now: WallTime) -> RateChange {
        let old_rate = self.ticks_per_second;
        let change = RateChange { old: old_rate, new: new_rate };
        if new_rate == old_rate {
            return change;
        }
        self.ticks_per_second = new_rate;

        let scheduled = self.next_tick_time();
        if old_rate == 0 && scheduled.is_none() {
            // Back from pause. A missing remainder means the game was paused
            // before its first tick, so the next one fires right away.
            self.state = match self.state {
                ClockState::Paused { remainder } => ClockState::Running {
                    next_tick: now + remainder / f64::from(new_rate),
                },
                _ => ClockState::Running { next_tick: now },
            };
        } else if new_rate == 0 || scheduled.is_none() {
            self.state = match scheduled {
                Some(next_tick) => ClockState::Paused {
                    remainder: (next_tick - now) * f64::from(old_rate),
                },
                None => ClockState::Stopped,
            };
        }
        // Running -> running keeps the deadline. Rescaling the time left to
        // the next tick can push it minutes out when several changes land
        // in one frame right after freeze protection kicked in.

        log::debug!(
            "clock: rate {old_rate} -> {new_rate} at tick {} ({:?})",
            self.current_tick,
            self.state
        );
        change
    }

    /// Collect the ticks that are due at `now`. The returned range holds
    /// the tick numbers, in order; it is empty while paused or stopped.
    pub fn poll(&mut self, now: WallTime) -> Range<Tick> {
        let first = self.current_tick + 1;
        let ClockState::Running { mut next_tick } = self.state else {
            return first..first;
        };
        if self.ticks_per_second == 0 {
            return first..first;
        }

        let interval = 1.0 / f64::from(self.ticks_per_second);
        let mut due: Tick = 0;
        while now >= next_tick {
            due += 1;
            next_tick += interval;
            if self.freeze_protection {
                // Stretch time instead of bursting through missed ticks.
                next_tick = next_tick.max(now - interval * ACCEPTABLE_TICK_DELAY);
            }
        }

        self.state = ClockState::Running { next_tick };
        self.current_tick += due;
        first..first + due
    }
}

/// Persisted clock state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClockSnapshot {
    pub current_tick:     Tick,
    pub ticks_per_second: u32,
}
