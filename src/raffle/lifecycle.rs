//! Raffle lifecycle: entrant-list mutation and draw dispositions.
//!
//! ```text
//! Open --draw, keep_winner / remove_winner / remove_and_prevent_winner--> Open
//! Open --draw, end--------------------------------------------------------> Ended
//! Open --owner end--------------------------------------------------------> Ended
//! ```
//!
//! A draw in progress holds no state of its own; the raffle stays open
//! through the suspense wait and the disposition is applied afterwards.
//!
//! These functions only touch the definition value. Removing an ended
//! raffle from the store is the caller's job.

use super::{EndAction, RaffleDefinition, UserId};
use super::random::{RandomSource, choose};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaffleState {
    Open,
    Ended,
}

impl fmt::Display for RaffleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Ended => f.write_str("ended"),
        }
    }
}

/// Append `user` to the entrants unless already present.
pub fn admit(def: &mut RaffleDefinition, user: UserId) -> bool {
    if def.has_entrant(user) {
        return false;
    }
    def.entries.push(user);
    true
}

/// Remove `user` from the entrants. Returns whether they were present.
pub fn remove_entrant(def: &mut RaffleDefinition, user: UserId) -> bool {
    match def.entries.iter().position(|u| *u == user) {
        Some(index) => {
            def.entries.remove(index);
            true
        }
        None => false,
    }
}

/// Pick a winner uniformly from the current entrants.
pub fn pick_winner(def: &RaffleDefinition, rng: &dyn RandomSource) -> Option<UserId> {
    choose(rng, &def.entries).copied()
}

/// Apply the raffle's disposition for `winner`; returns the state after the draw.
pub fn apply_end_action(def: &mut RaffleDefinition, winner: UserId) -> RaffleState {
    match def.on_end_action {
        EndAction::KeepWinner => RaffleState::Open,
        EndAction::RemoveWinner => {
            remove_entrant(def, winner);
            RaffleState::Open
        }
        EndAction::RemoveAndPreventWinner => {
            remove_entrant(def, winner);
            if !def.prevented_users.contains(&winner) {
                def.prevented_users.push(winner);
            }
            RaffleState::Open
        }
        EndAction::End => RaffleState::Ended,
    }
}
