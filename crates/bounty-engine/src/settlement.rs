//! # Proof Settlement
//!
//! Pure decision logic over the proof set of a wager. No side effects:
//! [`crate::engine::WagerEngine::submit_proof`] uses the verdict to decide
//! whether to finalize immediately, and the sweeper uses it for the
//! default-wins-by-inaction path.

use bounty_core::UserId;

use crate::wager::Proof;

/// The verdict over the current set of proofs for a wager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofConsensus {
    /// No proof has been submitted yet.
    NoProof,
    /// One participant has claimed a result; the other has not responded.
    AwaitingSecondProof {
        /// The winner claimed by the sole proof.
        claimed: UserId,
    },
    /// Both participants claim the same winner.
    Agreed {
        /// The agreed winner.
        winner: UserId,
    },
    /// The participants claim different winners.
    Conflicting {
        /// Winner claimed by the first submission.
        first_claimed: UserId,
        /// Winner claimed by the second submission.
        second_claimed: UserId,
    },
}

/// Evaluate the proof set. The engine guarantees at most one proof per
/// participant, so the slice holds at most two entries in submission order.
pub fn evaluate_proofs(proofs: &[Proof]) -> ProofConsensus {
    match proofs {
        [] => ProofConsensus::NoProof,
        [only] => ProofConsensus::AwaitingSecondProof {
            claimed: only.claimed_winner.clone(),
        },
        [first, second, ..] => {
            if first.claimed_winner == second.claimed_winner {
                ProofConsensus::Agreed {
                    winner: first.claimed_winner.clone(),
                }
            } else {
                ProofConsensus::Conflicting {
                    first_claimed: first.claimed_winner.clone(),
                    second_claimed: second.claimed_winner.clone(),
                }
            }
        }
    }
}
