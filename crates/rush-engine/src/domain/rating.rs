//! Rating parameters and the bundled Elo strategy.

use serde::{Deserialize, Serialize};
use shared_types::{MatchType, PlayerId, Timestamp};

use crate::ports::outbound::RatingUpdater;

/// A player's rating state in one match-type bucket.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatingParams {
    pub rating: f64,
    pub deviation: f64,
    pub volatility: f64,
    /// Settled rated games in this bucket
    pub games_played: u32,
}

impl Default for RatingParams {
    fn default() -> Self {
        Self {
            rating: 1500.0,
            deviation: 350.0,
            volatility: 0.06,
            games_played: 0,
        }
    }
}

/// One participant's input to a rating update.
#[derive(Clone, Debug, PartialEq)]
pub struct RatingInput {
    pub player: PlayerId,
    pub prior: RatingParams,
    pub score: u32,
    /// Competition rank, 1 is best
    pub rank: u32,
}

/// New parameters for one participant.
#[derive(Clone, Debug, PartialEq)]
pub struct RatingUpdate {
    pub player: PlayerId,
    pub params: RatingParams,
}

/// Recorded in the match log once ratings are settled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatingChange {
    pub player: PlayerId,
    pub before: f64,
    pub after: f64,
}

/// Settlement progress of a finished match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RatingStatus {
    /// Unrated, cancelled, or not yet finished
    #[default]
    NotApplicable,
    /// Finished and owed a settlement; `since` is when it was last claimed
    Pending { since: Timestamp },
    Applied,
}

/// K-factor for a full round of opponents
pub const K_FACTOR: f64 = 32.0;

/// Expected score of `a` against `b` (standard Elo formula).
pub fn expected_score(rating_a: f64, rating_b: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((rating_b - rating_a) / 400.0))
}

/// Pairwise multi-player Elo.
///
/// Each participant plays a virtual game against every other one, won by
/// the better rank. `K_FACTOR` is split across the opponents so a match
/// moves a rating by at most `K_FACTOR`.
#[derive(Clone, Copy, Debug, Default)]
pub struct EloRatingUpdater;

impl RatingUpdater for EloRatingUpdater {
    fn update(&self, _match_type: MatchType, inputs: &[RatingInput]) -> Vec<RatingUpdate> {
        if inputs.len() < 2 {
            return Vec::new();
        }
        let k = K_FACTOR / (inputs.len() - 1) as f64;

        inputs
            .iter()
            .map(|me| {
                let delta: f64 = inputs
                    .iter()
                    .filter(|other| other.player != me.player)
                    .map(|other| {
                        let actual = match me.rank.cmp(&other.rank) {
                            std::cmp::Ordering::Less => 1.0,
                            std::cmp::Ordering::Equal => 0.5,
                            std::cmp::Ordering::Greater => 0.0,
                        };
                        k * (actual - expected_score(me.prior.rating, other.prior.rating))
                    })
                    .sum();

                RatingUpdate {
                    player: me.player.clone(),
                    params: RatingParams {
                        rating: me.prior.rating + delta,
                        games_played: me.prior.games_played + 1,
                        ..me.prior
                    },
                }
            })
            .collect()
    }
}
