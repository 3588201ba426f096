//! Per-match board obfuscation.
//!
//! Every match displays its levels under one of the seven non-identity
//! symmetries of the square, chosen from `SHA-256(match_id)`. All players of
//! a match see the same symmetry. The canonical level is never touched; the
//! service maps played moves back through [`Transform::inverse_direction`]
//! before the solver sees them.

use sha2::{Digest, Sha256};
use shared_types::MatchId;

use super::tiles::{Direction, Level, Moves, SolutionProof, Tile};

/// Element of the dihedral group of the square.
///
/// Applied as: transpose first, then mirror horizontally, then vertically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Transform {
    pub transpose: bool,
    pub mirror_x: bool,
    pub mirror_y: bool,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        transpose: false,
        mirror_x: false,
        mirror_y: false,
    };

    fn from_index(index: u8) -> Self {
        Self {
            transpose: index & 0b100 != 0,
            mirror_x: index & 0b001 != 0,
            mirror_y: index & 0b010 != 0,
        }
    }

    /// Symmetry assigned to a match. Never the identity.
    pub fn for_match(match_id: &MatchId) -> Self {
        let digest = Sha256::digest(match_id.as_str().as_bytes());
        Self::from_index(digest[0] % 7 + 1)
    }

    /// Board size after the transform.
    pub fn dimensions(&self, width: usize, height: usize) -> (usize, usize) {
        if self.transpose {
            (height, width)
        } else {
            (width, height)
        }
    }

    /// Maps a point of a `width`x`height` board into the transformed board.
    pub fn apply_point(&self, x: usize, y: usize, width: usize, height: usize) -> (usize, usize) {
        let (mut x, mut y) = if self.transpose { (y, x) } else { (x, y) };
        let (w, h) = self.dimensions(width, height);
        if self.mirror_x {
            x = w - 1 - x;
        }
        if self.mirror_y {
            y = h - 1 - y;
        }
        (x, y)
    }

    /// Direction on the canonical board → direction on the displayed board.
    pub fn apply_direction(&self, direction: Direction) -> Direction {
        let (mut dx, mut dy) = direction.vector();
        if self.transpose {
            std::mem::swap(&mut dx, &mut dy);
        }
        if self.mirror_x {
            dx = -dx;
        }
        if self.mirror_y {
            dy = -dy;
        }
        Direction::from_vector(dx, dy).unwrap_or(direction)
    }

    /// Direction on the displayed board → direction on the canonical board.
    pub fn inverse_direction(&self, direction: Direction) -> Direction {
        let (mut dx, mut dy) = direction.vector();
        if self.mirror_y {
            dy = -dy;
        }
        if self.mirror_x {
            dx = -dx;
        }
        if self.transpose {
            std::mem::swap(&mut dx, &mut dy);
        }
        Direction::from_vector(dx, dy).unwrap_or(direction)
    }

    pub fn apply_tile(&self, tile: Tile) -> Tile {
        match tile {
            Tile::Block(moves) => {
                let mapped: Vec<Direction> = moves.iter().map(|d| self.apply_direction(d)).collect();
                Tile::Block(Moves::of(&mapped))
            }
            other => other,
        }
    }

    /// Maps a proof played on the displayed board back to the canonical frame.
    pub fn canonical_proof(&self, proof: &SolutionProof) -> SolutionProof {
        SolutionProof(
            proof
                .moves()
                .iter()
                .map(|d| self.inverse_direction(*d))
                .collect(),
        )
    }

    /// Maps a canonical proof into the displayed frame.
    pub fn displayed_proof(&self, proof: &SolutionProof) -> SolutionProof {
        SolutionProof(
            proof
                .moves()
                .iter()
                .map(|d| self.apply_direction(*d))
                .collect(),
        )
    }

    pub fn apply_level(&self, level: &Level) -> Level {
        let (width, height) = (level.width(), level.height());
        let (new_w, new_h) = self.dimensions(width, height);
        let mut tiles = vec![Tile::Floor; new_w * new_h];

        for (i, tile) in level.tiles().iter().enumerate() {
            let (x, y) = self.apply_point(i % width, i / width, width, height);
            tiles[y * new_w + x] = self.apply_tile(*tile);
        }

        Level::from_tiles(level.id().clone(), new_w, new_h, tiles)
    }
}

/// Board of `level` as displayed to players of `match_id`.
pub fn rotate_level(level: &Level, match_id: &MatchId) -> Level {
    Transform::for_match(match_id).apply_level(level)
}
