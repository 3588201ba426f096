//! Reference push-block solver
//!
//! The player walks from the start tile. Walls and unfilled holes block the
//! player. Walking into a block pushes it one tile if the block allows that
//! direction and the destination is free; a block pushed into a hole fills
//! it and both disappear. A level is solved when every exit is covered by a
//! block.

use crate::domain::{Level, SolutionProof, Tile};
use crate::ports::outbound::Solver;

#[derive(Clone, Copy, Debug, Default)]
pub struct SokobanSolver;

impl Solver for SokobanSolver {
    fn validate(&self, level: &Level, proof: &SolutionProof) -> bool {
        let width = level.width() as i64;
        let height = level.height() as i64;
        let mut board: Vec<Tile> = level.tiles().to_vec();

        let Some(start) = board.iter().position(|t| *t == Tile::Start) else {
            return false;
        };
        let exits: Vec<usize> = board
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == Tile::Exit)
            .map(|(i, _)| i)
            .collect();

        let index = |x: i64, y: i64| -> Option<usize> {
            (x >= 0 && x < width && y >= 0 && y < height).then(|| (y * width + x) as usize)
        };

        let (mut x, mut y) = (start as i64 % width, start as i64 / width);
        for direction in proof.moves() {
            let (dx, dy) = direction.vector();
            let (dx, dy) = (i64::from(dx), i64::from(dy));
            let Some(pos) = index(x + dx, y + dy) else {
                return false;
            };

            match board[pos] {
                Tile::Wall | Tile::Hole => return false,
                Tile::Block(moves) => {
                    if !moves.allows(*direction) {
                        return false;
                    }
                    let Some(dest) = index(x + 2 * dx, y + 2 * dy) else {
                        return false;
                    };
                    match board[dest] {
                        Tile::Wall | Tile::Block(_) => return false,
                        Tile::Hole => board[dest] = Tile::Floor,
                        _ => board[dest] = board[pos],
                    }
                    board[pos] = Tile::Floor;
                }
                Tile::Floor | Tile::Exit | Tile::Start => {}
            }

            x += dx;
            y += dy;
        }

        exits.iter().all(|i| board[*i].is_movable())
    }
}
