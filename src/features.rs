//! Discretisation of a game snapshot into an 11-bit lookup key.
//!
//! Bit layout, least significant first:
//!
//! | bits  | meaning                                               |
//! |-------|-------------------------------------------------------|
//! | 0..3  | danger straight ahead, to the right, to the left      |
//! | 3..7  | heading is left, right, up, down (one-hot)            |
//! | 7..11 | food is left of, right of, above, below the head      |

use crate::game::{Dir, Pos, Snapshot};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const FEATURES: usize = 11;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateKey(u16);

impl StateKey {
    pub fn from_bits(bits: [bool; FEATURES]) -> Self {
        let mut k: u16 = 0;
        for (i, &b) in bits.iter().enumerate() {
            if b {
                k |= 1 << i;
            }
        }
        Self(k)
    }

    pub fn bits(self) -> [u8; FEATURES] {
        let mut out = [0u8; FEATURES];
        for (i, v) in out.iter_mut().enumerate() {
            *v = ((self.0 >> i) & 1) as u8;
        }
        out
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.bits() {
            write!(f, "{b}")?;
        }
        Ok(())
    }
}

/// Whether moving onto `cell` would end the game: off the grid, on the
/// snake, or on a hazard.
pub fn is_danger(cell: Pos, snap: &Snapshot<'_>) -> bool {
    !snap.in_bounds(cell) || snap.snake.contains(&cell) || snap.hazards.contains(&cell)
}

pub fn encode(snap: &Snapshot<'_>) -> StateKey {
    let head = snap.head();
    let dir = snap.direction;
    let danger = |d: Dir| is_danger(head.offset(d), snap);

    let (food_l, food_r, food_u, food_d) = match snap.food {
        Some(f) => (f.x < head.x, f.x > head.x, f.y < head.y, f.y > head.y),
        None => (false, false, false, false),
    };

    StateKey::from_bits([
        danger(dir),
        danger(dir.right()),
        danger(dir.left()),
        dir == Dir::Left,
        dir == Dir::Right,
        dir == Dir::Up,
        dir == Dir::Down,
        food_l,
        food_r,
        food_u,
        food_d,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Game, GameConfig};
    use ahash::AHashSet;
    use std::collections::VecDeque;

    fn calm() -> Game {
        Game::seeded(GameConfig::new(20, 20, 0.0, 0).unwrap(), 1).unwrap()
    }

    #[test]
    fn start_position_has_no_danger() {
        let mut game = calm();
        game.place_food_at(Pos::new(15, 4));
        let bits = encode(&game.snapshot()).bits();
        // heading right, food up and to the right
        assert_eq!(bits, [0, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0]);
    }

    #[test]
    fn danger_is_relative_to_heading() {
        let mut game = calm();
        game.place_food_at(Pos::new(10, 0));
        game.set_direction(Dir::Up);
        // Head runs up column 10 to row 0 while the food sits there.
        while game.head().y > 1 {
            game.step();
        }
        game.place_food_at(Pos::new(0, 19));
        game.step();
        assert_eq!(game.head(), Pos::new(10, 0));
        let bits = encode(&game.snapshot()).bits();
        // Wall straight ahead; the body trails behind, so right and left are clear.
        assert_eq!(&bits[0..3], &[1, 0, 0]);
        assert_eq!(&bits[3..7], &[0, 0, 1, 0]);

        game.set_direction(Dir::Left);
        game.step();
        // Now heading left along the top edge: the wall is on the right.
        let bits = encode(&game.snapshot()).bits();
        assert_eq!(&bits[0..3], &[0, 1, 0]);
    }

    #[test]
    fn hazards_count_as_danger() {
        let mut game = calm();
        game.place_food_at(Pos::new(0, 0));
        game.place_hazard_at(Pos::new(10, 11));
        let snap = game.snapshot();
        assert!(is_danger(Pos::new(10, 11), &snap));
        assert!(is_danger(Pos::new(9, 10), &snap));
        assert!(is_danger(Pos::new(-1, 3), &snap));
        assert!(!is_danger(Pos::new(11, 10), &snap));
        // heading right, so "right of heading" is down
        assert_eq!(&encode(&snap).bits()[0..3], &[0, 1, 0]);
    }

    #[test]
    fn missing_food_clears_bearing_bits() {
        // 4x1: the only free cell holds the food, eating it fills the grid.
        let mut game = Game::seeded(GameConfig::new(4, 1, 0.0, 0).unwrap(), 1).unwrap();
        game.step();
        assert_eq!(game.food(), None);
        let bits = encode(&game.snapshot()).bits();
        assert_eq!(&bits[7..], &[0, 0, 0, 0]);
    }

    #[test]
    fn body_order_behind_the_head_does_not_matter() {
        let head = Pos::new(5, 5);
        let body = [Pos::new(5, 6), Pos::new(4, 6), Pos::new(4, 5), Pos::new(4, 4), Pos::new(5, 4)];
        let a: VecDeque<Pos> = std::iter::once(head).chain(body).collect();
        let b: VecDeque<Pos> = std::iter::once(head).chain(body.into_iter().rev()).collect();
        let hazards = AHashSet::new();
        let snap = |snake: &VecDeque<Pos>| encode(&Snapshot {
            snake,
            direction: Dir::Right,
            food: Some(Pos::new(8, 2)),
            hazards: &hazards,
            score: 0,
            outcome: None,
            width: 10,
            height: 10,
        });
        let (ka, kb) = (snap(&a), snap(&b));
        assert_eq!(ka, kb);
        // body above and below the head: danger right and left, clear ahead
        assert_eq!(&ka.bits()[0..3], &[0, 1, 1]);
    }

    #[test]
    fn hazard_order_does_not_matter() {
        let mut a = calm();
        let mut b = calm();
        for g in [&mut a, &mut b] {
            g.place_food_at(Pos::new(3, 3));
        }
        a.place_hazard_at(Pos::new(11, 9));
        a.place_hazard_at(Pos::new(11, 11));
        b.place_hazard_at(Pos::new(11, 11));
        b.place_hazard_at(Pos::new(11, 9));
        assert_eq!(encode(&a.snapshot()), encode(&b.snapshot()));
    }

    #[test]
    fn bits_round_trip_through_the_key() {
        let bits = [true, false, true, false, false, true, false, true, true, false, false];
        let key = StateKey::from_bits(bits);
        let back: Vec<bool> = key.bits().iter().map(|&b| b == 1).collect();
        assert_eq!(back, bits.to_vec());
        assert_eq!(key.to_string(), "10100101100");
    }
}
