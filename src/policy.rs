use crate::game::Dir;
use rand::Rng;

pub const ACTIONS: usize = 4;

/// Action index → absolute heading.
pub fn action_dir(action: usize) -> Dir {
    Dir::ALL[action]
}

/// Index of the largest value; the lowest index wins ties.
pub fn greedy(values: &[f32; ACTIONS]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Epsilon-greedy choice: a uniform random action with probability
/// `epsilon`, the greedy one otherwise.
pub fn select<R: Rng + ?Sized>(values: &[f32; ACTIONS], epsilon: f32, rng: &mut R) -> usize {
    if rng.r#gen::<f32>() < epsilon {
        rng.gen_range(0..ACTIONS)
    } else {
        greedy(values)
    }
}
