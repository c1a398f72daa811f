use std::cmp;
use rand::Rng;

pub const INITIAL_WAIT_MS: u64 = 1000;

pub fn next_wait<R: Rng>(previous_ms: u64, ceiling_ms: u64, rng: &mut R) -> u64 {
    if previous_ms == 0 {
        return INITIAL_WAIT_MS;
    }

    let upper = cmp::min(previous_ms.saturating_mul(2), ceiling_ms);
    if upper == 0 {
        return previous_ms;
    }
    cmp::max(rng.gen_range(0..upper), previous_ms)
}
