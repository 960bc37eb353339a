// Random draws of per-stimulus transform parameters and prices
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::TransformConfig;
use crate::render::{EqGains, TransformParams};

/// Draw the effects for one stimulus; disabled effects stay at identity
pub fn draw_params<R: Rng + ?Sized>(config: &TransformConfig, rng: &mut R) -> TransformParams {
    let mut params = TransformParams::default();

    if config.enable_tempo {
        if let Some(ratio) = config.tempo_ratios.choose(rng) {
            params.tempo_ratio = *ratio;
        }
    }

    if config.enable_pitch {
        if let Some(semitones) = config.semitones.choose(rng) {
            params.semitones = *semitones;
        }
    }

    if config.enable_eq {
        let low_db = draw_gain(&config.eq_gains_db, rng);
        let mid_db = draw_gain(&config.eq_gains_db, rng);
        let high_db = draw_gain(&config.eq_gains_db, rng);
        params.eq = EqGains::new(low_db, mid_db, high_db);
    }

    params
}

fn draw_gain<R: Rng + ?Sized>(options: &[f32], rng: &mut R) -> f32 {
    options.choose(rng).copied().unwrap_or(0.0)
}

/// Draw the simulated purchase price
pub fn draw_price<R: Rng + ?Sized>(config: &TransformConfig, rng: &mut R) -> u32 {
    config.prices.choose(rng).copied().unwrap_or_default()
}
