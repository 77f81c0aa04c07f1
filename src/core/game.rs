use crate::domain::ports::Game;
use crate::utils::error::{LabError, Result};
use std::fmt;

/// Linear public goods game. Every token contributed to the common pool
/// pays `gain / n` back to each of the `n` group members, so the pool
/// multiplies contributions by `gain` before the even split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearPublicGoods {
    gain: f64,
}

impl LinearPublicGoods {
    /// Reference group size the marginal return is sanity-checked against.
    const PROBE_GROUP_SIZE: usize = 1000;

    pub fn new(gain_factor: f64) -> Result<Self> {
        if !(gain_factor > 1.0) {
            return Err(LabError::ValidationError {
                message: format!(
                    "gain factor must exceed 1.0 for a public good, got {}",
                    gain_factor
                ),
            });
        }
        let game = Self { gain: gain_factor };
        game.selftest()?;
        Ok(game)
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    // A social dilemma needs 1/n < mcpr < 1: contributing must benefit the
    // group yet cost the contributor. Checked at a large reference group.
    fn selftest(&self) -> Result<()> {
        let n = Self::PROBE_GROUP_SIZE;
        let mcpr = self.marginal_per_capita_return(0.5, n);
        if !(mcpr < 1.0 && mcpr > 1.0 / n as f64) {
            return Err(LabError::ValidationError {
                message: format!(
                    "marginal per-capita return {} out of bounds for a group of {}",
                    mcpr, n
                ),
            });
        }
        Ok(())
    }
}

impl Game for LinearPublicGoods {
    fn label(&self) -> String {
        self.to_string()
    }

    fn marginal_per_capita_return(&self, _contribution_ratio: f64, group_size: usize) -> f64 {
        self.gain / group_size as f64
    }

    fn min_group_size(&self) -> usize {
        self.gain as usize + 1
    }
}

impl fmt::Display for LinearPublicGoods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicGoodsGame(gain_factor = {})", self.gain)
    }
}
