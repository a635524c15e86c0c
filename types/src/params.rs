//! Consensus parameters.
//!
//! The anticone-size bound `k` is derived once at initialisation from the
//! target block delay, the block rate, and the security level; it is fixed
//! for the lifetime of the process.

use serde::{Deserialize, Serialize};

/// Parameters the consensus core is initialised with.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsensusParams {
    /// Target propagation delay in seconds.
    pub block_delay_secs: u32,
    /// Expected block production rate in blocks per second.
    pub block_rate: f64,
    /// Security level: tolerated failure probability is `10^(-level)`.
    pub security_level: u32,
    /// Target time between blocks, drives the rebroadcast cadence.
    pub target_block_time_secs: u64,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            block_delay_secs: 15,
            block_rate: 0.2,
            security_level: 6,
            target_block_time_secs: 30,
        }
    }
}

impl ConsensusParams {
    /// Derive the anticone-size bound `k`.
    ///
    /// An honest block sees at most the blocks produced within two
    /// propagation delays as concurrent, so the number of concurrent blocks
    /// is Poisson with mean `2 * delay * rate`. `k` is the smallest bound
    /// whose tail probability falls below `10^(-security_level)`.
    pub fn anticone_size(&self) -> u32 {
        let mean = 2.0 * f64::from(self.block_delay_secs) * self.block_rate;
        let threshold = 10f64.powi(-(self.security_level as i32));

        // Walk the Poisson pmf until the remaining tail is below threshold.
        let mut term = (-mean).exp(); // P[X = 0]
        let mut cdf = term;
        let mut k = 0u32;
        while 1.0 - cdf >= threshold && k < 1000 {
            k += 1;
            term *= mean / f64::from(k);
            cdf += term;
        }
        k
    }
}
