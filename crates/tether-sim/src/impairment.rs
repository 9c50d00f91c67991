//! Fault injection parameters for a simulated wire.

/// Impairment applied to one end of a [`crate::SimWire`].
///
/// The probabilities shape this end's writes; `max_read_chunk` shapes this
/// end's reads. All randomness is drawn from a seeded generator, so a given
/// seed reproduces the same fault sequence.
#[derive(Debug, Clone)]
pub struct Impairment {
    /// Probability that a written buffer is silently lost.
    pub drop_probability: f64,
    /// Probability that one byte of a written buffer is flipped.
    pub corrupt_probability: f64,
    /// Probability that a write call reports failure without delivering.
    pub write_failure_probability: f64,
    /// Deliver at most this many bytes per read call, forcing the receiver
    /// to reassemble frames across reads.
    pub max_read_chunk: Option<usize>,
    /// Seed for the fault generator.
    pub seed: u64,
}

impl Default for Impairment {
    fn default() -> Self {
        Impairment {
            drop_probability: 0.0,
            corrupt_probability: 0.0,
            write_failure_probability: 0.0,
            max_read_chunk: None,
            seed: 0,
        }
    }
}

impl Impairment {
    /// A clean wire: everything written arrives intact, in one read.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_drop(mut self, probability: f64) -> Self {
        self.drop_probability = probability;
        self
    }

    pub fn with_corruption(mut self, probability: f64) -> Self {
        self.corrupt_probability = probability;
        self
    }

    pub fn with_write_failures(mut self, probability: f64) -> Self {
        self.write_failure_probability = probability;
        self
    }

    pub fn with_read_chunk(mut self, max_bytes: usize) -> Self {
        self.max_read_chunk = Some(max_bytes);
        self
    }
}
