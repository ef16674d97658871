use crate::colvar::Colvar;
use crate::errors::*;
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_pcg::Pcg64;

/// Test case using a biased harmonic oscillator.
///
/// The unbiased potential is $U(s) = \frac{k}{2}(s - s_0)^2$. Sampling happens under a static
/// bias $V(s) = -\frac{k_b}{2}(s - s_0)^2$ that flattens the well, as a converged metadynamics
/// bias would. Reweighting the samples must recover $U$ up to a constant.
///
/// # Examples
///
/// Generate a biased trajectory with default parameters.
///
/// ```
/// use metad_reweight::testsystems::*;
///
/// let testcase = HarmonicOscillator::default();
/// let Sample { s_n, bias_n } = testcase.sample_with_seed(1000, 42).unwrap();
/// assert_eq!(s_n.len(), 1000);
/// assert!(bias_n.iter().all(|&v| v <= 0.0));
/// ```
#[derive(Builder, Debug, Clone)]
#[builder(build_fn(
    validate = "Self::validate",
    name = "build_inner",
    private,
    error = "ReweightError"
))]
pub struct HarmonicOscillator {
    /// Position of the minimum
    #[builder(default = "0.0")]
    center: f64,

    /// Force constant of the unbiased potential
    #[builder(default = "4.0")]
    force_constant: f64,

    /// Force constant removed by the bias; must be smaller than `force_constant`
    #[builder(default = "3.0")]
    bias_force_constant: f64,

    /// Thermal energy
    #[builder(default = "1.0")]
    kt: f64,
}

impl HarmonicOscillatorBuilder {
    fn validate(&self) -> Result<()> {
        let k = self.force_constant.unwrap_or(4.0);
        let k_b = self.bias_force_constant.unwrap_or(3.0);
        let kt = self.kt.unwrap_or(1.0);
        if !(k > 0.0) {
            return Err(ReweightError::Config(format!(
                "force_constant must be positive (not {})",
                k
            )));
        }
        if !(k_b < k) {
            return Err(ReweightError::Config(format!(
                "bias_force_constant must be smaller than force_constant (not {} and {})",
                k_b, k
            )));
        }
        if !(kt > 0.0) {
            return Err(ReweightError::Config(format!("kt must be positive (not {})", kt)));
        }
        Ok(())
    }

    /// Build the test case
    pub fn build(&self) -> Result<HarmonicOscillator> {
        self.build_inner()
    }
}

impl HarmonicOscillator {
    /// Get a new builder for the `HarmonicOscillator` struct
    pub fn builder() -> HarmonicOscillatorBuilder {
        HarmonicOscillatorBuilder::default()
    }

    /// Thermal energy of the test case
    pub fn kt(&self) -> f64 {
        self.kt
    }

    /// The unbiased free energy $U(s)$, zero at the minimum
    pub fn analytical_fes(&self, s: f64) -> f64 {
        0.5 * self.force_constant * (s - self.center).powi(2)
    }

    /// The bias $V(s)$
    pub fn bias(&self, s: f64) -> f64 {
        -0.5 * self.bias_force_constant * (s - self.center).powi(2)
    }

    /// Standard deviation of $s$ under the biased potential
    pub fn biased_std(&self) -> f64 {
        (self.kt / (self.force_constant - self.bias_force_constant)).sqrt()
    }

    /// Draw samples from the biased distribution with a random seed
    pub fn sample(&self, n: usize) -> Result<Sample> {
        let mut rng = Pcg64::from_rng(&mut rand::rng());
        self.sample_inner(n, &mut rng)
    }

    /// Draw samples from the biased distribution with a specified seed
    pub fn sample_with_seed(&self, n: usize, seed: u64) -> Result<Sample> {
        self.sample_inner(n, &mut Pcg64::seed_from_u64(seed))
    }

    fn sample_inner(&self, n: usize, rng: &mut Pcg64) -> Result<Sample> {
        let normal = Normal::new(self.center, self.biased_std())
            .map_err(|e| ReweightError::Config(e.to_string()))?;
        let s_n: Array1<f64> = (0..n).map(|_| normal.sample(rng)).collect();
        let bias_n = s_n.mapv(|s| self.bias(s));
        Ok(Sample { s_n, bias_n })
    }

    /// A metadynamics FES snapshot over `points`: the negative of the bias
    pub fn snapshot(&self, points: &Array1<f64>) -> Array1<f64> {
        points.mapv(|s| -self.bias(s))
    }
}

impl Default for HarmonicOscillator {
    fn default() -> Self {
        Self::builder()
            .build()
            .expect("HarmonicOscillator should not fail with default params")
    }
}

/// A sample from a test case
#[derive(Debug, Clone)]
pub struct Sample {
    /// `s_n[n]` is the CV value of sample `n`
    pub s_n: Array1<f64>,
    /// `bias_n[n]` is the bias acting on sample `n`
    pub bias_n: Array1<f64>,
}

impl Sample {
    /// Lay the sample out as a COLVAR trajectory with columns `time cv bias`
    pub fn to_colvar(&self) -> Colvar {
        let n = self.s_n.len();
        let rows = Array2::from_shape_fn((n, 3), |(i, j)| match j {
            0 => i as f64,
            1 => self.s_n[i],
            _ => self.bias_n[i],
        });
        Colvar::from_rows(rows)
    }
}
