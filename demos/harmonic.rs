use anyhow::Result;
use itertools::Itertools;
use metad_reweight::testsystems::*;
use metad_reweight::*;
use ndarray::Array1;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Generate a biased trajectory
    let testcase = HarmonicOscillator::default();
    let sample = testcase.sample_with_seed(200_000, 2015)?;
    let colvar = sample.to_colvar();

    // A converged standard metadynamics run writes the same FES snapshot every time
    let points: Array1<f64> = Array1::linspace(-3.0, 3.0, 61);
    let snapshots = vec![testcase.snapshot(&points); 20];
    let ebetac =
        NormalizationSequence::estimate(snapshots.as_slice(), testcase.kt(), BiasMode::Standard)?;

    let bounds = cv_ranges(colvar.rows().view(), &[1], Some(&[-2.0][..]), Some(&[2.0][..]))?;
    let surface = Reweighting::builder()
        .kt(testcase.kt())
        .cv_columns(vec![1])
        .bias_columns(vec![2])
        .bounds(bounds)
        .bins(vec![41])
        .ebetac(ebetac)
        .build()?
        .compute_colvar(&colvar)?;

    println!("{:>8} {:>12} {:>12}", "s", "reweighted", "analytical");
    for (s, f) in surface.axes()[0].iter().zip_eq(surface.fes().iter()) {
        println!("{:8.3} {:12.4} {:12.4}", s, f, testcase.analytical_fes(*s));
    }

    Ok(())
}
