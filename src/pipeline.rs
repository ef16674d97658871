//! The full reweighting run, from validated settings to the written FES

use crate::colvar::Colvar;
use crate::config::{EbetacSource, RunPlan, Settings};
use crate::ebetac::NormalizationSequence;
use crate::errors::*;
use crate::ranges::cv_ranges;
use crate::reweight::{FreeEnergySurface, Reweighting};

/// Validate `settings`, run every stage and write the outputs
pub fn run(settings: &Settings) -> Result<FreeEnergySurface> {
    let plan = settings.validate()?;
    execute(&plan)
}

/// Run a validated plan and write the outputs
pub fn execute(plan: &RunPlan) -> Result<FreeEnergySurface> {
    let ebetac = match &plan.ebetac {
        EbetacSource::Cached(path) => NormalizationSequence::load(path)?,
        EbetacSource::Snapshots(files) => {
            NormalizationSequence::estimate(files, plan.kt, plan.mode)?
        }
    };
    if let Some(path) = &plan.exp_bct_out {
        log::info!("Saving ebetac list on {}", path.display());
        ebetac.save(path)?;
    }

    log::info!("Calculating CV ranges..");
    let colvar = Colvar::read(&plan.colvar)?;
    let cv_columns = colvar.resolve_all(&plan.cv_columns)?;
    let bias_columns = colvar.resolve_all(&plan.bias_columns)?;
    let bounds = cv_ranges(
        colvar.rows().view(),
        &cv_columns,
        plan.cv_mins.as_deref(),
        plan.cv_maxs.as_deref(),
    )?;

    let surface = Reweighting::builder()
        .kt(plan.kt)
        .cv_columns(cv_columns)
        .bias_columns(bias_columns)
        .bounds(bounds)
        .bins(plan.bins.clone())
        .ebetac(ebetac)
        .num_snapshots(plan.num_snapshots)
        .build()?
        .compute_colvar(&colvar)?;

    let unvisited = surface.unvisited();
    if unvisited > 0 {
        log::warn!(
            "{} of {} grid points have no data and are written as inf",
            unvisited,
            surface.fes().len()
        );
    }

    surface.save(&plan.outfile)?;
    Ok(surface)
}
