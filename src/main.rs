use clap::Parser;
use env_logger::Env;
use metad_reweight::{pipeline, Settings};

fn main() -> anyhow::Result<()> {
    let settings = Settings::parse();

    let default_level = if settings.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    let surface = pipeline::run(&settings)?;
    log::info!(
        "Wrote a {}-dimensional FES with {} grid points to {}",
        surface.ndim(),
        surface.fes().len(),
        settings.outfile.display()
    );

    Ok(())
}
