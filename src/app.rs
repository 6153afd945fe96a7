//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - sets up logging
//! - parses CLI arguments
//! - runs the profile pipeline
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, PlotArgs, ProfileArgs};
use crate::domain::{ExternalInputs, HeightGrid, ModelOptions, PeakOverrides, ProfileConfig, SunCycle};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `iri` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Profile(args) => handle_profile(args, OutputMode::Full),
        Command::Params(args) => handle_profile(args, OutputMode::ParamsOnly),
        Command::Plot(args) => handle_plot(args),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Full,
    ParamsOnly,
}

fn handle_profile(args: ProfileArgs, mode: OutputMode) -> Result<(), AppError> {
    let config = profile_config_from_args(&args);

    if mode == OutputMode::ParamsOnly {
        let (derivation, profile) = pipeline::resolve_inputs(&config.inputs, &config.options)?;
        let report = crate::report::params_report(&derivation, &profile);
        println!("{}", crate::report::format_params_json(&report)?);
        return Ok(());
    }

    let run = pipeline::run_profile(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&config.inputs, &run.derivation.parameters, &run.profile)
    );
    println!("{}", crate::report::format_density_table(&run.rows));

    if config.plot {
        let plot = crate::plot::render_profile_plot(&run.rows, config.plot_width, config.plot_height);
        println!("{plot}");
    }

    // Optional exports.
    if let Some(path) = &config.export_csv {
        crate::io::export::write_profile_csv(path, &run.rows)?;
        log::info!("wrote {}", path.display());
    }
    if let Some(path) = &config.export_profile {
        let file = crate::io::profile_file::build_profile_file(
            config.inputs.date,
            config.inputs.local_hour,
            &run.profile,
            &run.rows,
        );
        crate::io::profile_file::write_profile_json(path, &file)?;
        log::info!("wrote {}", path.display());
    }

    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let file = crate::io::profile_file::read_profile_json(&args.profile)?;
    let plot = crate::plot::render_profile_plot_from_file(&file, args.width, args.height);

    println!(
        "{} {} LT={:.2}h ({} model)",
        file.tool,
        file.date,
        file.local_hour,
        file.model.label()
    );
    println!("{plot}");
    Ok(())
}

pub fn profile_config_from_args(args: &ProfileArgs) -> ProfileConfig {
    ProfileConfig {
        inputs: ExternalInputs {
            date: args.date,
            local_hour: args.hour,
            lat: args.lat,
            mlat: args.mlat,
            dip: args.dip,
            modip: args.modip,
            zenith: args.zenith,
            noon_zenith: args.noon_zenith,
            sun: SunCycle::from_hours(args.sunrise, args.sunset),
            rz12: args.rz12,
            fof2: args.fof2,
            m3000: args.m3000,
            overrides: PeakOverrides {
                nmf2: args.nmf2,
                hmf2: args.hmf2,
                nmf1: args.nmf1,
                hmf1: args.hmf1,
                nme: args.nme,
                hme: args.hme,
                b0: args.b0,
            },
        },
        options: ModelOptions { model: args.model, thickness: args.thickness, topside: args.topside },
        grid: HeightGrid { min: args.hmin, max: args.hmax, step: args.step },
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_csv: args.export.clone(),
        export_profile: args.export_profile.clone(),
    }
}
