// Command-line collaborator: fetch the stage sheet, run the KPI pipeline,
// export the long table and print a short preview.
use clap::Parser;
use stage_kpis::config::{Cli, Config};
use stage_kpis::error::Result;
use stage_kpis::{kpi, loader, logging, output, reports, util};
use std::process::ExitCode;
use tracing::{error, info};

fn run(config: &Config) -> Result<()> {
    let (records, load_report) = loader::load(&config.source)?;
    println!(
        "Processing dataset... ({} rows loaded, {} skipped, {} unreadable dates)",
        util::format_int(load_report.loaded_rows),
        util::format_int(load_report.malformed_rows),
        util::format_int(load_report.unparsed_dates)
    );

    let (observations, report) = kpi::run(records);
    if report.duplicates_removed > 0 {
        println!(
            "Note: {} duplicate rows collapsed.",
            util::format_int(report.duplicates_removed)
        );
    }

    output::write_observations(&config.output, &observations)?;
    info!(path = %config.output.display(), rows = observations.len(), "long table written");
    println!(
        "\nKPI observations ({} rows, full table exported to {})\n",
        util::format_int(observations.len()),
        config.output.display()
    );
    output::preview_table_rows(&observations, config.preview_rows);

    let summary = reports::generate_kpi_summary(&observations);
    println!("KPI months by year\n");
    output::preview_table_rows(&summary, summary.len());
    if let Some(path) = &config.summary {
        output::write_csv(path, &summary)?;
        println!("(Summary exported to {})\n", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    logging::init_logging();
    let config = match Config::try_from(Cli::parse()) {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(2);
        }
    };

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
