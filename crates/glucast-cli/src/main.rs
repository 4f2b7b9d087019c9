use anyhow::Result;
use clap::{Arg, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use glucast_cli::predict::config::PredictConfig;
use glucast_cli::predict::pipeline::{run_cv, run_pipeline};

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("GLUCAST_LOG", "error,glucast=info"))
        .init();

    let matches = Command::new("glucast")
        .version(clap::crate_version!())
        .about("Blood glucose prediction with stacked regression ensembles")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("predict")
                .about("Fit the models on the training table and write test predictions")
                .arg(
                    Arg::new("config")
                        .help("Path to the JSON run configuration")
                        .required(false)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("train_data")
                        .short('t')
                        .long("train_data")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "Path to the training table. Overrides the train_data \
                             specified in the configuration file.",
                        )
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("test_data")
                        .short('s')
                        .long("test_data")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "Path to the test table. Overrides the test_data \
                             specified in the configuration file.",
                        )
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output_file")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "File path the submission CSV is written to. \
                             Defaults to predict_<timestamp>.csv.",
                        )
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("report_file")
                        .short('r')
                        .long("report_file")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help("Write an HTML report of the training fit to this path.")
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("cv")
                .about("Report k-fold cross-validated RMSE of every configured model")
                .arg(
                    Arg::new("config")
                        .help("Path to the JSON run configuration")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("train_data")
                        .short('t')
                        .long("train_data")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help("Path to the training table. Overrides the configuration file.")
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("test_data")
                        .short('s')
                        .long("test_data")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help("Path to the test table. Overrides the configuration file.")
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    match matches.subcommand() {
        Some(("predict", sub_m)) => handle_predict(sub_m),
        Some(("cv", sub_m)) => handle_cv(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_predict(matches: &ArgMatches) -> Result<()> {
    let Some(config_path) = matches.get_one::<PathBuf>("config") else {
        eprintln!("[glucast::predict] No config file provided; printing the default configuration.");
        println!("{}", serde_json::to_string_pretty(&PredictConfig::default())?);
        return Ok(());
    };
    log::info!("[glucast::predict] Using config: {:?}", config_path);

    let config = match PredictConfig::from_arguments(config_path, matches) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {:#}", e);
            std::process::exit(1)
        }
    };

    match run_pipeline(&config) {
        Ok(output) => {
            log::info!(
                "[glucast::predict] Wrote {} predictions to {}",
                output.ids.len(),
                output.output_path.display()
            );
            Ok(())
        }
        Err(e) => {
            log::error!("Prediction failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_cv(matches: &ArgMatches) -> Result<()> {
    let config_path: &PathBuf = matches
        .get_one("config")
        .ok_or_else(|| anyhow::anyhow!("config is required"))?;
    log::info!("[glucast::cv] Using config: {:?}", config_path);

    let config = match PredictConfig::from_arguments(config_path, matches) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {:#}", e);
            std::process::exit(1)
        }
    };

    match run_cv(&config) {
        Ok(results) => {
            for (name, scores) in results {
                let mean = scores.iter().sum::<f64>() / scores.len().max(1) as f64;
                println!("{}\t{:.5}\t{:?}", name, mean, scores);
            }
            Ok(())
        }
        Err(e) => {
            log::error!("Cross-validation failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
