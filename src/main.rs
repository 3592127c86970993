use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use rusty_predict::batch::run_batch;
use rusty_predict::config::{Cli, Config};
use rusty_predict::{load_model, InferenceHandler};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::try_from(Cli::parse()) {
        Ok(config) => config,
        Err(e) => {
            error!("{e:#}");
            return ExitCode::from(2);
        }
    };

    // No request can be served without a model.
    let model = match load_model(&config.model_path) {
        Ok(model) => model,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(2);
        }
    };

    let handler = InferenceHandler::new(Arc::new(model)).with_policy(config.policy);
    info!(
        "Model expects [{}], schema policy {:?}",
        handler.model().expected_features().join(", "),
        handler.policy()
    );
    let outcomes = run_batch(&handler, &config);

    for outcome in &outcomes {
        println!("{}", outcome.to_json());
    }

    if outcomes.iter().all(|o| o.response.is_success()) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
