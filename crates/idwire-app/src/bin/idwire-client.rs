// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// idwire-client: sends one image (or a log request) and stores the outcome.

use std::process::ExitCode;

use chrono::Local;
use clap::Parser;
use tracing::error;

use idwire_app::cli::ClientArgs;
use idwire_app::logging;
use idwire_core::error::Result;
use idwire_core::types::FailureReason;
use idwire_net::{ClientOutcome, RecognitionClient};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    let args = ClientArgs::parse();

    match run(&args).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "request failed");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &ClientArgs) -> Result<ExitCode> {
    let message = args.message(Local::now().date_naive())?;
    let client = RecognitionClient::new(args.to_config());

    match client.run(&message).await? {
        ClientOutcome::Saved(Some(path)) => {
            println!("{}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        ClientOutcome::Saved(None) => Ok(ExitCode::SUCCESS),
        ClientOutcome::Failed { desc, reason } => {
            println!("{desc}");
            // A log request always comes back as an engine status report.
            if reason == FailureReason::EngineStatus {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(2))
            }
        }
    }
}
