// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// idwire-server: loads the engine bundle once and serves recognition
// requests until interrupted.
//
// A bundle that fails to load does not stop the server: it keeps answering
// every request with the retained initialization error.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use idwire_app::cli::ServerArgs;
use idwire_app::logging;
use idwire_core::config::ServerConfig;
use idwire_core::error::Result;
use idwire_engine::{FixtureEngine, Orchestrator};
use idwire_net::RecognitionServer;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    let args = ServerArgs::parse();

    match serve(args.to_config()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "idwire server exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: ServerConfig) -> Result<()> {
    info!(
        bundle_dir = %config.bundle_dir.display(),
        lazy_init = config.lazy_init,
        concurrency = config.concurrency,
        "idwire server starting"
    );

    let orchestrator = Orchestrator::initialize(|| {
        FixtureEngine::from_bundle_dir(&config.bundle_dir, config.lazy_init, config.concurrency)
    });

    let mut server = RecognitionServer::new(config, orchestrator);
    server.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("interrupt received");
    server.stop().await
}
