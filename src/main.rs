// SPDX-License-Identifier: MPL-2.0
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use preview_probe::config::{self, CollectorConfig};
use preview_probe::diagnostics::{
    DebugCollector, ElementNode, Extra, Fetch, FetchRequest, LogArg,
};
use preview_probe::error::Result;
use preview_probe::feedback::{FeedbackPayload, SimulatedTransport, Transport};

const USAGE: &str = "\
Usage: preview-probe [--config PATH] [--url URL] [--message TEXT] [--export PATH]

  --config PATH   read collector settings from PATH instead of the default location
  --url URL       preview page to load (defaults to app.preview_url)
  --message TEXT  compose feedback with TEXT and send it through the simulated transport
  --export PATH   write the full diagnostic bundle to PATH as JSON";

struct Args {
    config: Option<PathBuf>,
    url: Option<String>,
    message: Option<String>,
    export: Option<PathBuf>,
}

fn parse_args() -> std::result::Result<Option<Args>, pico_args::Error> {
    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        return Ok(None);
    }
    Ok(Some(Args {
        config: args.opt_value_from_str("--config")?,
        url: args.opt_value_from_str("--url")?,
        message: args.opt_value_from_str("--message")?,
        export: args.opt_value_from_str("--export")?,
    }))
}

fn load_config(path: Option<&PathBuf>) -> (CollectorConfig, Option<String>) {
    match path {
        Some(path) => match config::load_from_path(path) {
            Ok(config) => (config, None),
            Err(err) => (CollectorConfig::default(), Some(err.to_string())),
        },
        None => config::load(),
    }
}

async fn run(collector: &DebugCollector, args: Args) -> Result<()> {
    let app = &collector.config().app;
    let url = args.url.unwrap_or_else(|| app.preview_url.clone());
    collector.ui().update(|state| state.frame.src.clone_from(&url));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(app.load_timeout_ms))
        .user_agent(concat!("preview-probe/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let client = collector.observe_fetch(client);

    match client.fetch(FetchRequest::get(url.as_str())).await {
        Ok(response) => {
            log::info!("preview answered {}", response.status());
            collector.ui().update(|state| {
                state.frame.ready_state = "complete".to_string();
                state.frame.has_content = true;
                state.frame.url.clone_from(&url);
            });
        }
        Err(err) => collector.page_console().error(&[
            LogArg::from("preview failed to load:"),
            LogArg::from(err.to_string()),
        ]),
    }
    collector.process_pending();

    if let Some(path) = args.export {
        let written = collector.export_to_file(Some(&path))?;
        println!("Diagnostic bundle written to {}", written.display());
    }

    match args.message {
        Some(message) => {
            let mut extra = Extra::new();
            extra.insert("message_length".into(), message.chars().count().into());
            collector.interactions().record(
                "click",
                Some(&ElementNode::new("button").with_id("sendFeedbackBtn")),
                extra,
            );

            let payload =
                FeedbackPayload::compose(&message, url, collector.assemble_for_transmission())?;
            SimulatedTransport::default().send(&payload).await?;
            println!("Feedback sent, thank you!");
        }
        None => println!("{}", collector.summary()),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("preview-probe: {err}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    let (config, config_warning) = load_config(args.config.as_ref());

    let logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .build();
    let max_level = logger.filter();

    let collector = match DebugCollector::new(config) {
        Ok(collector) => collector,
        Err(err) => {
            eprintln!("preview-probe: {err}");
            return ExitCode::FAILURE;
        }
    };
    let installation = match collector.install_with_logger(Box::new(logger), max_level) {
        Ok(installation) => installation,
        Err(err) => {
            eprintln!("preview-probe: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(warning) = config_warning {
        log::warn!("{warning}");
    }

    let outcome = run(&collector, args).await;
    installation.restore();

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("preview-probe: {err}");
            ExitCode::FAILURE
        }
    }
}
