// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use qeb_config::{BoundaryConfig, LoggingConfig, load_config, validate_config};
use qeb_error::{ErrorBuilder, ErrorClassification, Location};
use qeb_pipeline::telemetry::init_tracing;
use qeb_pipeline::{
    CancellationReason, DefaultErrorHandler, Fault, LoggingErrorFilter, Pipeline, QueryResult,
    RequestContext, RequestStage,
};
use serde_json::json;
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "qeb", version, about = "Query error boundary CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one request whose downstream stage raises the chosen fault and
    /// print the resulting response.
    Simulate {
        /// Fault raised by the downstream stage.
        #[arg(long, value_enum, default_value_t = FaultArg::None)]
        fault: FaultArg,

        /// Message carried by the fault.
        #[arg(long, default_value = "simulated failure")]
        message: String,

        /// Line of the fault position (syntax and query faults).
        #[arg(long, requires = "column")]
        line: Option<u32>,

        /// Column of the fault position (syntax and query faults).
        #[arg(long, requires = "line")]
        column: Option<u32>,

        /// Query text placed on the request.
        #[arg(long, default_value = "{ __typename }")]
        query: String,

        /// Pretty-print the response.
        #[arg(long)]
        pretty: bool,
    },

    /// Validate the config file and list advisory warnings.
    CheckConfig,

    /// Print the JSON schema of the config file.
    Schema,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FaultArg {
    None,
    Query,
    Syntax,
    Scalar,
    InputObject,
    Cancelled,
    Panic,
    Other,
}

/// Stands in for the parse/validate/execute chain.
struct SimulatedStage {
    fault: FaultArg,
    message: String,
    location: Option<Location>,
}

#[async_trait]
impl RequestStage for SimulatedStage {
    async fn invoke(&self, ctx: &mut RequestContext) -> Result<(), Fault> {
        let message = self.message.clone();
        match self.fault {
            FaultArg::None => {
                ctx.set_result(QueryResult::data(json!({"__typename": "Query"})));
                Ok(())
            }
            FaultArg::Query => {
                let mut record = ErrorBuilder::new(message.clone())
                    .set_classification(ErrorClassification::QueryStructure);
                if let Some(loc) = self.location {
                    record = record.add_location(loc);
                }
                Err(Fault::query(message, vec![record.build()]))
            }
            FaultArg::Syntax => Err(Fault::Syntax {
                message,
                location: self.location,
            }),
            FaultArg::Scalar => Err(Fault::scalar(message)),
            FaultArg::InputObject => Err(Fault::input_object(message)),
            FaultArg::Cancelled => {
                ctx.cancellation()
                    .cancel_with(CancellationReason::ClientDisconnected);
                ctx.check_cancelled()
            }
            FaultArg::Panic => panic!("{message}"),
            FaultArg::Other => Err(Fault::other(anyhow::anyhow!(message))),
        }
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("load config")?;
    let logging = if cli.debug {
        LoggingConfig {
            level: Some("debug".into()),
            ..config.logging.clone()
        }
    } else {
        config.logging.clone()
    };
    init_tracing(&logging);

    match cli.command {
        Commands::Simulate {
            fault,
            message,
            line,
            column,
            query,
            pretty,
        } => {
            let location = line.zip(column).map(|(l, c)| Location::new(l, c));
            cmd_simulate(&config, fault, message, location, query, pretty).await
        }
        Commands::CheckConfig => cmd_check_config(&config),
        Commands::Schema => cmd_schema(),
    }
}

async fn cmd_simulate(
    config: &BoundaryConfig,
    fault: FaultArg,
    message: String,
    location: Option<Location>,
    query: String,
    pretty: bool,
) -> Result<()> {
    for w in validate_config(config)? {
        warn!(target: "qeb.cli", "{w}");
    }
    let handler = DefaultErrorHandler::from_config(config).with_filter(LoggingErrorFilter);
    let boundary = Pipeline::new()
        .stage(SimulatedStage {
            fault,
            message,
            location,
        })
        .into_boundary(handler);

    let mut ctx = RequestContext::new(query);
    boundary.invoke(&mut ctx).await;
    let result = ctx
        .take_result()
        .context("error boundary returned without a result")?;

    let out = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{out}");
    Ok(())
}

fn cmd_check_config(config: &BoundaryConfig) -> Result<()> {
    let warnings = validate_config(config)?;
    for w in &warnings {
        warn!(target: "qeb.cli", "{w}");
        println!("warning: {w}");
    }
    println!("config ok ({} warning(s))", warnings.len());
    Ok(())
}

fn cmd_schema() -> Result<()> {
    let schema = schemars::schema_for!(BoundaryConfig);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
