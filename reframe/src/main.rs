use std::process::ExitCode;

use clap::Parser;
use log::{info, warn};
use tokio::signal;

use reframe::transcoder::build_args;
use reframe::{ConversionJob, ConvertError, FfmpegSink, FfprobeSource, plan_job, process_job};

mod args;

use args::Args;

const EXIT_INTERRUPTED: u8 = 130;

async fn dry_run(
    source: &FfprobeSource,
    sink: &FfmpegSink,
    job: &ConversionJob,
) -> Result<(), ConvertError> {
    let plan = plan_job(source, job).await?;
    println!("{}", serde_json::to_string_pretty(&plan)?);

    let args = build_args(&job.input, &job.output, &plan, sink.options())?;
    let command_line = std::iter::once(sink.program().to_string())
        .chain(args.iter().map(|a| a.to_string_lossy().into_owned()))
        .collect::<Vec<_>>()
        .join(" ");
    println!("{}", command_line);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = <Args as Parser>::parse();
    let is_dry_run = args.dry_run;

    let job = match args.into_job() {
        Ok(job) => job,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let source = FfprobeSource::from_env();
    let sink = FfmpegSink::from_env(job.options.clone());
    info!("Using {} and {}", source.program(), sink.program());

    let result = tokio::select! {
        res = async {
            if is_dry_run {
                dry_run(&source, &sink, &job).await
            } else {
                process_job(&source, &sink, &job).await.map(|_| ())
            }
        } => res,
        _ = signal::ctrl_c() => {
            warn!("CTRL-C received, aborting conversion of {:?}.", job.input);
            return ExitCode::from(EXIT_INTERRUPTED);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
