mod abort;
mod gate;
mod job;
mod signal;
mod web;

use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::abort::AbortSignal;
use crate::gate::StepGate;
use crate::job::{Relaxation, Runner, RunnerError, StepWindow};
use crate::signal::{Command, SignalStore};
use crate::web::Config;

#[derive(Parser)]
#[command(name = "freeze-frame")]
#[command(about = "Pause and resume step-based jobs between steps")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP control server
    Serve {
        /// YAML configuration file
        #[arg(long)]
        config: Option<String>,
    },
    /// Run a relaxation job in the foreground, controlled from stdin
    /// (PAUSE, PROCEED or ABORT, one per line)
    Run {
        #[arg(long, default_value_t = 20)]
        steps: usize,
        #[arg(long, default_value_t = 64)]
        size: usize,
        #[arg(long, value_parser = humantime::parse_duration, default_value = "250ms")]
        step_delay: Duration,
        #[arg(long, value_parser = parse_poll_interval, default_value = "100ms")]
        poll_interval: Duration,
        #[arg(long)]
        start_at: Option<usize>,
        #[arg(long)]
        end_at: Option<usize>,
    },
}

fn parse_poll_interval(raw: &str) -> Result<Duration, String> {
    let interval = humantime::parse_duration(raw).map_err(|e| e.to_string())?;
    if interval.is_zero() {
        return Err("poll interval must be greater than zero".to_string());
    }
    Ok(interval)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => serve(config.as_deref()),
        Commands::Run {
            steps,
            size,
            step_delay,
            poll_interval,
            start_at,
            end_at,
        } => run(
            Relaxation::new(size, steps).with_step_delay(step_delay),
            poll_interval,
            StepWindow::new(start_at, end_at),
        ),
    }
}

fn serve(path: Option<&str>) -> ExitCode {
    let config = match path.map(Config::from_file).transpose() {
        Ok(c) => c.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(web::run_server(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(job: Relaxation, poll_interval: Duration, window: StepWindow) -> ExitCode {
    let signals = Arc::new(SignalStore::new());
    let abort = AbortSignal::new();

    spawn_stdin_control(signals.clone(), abort.clone());

    let gate = StepGate::new(signals, abort).with_poll_interval(poll_interval);
    let runner = Runner::new(gate).with_window(window);

    let result = runner.run(job, |event| {
        println!(
            "step {}/{} residual {:.3e}",
            event.step_index + 1,
            event.total_steps,
            event.payload
        );
    });

    match result {
        Ok(out) => {
            println!("Done, residual {:.3e}", out.residual);
            ExitCode::SUCCESS
        }
        Err(RunnerError::Aborted(aborted)) => {
            eprintln!("Run aborted: {}", aborted);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Run failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn spawn_stdin_control(signals: Arc<SignalStore>, abort: AbortSignal) {
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == "ABORT" {
                abort.raise("aborted from stdin");
                break;
            }
            let command = Command::from_signal(line);
            signals.set_command(command);
            log::info!("Signal received: {}", command);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_interval_must_be_positive() {
        assert_eq!(
            parse_poll_interval("250ms"),
            Ok(Duration::from_millis(250))
        );
        assert!(parse_poll_interval("0s").is_err());
        assert!(parse_poll_interval("soon").is_err());
    }

    #[test]
    fn cli_rejects_zero_poll_interval() {
        let parsed = Cli::try_parse_from(["freeze-frame", "run", "--poll-interval", "0ms"]);
        assert!(parsed.is_err());
    }
}
