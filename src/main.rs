use clap::Parser;
use job_autofill::cli::commands::{cmd_detect, cmd_fill, cmd_serve};
use job_autofill::cli::config::{Cli, Commands, load_config};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Detect { html, url } => {
            cmd_detect(&html, &url)?;
        }
        Commands::Fill {
            html,
            url,
            answers,
            out,
            advance,
        } => {
            let resolved = cmd_fill(
                &html,
                &url,
                answers.as_deref(),
                out.as_deref(),
                advance,
                cli.endpoint.as_deref(),
                &config,
            )?;
            if !resolved {
                std::process::exit(1);
            }
        }
        Commands::Serve { auto } => {
            cmd_serve(auto, cli.endpoint.as_deref(), &config)?;
        }
    }

    Ok(())
}
