use clap::{Parser, Subcommand};

use commands::GlobalArgs;

#[derive(Debug, Clone, Copy)]
enum ResponseMode {
    Json,
    Raw(RawOutputMode),
}

#[derive(Debug, Clone, Copy)]
enum RawOutputMode {
    InteractivePassthrough,
}

mod commands;
mod output;
mod tty;

use commands::{ambari, bindings, conf, cred, etc, hosts};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "hostrun")]
#[command(version = VERSION)]
#[command(about = "Run configured commands on local and remote hosts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Use hostnames from the config file itself
    Conf(conf::ConfArgs),
    /// Use hostnames from /etc/hosts
    Etc(etc::EtcArgs),
    /// Use hostnames from a hostname,sshuser,password CSV file
    Cred(cred::CredArgs),
    /// Use hostnames given on the command line
    Hosts(hosts::HostsArgs),
    /// Use hostnames and log directories of a service from the Ambari API
    Ambari(ambari::AmbariArgs),
    /// Print the resolved variable bindings of a config file
    Bindings(bindings::BindingsArgs),
}

fn response_mode(command: &Commands) -> ResponseMode {
    match command {
        Commands::Etc(args) if etc::is_interactive(args) => {
            ResponseMode::Raw(RawOutputMode::InteractivePassthrough)
        }
        Commands::Cred(args) if cred::is_interactive(args) => {
            ResponseMode::Raw(RawOutputMode::InteractivePassthrough)
        }
        Commands::Hosts(args) if hosts::is_interactive(args) => {
            ResponseMode::Raw(RawOutputMode::InteractivePassthrough)
        }
        Commands::Ambari(args) if ambari::is_interactive(args) => {
            ResponseMode::Raw(RawOutputMode::InteractivePassthrough)
        }
        _ => ResponseMode::Json,
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs {};
    let mode = response_mode(&cli.command);

    if let ResponseMode::Raw(RawOutputMode::InteractivePassthrough) = mode {
        if !tty::require_tty_for_interactive() {
            let err = hostrun::Error::validation_invalid_argument(
                "tty",
                "--interactive requires an interactive TTY",
            );
            let _ = output::print_json_result(Err(err));
            return std::process::ExitCode::from(exit_code_to_u8(2));
        }
    }

    let (json_result, exit_code) = commands::run_json(cli.command, &global);

    match mode {
        ResponseMode::Json => {
            let _ = output::print_json_result(json_result);
        }
        ResponseMode::Raw(RawOutputMode::InteractivePassthrough) => {
            if let Err(err) = &json_result {
                output::print_error_text(err);
            }
        }
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
