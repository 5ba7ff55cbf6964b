use clap::Args;

use super::run::{self, RunOutput};
use super::{CmdResult, RunArgs, TargetArgs};
use crate::tty::TerminalOperator;

/// Hosts and credentials come from the config file, so there are no
/// `--ssh-user`/`--ssh-pass` flags here.
#[derive(Args, Debug)]
pub struct ConfArgs {
    /// Config file to run (.json, .yaml, .yml or .toml)
    #[arg(short = 'f', long = "conf-file")]
    pub conf_file: String,

    #[command(flatten)]
    pub run: RunArgs,
}

pub fn run(args: ConfArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<RunOutput> {
    let target = TargetArgs {
        conf_file: Some(args.conf_file),
        interactive: false,
    };
    run::execute(None, &target, &args.run, &mut TerminalOperator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        conf: ConfArgs,
    }

    #[test]
    fn run_flags_are_accepted() {
        let cli = Cli::try_parse_from(["conf", "-f", "a.json", "--live-run", "--run-id", "R1"]).unwrap();
        assert_eq!(cli.conf.conf_file, "a.json");
        assert!(cli.conf.run.live_run);
        assert_eq!(cli.conf.run.run_id.as_deref(), Some("R1"));
    }

    #[test]
    fn credential_flags_are_rejected() {
        assert!(Cli::try_parse_from(["conf", "-f", "a.json", "--ssh-user", "ops"]).is_err());
        assert!(Cli::try_parse_from(["conf", "-f", "a.json", "--ssh-pass", "pw"]).is_err());
    }
}
