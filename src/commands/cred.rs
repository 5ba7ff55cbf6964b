use clap::Args;

use hostrun::paths::expand_user_path;
use hostrun::sources::cred_file;

use super::run::{self, RunOutput};
use super::{CmdResult, CommonArgs, TargetArgs};
use crate::tty::TerminalOperator;

#[derive(Args, Debug)]
pub struct CredArgs {
    /// CSV file with hostname,ssh-username,ssh-password lines
    #[arg(short = 'c', long = "cred-file")]
    pub cred_file: String,

    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub target: TargetArgs,
}

pub fn is_interactive(args: &CredArgs) -> bool {
    args.target.interactive
}

pub fn run(args: CredArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<RunOutput> {
    let mut operator = TerminalOperator;
    let credentials = run::ssh_credentials(&args.common, &mut operator)?;
    let variables = cred_file::load(&expand_user_path(&args.cred_file), &credentials)?;
    run::execute(Some(variables), &args.target, &args.common.run, &mut operator)
}
