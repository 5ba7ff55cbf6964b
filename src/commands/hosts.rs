use clap::Args;

use hostrun::sources::host_list;

use super::run::{self, RunOutput};
use super::{CmdResult, CommonArgs, TargetArgs};
use crate::tty::TerminalOperator;

#[derive(Args, Debug)]
pub struct HostsArgs {
    /// Comma separated hostnames or IPv4 addresses
    #[arg(short = 'H', long = "hosts")]
    pub hosts: String,

    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub target: TargetArgs,
}

pub fn is_interactive(args: &HostsArgs) -> bool {
    args.target.interactive
}

pub fn run(args: HostsArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<RunOutput> {
    let mut operator = TerminalOperator;
    let credentials = run::ssh_credentials(&args.common, &mut operator)?;
    let variables = host_list::load(&args.hosts, &credentials)?;
    run::execute(Some(variables), &args.target, &args.common.run, &mut operator)
}
