use std::path::Path;

use clap::Args;

use hostrun::sources::etc_hosts::{self, PrefixFilter, ETC_HOSTS};

use super::run::{self, RunOutput};
use super::{CmdResult, CommonArgs, TargetArgs};
use crate::tty::TerminalOperator;

#[derive(Args, Debug)]
pub struct EtcArgs {
    /// Hostname prefixes to include (comma separated)
    #[arg(short = 'i', long = "include-prefix")]
    pub include_prefix: Option<String>,

    /// Hostname prefixes to exclude (comma separated). Ignored when
    /// --include-prefix is given
    #[arg(short = 'e', long = "exclude-prefix")]
    pub exclude_prefix: Option<String>,

    /// Hosts file to read
    #[arg(long = "hosts-file", default_value = ETC_HOSTS)]
    pub hosts_file: String,

    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub target: TargetArgs,
}

pub fn is_interactive(args: &EtcArgs) -> bool {
    args.target.interactive
}

pub fn run(args: EtcArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<RunOutput> {
    let mut operator = TerminalOperator;
    let credentials = run::ssh_credentials(&args.common, &mut operator)?;
    let filter = PrefixFilter::parse(args.include_prefix.as_deref(), args.exclude_prefix.as_deref());
    let variables = etc_hosts::load(Path::new(&args.hosts_file), &filter, &credentials)?;
    run::execute(Some(variables), &args.target, &args.common.run, &mut operator)
}
