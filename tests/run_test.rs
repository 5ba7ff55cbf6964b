use hostrun::action::RunOptions;
use hostrun::command::MockRunner;
use hostrun::config::{DocumentFormat, RunConfig};
use hostrun::defaults::builtin_defaults;
use hostrun::operator::ScriptedOperator;
use hostrun::report::{Outcome, RecordingReporter, RunReport};
use hostrun::runner;
use hostrun::session::{Script, ScriptedLauncher, ScriptedReply};
use hostrun::sources::{cred_file, SshCredentials};

struct Harness {
    launcher: ScriptedLauncher,
    runner: MockRunner,
    reporter: RecordingReporter,
}

impl Harness {
    fn new(launcher: ScriptedLauncher) -> Self {
        Self {
            launcher,
            runner: MockRunner::new(),
            reporter: RecordingReporter::new(),
        }
    }

    fn run(&mut self, config: &RunConfig, live: bool) -> RunReport {
        let mut options = RunOptions::new(builtin_defaults()).live(live);
        options.run_id = Some("RID_IT".to_string());
        let mut operator = ScriptedOperator::default();
        runner::run(
            config,
            &options,
            &self.launcher,
            &self.runner,
            &mut self.reporter,
            &mut operator,
        )
        .unwrap()
    }
}

fn parse(json: &str) -> RunConfig {
    RunConfig::parse(json, DocumentFormat::Json, "test").unwrap()
}

fn shell_host() -> Script {
    Script::new("Password: ")
        .reply(ScriptedReply::Output("u@h:~$ ".into()))
        .otherwise("done\nu@h:~$ ")
}

#[test]
fn unused_group_does_not_multiply_local_commands() {
    let config = parse(
        r#"{
            "variables": {
                "host.hostname": ["h1", "h2"],
                "host.user": "u",
                "cmd": ["echo {x}"],
                "x": ["1", "2"]
            },
            "main": ["run"],
            "run": { "action": "local", "commands": ["{cmd}"] }
        }"#,
    );
    let mut harness = Harness::new(ScriptedLauncher::new(Script::new("")));
    let report = harness.run(&config, false);

    assert_eq!(harness.reporter.commands(), vec!["echo 1", "echo 2"]);
    assert_eq!(report.steps[0].commands(), vec!["echo 1", "echo 2"]);
    assert!(harness.runner.executed_commands().is_empty());
}

#[test]
fn live_local_run_executes_through_runner() {
    let config = parse(
        r#"{
            "variables": { "x": ["1", "2"] },
            "main": ["run"],
            "run": { "action": "local", "commands": ["echo {x}"] }
        }"#,
    );
    let mut harness = Harness::new(ScriptedLauncher::new(Script::new("")));
    let report = harness.run(&config, true);

    assert_eq!(harness.runner.executed_commands(), vec!["echo 1", "echo 2"]);
    assert_eq!(report.failures(), 0);
}

#[test]
fn two_hosts_open_two_connections_with_one_command_each() {
    let config = parse(
        r#"{
            "variables": {
                "credentials.hostname": ["h1", "h2"],
                "credentials.username": ["u", "u"],
                "credentials.password": ["p1", "p2"]
            },
            "constants": { "password_prompt": "assword:", "shell_prompt": "\\$ $" },
            "main": ["uptime"],
            "uptime": { "action": "ssh", "commands": ["uptime"] }
        }"#,
    );
    let mut harness = Harness::new(ScriptedLauncher::new(shell_host()));
    let report = harness.run(&config, true);

    assert_eq!(harness.launcher.spawned().len(), 2);
    assert_eq!(
        harness.launcher.sent_lines(),
        vec!["p1", "uptime", "exit", "p2", "uptime", "exit"]
    );
    let step = report.step("uptime").unwrap();
    assert!(step.records.iter().all(|r| r.outcome == Outcome::Succeeded));
}

#[test]
fn preview_never_spawns_for_any_action() {
    let config = parse(
        r#"{
            "variables": {
                "credentials.hostname": ["h1"],
                "credentials.username": ["u"],
                "credentials.password": ["p"],
                "password_prompt": "assword:",
                "shell_prompt": "\\$ $",
                "progress_prompt": "%"
            },
            "main": ["remote", "copy", "shell", "local"],
            "remote": { "action": "ssh", "commands": ["ls /"] },
            "copy": {
                "action": "scp", "source_dir": "/var/log",
                "source_files": ["a.log"], "target_dir": "/tmp/{run_id}"
            },
            "shell": { "action": "ssh-int" },
            "local": { "action": "local", "commands": ["date"] }
        }"#,
    );
    let mut harness = Harness::new(ScriptedLauncher::new(shell_host()));
    let report = harness.run(&config, false);

    assert!(harness.launcher.spawned().is_empty());
    assert!(harness.runner.executed_commands().is_empty());
    for step in &report.steps {
        assert!(step.skipped.is_none(), "{} was skipped", step.step);
        assert!(step.records.iter().all(|r| r.outcome == Outcome::Previewed));
    }
    let commands = harness.reporter.commands();
    assert!(commands.iter().any(|c| c.ends_with("u@h1:/var/log/a.log /tmp/RID_IT")));
    assert!(commands.contains(&"ls /"));
    assert!(commands.contains(&"date"));
}

#[test]
fn credential_file_feeds_a_config_run() {
    let dir = tempfile::tempdir().unwrap();
    let creds = dir.path().join("hosts.csv");
    std::fs::write(&creds, "h1,u1,p1\nh2,,p2\n").unwrap();

    let mut config = parse(
        r#"{
            "constants": { "password_prompt": "assword:", "shell_prompt": "\\$ $" },
            "variables": { "credentials.hostname": ["stale"] },
            "main": ["whoami"],
            "whoami": { "action": "ssh", "commands": ["whoami"] }
        }"#,
    );
    let fallback = SshCredentials::new(Some("ops".into()), None);
    config.merge_variables(cred_file::load(&creds, &fallback).unwrap());

    let mut harness = Harness::new(ScriptedLauncher::new(shell_host()));
    harness.run(&config, false);

    let commands = harness.reporter.commands();
    assert!(commands.iter().any(|c| c.ends_with(" u1@h1")));
    assert!(commands.iter().any(|c| c.ends_with(" ops@h2")));
    assert!(!commands.iter().any(|c| c.contains("stale")));
}
