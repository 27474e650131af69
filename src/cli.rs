//! # Command-line adapter.
//!
//! Builds a `clap` command from a [`Service`]'s declarations and turns the
//! matches into a [`ServiceConfig`].
//!
//! ## Flags
//! ```text
//! --tasks [TASK]...    run only these tasks; without values: list tasks and exit
//! --level <LEVEL>      log threshold [default: debug]
//! --dryrun             expose dryrun mode to tasks
//! --runit-install      install under runit and exit (only with an installer)
//! --<task>-<option>    one per declared task option
//! ```
//!
//! Boolean options accept `--flag`, `--flag true` and `--flag false`; list
//! options accept several values and may repeat.

use std::ffi::OsString;

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

use crate::core::{Service, ServiceConfig};
use crate::options::{OptionKind, OptionValue, ResolvedOption};

const TASKS: &str = "tasks";
const LEVEL: &str = "level";
const DRYRUN: &str = "dryrun";
const RUNIT_INSTALL: &str = "runit_install";

/// Builds the command for `service`.
pub fn command(service: &Service) -> Command {
    let default_level = ServiceConfig::default().level;

    let mut cmd = Command::new(service.name().to_string())
        .arg(
            Arg::new(TASKS)
                .long("tasks")
                .num_args(0..)
                .value_name("TASK")
                .help("Tasks to run. Pass without args to see the list. If not passed, all tasks are started"),
        )
        .arg(
            Arg::new(LEVEL)
                .long("level")
                .value_name("LEVEL")
                .default_value(default_level)
                .help("Log level"),
        )
        .arg(
            Arg::new(DRYRUN)
                .long("dryrun")
                .action(ArgAction::SetTrue)
                .help("Run in \"dryrun\" mode"),
        );

    if service.has_installer() {
        cmd = cmd.arg(
            Arg::new(RUNIT_INSTALL)
                .long("runit-install")
                .action(ArgAction::SetTrue)
                .help("Install this service under runit"),
        );
    }

    for opt in service.options().iter() {
        cmd = cmd.arg(option_arg(opt));
    }
    cmd
}

fn option_arg(opt: &ResolvedOption) -> Arg {
    let help = if opt.help.is_empty() {
        format!("[{}] (task {})", opt.default, opt.owner)
    } else {
        format!("{} [{}]", opt.help, opt.default)
    };
    let arg = Arg::new(opt.key.clone())
        .long(opt.flag.clone())
        .value_name(opt.name.to_uppercase())
        .help(help);

    match opt.kind {
        OptionKind::Str => arg.value_parser(value_parser!(String)),
        OptionKind::Int => arg.value_parser(value_parser!(i64)),
        OptionKind::Float => arg.value_parser(value_parser!(f64)),
        OptionKind::Bool => arg
            .value_parser(value_parser!(bool))
            .num_args(0..=1)
            .default_missing_value("true"),
        OptionKind::List => arg
            .value_parser(value_parser!(String))
            .num_args(1..)
            .action(ArgAction::Append),
    }
}

/// Parses `args` (including the program name) into a configuration.
///
/// Options not given on the command line keep their declared defaults.
pub fn parse_from<I, T>(service: &Service, args: I) -> Result<ServiceConfig, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command(service).try_get_matches_from(args)?;
    Ok(config_from(service, &matches))
}

/// Parses the process arguments.
pub fn parse(service: &Service) -> Result<ServiceConfig, clap::Error> {
    parse_from(service, std::env::args_os())
}

fn config_from(service: &Service, matches: &ArgMatches) -> ServiceConfig {
    let mut config = ServiceConfig::default();

    if matches.value_source(TASKS) == Some(ValueSource::CommandLine) {
        config.tasks = Some(
            matches
                .get_many::<String>(TASKS)
                .map(|names| names.cloned().collect())
                .unwrap_or_default(),
        );
    }
    if let Some(level) = matches.get_one::<String>(LEVEL) {
        config.level = level.clone();
    }
    config.dryrun = matches.get_flag(DRYRUN);
    if service.has_installer() {
        config.install = matches.get_flag(RUNIT_INSTALL);
    }

    for opt in service.options().iter() {
        let key = opt.key.as_str();
        let value = match opt.kind {
            OptionKind::Str => matches.get_one::<String>(key).cloned().map(OptionValue::Str),
            OptionKind::Int => matches.get_one::<i64>(key).copied().map(OptionValue::Int),
            OptionKind::Float => matches.get_one::<f64>(key).copied().map(OptionValue::Float),
            OptionKind::Bool => matches.get_one::<bool>(key).copied().map(OptionValue::Bool),
            OptionKind::List => matches
                .get_many::<String>(key)
                .map(|values| OptionValue::List(values.cloned().collect())),
        };
        if let Some(value) = value {
            config.options.set(key, value);
        }
    }

    config.with_defaults(service)
}
