//! Parsing Options.
//! `pnsim <NET> [-c config.toml] [-e basic|transition] [--dot out.dot] [--diagnose]`

use clap::{Arg, ArgAction, Command};
use std::error::Error;
use std::path::PathBuf;

use crate::config::EngineKind;

fn make_options_parser() -> clap::Command {
    let parser = Command::new("pnsim")
        .no_binary_name(true)
        .version("v0.1.0")
        .about("Plays the token game on a Petri net loaded from JSON or RON")
        .arg(
            Arg::new("net")
                .value_name("NET")
                .help("Net file (.json or .ron)")
                .required(true),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML run configuration: engine, data values and steps"),
        )
        .arg(
            Arg::new("engine")
                .short('e')
                .long("engine")
                .help("Overrides the engine selected by the configuration")
                .value_parser(["basic", "transition"]),
        )
        .arg(
            Arg::new("dot")
                .long("dot")
                .value_name("FILE")
                .help("Write the final simulation model as Graphviz DOT"),
        )
        .arg(
            Arg::new("diagnose")
                .long("diagnose")
                .action(ArgAction::SetTrue)
                .help("Log connectivity diagnostics for the loaded net"),
        );
    parser
}

#[derive(Debug, Default)]
pub struct Options {
    pub net: PathBuf,
    pub config: Option<PathBuf>,
    pub engine: Option<EngineKind>,
    pub dot: Option<PathBuf>,
    pub diagnose: bool,
}

impl Options {
    pub fn parse_from_str(s: &str) -> Result<Self, Box<dyn Error>> {
        let flags = shellwords::split(s)?;
        Self::parse_from_args(&flags)
    }

    pub fn parse_from_args(flags: &[String]) -> Result<Self, Box<dyn Error>> {
        let app = make_options_parser();
        let matches = app.try_get_matches_from(flags.iter())?;

        let net = match matches.get_one::<String>("net") {
            Some(path) => PathBuf::from(path),
            None => return Err("missing net file".into()),
        };
        let engine = match matches.get_one::<String>("engine").map(String::as_str) {
            Some("basic") => Some(EngineKind::Basic),
            Some("transition") => Some(EngineKind::Transition),
            Some(other) => return Err(format!("unsupported engine kind {other}").into()),
            None => None,
        };

        Ok(Options {
            net,
            config: matches.get_one::<String>("config").map(PathBuf::from),
            engine,
            dot: matches.get_one::<String>("dot").map(PathBuf::from),
            diagnose: matches.get_flag("diagnose"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_from_str() {
        let options =
            Options::parse_from_str("nets/order.json -c run.toml -e transition --diagnose")
                .unwrap();
        assert_eq!(options.net, PathBuf::from("nets/order.json"));
        assert_eq!(options.config, Some(PathBuf::from("run.toml")));
        assert_eq!(options.engine, Some(EngineKind::Transition));
        assert!(options.diagnose);
        assert_eq!(options.dot, None);
    }

    #[test]
    fn test_parse_from_args_err() {
        let options = Options::parse_from_args(&["-e".to_owned(), "unknown".to_owned()]);
        assert!(options.is_err());
        assert!(Options::parse_from_args(&[]).is_err());
    }
}
