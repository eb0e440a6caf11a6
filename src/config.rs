use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Load everything and print what came back.
    Check,
    /// Load, then write house info and house items straight back.
    Resave,
    /// Load, then keep autosaving until stdin closes.
    Serve,
}

impl Command {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "check" => Some(Self::Check),
            "resave" => Some(Self::Resave),
            "serve" => Some(Self::Serve),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct AppConfig {
    pub root: PathBuf,
    pub command: Command,
    pub db_path: PathBuf,
    pub autosave_seconds: u64,
}

const DEFAULT_AUTOSAVE_SECONDS: u64 = 900;

impl AppConfig {
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        if args.len() < 2 {
            return Err(
                "usage: tibia-house-store <asset-root> [check|resave|serve]".to_string(),
            );
        }

        let root = Path::new(&args[1]).to_path_buf();
        let command = match args.get(2) {
            Some(value) => Command::parse(value)
                .ok_or_else(|| format!("unknown command '{}'", value))?,
            None => Command::Check,
        };
        let db_path = env_value("TIBIA_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| root.join("save").join("world.db"));
        let autosave_seconds = match env_value("TIBIA_AUTOSAVE_SECS") {
            Some(value) => value
                .parse()
                .map_err(|_| format!("TIBIA_AUTOSAVE_SECS is not a number: '{}'", value))?,
            None => DEFAULT_AUTOSAVE_SECONDS,
        };
        Ok(Self {
            root,
            command,
            db_path,
            autosave_seconds,
        })
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn command_defaults_to_check() {
        let config = AppConfig::from_args(&args(&["bin", "/srv/tibia"])).expect("config");
        assert_eq!(config.command, Command::Check);
        assert_eq!(config.root, PathBuf::from("/srv/tibia"));

        let config =
            AppConfig::from_args(&args(&["bin", "/srv/tibia", "serve"])).expect("config");
        assert_eq!(config.command, Command::Serve);
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(AppConfig::from_args(&args(&["bin"])).is_err());
        assert!(AppConfig::from_args(&args(&["bin", "/srv", "explode"])).is_err());
    }
}
