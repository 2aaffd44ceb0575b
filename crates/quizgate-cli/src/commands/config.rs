use clap::Subcommand;
use quizgate_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "time_limit_seconds", "answer_key.q1")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List effective config values (secret masked)
    List,
    /// Reset config to defaults
    Reset,
    /// Print the config file location
    Path,
}

const MASK: &str = "********";

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) if key == "teacher_secret" && !value.is_empty() => println!("{MASK}"),
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            // Edit the file as written; environment overrides stay out of it.
            let path = Config::path()?;
            let mut config = Config::load_from(&path)?;
            config.set(&key, &value)?;
            config.save_to(&path)?;
            println!("ok");
        }
        ConfigAction::List => {
            let mut config = Config::load()?;
            if !config.teacher_secret.is_empty() {
                config.teacher_secret = MASK.to_string();
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("config reset to defaults");
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
    }
    Ok(())
}
