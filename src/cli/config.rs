//! Config command handler
//!
//! View and modify configuration settings.

use crate::config::Config;
use crate::error::{Error, Result};
use clap::Args;

/// Config command arguments
#[derive(Args)]
pub struct ConfigArgs {
    /// Configuration key (e.g., "geocoder.user_agent")
    pub key: Option<String>,

    /// Value to set (if not provided, shows current value)
    pub value: Option<String>,

    /// Show config file path
    #[arg(long)]
    pub path: bool,

    /// Reset config to defaults
    #[arg(long)]
    pub reset: bool,
}

/// Run the config command
pub fn run(args: ConfigArgs) -> Result<()> {
    // Show path
    if args.path {
        let path = Config::config_path()?;
        println!("{}", path.display());
        return Ok(());
    }

    // Reset config
    if args.reset {
        let config = Config::default();
        config.save()?;
        println!("Configuration reset to defaults");
        return Ok(());
    }

    let mut config = Config::load()?;

    match (&args.key, &args.value) {
        // No arguments: show all config
        (None, None) => {
            print!("{}", render_config(&config));
        }

        // Key only: show that value
        (Some(key), None) => {
            if let Some(value) = config.get(key) {
                println!("{}", value);
            } else {
                eprintln!("Unknown config key: {}", key);
                eprintln!("\nAvailable keys:");
                for k in Config::available_keys() {
                    eprintln!("  {}", k);
                }
                return Err(Error::Config(format!("Unknown config key: {}", key)));
            }
        }

        // Key and value: set the value
        (Some(key), Some(value)) => {
            config.set(key, value)?;
            config.save()?;
            println!("{} = {}", key, value);
        }

        // Value without key: not valid
        (None, Some(_)) => {
            return Err(Error::Config("Must specify a key to set a value".to_string()));
        }
    }

    Ok(())
}

/// Render every key grouped by section, TOML-style
fn render_config(config: &Config) -> String {
    let mut out = String::new();
    let mut section = "";

    for key in Config::available_keys() {
        let Some((name, field)) = key.split_once('.') else {
            continue;
        };
        if name != section {
            if !section.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("[{}]\n", name));
            section = name;
        }

        let value = config.get(key).unwrap_or_default();
        match key {
            "geocoder.user_agent" if value.is_empty() => {
                out.push_str(&format!("{} = \"\" # not configured\n", field));
            }
            _ if value.parse::<f64>().is_ok() || value == "true" || value == "false" => {
                out.push_str(&format!("{} = {}\n", field, value));
            }
            _ => out.push_str(&format!("{} = \"{}\"\n", field, value)),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_groups_sections() {
        let rendered = render_config(&Config::default());

        assert!(rendered.starts_with("[server]\n"));
        assert!(rendered.contains("\n[geocoder]\n"));
        assert!(rendered.contains("user_agent = \"\" # not configured"));
        assert!(rendered.contains("country_codes = \"de\""));
        assert!(rendered.contains("abort_stale_requests = true"));
        assert!(rendered.contains("settle_debounce_ms = 350"));
        assert_eq!(rendered.matches('[').count(), 4);
    }
}
