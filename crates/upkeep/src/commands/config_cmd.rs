//! `upkeep config` — profile management, no backend connection.

use dialoguer::{Confirm, Input};
use tabled::Tabled;
use url::Url;

use upkeep_config::{Profile, config_path, load_config_or_default, save_config};

use crate::cli::{ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "SERVER")]
    server: String,
    #[tabled(rename = "REALTIME")]
    realtime: String,
    #[tabled(rename = "DEFAULT")]
    default: String,
}

pub fn handle(command: &ConfigCommand, global: &GlobalOpts) -> Result<(), CliError> {
    match command {
        ConfigCommand::Init => init(global),
        ConfigCommand::Show => {
            show(global);
            Ok(())
        }
        ConfigCommand::SetDefault { name } => set_default(name, global),
        ConfigCommand::ListProfiles => {
            list_profiles(global);
            Ok(())
        }
    }
}

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = load_config_or_default();

    let name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".to_owned())
        .interact_text()
        .map_err(prompt_err)?;

    let server: String = Input::new()
        .with_prompt("Backend URL")
        .default(
            global
                .server
                .clone()
                .unwrap_or_else(|| "http://localhost:8000".to_owned()),
        )
        .validate_with(|input: &String| {
            input.parse::<Url>().map(|_| ()).map_err(|e| e.to_string())
        })
        .interact_text()
        .map_err(prompt_err)?;

    let insecure = Confirm::new()
        .with_prompt("Accept self-signed TLS certificates?")
        .default(false)
        .interact()
        .map_err(prompt_err)?;

    let mut profile = Profile::new(server);
    if insecure {
        profile.insecure = Some(true);
    }

    let make_default = cfg.profiles.is_empty()
        || Confirm::new()
            .with_prompt(format!("Make '{name}' the default profile?"))
            .default(true)
            .interact()
            .map_err(prompt_err)?;

    cfg.profiles.insert(name.clone(), profile);
    if make_default {
        cfg.default_profile = Some(name.clone());
    }
    save_config(&cfg)?;

    output::print_output(
        &format!("Saved profile '{name}' to {}", config_path().display()),
        global.quiet,
    );
    Ok(())
}

fn show(global: &GlobalOpts) {
    let cfg = load_config_or_default();

    let rendered = match global.output {
        OutputFormat::Json => output::render_json_pretty(&cfg),
        OutputFormat::JsonCompact => output::render_json_compact(&cfg),
        OutputFormat::Table | OutputFormat::Plain => {
            let mut out = format!("Config file: {}\n", config_path().display());
            out.push_str(&format!(
                "Default profile: {}",
                cfg.default_profile.as_deref().unwrap_or("(none)")
            ));
            if !cfg.profiles.is_empty() {
                out.push('\n');
                out.push_str(&profile_table(&cfg));
            }
            out
        }
    };
    output::print_output(&rendered, global.quiet);
}

fn set_default(name: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = load_config_or_default();
    if !cfg.profiles.contains_key(name) {
        let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
        available.sort_unstable();
        return Err(CliError::ProfileNotFound {
            name: name.into(),
            available: if available.is_empty() {
                "(none)".into()
            } else {
                available.join(", ")
            },
        });
    }

    cfg.default_profile = Some(name.to_owned());
    save_config(&cfg)?;
    output::print_output(&format!("Default profile set to '{name}'"), global.quiet);
    Ok(())
}

fn list_profiles(global: &GlobalOpts) {
    let cfg = load_config_or_default();

    let rendered = match global.output {
        OutputFormat::Json => output::render_json_pretty(&cfg.profiles),
        OutputFormat::JsonCompact => output::render_json_compact(&cfg.profiles),
        OutputFormat::Plain => {
            let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
            names.sort_unstable();
            names.join("\n")
        }
        OutputFormat::Table => {
            if cfg.profiles.is_empty() {
                "No profiles configured. Run: upkeep config init".to_owned()
            } else {
                profile_table(&cfg)
            }
        }
    };
    output::print_output(&rendered, global.quiet);
}

fn profile_table(cfg: &upkeep_config::Config) -> String {
    use tabled::{Table, settings::Style};

    let mut rows: Vec<ProfileRow> = cfg
        .profiles
        .iter()
        .map(|(name, profile)| ProfileRow {
            name: name.clone(),
            server: profile.server.clone(),
            realtime: match profile.realtime {
                Some(true) | None => "on".into(),
                Some(false) => "off".into(),
            },
            default: if cfg.default_profile.as_deref() == Some(name) {
                "*".into()
            } else {
                String::new()
            },
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));

    Table::new(&rows).with(Style::rounded()).to_string()
}

fn prompt_err(err: dialoguer::Error) -> CliError {
    CliError::Backend(format!("prompt failed: {err}"))
}
