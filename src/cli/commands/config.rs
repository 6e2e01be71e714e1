use crate::config::Config;

pub fn cmd_config_init() -> anyhow::Result<()> {
    if Config::create_default_if_missing()? {
        println!("✓ Config file created. Edit config.toml and run again.");
    } else {
        println!("config.toml already exists, leaving it untouched.");
    }
    Ok(())
}

pub fn cmd_config_show(config: &Config) -> anyhow::Result<()> {
    print!("{}", toml::to_string_pretty(&config.masked())?);
    Ok(())
}
