// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use crate::cli::ConfigCommand;
use crate::config::Config;
use crate::error::Result;

/// Execute a config subcommand.
pub fn run(config: &Config, path: &Path, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}
