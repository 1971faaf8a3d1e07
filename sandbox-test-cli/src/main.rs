// Copyright (c) The sandbox-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::Parser;
use color_eyre::Result;
use sandbox_test_cli::{OutputWriter, SandboxTestApp};

fn main() -> Result<()> {
    color_eyre::install()?;

    let opts = SandboxTestApp::parse();
    let output = opts.init_output();

    match opts.exec(output, &mut OutputWriter::default()) {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            error.display_to_stderr(&output.error_styles());
            std::process::exit(error.process_exit_code())
        }
    }
}
