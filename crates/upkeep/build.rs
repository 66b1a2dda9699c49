use std::fs;
use std::path::PathBuf;

use clap::CommandFactory;

// cli.rs only needs clap + clap_complete (both build-dependencies), so the
// build script includes it directly and renders man pages from the same
// definitions the binary parses with.
#[path = "src/cli.rs"]
mod cli;

fn main() {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let out_dir: PathBuf = std::env::var_os("OUT_DIR").expect("OUT_DIR not set by Cargo").into();
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("failed to create man output directory");

    // Walk the command tree iteratively; subcommand pages are named
    // `upkeep-<sub>.1`, nested ones `upkeep-<sub>-<subsub>.1`.
    let mut pending = vec![cli::Cli::command()];
    while let Some(cmd) = pending.pop() {
        let name = cmd.get_name().to_owned();

        let mut page = Vec::new();
        clap_mangen::Man::new(cmd.clone())
            .render(&mut page)
            .unwrap_or_else(|e| panic!("rendering man page for `{name}`: {e}"));
        let path = man_dir.join(format!("{name}.1"));
        fs::write(&path, page).unwrap_or_else(|e| panic!("writing {}: {e}", path.display()));

        for sub in cmd.get_subcommands() {
            if !sub.is_hide_set() {
                pending.push(sub.clone().name(format!("{name}-{}", sub.get_name())));
            }
        }
    }
}
