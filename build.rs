// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: mirror project directory
fn path_arg() -> Arg {
    Arg::new("path")
        .short('p')
        .long("path")
        .value_name("DIR")
        .default_value(".")
        .global(true)
        .help("Mirror project directory (holds config.json and state.json)")
}

/// Common argument: skip confirmation
fn yes_arg() -> Arg {
    Arg::new("yes")
        .short('y')
        .long("yes")
        .action(clap::ArgAction::SetTrue)
        .help("Skip the confirmation prompt")
}

fn quiet_arg() -> Arg {
    Arg::new("quiet")
        .short('q')
        .long("quiet")
        .action(clap::ArgAction::SetTrue)
        .help("Hide per-file progress bars")
}

fn build_cli() -> Command {
    Command::new("winget-mirror")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Mirror winget manifests and installers with SHA-256 integrity tracking")
        .subcommand_required(true)
        .arg(path_arg())
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(clap::ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
        .subcommand(Command::new("init").about("Create a mirror project with default config and empty state"))
        .subcommand(
            Command::new("sync-repo")
                .about("Clone or update the manifest repository at the configured revision"),
        )
        .subcommand(
            Command::new("sync")
                .about("Download the latest installers of matching packages")
                .arg(
                    Arg::new("filter")
                        .required(true)
                        .help("Publisher prefix, optionally followed by /Package prefix"),
                )
                .arg(quiet_arg()),
        )
        .subcommand(
            Command::new("refresh-synced")
                .about("Update every tracked package that has a newer version")
                .arg(quiet_arg()),
        )
        .subcommand(
            Command::new("validate-hash")
                .about("Verify recorded SHA-256 digests of all tracked downloads")
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_parser(["text", "json"])
                        .default_value("text")
                        .help("Output format"),
                ),
        )
        .subcommand(
            Command::new("purge-package")
                .about("Remove downloads and records of packages by publisher prefix")
                .arg(Arg::new("publisher").required(true).help("Publisher prefix (case-insensitive)"))
                .arg(yes_arg()),
        )
        .subcommand(
            Command::new("purge-all-packages")
                .about("Remove every tracked package")
                .arg(yes_arg()),
        )
        .subcommand(
            Command::new("search")
                .about("Show mirror status of packages under matching publishers")
                .arg(Arg::new("publisher").required(true).help("Publisher prefix (case-insensitive)")),
        )
        .subcommand(
            Command::new("patch-repo")
                .about("Write manifests with installer URLs pointing at the mirror")
                .arg(
                    Arg::new("output_dir")
                        .short('o')
                        .long("output-dir")
                        .required(true)
                        .help("Output directory for patched manifests"),
                )
                .arg(
                    Arg::new("server_url")
                        .short('s')
                        .long("server-url")
                        .help("Base URL the downloads directory is served from"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("winget-mirror.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
        return;
    }

    println!("cargo:warning=Man page generated at {}", man_path.display());
}
