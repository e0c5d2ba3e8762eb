// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("reposx")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Reposx Contributors")
        .about("Minimal package manager for prebuilt tarballs")
        .subcommand_required(false)
        .arg(
            Arg::new("base_url")
                .long("base-url")
                .value_name("URL")
                .global(true)
                .default_value("http://93.100.25.80:8080/reposx/")
                .help("Package origin serving index.xml (env: REPOSX_BASE_URL)"),
        )
        .arg(
            Arg::new("root")
                .long("root")
                .value_name("DIR")
                .global(true)
                .help("Store root, default ~/.local/reposx (env: REPOSX_ROOT)"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("SECS")
                .global(true)
                .default_value("30")
                .help("HTTP timeout in seconds, 0 disables it (env: REPOSX_TIMEOUT)"),
        )
        .subcommand(Command::new("update").about("Update package list"))
        .subcommand(
            Command::new("install")
                .about("Install package")
                .arg(
                    Arg::new("package")
                        .required(true)
                        .help("Package name as listed in the index"),
                ),
        )
        .subcommand(Command::new("paths").about("Get package paths for shells"))
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("reposx.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
