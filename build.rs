// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: one or more recipe paths
fn recipes_arg() -> Arg {
    Arg::new("recipes")
        .required(true)
        .num_args(1..)
        .help("Recipe files or directories containing recipe.toml")
}

/// Common arguments: profile and -s/-o overrides
fn profile_args() -> [Arg; 3] {
    [
        Arg::new("profile")
            .short('p')
            .long("profile")
            .value_name("PATH")
            .help("Profile file (TOML with [settings] and [options])"),
        Arg::new("setting")
            .short('s')
            .long("setting")
            .value_name("KEY=VALUE")
            .action(ArgAction::Append)
            .help("Setting override, e.g. -s build_type=Debug"),
        Arg::new("option")
            .short('o')
            .long("option")
            .value_name("KEY=VALUE")
            .action(ArgAction::Append)
            .help("Option override, e.g. -o glad/*:shared=True"),
    ]
}

/// Common argument: pantry root
fn root_arg() -> Arg {
    Arg::new("root")
        .long("root")
        .value_name("PATH")
        .help("Pantry root for exports, layouts and the cache")
}

fn build_cli() -> Command {
    Command::new("pantry")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Pantry Contributors")
        .about("Recipe-driven native package builder")
        .subcommand_required(true)
        .subcommand(
            Command::new("inspect")
                .about("Parse and validate a recipe")
                .arg(Arg::new("recipe").required(true).help("Recipe file or directory"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the parsed recipe as JSON"),
                ),
        )
        .subcommand(
            Command::new("package-id")
                .about("Compute the package id of a recipe")
                .arg(Arg::new("recipe").required(true).help("Recipe file or directory"))
                .args(profile_args())
                .arg(
                    Arg::new("verbose")
                        .long("verbose")
                        .action(ArgAction::SetTrue)
                        .help("Also print the canonical text the id is hashed from"),
                ),
        )
        .subcommand(
            Command::new("graph")
                .about("Show the build order of a set of recipes")
                .arg(recipes_arg())
                .arg(
                    Arg::new("levels")
                        .long("levels")
                        .action(ArgAction::SetTrue)
                        .help("Group recipes into levels that can be cooked in parallel"),
                )
                .arg(
                    Arg::new("affected")
                        .long("affected")
                        .value_name("NAME")
                        .conflicts_with("levels")
                        .help("List every recipe that must be rebuilt when this one changes"),
                ),
        )
        .subcommand(
            Command::new("cook")
                .about("Build, package and publish a set of recipes")
                .arg(recipes_arg())
                .args(profile_args())
                .arg(root_arg())
                .arg(
                    Arg::new("jobs")
                        .short('j')
                        .long("jobs")
                        .help("Parallel jobs (default: available CPUs)"),
                )
                .arg(
                    Arg::new("timeout")
                        .long("timeout")
                        .help("Timeout for a single toolchain step, in seconds"),
                )
                .arg(Arg::new("cmake").long("cmake").help("cmake executable"))
                .arg(
                    Arg::new("generator")
                        .short('G')
                        .long("generator")
                        .help("CMake generator, e.g. Ninja"),
                )
                .arg(
                    Arg::new("no_cache")
                        .long("no-cache")
                        .action(ArgAction::SetTrue)
                        .help("Neither read nor write the build cache"),
                ),
        )
        .subcommand(
            Command::new("cache-clear")
                .about("Remove every record from the build cache")
                .arg(root_arg()),
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

    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("pantry.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
