use anyhow::Context;
use clap::{
    crate_authors, crate_description, crate_version, value_parser, Arg, ArgAction, ArgMatches,
    Command,
};
use lngs::LangFile;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

mod catalog;
mod generator;
mod info;
mod make;

fn file_arg(name: &'static str, short: char, help: &'static str) -> Arg {
    Arg::new(name)
        .short(short)
        .long(name)
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .required(true)
        .help(help)
}

fn cli() -> Command {
    Command::new("xlngs")
        .version(crate_version!())
        .author(crate_authors!())
        .about(crate_description!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Show more information; RUST_LOG takes precedence"),
        )
        .subcommand(
            Command::new("make")
                .about("Compile a GetText message file into a language file")
                .arg(file_arg(
                    "keys",
                    'k',
                    "Reference language file with keys, giving the serial and string ids",
                ))
                .arg(file_arg("msgs", 'm', "GetText message file to read (.po or .mo)"))
                .arg(file_arg(
                    "output",
                    'o',
                    "Language file to write; with -, the result is written to standard output",
                ))
                .arg(
                    Arg::new("language")
                        .short('l')
                        .long("language")
                        .value_name("NAME")
                        .help("Name of the language, stored in the Language attribute"),
                )
                .arg(
                    Arg::new("warp")
                        .short('w')
                        .long("warp")
                        .action(ArgAction::SetTrue)
                        .help(
                            "Replace missing strings with warped ones; \
                             resulting strings are always singular",
                        ),
                )
                .arg(
                    Arg::new("with-keys")
                        .long("with-keys")
                        .action(ArgAction::SetTrue)
                        .help("Copy the keys of the reference file into the output"),
                ),
        )
        .subcommand(
            Command::new("pot")
                .about("Write a GetText template for the strings of a reference language file")
                .arg(file_arg("keys", 'k', "Reference language file with keys"))
                .arg(file_arg(
                    "output",
                    'o',
                    "Template to write; with -, the result is written to standard output",
                ))
                .arg(
                    Arg::new("copyright-holder")
                        .long("copyright-holder")
                        .value_name("string")
                        .help("Set the copyright holder in the output."),
                )
                .arg(
                    Arg::new("package-name")
                        .long("package-name")
                        .value_name("package")
                        .help("Set the package name in the header of the output."),
                )
                .arg(
                    Arg::new("package-version")
                        .long("package-version")
                        .value_name("version")
                        .help("Set the package version in the header of the output."),
                )
                .arg(
                    Arg::new("msgid-bugs-address")
                        .long("msgid-bugs-address")
                        .value_name("email@address")
                        .help(
                            "Set the reporting address for msgid bugs. This is the email address \
                             or URL to which the translators shall report bugs in the untranslated strings",
                        ),
                ),
        )
        .subcommand(
            Command::new("info")
                .about("Describe the content of a language file")
                .arg(
                    Arg::new("INPUT")
                        .value_parser(value_parser!(PathBuf))
                        .required(true)
                        .help("Language file to read"),
                ),
        )
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_lang_file(path: &Path) -> anyhow::Result<LangFile<'static>> {
    let data = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    LangFile::from_bytes(data).with_context(|| format!("cannot open {}", path.display()))
}

fn write_output(
    path: &Path,
    f: impl FnOnce(&mut dyn Write) -> std::io::Result<()>,
) -> anyhow::Result<()> {
    let result = if path == Path::new("-") {
        let mut out = std::io::stdout().lock();
        f(&mut out).and_then(|()| out.flush())
    } else {
        std::fs::File::create(path).and_then(|file| {
            let mut out = std::io::BufWriter::new(file);
            f(&mut out)?;
            out.flush()
        })
    };
    result.with_context(|| format!("cannot write {}", path.display()))
}

fn path<'a>(args: &'a ArgMatches, name: &str) -> &'a Path {
    args.get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .unwrap_or_else(|| Path::new("-"))
}

fn make_command(args: &ArgMatches) -> anyhow::Result<()> {
    let reference = read_lang_file(path(args, "keys"))?;
    let catalog = catalog::Catalog::load(path(args, "msgs"))?;
    tracing::info!(translations = catalog.len(), "message file loaded");

    let options = make::MakeOptions {
        language: args.get_one::<String>("language").cloned(),
        warp: args.get_flag("warp"),
        with_keys: args.get_flag("with-keys"),
    };
    let file = make::make(&reference, &catalog, &options);
    write_output(path(args, "output"), |out| file.write(out))
}

fn pot_command(args: &ArgMatches) -> anyhow::Result<()> {
    let reference = read_lang_file(path(args, "keys"))?;
    let details = generator::OutputDetails {
        copyright_holder: args.get_one::<String>("copyright-holder").cloned(),
        package_name: args.get_one::<String>("package-name").cloned(),
        package_version: args.get_one::<String>("package-version").cloned(),
        bugs_address: args.get_one::<String>("msgid-bugs-address").cloned(),
    };
    let now = chrono::Local::now();
    write_output(path(args, "output"), |out| {
        generator::generate(out, &details, &reference, &now)
    })
}

fn info_command(args: &ArgMatches) -> anyhow::Result<()> {
    let file = read_lang_file(path(args, "INPUT"))?;
    info::describe(std::io::stdout().lock(), &file).context("cannot write to standard output")
}

fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    setup_tracing(matches.get_flag("verbose"));

    match matches.subcommand() {
        Some(("make", args)) => make_command(args),
        Some(("pot", args)) => pot_command(args),
        Some(("info", args)) => info_command(args),
        _ => unreachable!("a subcommand is required"),
    }
}
