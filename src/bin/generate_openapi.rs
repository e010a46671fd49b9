//! Regenerates the worker's OpenAPI document.
//!
//! Usage:
//!   cargo run --bin generate_openapi                       # writes docs/openapi.json
//!   cargo run --bin generate_openapi -- --output api.json
//!   cargo run --bin generate_openapi -- --stdout

use std::{
    env, fs,
    io::{self, Write},
    path::PathBuf,
};

use agro_analysis_worker::api::handlers::ApiDoc;
use anyhow::{bail, Context, Result};
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "docs/openapi.json";

#[derive(Debug, PartialEq, Eq)]
enum Destination {
    Stdout,
    File(PathBuf),
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Destination> {
    let mut destination = Destination::File(PathBuf::from(DEFAULT_OUTPUT));
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--stdout" => destination = Destination::Stdout,
            "--output" => {
                let path = args.next().context("--output needs a path")?;
                destination = Destination::File(PathBuf::from(path));
            }
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(destination)
}

fn main() -> Result<()> {
    let destination = parse_args(env::args().skip(1))?;
    let json = ApiDoc::openapi()
        .to_pretty_json()
        .context("failed to serialise OpenAPI document")?;

    match destination {
        Destination::Stdout => io::stdout()
            .write_all(json.as_bytes())
            .context("failed to write to stdout")?,
        Destination::File(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
            }
            fs::write(&path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("OpenAPI document written to {}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn defaults_to_docs_directory() {
        assert_eq!(
            parse_args(args(&[])).unwrap(),
            Destination::File(PathBuf::from("docs/openapi.json"))
        );
    }

    #[test]
    fn explicit_destinations() {
        assert_eq!(parse_args(args(&["--stdout"])).unwrap(), Destination::Stdout);
        assert_eq!(
            parse_args(args(&["--output", "api.json"])).unwrap(),
            Destination::File(PathBuf::from("api.json"))
        );
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(parse_args(args(&["--output"])).is_err());
        assert!(parse_args(args(&["--yaml"])).is_err());
    }
}
