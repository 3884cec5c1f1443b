// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

use std::path::PathBuf;

use anyhow::{anyhow, Error};
use clap::{value_parser, Arg, ArgAction, Command};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use proptree::process_document::{process_document_file, ProcessOptions};

fn main() -> Result<(), Error> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let matches = Command::new("proptree")
        .about("Builds, resolves and documents an API description")
        .arg(
            Arg::new("input")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("API description file"),
        )
        .arg(
            Arg::new("doc")
                .long("doc")
                .action(ArgAction::SetTrue)
                .help("Print rendered documentation instead of the outline"),
        )
        .arg(
            Arg::new("no-resolve")
                .long("no-resolve")
                .action(ArgAction::SetTrue)
                .help("Do not apply resource types and traits"),
        )
        .arg(
            Arg::new("param")
                .short('p')
                .long("param")
                .value_name("NAME=VALUE")
                .action(ArgAction::Append)
                .help("Extra template parameter"),
        )
        .get_matches();

    let mut options = ProcessOptions {
        resolve: !matches.get_flag("no-resolve"),
        ..ProcessOptions::default()
    };
    for param in matches.get_many::<String>("param").into_iter().flatten() {
        let (name, value) = param
            .split_once('=')
            .ok_or_else(|| anyhow!("template parameter '{}' must look like NAME=VALUE", param))?;
        options.params.insert(name.to_string(), value.to_string());
    }

    let input = matches
        .get_one::<PathBuf>("input")
        .ok_or_else(|| anyhow!("missing input file"))?;
    let doc = process_document_file(input, &options)?;

    if matches.get_flag("doc") {
        print!("{}", doc.render_docs()?);
    } else {
        print!("{}", doc.outline());
    }
    Ok(())
}
