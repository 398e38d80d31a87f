/*!
# Introduction

nodebootstrap renders the user-data for one node group.

The node group and the cluster it joins are read from a TOML file:

```toml
[cluster]
name = "example"
endpoint = "https://example.com"
certificate-authority = "Q0E="
service-ipv4-cidr = "10.100.0.0/16"

[node-group]
ami-family = "AmazonLinux2023"
labels = { role = "worker" }
```

The base64-encoded user-data is printed to stdout.  With `--decode`, the decoded payload is
printed instead, which is handy for checking what a node will actually see.
*/

#[macro_use]
extern crate log;

use argh::FromArgs;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use nodebootstrap::{Bootstrapper, ClusterRuntimeStatus, NodeBootstrapSpec, UserData};
use serde::Deserialize;
use simplelog::{Config as LogConfig, LevelFilter, SimpleLogger};
use snafu::ResultExt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(FromArgs, PartialEq, Debug)]
/// Render instance user-data for a node group.
struct Args {
    #[argh(option)]
    /// TOML file describing the cluster and node group
    input: PathBuf,

    #[argh(option)]
    /// fixed MIME boundary, for reproducible multipart output
    boundary: Option<String>,

    #[argh(option, default = "LevelFilter::Info")]
    /// log level: trace|debug|info|warn|error
    log_level: LevelFilter,

    #[argh(switch)]
    /// print the decoded payload instead of the encoded user-data
    decode: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Input {
    cluster: ClusterRuntimeStatus,
    node_group: NodeBootstrapSpec,
}

fn read_input(path: &Path) -> Result<Input> {
    let data = fs::read_to_string(path).context(error::InputReadSnafu { path })?;
    toml::from_str(&data).context(error::InputParseSnafu { path })
}

/// Undoes the base64 and, for cloud-config, the gzip layer of user-data.
fn decode(user_data: &str) -> Result<String> {
    let bytes = BASE64.decode(user_data).context(error::DecodeSnafu)?;
    cloudconfig::expand_slice_maybe(&bytes).context(error::ExpandSnafu)
}

fn render(input: &Input, boundary: Option<String>, decoded: bool) -> Result<String> {
    let user_data = Bootstrapper::new(&input.node_group, &input.cluster)
        .context(error::GenerateSnafu)?
        .with_mime_boundary(boundary)
        .user_data()
        .context(error::GenerateSnafu)?;

    if decoded {
        decode(&user_data)
    } else {
        Ok(user_data)
    }
}

fn run() -> Result<()> {
    let args: Args = argh::from_env();

    // SimpleLogger will send errors to stderr and anything less to stdout.
    SimpleLogger::init(args.log_level, LogConfig::default()).context(error::LoggerSnafu)?;

    let input = read_input(&args.input)?;
    info!(
        "Rendering user-data for node group '{}' in cluster '{}'",
        input.node_group.name, input.cluster.name
    );
    let output = render(&input, args.boundary, args.decode)?;
    if output.is_empty() {
        info!("Node group needs no user-data");
    } else {
        println!("{}", output);
    }
    Ok(())
}

// Returning a Result from main makes it print a Debug representation of the error, but with Snafu
// we have nice Display representations of the error, so we wrap "main" (run) and print any error.
// https://github.com/shepmaster/snafu/issues/110
fn main() {
    if let Err(e) = run() {
        eprintln!("{}", e);
        process::exit(1);
    }
}

mod error {
    use snafu::Snafu;
    use std::path::PathBuf;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(super) enum Error {
        #[snafu(display("Unable to decode user-data as base64: {}", source))]
        Decode { source: base64::DecodeError },

        #[snafu(display("Unable to decompress user-data: {}", source))]
        Expand { source: std::io::Error },

        #[snafu(display("Unable to generate user-data: {}", source))]
        Generate { source: nodebootstrap::Error },

        #[snafu(display("Unable to parse input '{}': {}", path.display(), source))]
        InputParse {
            path: PathBuf,
            source: toml::de::Error,
        },

        #[snafu(display("Unable to read input '{}': {}", path.display(), source))]
        InputRead {
            path: PathBuf,
            source: std::io::Error,
        },

        #[snafu(display("Logger setup error: {}", source))]
        Logger { source: log::SetLoggerError },
    }
}

type Result<T> = std::result::Result<T, error::Error>;

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=
