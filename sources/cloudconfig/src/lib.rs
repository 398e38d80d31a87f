/*!
# Introduction

cloudconfig builds the `#cloud-config` documents that cloud-init reads from instance user-data on
first boot.

A document is an ordered list of packages to install, commands to run, and files to write.
Commands are either argv lists or shell strings; scripts are written under a fixed scripts
directory and run by absolute path.

`CloudConfig::encode` produces the string that is attached verbatim as user-data: the YAML body
behind a literal `#cloud-config` header line, gzip-compressed, then base64-encoded with the
standard alphabet.  `CloudConfig::decode` is the inverse, and also accepts user-data that was
never compressed.
*/

#![deny(rust_2018_idioms)]

#[macro_use]
extern crate log;

mod compression;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt};

pub use compression::expand_slice_maybe;

/// The first line of every cloud-config document.
pub const HEADER: &str = "#cloud-config";

/// Directory that scripts added with `run_script` are written to.
pub const SCRIPTS_DIR: &str = "/var/lib/cloud/scripts/eksctl/";

pub const DEFAULT_OWNER: &str = "root:root";
pub const DEFAULT_PERMISSIONS: &str = "0644";
pub const SCRIPT_PERMISSIONS: &str = "0755";

const SHELL: &str = "/bin/bash";

/// A single `runcmd` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// Run directly, without a shell.
    Argv(Vec<String>),
    /// Handed to the shell by cloud-init.
    Shell(String),
}

/// A `write_files` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub path: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub owner: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub permissions: String,
}

impl File {
    /// A file with no owner or permissions set; `CloudConfig::add_file` fills in the defaults.
    pub fn new<P, C>(path: P, content: C) -> Self
    where
        P: Into<String>,
        C: Into<String>,
    {
        Self {
            path: path.into(),
            content: content.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,

    #[serde(rename = "runcmd", default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<Command>,

    #[serde(rename = "write_files", default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<File>,
}

impl CloudConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_packages<I, S>(&mut self, packages: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.packages.extend(packages.into_iter().map(Into::into));
    }

    /// Appends a command that cloud-init runs without a shell.
    pub fn add_command<I, S>(&mut self, argv: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands
            .push(Command::Argv(argv.into_iter().map(Into::into).collect()));
    }

    /// Appends a command that runs as `/bin/bash -c <command>`.
    pub fn add_shell_command<S: Into<String>>(&mut self, command: S) {
        self.add_command([SHELL.to_string(), "-c".to_string(), command.into()]);
    }

    /// Appends a file, defaulting the owner to root and the permissions to 0644.
    pub fn add_file(&mut self, file: File) {
        self.push_file(file, DEFAULT_PERMISSIONS);
    }

    /// Appends an executable file, defaulting the owner to root and the permissions to 0755.
    pub fn add_script(&mut self, file: File) {
        self.push_file(file, SCRIPT_PERMISSIONS);
    }

    /// Writes the script under `SCRIPTS_DIR` and appends a command that runs it.
    pub fn run_script<N, C>(&mut self, name: N, content: C)
    where
        N: AsRef<str>,
        C: Into<String>,
    {
        let path = format!("{}{}", SCRIPTS_DIR, name.as_ref());
        self.add_script(File::new(path.clone(), content));
        self.add_command([path]);
    }

    fn push_file(&mut self, mut file: File, default_permissions: &str) {
        if file.owner.is_empty() {
            file.owner = DEFAULT_OWNER.to_string();
        }
        if file.permissions.is_empty() {
            file.permissions = default_permissions.to_string();
        }
        self.files.push(file);
    }

    /// Renders the document as YAML behind the `#cloud-config` header, without compression.
    pub fn to_document(&self) -> Result<String> {
        let body = serde_yaml::to_string(self).context(error::YamlSerializeSnafu)?;
        Ok(format!("{}\n{}", HEADER, body))
    }

    /// Produces the gzip-compressed, base64-encoded document for use as user-data.
    pub fn encode(&self) -> Result<String> {
        let document = self.to_document()?;
        trace!("cloud-config document:\n{}", document);
        let compressed =
            compression::compress(document.as_bytes()).context(error::CompressSnafu)?;
        Ok(BASE64.encode(compressed))
    }

    /// Parses user-data produced by `encode`.  Uncompressed user-data is accepted too.
    pub fn decode<S: AsRef<str>>(user_data: S) -> Result<Self> {
        let raw = BASE64
            .decode(user_data.as_ref().trim())
            .context(error::Base64DecodeSnafu)?;
        let document = expand_slice_maybe(&raw).context(error::DecompressSnafu)?;
        let body = document
            .strip_prefix(HEADER)
            .context(error::MissingHeaderSnafu)?;
        serde_yaml::from_str(body).context(error::YamlDeserializeSnafu)
    }
}

mod error {
    use snafu::Snafu;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub enum Error {
        #[snafu(display("Unable to base64-decode user-data: {}", source))]
        Base64Decode { source: base64::DecodeError },

        #[snafu(display("Unable to gzip cloud-config: {}", source))]
        Compress { source: std::io::Error },

        #[snafu(display("Unable to expand user-data: {}", source))]
        Decompress { source: std::io::Error },

        #[snafu(display("User-data does not start with '{}'", super::HEADER))]
        MissingHeader,

        #[snafu(display("Unable to deserialize cloud-config: {}", source))]
        YamlDeserialize { source: serde_yaml::Error },

        #[snafu(display("Unable to serialize cloud-config: {}", source))]
        YamlSerialize { source: serde_yaml::Error },
    }
}

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=
