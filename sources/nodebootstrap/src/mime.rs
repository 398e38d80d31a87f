//! Multipart MIME user-data, as read by cloud-init on images that bootstrap with a node
//! configuration document.
//!
//! Parts are always emitted in the same order: shell scripts, then boot-hooks, then the node
//! configuration.  An envelope with no parts produces no user-data at all.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::RngCore;

const CRLF: &str = "\r\n";
const BOUNDARY_BYTES: usize = 30;

/// The kind of a MIME part, which determines how cloud-init treats it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    ShellScript,
    BootHook,
    NodeConfig,
}

impl PartKind {
    pub fn content_type(&self) -> &'static str {
        match self {
            PartKind::ShellScript => "text/x-shellscript; charset=\"us-ascii\"",
            PartKind::BootHook => "text/cloud-boothook; charset=\"us-ascii\"",
            PartKind::NodeConfig => "application/node.eks.aws",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MimeEnvelope {
    scripts: Vec<String>,
    boot_hooks: Vec<String>,
    node_config: Option<String>,
    boundary: Option<String>,
}

impl MimeEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed boundary instead of a random one.
    pub fn with_boundary<S: Into<String>>(mut self, boundary: Option<S>) -> Self {
        self.boundary = boundary.map(Into::into);
        self
    }

    pub fn add_script<S: Into<String>>(&mut self, body: S) {
        self.scripts.push(body.into());
    }

    pub fn add_boot_hook<S: Into<String>>(&mut self, body: S) {
        self.boot_hooks.push(body.into());
    }

    /// Sets the single node configuration document, replacing any previous one.
    pub fn set_node_config<S: Into<String>>(&mut self, body: S) {
        self.node_config = Some(body.into());
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty() && self.boot_hooks.is_empty() && self.node_config.is_none()
    }

    /// The parts in emission order.
    pub fn parts(&self) -> impl Iterator<Item = (PartKind, &str)> + '_ {
        self.scripts
            .iter()
            .map(|s| (PartKind::ShellScript, s.as_str()))
            .chain(self.boot_hooks.iter().map(|s| (PartKind::BootHook, s.as_str())))
            .chain(
                self.node_config
                    .iter()
                    .map(|s| (PartKind::NodeConfig, s.as_str())),
            )
    }

    /// The plain multipart message, or an empty string if there are no parts.
    pub fn render(&self) -> String {
        if self.is_empty() {
            return String::new();
        }

        let boundary = self.boundary.clone().unwrap_or_else(random_boundary);
        let mut out = format!(
            "MIME-Version: 1.0{crlf}Content-Type: multipart/mixed; boundary={b}{crlf}{crlf}",
            crlf = CRLF,
            b = boundary
        );
        for (kind, body) in self.parts() {
            out.push_str(&format!("--{}{}", boundary, CRLF));
            out.push_str(&format!("Content-Type: {}{}", kind.content_type(), CRLF));
            out.push_str(CRLF);
            out.push_str(body);
            out.push_str(CRLF);
        }
        out.push_str(&format!("--{}--{}", boundary, CRLF));
        out
    }

    /// The base64-encoded message for use as user-data, or an empty string if there are no parts.
    pub fn encode(&self) -> String {
        let message = self.render();
        if message.is_empty() {
            return message;
        }
        trace!("MIME user-data:\n{}", message);
        BASE64.encode(message)
    }
}

fn random_boundary() -> String {
    let mut bytes = [0u8; BOUNDARY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=
