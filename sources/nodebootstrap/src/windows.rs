//! PowerShell user-data for Windows nodes, which run the bootstrap script shipped in the image.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

const PREAMBLE: &str = r#"[string]$EKSBootstrapScriptFile = "$env:ProgramFiles\Amazon\EKS\Start-EKSBootstrap.ps1""#;

/// Redirects the script's warning, verbose, debug and information streams to stdout so they end
/// up in the instance console log.
const REDIRECTS: &str = "3>&1 4>&1 5>&1 6>&1";

#[derive(Debug, Clone, Default)]
pub struct PowerShellScript {
    pre_bootstrap: Vec<String>,
    arguments: Vec<(&'static str, String)>,
    kubelet_flags: Vec<String>,
    override_command: Option<String>,
}

impl PowerShellScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands run verbatim before the bootstrap script.
    pub fn add_pre_bootstrap_commands<I, S>(&mut self, commands: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pre_bootstrap
            .extend(commands.into_iter().map(Into::into));
    }

    /// Adds a quoted `-Name "value"` argument to the bootstrap invocation.  Empty values are left
    /// out.
    pub fn add_argument<S: Into<String>>(&mut self, name: &'static str, value: S) {
        let value = value.into();
        if !value.is_empty() {
            self.arguments.push((name, value));
        }
    }

    /// Adds `--name=value` to the kubelet arguments.  Flags are kept even when the value is
    /// empty, since the bootstrap script expects them to be present.
    pub fn add_kubelet_flag<S: AsRef<str>>(&mut self, name: &str, value: S) {
        self.kubelet_flags
            .push(format!("--{}={}", name, value.as_ref()));
    }

    /// Runs the given command in place of the bootstrap script.
    pub fn set_override_command<S: Into<String>>(&mut self, command: S) {
        self.override_command = Some(command.into());
    }

    pub fn render(&self) -> String {
        let mut lines = vec!["<powershell>".to_string(), PREAMBLE.to_string()];
        lines.extend(self.pre_bootstrap.iter().cloned());
        lines.push(match &self.override_command {
            Some(command) => command.clone(),
            None => self.invocation(),
        });
        lines.push("</powershell>".to_string());
        lines.join("\n")
    }

    pub fn encode(&self) -> String {
        let script = self.render();
        trace!("PowerShell user-data:\n{}", script);
        BASE64.encode(script)
    }

    fn invocation(&self) -> String {
        let mut parts = vec!["& $EKSBootstrapScriptFile".to_string()];
        for (name, value) in &self.arguments {
            parts.push(format!("-{} {}", name, quote(value)));
        }
        parts.push(format!(
            "-KubeletExtraArgs {}",
            quote(&self.kubelet_flags.join(" "))
        ));
        parts.push(REDIRECTS.to_string());
        parts.join(" ")
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value)
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=
