/// Configuration for a command-server session.
///
/// Passed explicitly into [`CommandServer::new`](crate::CommandServer::new);
/// there is no global default state to mutate.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name or path of the Mercurial binary.
    pub hg_binary: String,

    /// Arguments used to launch the command server.
    pub server_args: Vec<String>,

    /// Value forced into the subprocess's `HGENCODING` environment variable
    /// so it emits predictable bytes.
    pub forced_encoding: String,
}

impl SessionConfig {
    /// Environment variable controlling Mercurial's text encoding.
    pub const ENCODING_VAR: &'static str = "HGENCODING";
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            hg_binary: "hg".to_string(),
            server_args: [
                "--config",
                "ui.interactive=True",
                "--config",
                "ui.merge=internal:fail",
                "serve",
                "--cmdserver",
                "pipe",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            forced_encoding: "UTF-8".to_string(),
        }
    }
}
