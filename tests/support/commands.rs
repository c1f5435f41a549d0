//! Command helper methods for Test.

use super::Test;
use assert_cmd::Command;
use std::process::Output;

impl Test {
    /// Create a fleetkeys command running in the project directory.
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("fleetkeys").expect("failed to find fleetkeys binary");
        cmd.current_dir(self.dir.path());
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("FLEETKEYS_CONFIG");
        cmd.env_remove("FLEETKEYS_LOG");
        cmd
    }

    /// Shortcut for `fleetkeys list`.
    pub fn list(&self) -> Output {
        self.cmd()
            .arg("list")
            .output()
            .expect("failed to run fleetkeys list")
    }

    /// Shortcut for `fleetkeys print-keys --alias <alias>`.
    pub fn print_keys(&self, alias: &str) -> Output {
        self.cmd()
            .args(["print-keys", "--alias", alias])
            .write_stdin("")
            .output()
            .expect("failed to run fleetkeys print-keys")
    }

    /// `fleetkeys print-keys` answering the continue prompt with `answer`.
    pub fn print_keys_answering(&self, alias: &str, answer: &str) -> Output {
        self.cmd()
            .args(["print-keys", "--alias", alias])
            .write_stdin(format!("{}\n", answer))
            .output()
            .expect("failed to run fleetkeys print-keys")
    }

    /// `fleetkeys install-host-keys [--alias <alias>]` answering prompts with `answer`.
    pub fn install(&self, alias: Option<&str>, answer: &str) -> Output {
        let mut cmd = self.cmd();
        cmd.arg("install-host-keys");
        if let Some(alias) = alias {
            cmd.args(["--alias", alias]);
        }
        cmd.write_stdin(format!("{}\n", answer))
            .output()
            .expect("failed to run fleetkeys install-host-keys")
    }

    /// Shortcut for `fleetkeys update-sops-files`.
    pub fn update_sops_files(&self) -> Output {
        self.cmd()
            .arg("update-sops-files")
            .output()
            .expect("failed to run fleetkeys update-sops-files")
    }
}
