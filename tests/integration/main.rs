//! Integration tests for logprep

use logprep::config::Config;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary data root plus a config file pointing at it
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let ws = Self {
            dir: TempDir::new().unwrap(),
        };
        std::fs::create_dir_all(ws.data_dir()).unwrap();
        ws.write_config(Config::default());
        ws
    }

    fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write_config(&self, mut config: Config) {
        config.storage.data_dir = self.data_dir();
        std::fs::write(self.config_path(), toml::to_string_pretty(&config).unwrap()).unwrap();
    }

    /// Configure an encoder that writes `{dataset}-{split}` into each split
    fn with_shell_encoder(self) -> Self {
        let mut config = Config::default();
        config.encoder.command = vec![
            "sh".to_string(),
            "-c".to_string(),
            r#"for s in train val test; do printf '%s-%s' "$LOGPREP_DATASET" "$s" > "$LOGPREP_OUTPUT_DIR/$s.$LOGPREP_EXTENSION"; done"#
                .to_string(),
        ];
        self.write_config(config);
        self
    }

    fn add_dataset(&self, name: &str) {
        let dir = self.data_dir().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{}.csv", name)), "CaseID,Activity,Timestamp\n").unwrap();
        std::fs::write(
            dir.join("default_props.json"),
            r#"{"case_name": "CaseID", "concept_name": "Activity", "timestamp_name": "Timestamp"}"#,
        )
        .unwrap();
    }

    fn global_args(&self) -> Vec<String> {
        vec![
            "-c".to_string(),
            self.config_path().display().to_string(),
            "--data-dir".to_string(),
            self.data_dir().display().to_string(),
        ]
    }
}

mod cli_tests {
    use super::*;
    use assert_cmd::Command;
    use predicates::prelude::*;

    fn logprep(ws: &Workspace) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_logprep"));
        cmd.env_remove("LOGPREP_CONFIG")
            .env_remove("LOGPREP_DATA_DIR")
            .current_dir(ws.path())
            .args(ws.global_args());
        cmd
    }

    #[test]
    fn help_displays() {
        Command::new(env!("CARGO_BIN_EXE_logprep"))
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("encoding cache"));
    }

    #[test]
    fn version_displays() {
        Command::new(env!("CARGO_BIN_EXE_logprep"))
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("logprep"));
    }

    #[test]
    fn datasets_lists_directories() {
        let ws = Workspace::new();
        ws.add_dataset("Sepsis");
        ws.add_dataset("Helpdesk");

        logprep(&ws)
            .arg("datasets")
            .assert()
            .success()
            .stdout(predicate::eq("Helpdesk\nSepsis\n"));
    }

    #[test]
    fn props_prints_merged_defaults() {
        let ws = Workspace::new();
        ws.add_dataset("Sepsis");

        logprep(&ws)
            .args(["props", "Sepsis"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""case_name": "CaseID""#))
            .stdout(predicate::str::contains(r#""min_suffix_size": 5"#));
    }

    #[test]
    fn props_missing_dataset() {
        let ws = Workspace::new();

        logprep(&ws)
            .args(["props", "Sepsis"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Event log not found"))
            .stderr(predicate::str::contains("logprep datasets"));
    }

    #[test]
    fn config_path_and_show() {
        let ws = Workspace::new();

        logprep(&ws)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));

        logprep(&ws)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[storage]"))
            .stdout(predicate::str::contains("[defaults]"));
    }

    #[test]
    fn config_init_respects_existing_file() {
        let ws = Workspace::new();
        let path = ws.path().join("fresh").join("config.toml");

        Command::new(env!("CARGO_BIN_EXE_logprep"))
            .arg("-c")
            .arg(&path)
            .args(["config", "init"])
            .assert()
            .success();
        assert!(path.exists());

        Command::new(env!("CARGO_BIN_EXE_logprep"))
            .arg("-c")
            .arg(&path)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--force"));
    }

    #[test]
    fn encode_without_encoder_fails_with_hint() {
        let ws = Workspace::new();
        ws.add_dataset("Sepsis");

        logprep(&ws)
            .args(["encode", "Sepsis"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No encoder command configured"))
            .stderr(predicate::str::contains("Hint:"));
        assert!(!ws.path().join("Sepsis.zip").exists());
    }

    #[test]
    fn encode_rejects_invalid_fractions() {
        let ws = Workspace::new().with_shell_encoder();
        ws.add_dataset("Sepsis");
        let props = ws.path().join("props.json");
        std::fs::write(&props, r#"{"train_validation_size": 0.6, "test_validation_size": 0.6}"#).unwrap();

        logprep(&ws)
            .args(["encode", "Sepsis", "--properties"])
            .arg(&props)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid request"));
        assert!(!ws.data_dir().join("Sepsis").join("encoded").exists());
    }

    #[cfg(unix)]
    #[test]
    fn encode_writes_archive_and_reuses_cache() {
        let ws = Workspace::new().with_shell_encoder();
        ws.add_dataset("Sepsis");

        logprep(&ws).args(["encode", "Sepsis"]).assert().success();
        let first = std::fs::read(ws.path().join("Sepsis.zip")).unwrap();
        assert_eq!(&first[..4], b"PK\x03\x04");
        assert!(first.windows(18).any(|w| w == b"Sepsis_5_train.pkl"));
        assert!(first.windows(10).any(|w| w == b"Sepsis-val"));

        let second_path = ws.path().join("again.zip");
        logprep(&ws)
            .args(["encode", "Sepsis", "-o"])
            .arg(&second_path)
            .assert()
            .success();
        assert_eq!(std::fs::read(second_path).unwrap(), first);

        let audit = std::fs::read_to_string(ws.data_dir().join(".logprep").join("audit.log")).unwrap();
        assert_eq!(audit.matches("\"build.started\"").count(), 1);
        assert_eq!(audit.matches("\"cache.hit\"").count(), 1);

        logprep(&ws)
            .args(["cache", "list", "Sepsis", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"state\": \"complete\""));
    }

    #[cfg(unix)]
    #[test]
    fn encode_to_stdout_keeps_status_on_stderr() {
        let ws = Workspace::new().with_shell_encoder();
        ws.add_dataset("Sepsis");

        let assert = logprep(&ws)
            .args(["encode", "Sepsis", "-o", "-"])
            .assert()
            .success()
            .stderr(predicate::str::contains("Artifacts ready"));
        let stdout = &assert.get_output().stdout;
        assert_eq!(&stdout[..4], b"PK\x03\x04");
        assert!(!ws.path().join("Sepsis.zip").exists());
    }

    #[test]
    fn props_rejects_dataset_without_raw_log() {
        let ws = Workspace::new();
        std::fs::create_dir_all(ws.data_dir().join("Sepsis")).unwrap();

        logprep(&ws)
            .args(["props", "Sepsis"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Event log not found"));
    }
}

#[cfg(unix)]
mod http_tests {
    use super::*;
    use std::net::TcpListener;
    use std::process::{Child, Command, Stdio};
    use std::thread::sleep;
    use std::time::Duration;

    /// `logprep serve` child process, killed on drop
    struct Server {
        child: Child,
        base: String,
    }

    impl Server {
        fn start(ws: &Workspace) -> Self {
            let port = TcpListener::bind("127.0.0.1:0")
                .unwrap()
                .local_addr()
                .unwrap()
                .port();
            let bind = format!("127.0.0.1:{}", port);

            let child = Command::new(env!("CARGO_BIN_EXE_logprep"))
                .env_remove("LOGPREP_CONFIG")
                .args(ws.global_args())
                .args(["serve", "--bind"])
                .arg(&bind)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .unwrap();

            let server = Self {
                child,
                base: format!("http://{}", bind),
            };
            for _ in 0..100 {
                if ureq::get(&server.url("/")).call().is_ok() {
                    return server;
                }
                sleep(Duration::from_millis(100));
            }
            panic!("server did not start on {}", bind);
        }

        fn url(&self, path: &str) -> String {
            format!("{}{}", self.base, path)
        }
    }

    impl Drop for Server {
        fn drop(&mut self) {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }

    fn agent() -> ureq::Agent {
        ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into()
    }

    #[test]
    fn serves_logs_and_archives() {
        let ws = Workspace::new().with_shell_encoder();
        ws.add_dataset("Sepsis");
        let server = Server::start(&ws);
        let agent = agent();

        let body = agent
            .get(&server.url("/logs"))
            .call()
            .unwrap()
            .body_mut()
            .read_to_string()
            .unwrap();
        let logs: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(logs["logs"], serde_json::json!(["Sepsis"]));

        let mut resp = agent
            .post(&server.url("/encode_event_log"))
            .header("content-type", "application/json")
            .send(r#"{"event_log_name": "Sepsis", "event_log_properties": {"min_suffix_size": 6}}"#)
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let disposition = resp
            .headers()
            .get("content-disposition")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(disposition.contains("Sepsis.zip"));
        let archive = resp.body_mut().read_to_vec().unwrap();
        assert_eq!(&archive[..4], b"PK\x03\x04");
        assert!(archive.windows(16).any(|w| w == b"Sepsis_6_val.pkl"));
    }

    #[test]
    fn reports_errors_as_detail() {
        let ws = Workspace::new().with_shell_encoder();
        let server = Server::start(&ws);

        let mut resp = agent()
            .get(&server.url("/log_props/Missing"))
            .call()
            .unwrap();
        assert_eq!(resp.status().as_u16(), 404);
        let body: serde_json::Value =
            serde_json::from_str(&resp.body_mut().read_to_string().unwrap()).unwrap();
        assert!(body["detail"].as_str().unwrap().contains("Missing"));
    }
}
