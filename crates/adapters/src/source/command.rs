//! External exporter process.
//!
//! The exporter is run once per check with `{load_balancer}` substituted in
//! its arguments and the credentials in its environment. It prints a
//! snapshot on stdout and exits 0; on failure its stderr is matched against
//! the AWS error codes below.

use std::process::Stdio;

use elbenwald_core::config::LOAD_BALANCER_PLACEHOLDER;
use elbenwald_core::error::DataSourceError;
use elbenwald_core::pipeline::HealthDataSource;
use elbenwald_core::types::InstanceHealthRecord;
use tracing::debug;

use super::parse_snapshot;
use crate::credentials::AwsCredentials;

const NOT_FOUND_CODES: &[&str] = &["LoadBalancerNotFound"];

const UNAUTHORIZED_CODES: &[&str] = &[
    "AccessDenied",
    "InvalidClientTokenId",
    "SignatureDoesNotMatch",
    "UnrecognizedClientException",
    "ExpiredToken",
];

/// Runs an exporter program per fetch.
#[derive(Debug, Clone)]
pub struct CommandSource {
    program: String,
    args: Vec<String>,
    credentials: AwsCredentials,
}

impl CommandSource {
    pub fn new(program: impl Into<String>, args: Vec<String>, credentials: AwsCredentials) -> Self {
        Self {
            program: program.into(),
            args,
            credentials,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn args_for(&self, load_balancer: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(LOAD_BALANCER_PLACEHOLDER, load_balancer))
            .collect()
    }
}

/// Maps a failed exporter run to a data source error.
fn failure_from_stderr(load_balancer: &str, code: Option<i32>, stderr: &str) -> DataSourceError {
    if NOT_FOUND_CODES.iter().any(|c| stderr.contains(c)) {
        return DataSourceError::UnknownLoadBalancer(load_balancer.to_owned());
    }
    if UNAUTHORIZED_CODES.iter().any(|c| stderr.contains(c)) {
        return DataSourceError::Unauthorized(first_line(stderr).to_owned());
    }
    let status = code.map_or_else(|| "signal".to_owned(), |c| c.to_string());
    DataSourceError::Unavailable(format!(
        "exporter exited with {status}: {}",
        first_line(stderr)
    ))
}

fn first_line(s: &str) -> &str {
    s.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim()
}

impl HealthDataSource for CommandSource {
    fn name(&self) -> &str {
        "command"
    }

    async fn fetch_instance_health(
        &self,
        load_balancer: &str,
    ) -> Result<Vec<InstanceHealthRecord>, DataSourceError> {
        let args = self.args_for(load_balancer);
        debug!(program = %self.program, ?args, "running exporter");

        // kill_on_drop: a fetch timeout drops this future and must not leak the child
        let output = tokio::process::Command::new(&self.program)
            .args(&args)
            .envs(self.credentials.env_vars())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                DataSourceError::Unavailable(format!("failed to run '{}': {e}", self.program))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failure_from_stderr(
                load_balancer,
                output.status.code(),
                &stderr,
            ));
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| {
            DataSourceError::MalformedResponse("exporter output is not UTF-8".to_owned())
        })?;
        parse_snapshot(&stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> AwsCredentials {
        AwsCredentials::from_yaml(
            "access_key_id: AKIDTEST\nsecret_access_key: secret\nregion: eu-west-1\n",
        )
        .unwrap()
    }

    fn shell(script: &str) -> CommandSource {
        CommandSource::new(
            "sh",
            vec![
                "-c".to_owned(),
                script.to_owned(),
                "sh".to_owned(),
                LOAD_BALANCER_PLACEHOLDER.to_owned(),
            ],
            credentials(),
        )
    }

    #[test]
    fn placeholder_is_substituted_in_every_argument() {
        let source = CommandSource::new(
            "exporter",
            vec![
                "--load-balancer".to_owned(),
                "{load_balancer}".to_owned(),
                "--out=/tmp/{load_balancer}.json".to_owned(),
            ],
            credentials(),
        );
        assert_eq!(
            source.args_for("web"),
            vec!["--load-balancer", "web", "--out=/tmp/web.json"]
        );
    }

    #[test]
    fn stderr_codes_map_to_errors() {
        assert!(matches!(
            failure_from_stderr("web", Some(255), "An error occurred (LoadBalancerNotFound)"),
            DataSourceError::UnknownLoadBalancer(ref n) if n == "web"
        ));
        for code in UNAUTHORIZED_CODES {
            let stderr = format!("An error occurred ({code}) when calling DescribeInstanceHealth");
            assert!(matches!(
                failure_from_stderr("web", Some(255), &stderr),
                DataSourceError::Unauthorized(_)
            ));
        }
        assert!(matches!(
            failure_from_stderr("web", Some(1), "\nconnection reset\n"),
            DataSourceError::Unavailable(ref m) if m.contains("connection reset") && m.contains('1')
        ));
        assert!(matches!(
            failure_from_stderr("web", None, ""),
            DataSourceError::Unavailable(ref m) if m.contains("signal")
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn parses_exporter_stdout() {
        let source = shell(
            r#"printf '[{"instance_id":"i-1","availability_zone":"%s-a","state":"InService"}]' "$1""#,
        );

        let records = source.fetch_instance_health("web").await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].availability_zone, "web-a");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn credentials_reach_the_child_environment() {
        let source = shell(
            r#"printf '[{"instance_id":"%s","availability_zone":"%s","state":"InService"}]' "$AWS_ACCESS_KEY_ID" "$AWS_DEFAULT_REGION""#,
        );

        let records = source.fetch_instance_health("web").await.unwrap();

        assert_eq!(records[0].instance_id, "AKIDTEST");
        assert_eq!(records[0].availability_zone, "eu-west-1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_exporter_maps_stderr() {
        let source = shell("echo 'An error occurred (AccessDenied)' >&2; exit 255");

        let err = source.fetch_instance_health("web").await.unwrap_err();

        assert!(matches!(err, DataSourceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn missing_program_is_unavailable() {
        let source = CommandSource::new(
            "/nonexistent/elbenwald-exporter",
            Vec::new(),
            credentials(),
        );

        let err = source.fetch_instance_health("web").await.unwrap_err();

        assert!(matches!(err, DataSourceError::Unavailable(_)));
    }
}
