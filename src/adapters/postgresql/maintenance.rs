//! Database maintenance around an anonymization run

use crate::config::schema::PostgreSQLConfig;
use crate::domain::{AnonymizerError, Result};
use secrecy::ExposeSecret;
use std::path::Path;
use tokio::process::Command;

/// Program used to write dump files
pub const PG_DUMP: &str = "pg_dump";

/// Arguments for a compressed custom-format dump of the configured database
pub fn dump_arguments(connection_string: &str, path: &Path) -> Vec<String> {
    vec![
        "-Fc".to_string(),
        "-Z".to_string(),
        "9".to_string(),
        "--dbname".to_string(),
        connection_string.to_string(),
        "-f".to_string(),
        path.display().to_string(),
    ]
}

/// Write a compressed `pg_dump` archive of the database to `path`
///
/// The program is started directly, without a shell.
///
/// # Errors
///
/// Returns an I/O error if `pg_dump` cannot be started and a connectivity
/// error if it exits unsuccessfully.
pub async fn create_database_dump(path: &Path, config: &PostgreSQLConfig) -> Result<()> {
    create_dump_with(PG_DUMP, path, config).await
}

async fn create_dump_with(program: &str, path: &Path, config: &PostgreSQLConfig) -> Result<()> {
    tracing::info!(path = %path.display(), "Creating database dump file");

    let connection_string = config.connection_string.expose_secret();
    let output = Command::new(program)
        .args(dump_arguments(connection_string.as_ref(), path))
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| AnonymizerError::Io(format!("Failed to run {}: {}", program, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AnonymizerError::Connectivity(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            stderr.trim()
        )));
    }

    tracing::info!(path = %path.display(), "Database dump file created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    fn config() -> PostgreSQLConfig {
        PostgreSQLConfig {
            connection_string: secret_string("postgresql://u:p@localhost/app".to_string()),
            connection_timeout_seconds: 5,
            statement_timeout_seconds: 0,
            ssl_mode: "disable".to_string(),
        }
    }

    #[test]
    fn test_dump_arguments() {
        let args = dump_arguments("postgresql://localhost/app", Path::new("/tmp/app.dump"));
        assert_eq!(
            args,
            vec![
                "-Fc",
                "-Z",
                "9",
                "--dbname",
                "postgresql://localhost/app",
                "-f",
                "/tmp/app.dump"
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let err = create_dump_with("pganon-no-such-program", Path::new("out.dump"), &config())
            .await
            .unwrap_err();
        assert!(matches!(err, AnonymizerError::Io(_)));
    }
}
